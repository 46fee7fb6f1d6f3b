use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::TVError;
use crate::store::{Column, DatasetStore};

pub const ID_FIELD: &str = "id";

#[derive(Debug, PartialEq)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

/// Where the dataset is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    /// URLs are recognised by their scheme, everything else is a path with
    /// `~` and environment variables expanded.
    pub fn parse(raw: &str) -> Result<Self, TVError> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Source::Url(raw.to_string()));
        }
        let expanded = shellexpand::full(raw)
            .map_err(|e| TVError::LoadingFailed(format!("cannot expand {raw:?}: {e}")))?;
        Ok(Source::Path(PathBuf::from(expanded.as_ref())))
    }

    pub fn name(&self) -> String {
        match self {
            Source::Path(path) => path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string(),
            Source::Url(url) => url.rsplit('/').next().unwrap_or(url).to_string(),
        }
    }
}

pub fn load(source: &Source) -> Result<DatasetStore, TVError> {
    let start_time = Instant::now();
    let df = match source {
        Source::Path(path) => load_file(path)?,
        Source::Url(url) => fetch_json(url)?,
    };
    info!(
        "Read {} rows x {} columns from {:?} in {}ms",
        df.height(),
        df.width(),
        source,
        start_time.elapsed().as_millis()
    );
    store_from_frame(&df)
}

fn load_file(path: &Path) -> Result<DataFrame, TVError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed("Not a file!".into()));
    }
    debug!("Loading {:?} ({} bytes)", path, metadata.len());

    let df = match detect_file_type(path)? {
        FileType::JSON => read_json(fs::read(path)?)?,
        FileType::CSV => load_csv(path)?.collect()?,
        FileType::PARQUET => load_parquet(path)?.collect()?,
        FileType::ARROW => load_arrow(path)?.collect()?,
    };
    Ok(df)
}

fn fetch_json(url: &str) -> Result<DataFrame, TVError> {
    debug!("Fetching {url}");
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let body = response.bytes()?;
    Ok(read_json(body.to_vec())?)
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType),
    }
}

fn read_json(bytes: Vec<u8>) -> Result<DataFrame, PolarsError> {
    JsonReader::new(Cursor::new(bytes))
        .with_json_format(JsonFormat::Json)
        .finish()
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

/// Converts every column to strings, one column per rayon task. The `id`
/// column becomes the record key, all others become fields.
pub fn store_from_frame(df: &DataFrame) -> Result<DatasetStore, TVError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    if !names.iter().any(|n| n == ID_FIELD) {
        return Err(TVError::MissingId);
    }

    let start_time = Instant::now();
    let c_: Result<Vec<Column>, PolarsError> = names
        .par_iter()
        .map(|name| load_column(df, name))
        .collect();
    let mut columns = c_?;
    debug!(
        "Converting columns took {}ms",
        start_time.elapsed().as_millis()
    );

    let id_pos = columns
        .iter()
        .position(|c| c.name == ID_FIELD)
        .ok_or(TVError::MissingId)?;
    let id_column = columns.remove(id_pos);
    let ids = id_column
        .data
        .into_iter()
        .enumerate()
        .map(|(row, id)| {
            id.ok_or_else(|| TVError::LoadingFailed(format!("record {row} has no id")))
        })
        .collect::<Result<Vec<String>, TVError>>()?;

    for c in columns.iter() {
        debug!("Column: {}", c.as_string());
    }
    DatasetStore::new(ids, columns)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.map(|s| s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")))
        .collect();

    Ok(Column::new(col_name, original_dtype, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn loads_json_catalogue() {
        let store = load(&Source::Path(fixture("phones.json"))).unwrap();
        assert_eq!(store.len(), 6);
        let idx = store.find_by_id("iphone-8").unwrap();
        assert_eq!(store.value(idx, "name"), Some("iPhone 8"));
        assert_eq!(store.value(idx, "age"), Some("10"));
        assert!(store.column("age").unwrap().is_numeric());
        assert!(!store.has_field(ID_FIELD));
    }

    #[test]
    fn loads_csv_with_numeric_ids() {
        let store = load(&Source::Path(fixture("phones.csv"))).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.value(store.find_by_id("2").unwrap(), "name"), Some("Nexus S"));
    }

    #[test]
    fn frame_without_id_is_rejected() {
        let df = df!("name" => ["a", "b"]).unwrap();
        assert!(matches!(store_from_frame(&df), Err(TVError::MissingId)));
    }

    #[test]
    fn nulls_become_missing_values() {
        let df = df!(
            "id" => ["a", "b"],
            "carrier" => [Some("AT&T"), None]
        )
        .unwrap();
        let store = store_from_frame(&df).unwrap();
        assert_eq!(store.value(0, "carrier"), Some("AT&T"));
        assert_eq!(store.value(1, "carrier"), None);
    }

    #[test]
    fn missing_files_and_unknown_types_fail() {
        assert!(matches!(
            load(&Source::Path(fixture("nope.json"))),
            Err(TVError::FileNotFound)
        ));
        assert!(matches!(
            detect_file_type(Path::new("phones.xlsx")),
            Err(TVError::UnknownFileType)
        ));
        assert_eq!(detect_file_type(Path::new("x.Feather")).unwrap(), FileType::ARROW);
    }

    #[test]
    fn unreachable_url_is_an_http_error() {
        let source = Source::Url("http://127.0.0.1:9/phones.json".into());
        assert!(matches!(load(&source), Err(TVError::HttpError(_))));
    }

    #[test]
    fn sources_are_parsed_by_scheme() {
        assert_eq!(
            Source::parse("https://example.org/phones/phones.json").unwrap(),
            Source::Url("https://example.org/phones/phones.json".into())
        );
        assert_eq!(
            Source::parse("data/phones.json").unwrap(),
            Source::Path(PathBuf::from("data/phones.json"))
        );
        assert_eq!(
            Source::parse("https://example.org/phones/phones.json")
                .unwrap()
                .name(),
            "phones.json"
        );
    }
}
