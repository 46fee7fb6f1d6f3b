use std::collections::HashMap;

use polars::prelude::DataType;
use tracing::{debug, trace};

use crate::domain::TVError;

/// Handle of a record inside the store. Records never move, so the handle
/// stays valid for the lifetime of the store.
pub type RecordIdx = usize;

pub struct Column {
    pub name: String,
    pub dtype: DataType,
    pub data: Vec<Option<String>>,
}

impl Column {
    pub fn new(name: &str, dtype: DataType, data: Vec<Option<String>>) -> Self {
        Column {
            name: name.to_string(),
            dtype,
            data,
        }
    }

    pub fn is_numeric(&self) -> bool {
        is_numeric_type(&self.dtype)
    }

    pub fn as_string(&self) -> String {
        format!(
            "\"{}\", {:?}, # rows {}, # missing {}",
            self.name,
            self.dtype,
            self.data.len(),
            self.data.iter().filter(|v| v.is_none()).count(),
        )
    }
}

pub fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Owns every loaded record. Field values are kept column-wise and indexed
/// by `RecordIdx`; all views hold handles into this arena instead of copies,
/// so checking or editing a record is visible everywhere at once.
pub struct DatasetStore {
    ids: Vec<String>,
    id_index: HashMap<String, RecordIdx>,
    columns: Vec<Column>,
    column_index: HashMap<String, usize>,
    checked: Vec<bool>,
}

impl DatasetStore {
    pub fn new(ids: Vec<String>, columns: Vec<Column>) -> Result<Self, TVError> {
        let nrecords = ids.len();
        let mut id_index = HashMap::with_capacity(nrecords);
        for (idx, id) in ids.iter().enumerate() {
            if id_index.insert(id.clone(), idx).is_some() {
                return Err(TVError::LoadingFailed(format!("duplicate record id {id:?}")));
            }
        }

        let mut column_index = HashMap::with_capacity(columns.len());
        for (cidx, column) in columns.iter().enumerate() {
            if column.data.len() != nrecords {
                return Err(TVError::LoadingFailed(format!(
                    "column \"{}\" has {} values for {} records",
                    column.name,
                    column.data.len(),
                    nrecords
                )));
            }
            column_index.insert(column.name.clone(), cidx);
        }

        debug!(
            "Created dataset store with {} records and {} fields",
            nrecords,
            columns.len()
        );
        Ok(DatasetStore {
            ids,
            id_index,
            columns,
            column_index,
            checked: vec![false; nrecords],
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, idx: RecordIdx) -> &str {
        &self.ids[idx]
    }

    pub fn find_by_id(&self, id: &str) -> Result<RecordIdx, TVError> {
        self.id_index
            .get(id)
            .copied()
            .ok_or_else(|| TVError::NotFound(id.to_string()))
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.column_index.contains_key(field)
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.column_index.get(field).map(|&cidx| &self.columns[cidx])
    }

    /// Value of `field` for the record, `None` if the field is absent or null.
    pub fn value(&self, idx: RecordIdx, field: &str) -> Option<&str> {
        self.column(field)
            .and_then(|c| c.data.get(idx))
            .and_then(|v| v.as_deref())
    }

    pub fn is_checked(&self, idx: RecordIdx) -> bool {
        self.checked[idx]
    }

    pub fn set_checked(&mut self, id: &str, value: bool) -> Result<(), TVError> {
        let idx = self.find_by_id(id)?;
        self.checked[idx] = value;
        trace!("Record {id:?} checked: {value}");
        Ok(())
    }

    pub fn set_all_checked(&mut self, value: bool) {
        self.checked.iter_mut().for_each(|c| *c = value);
        trace!("All {} records checked: {value}", self.checked.len());
    }

    /// Writes `value` into the record in place. Unknown fields are created
    /// with all other records left empty.
    pub fn set_value(&mut self, id: &str, field: &str, value: String) -> Result<(), TVError> {
        let idx = self.find_by_id(id)?;
        let cidx = match self.column_index.get(field) {
            Some(&cidx) => cidx,
            None => {
                debug!("Adding field \"{field}\" to the dataset");
                let nrecords = self.len();
                self.columns
                    .push(Column::new(field, DataType::String, vec![None; nrecords]));
                self.column_index
                    .insert(field.to_string(), self.columns.len() - 1);
                self.columns.len() - 1
            }
        };
        trace!("Record {id:?} field \"{field}\" := {value:?}");
        self.columns[cidx].data[idx] = Some(value);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small catalogue used by the tests of several modules.
    pub(crate) fn phones() -> DatasetStore {
        let names = [
            "Motorola XOOM",
            "iPhone 8",
            "Nexus S",
            "Dell Streak 7",
            "Samsung Galaxy Tab",
            "T-Mobile G2",
        ];
        let snippets = [
            "The Next, Next Generation tablet.",
            "Apple smartphone with a glass back.",
            "Fast just got faster with Nexus S.",
            "Introducing Dell Streak 7.",
            "Feel free to surf the web.",
            "The T-Mobile G2 with Google.",
        ];
        let ages = ["1", "10", "0", "3", "2", "12"];
        let ids: Vec<String> = names
            .iter()
            .map(|n| n.to_lowercase().replace(' ', "-"))
            .collect();
        let to_col = |name: &str, dtype: DataType, values: &[&str]| {
            Column::new(
                name,
                dtype,
                values.iter().map(|v| Some(v.to_string())).collect(),
            )
        };
        DatasetStore::new(
            ids,
            vec![
                to_col("name", DataType::String, &names),
                to_col("snippet", DataType::String, &snippets),
                to_col("age", DataType::Int64, &ages),
            ],
        )
        .unwrap()
    }

    #[test]
    fn find_by_id_resolves_handles() {
        let store = phones();
        let idx = store.find_by_id("iphone-8").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(store.value(idx, "name"), Some("iPhone 8"));
        assert!(matches!(
            store.find_by_id("nokia"),
            Err(TVError::NotFound(id)) if id == "nokia"
        ));
    }

    #[test]
    fn checked_flags_are_shared_state() {
        let mut store = phones();
        assert!((0..store.len()).all(|i| !store.is_checked(i)));

        store.set_checked("nexus-s", true).unwrap();
        assert!(store.is_checked(2));
        assert!(store.set_checked("nokia", true).is_err());

        store.set_all_checked(true);
        assert!((0..store.len()).all(|i| store.is_checked(i)));
        store.set_all_checked(false);
        assert!(!store.is_checked(2));
    }

    #[test]
    fn set_value_writes_in_place_and_adds_fields() {
        let mut store = phones();
        store
            .set_value("nexus-s", "name", "Nexus S (edited)".into())
            .unwrap();
        assert_eq!(store.value(2, "name"), Some("Nexus S (edited)"));

        store.set_value("nexus-s", "carrier", "AT&T".into()).unwrap();
        assert!(store.has_field("carrier"));
        assert_eq!(store.value(2, "carrier"), Some("AT&T"));
        assert_eq!(store.value(0, "carrier"), None);
    }

    #[test]
    fn absent_fields_have_no_value() {
        let store = phones();
        assert_eq!(store.value(0, "imageUrl"), None);
        assert!(store.column("age").unwrap().is_numeric());
        assert!(!store.column("name").unwrap().is_numeric());
    }

    #[test]
    fn rejects_duplicate_ids_and_ragged_columns() {
        let dup = DatasetStore::new(vec!["a".into(), "a".into()], Vec::new());
        assert!(matches!(dup, Err(TVError::LoadingFailed(_))));

        let ragged = DatasetStore::new(
            vec!["a".into(), "b".into()],
            vec![Column::new("name", DataType::String, vec![None])],
        );
        assert!(matches!(ragged, Err(TVError::LoadingFailed(_))));
    }
}
