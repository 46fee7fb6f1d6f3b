use std::fmt;
use std::io::Error;
use std::time::Instant;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::page_size::PAGE_SIZE_OPTIONS;
use crate::pipeline::FilterMode;

pub const HELP_TEXT: &str = "\
Navigation
  ↑ ↓ / j k       move row cursor
  ← → / h l       move column cursor
  n / PgDn        next page
  p / PgUp        previous page
  1 .. 9          jump to page
  + / -           more / fewer rows per page

Filtering
  /               edit filter text (Enter closes, Esc clears)
  a               show all rows
  c               show checked rows only

Rows
  Space           toggle row checkbox
  t               toggle main checkbox (all rows)
  s               sort by current column (again to flip)
  e / Enter       edit current cell (Enter commits, Esc cancels)
  y / Y           copy cell / row

  ?               this help
  Esc             close popup
  q               quit";

#[derive(Debug)]
pub enum TVError {
    IoError(Error),
    PolarsError(PolarsError),
    HttpError(reqwest::Error),
    ConfigError(String),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    MissingId,
    NotFound(String),
}

impl fmt::Display for TVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TVError::IoError(e) => write!(f, "io error: {e}"),
            TVError::PolarsError(e) => write!(f, "failed to read dataset: {e}"),
            TVError::HttpError(e) => write!(f, "failed to fetch dataset: {e}"),
            TVError::ConfigError(s) => write!(f, "invalid column config: {s}"),
            TVError::LoadingFailed(s) => write!(f, "loading failed: {s}"),
            TVError::FileNotFound => write!(f, "file not found"),
            TVError::PermissionDenied => write!(f, "permission denied"),
            TVError::UnknownFileType => write!(f, "unknown file type"),
            TVError::MissingId => write!(f, "dataset has no `id` field"),
            TVError::NotFound(id) => write!(f, "no record with id {id:?}"),
        }
    }
}

impl std::error::Error for TVError {}

impl From<Error> for TVError {
    fn from(err: Error) -> Self {
        TVError::IoError(err)
    }
}

impl From<PolarsError> for TVError {
    fn from(err: PolarsError) -> Self {
        TVError::PolarsError(err)
    }
}

impl From<reqwest::Error> for TVError {
    fn from(err: reqwest::Error) -> Self {
        TVError::HttpError(err)
    }
}

impl From<serde_json::Error> for TVError {
    fn from(err: serde_json::Error) -> Self {
        TVError::ConfigError(err.to_string())
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub debounce_ms: u64,
    pub per_page: usize,
    pub per_page_options: Vec<usize>,
    pub max_column_width: usize,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            event_poll_time: 100,
            debounce_ms: 500,
            per_page: 5,
            per_page_options: PAGE_SIZE_OPTIONS.to_vec(),
            max_column_width: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    Filter,
    Edit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Help,
    Resize(usize, usize),
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Search,
    FilterMode(FilterMode),
    SortColumn,
    ToggleRow,
    ToggleAll,
    PageSizeNext,
    PageSizePrev,
    GoToPage(usize),
    PrevPage,
    NextPage,
    Edit,
    CopyCell,
    CopyRow,
    RawKey(KeyEvent),
    Tick(Instant),
}
