use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::TVError;
use crate::store::DatasetStore;

/// Capabilities of a single column. Every flag defaults to off.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSpec {
    pub title: Option<String>,
    pub is_sortable: bool,
    pub is_searchable: bool,
    pub is_editable: bool,
    pub has_photo: bool,
}

impl ColumnSpec {
    pub fn titled(title: &str) -> Self {
        ColumnSpec {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    pub fn sortable(mut self) -> Self {
        self.is_sortable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.is_searchable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.is_editable = true;
        self
    }

    pub fn photo(mut self) -> Self {
        self.has_photo = true;
        self
    }

    /// A column header can be used to sort if it is sortable or searchable.
    pub fn can_sort(&self) -> bool {
        self.is_sortable || self.is_searchable
    }
}

/// Ordered column layout of the table, fixed for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    columns: Vec<(String, ColumnSpec)>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig::new(vec![
            ("imageUrl".to_string(), ColumnSpec::default().photo()),
            (
                "name".to_string(),
                ColumnSpec::titled("Name").sortable().searchable().editable(),
            ),
            (
                "snippet".to_string(),
                ColumnSpec::titled("Description").searchable().editable(),
            ),
            ("age".to_string(), ColumnSpec::titled("Age").sortable()),
        ])
    }
}

impl ColumnConfig {
    pub fn new(columns: Vec<(String, ColumnSpec)>) -> Self {
        ColumnConfig { columns }
    }

    /// Parses a JSON object mapping field names to column specs. Key order is kept.
    pub fn from_json(json: &str) -> Result<Self, TVError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut columns = Vec::with_capacity(raw.len());
        for (field, value) in raw {
            let spec: ColumnSpec = serde_json::from_value(value)?;
            columns.push((field, spec));
        }
        if columns.is_empty() {
            return Err(TVError::ConfigError("no columns configured".into()));
        }
        debug!("Parsed column config with {} columns", columns.len());
        Ok(ColumnConfig { columns })
    }

    pub fn load(path: &Path) -> Result<Self, TVError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnSpec)> {
        self.columns.iter().map(|(f, s)| (f.as_str(), s))
    }

    pub fn get(&self, idx: usize) -> Option<(&str, &ColumnSpec)> {
        self.columns.get(idx).map(|(f, s)| (f.as_str(), s))
    }

    pub fn spec(&self, field: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, s)| s)
    }

    pub fn searchable_fields(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, s)| s.is_searchable)
            .map(|(f, _)| f.clone())
            .collect()
    }

    /// Logs configured fields the dataset does not carry. They stay in the
    /// layout and behave like absent values.
    pub fn check_against(&self, store: &DatasetStore) -> Vec<String> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|(f, _)| !store.has_field(f))
            .map(|(f, _)| f.clone())
            .collect();
        for field in missing.iter() {
            warn!("Configured column \"{field}\" is not present in the dataset");
        }
        missing
    }
}
