use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::trace;

use crate::store::{DatasetStore, RecordIdx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Checked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// User controlled parameters the visible rows are derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub filter_text: String,
    pub filter_mode: FilterMode,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        ViewState {
            filter_text: String::new(),
            filter_mode: FilterMode::All,
            sort_field: None,
            sort_direction: SortDirection::Ascending,
            page_index: 0,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewProjection {
    pub rows: Vec<RecordIdx>, // Handles of the records on the current page, in display order
    pub filtered_count: usize,
    pub main_checked: bool,
}

pub fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Derives the visible page from the store. Pure in `store` and `state`.
pub fn compute(store: &DatasetStore, searchable: &[String], state: &ViewState) -> ViewProjection {
    let mut rows = filter_rows(store, searchable, state);
    let filtered_count = rows.len();
    if let Some(field) = state.sort_field.as_deref() {
        sort_rows(store, field, state.sort_direction, &mut rows);
    }
    let rows = page_slice(&rows, state.page_index, state.page_size);
    let main_checked = main_checkbox_state(store, &rows);

    trace!(
        "Projection: filter {:?}, mode {:?}, sort {:?} {:?}, page {}x{} => {} of {} rows",
        state.filter_text,
        state.filter_mode,
        state.sort_field,
        state.sort_direction,
        state.page_index,
        state.page_size,
        rows.len(),
        filtered_count
    );
    ViewProjection {
        rows,
        filtered_count,
        main_checked,
    }
}

/// Mode filter followed by the text filter. Keeps load order.
pub fn filter_rows(store: &DatasetStore, searchable: &[String], state: &ViewState) -> Vec<RecordIdx> {
    let needle = fold(&state.filter_text);
    let mode = state.filter_mode;
    (0..store.len())
        .into_par_iter()
        .filter(|&idx| mode == FilterMode::All || store.is_checked(idx))
        .filter(|&idx| matches_text(store, searchable, idx, &needle))
        .collect()
}

/// True if any searchable field contains the already folded `needle`.
pub fn matches_text(store: &DatasetStore, searchable: &[String], idx: RecordIdx, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    searchable.iter().any(|field| {
        store
            .value(idx, field)
            .is_some_and(|v| fold(v).contains(needle))
    })
}

pub fn sort_rows(store: &DatasetStore, field: &str, direction: SortDirection, rows: &mut [RecordIdx]) {
    let Some(column) = store.column(field) else {
        // Nothing to order by, every record has the same (absent) key.
        return;
    };
    let data = &column.data;
    let numeric = column.is_numeric();
    rows.sort_by(|&a, &b| {
        let ord = compare_values(data[a].as_deref(), data[b].as_deref(), numeric);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Ascending order of two cell values. Missing values go last, numeric
/// columns compare as floats with unparseable values after parseable ones.
pub fn compare_values(a: Option<&str>, b: Option<&str>, numeric: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) if numeric => {
            match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => a.cmp(b),
            }
        }
        (Some(a), Some(b)) => a.cmp(b),
    }
}

pub fn page_slice(rows: &[RecordIdx], page_index: usize, page_size: usize) -> Vec<RecordIdx> {
    let begin = page_index.saturating_mul(page_size);
    if begin >= rows.len() {
        return Vec::new();
    }
    let end = std::cmp::min(begin + page_size, rows.len());
    rows[begin..end].to_vec()
}

/// Vacuously true for an empty page.
pub fn main_checkbox_state(store: &DatasetStore, rows: &[RecordIdx]) -> bool {
    rows.iter().all(|&idx| store.is_checked(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::phones;

    fn searchable() -> Vec<String> {
        vec!["name".to_string(), "snippet".to_string()]
    }

    fn names(store: &DatasetStore, rows: &[RecordIdx]) -> Vec<String> {
        rows.iter()
            .map(|&i| store.value(i, "name").unwrap().to_string())
            .collect()
    }

    #[test]
    fn empty_filter_keeps_everything_in_load_order() {
        let store = phones();
        let state = ViewState::new(10);
        let view = compute(&store, &searchable(), &state);
        assert_eq!(view.filtered_count, 6);
        assert_eq!(view.rows, vec![0, 1, 2, 3, 4, 5]);
        assert!(!view.main_checked);
    }

    #[test]
    fn text_filter_is_case_insensitive_trimmed_or_across_fields() {
        let store = phones();
        let mut state = ViewState::new(10);

        state.filter_text = "  IPHONE ".to_string();
        let view = compute(&store, &searchable(), &state);
        assert_eq!(names(&store, &view.rows), vec!["iPhone 8"]);

        // "next" only appears in a snippet
        state.filter_text = "next".to_string();
        let view = compute(&store, &searchable(), &state);
        assert_eq!(names(&store, &view.rows), vec!["Motorola XOOM"]);

        // name and snippet of the same record count once
        state.filter_text = "nexus".to_string();
        let view = compute(&store, &searchable(), &state);
        assert_eq!(view.filtered_count, 1);

        state.filter_text = "t-mobile".to_string();
        let view = compute(&store, &searchable(), &state);
        assert_eq!(names(&store, &view.rows), vec!["T-Mobile G2"]);
    }

    #[test]
    fn text_filter_matches_exactly_the_defining_set() {
        let store = phones();
        let fields = searchable();
        for text in ["", "e", "S", "tab", "with", "zzz", " g2"] {
            let mut state = ViewState::new(100);
            state.filter_text = text.to_string();
            let view = compute(&store, &fields, &state);
            let expected: Vec<RecordIdx> = (0..store.len())
                .filter(|&i| {
                    fields.iter().any(|f| {
                        store
                            .value(i, f)
                            .is_some_and(|v| v.to_lowercase().trim().contains(&fold(text)))
                    })
                })
                .collect();
            assert_eq!(view.rows, expected, "filter {text:?}");
        }
    }

    #[test]
    fn fields_missing_from_the_dataset_never_match() {
        let store = phones();
        let mut state = ViewState::new(10);
        state.filter_text = "x".to_string();
        let view = compute(&store, &["imageUrl".to_string()], &state);
        assert_eq!(view.filtered_count, 0);
        assert!(view.rows.is_empty());
        assert!(view.main_checked);
    }

    #[test]
    fn checked_mode_applies_before_text_filter() {
        let mut store = phones();
        store.set_checked("nexus-s", true).unwrap();
        store.set_checked("iphone-8", true).unwrap();

        let mut state = ViewState::new(10);
        state.filter_mode = FilterMode::Checked;
        let view = compute(&store, &searchable(), &state);
        assert_eq!(names(&store, &view.rows), vec!["iPhone 8", "Nexus S"]);
        assert!(view.main_checked);

        state.filter_text = "nexus".to_string();
        let view = compute(&store, &searchable(), &state);
        assert_eq!(names(&store, &view.rows), vec!["Nexus S"]);
    }

    #[test]
    fn numeric_fields_sort_by_value() {
        let store = phones();
        let mut state = ViewState::new(10);
        state.sort_field = Some("age".to_string());
        let view = compute(&store, &searchable(), &state);
        let ages: Vec<&str> = view
            .rows
            .iter()
            .map(|&i| store.value(i, "age").unwrap())
            .collect();
        assert_eq!(ages, vec!["0", "1", "2", "3", "10", "12"]);

        state.sort_direction = SortDirection::Descending;
        let view = compute(&store, &searchable(), &state);
        let ages: Vec<&str> = view
            .rows
            .iter()
            .map(|&i| store.value(i, "age").unwrap())
            .collect();
        assert_eq!(ages, vec!["12", "10", "3", "2", "1", "0"]);
    }

    #[test]
    fn text_fields_sort_lexicographically() {
        let store = phones();
        let mut state = ViewState::new(10);
        state.sort_field = Some("name".to_string());
        let view = compute(&store, &searchable(), &state);
        assert_eq!(
            names(&store, &view.rows),
            vec![
                "Dell Streak 7",
                "Motorola XOOM",
                "Nexus S",
                "Samsung Galaxy Tab",
                "T-Mobile G2",
                "iPhone 8",
            ]
        );
    }

    #[test]
    fn sort_on_absent_field_keeps_order() {
        let store = phones();
        let mut state = ViewState::new(10);
        state.sort_field = Some("carrier".to_string());
        let view = compute(&store, &searchable(), &state);
        assert_eq!(view.rows, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn missing_values_sort_last_and_bad_numbers_after_good_ones() {
        assert_eq!(compare_values(None, Some("a"), false), Ordering::Greater);
        assert_eq!(compare_values(Some("a"), None, true), Ordering::Less);
        assert_eq!(compare_values(Some("9"), Some("10"), true), Ordering::Less);
        assert_eq!(compare_values(Some("9"), Some("10"), false), Ordering::Greater);
        assert_eq!(compare_values(Some("n/a"), Some("10"), true), Ordering::Greater);
    }

    #[test]
    fn pages_slice_the_sorted_rows() {
        let store = phones();
        let mut state = ViewState::new(5);
        let view = compute(&store, &searchable(), &state);
        assert_eq!(view.rows, vec![0, 1, 2, 3, 4]);
        assert_eq!(view.filtered_count, 6);

        state.page_index = 1;
        let view = compute(&store, &searchable(), &state);
        assert_eq!(view.rows, vec![5]);

        state.page_index = 7;
        let view = compute(&store, &searchable(), &state);
        assert!(view.rows.is_empty());
        assert_eq!(view.filtered_count, 6);
    }

    #[test]
    fn main_checkbox_reflects_the_visible_page_only() {
        let mut store = phones();
        for id in ["motorola-xoom", "iphone-8", "nexus-s"] {
            store.set_checked(id, true).unwrap();
        }
        let mut state = ViewState::new(3);
        assert!(compute(&store, &searchable(), &state).main_checked);
        state.page_index = 1;
        assert!(!compute(&store, &searchable(), &state).main_checked);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut store = phones();
        store.set_checked("dell-streak-7", true).unwrap();
        let mut state = ViewState::new(3);
        state.filter_text = "e".to_string();
        state.sort_field = Some("age".to_string());
        state.sort_direction = SortDirection::Descending;
        let first = compute(&store, &searchable(), &state);
        let second = compute(&store, &searchable(), &state);
        assert_eq!(first, second);
    }
}
