use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::columns::ColumnConfig;
use crate::debounce::Debouncer;
use crate::domain::{HELP_TEXT, InputKind, Message, TVConfig, TVError};
use crate::editor::{CellEditor, EditOutcome};
use crate::inputter::{InputResult, Inputter};
use crate::page_size::{PageSizeEvent, PageSizeSelector};
use crate::pager::{Pager, PagerEvent};
use crate::pipeline::{self, FilterMode, SortDirection, ViewProjection, ViewState};
use crate::store::{DatasetStore, RecordIdx};

const MISSING_VALUE: &str = "∅";

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    FILTERINPUT,
    EDITING,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub title: String,
    pub sortable: bool,
    pub sort: Option<SortDirection>,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub text: String,
    pub photo: bool,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub checked: bool,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagerView {
    pub min: usize,
    pub max: usize,
    pub total: usize,
    pub current: usize,
    pub page_count: usize,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

/// Snapshot of everything the UI renders. Rebuilt after every state change.
pub struct UIData {
    pub name: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub main_checked: bool,
    pub selected_row: usize,
    pub selected_column: usize,
    pub pager: PagerView,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub filter_mode: FilterMode,
    pub filter_input: InputResult,
    pub filter_pending: bool,
    pub active_input: Option<InputKind>,
    pub edit_cell: Option<(usize, usize)>, // (row, column) on the visible page
    pub edit_input: InputResult,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            main_checked: false,
            selected_row: 0,
            selected_column: 0,
            pager: PagerView::default(),
            page_size: 0,
            page_size_options: Vec::new(),
            filter_mode: FilterMode::All,
            filter_input: InputResult::default(),
            filter_pending: false,
            active_input: None,
            edit_cell: None,
            edit_input: InputResult::default(),
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
        }
    }
}

/// The table controller. Owns the view state, the pager and the page size
/// selector and derives the visible rows from the dataset store.
pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    store: DatasetStore,
    columns: ColumnConfig,
    searchable: Vec<String>,
    view: ViewState,
    projection: ViewProjection,
    pager: Pager,
    page_size: PageSizeSelector,
    filter_input: Inputter,
    last_filter_input: InputResult,
    debounce: Debouncer,
    editor: CellEditor,
    curser_row: usize,
    curser_column: usize,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
}

impl Model {
    pub fn new(config: &TVConfig, name: &str, store: DatasetStore, columns: ColumnConfig) -> Self {
        columns.check_against(&store);
        if store.is_empty() {
            warn!("Dataset has no records");
        }
        let page_size = PageSizeSelector::new(&config.per_page_options, config.per_page);
        let view = ViewState::new(page_size.value());
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            name: name.to_string(),
            searchable: columns.searchable_fields(),
            store,
            columns,
            pager: Pager::new(view.page_size, 0),
            view,
            projection: ViewProjection::default(),
            page_size,
            filter_input: Inputter::default(),
            last_filter_input: InputResult::default(),
            debounce: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            editor: CellEditor::default(),
            curser_row: 0,
            curser_column: 0,
            uidata: UIData::empty(),
            clipboard: None,
            status_message: String::new(),
        };
        model.refilter();
        model.set_status_message(format!("Loaded {} records", model.store.len()));
        info!(
            "Table \"{}\" ready: {} records, {} columns, {} per page",
            model.name,
            model.store.len(),
            model.columns.len(),
            model.view.page_size
        );
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// All keys go to the active text input instead of being mapped.
    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::FILTERINPUT | Modus::EDITING)
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Message) -> Result<(), TVError> {
        if let Message::Tick(now) = message {
            self.tick(now);
            return Ok(());
        }
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);

        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::MoveUp => self.move_selection_up(),
                Message::MoveDown => self.move_selection_down(),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::Search => self.enter_filter_input(),
                Message::FilterMode(mode) => self.set_filter_mode(mode),
                Message::SortColumn => self.sort_current_column(),
                Message::ToggleRow => self.toggle_current_row(),
                Message::ToggleAll => self.toggle_all(),
                Message::PageSizeNext => {
                    let event = self.page_size.select_next();
                    self.on_page_size_event(event);
                }
                Message::PageSizePrev => {
                    let event = self.page_size.select_prev();
                    self.on_page_size_event(event);
                }
                Message::GoToPage(page) => self.go_to_page(page),
                Message::PrevPage => self.step_page(-1),
                Message::NextPage => self.step_page(1),
                Message::Edit => self.edit_current_cell(),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Exit => self.set_status_message(""),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.close_popup(),
                _ => (),
            },
            Modus::FILTERINPUT => match message {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::RawKey(key) => self.filter_key(key),
                _ => (),
            },
            Modus::EDITING => match message {
                Message::Quit => {
                    self.end_editing(true);
                    self.quit();
                }
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::RawKey(key) => {
                    if let Some(outcome) = self.editor.key(key) {
                        self.apply_edit(outcome);
                        self.modus = Modus::TABLE;
                    }
                    self.update_uidata();
                }
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- View state reconciliation ---------------------- //

    /// Recomputes in place. The pager follows the filtered total, leaving
    /// the current page only if it no longer exists.
    fn recompute(&mut self) {
        self.projection = pipeline::compute(&self.store, &self.searchable, &self.view);
        if let Some(PagerEvent::PageChanged(page)) =
            self.pager.set_total(self.projection.filtered_count)
        {
            self.view.page_index = page;
            self.projection = pipeline::compute(&self.store, &self.searchable, &self.view);
        }
        self.projection_changed();
    }

    /// Recomputes from the first page and hands the new total to the pager.
    fn refilter(&mut self) {
        self.view.page_index = 0;
        self.projection = pipeline::compute(&self.store, &self.searchable, &self.view);
        self.pager
            .configure(self.view.page_size, self.projection.filtered_count);
        self.projection_changed();
    }

    fn projection_changed(&mut self) {
        self.curser_row = std::cmp::min(
            self.curser_row,
            self.projection.rows.len().saturating_sub(1),
        );
        self.update_uidata();
    }

    fn on_pager_event(&mut self, event: Option<PagerEvent>) {
        if let Some(PagerEvent::PageChanged(page)) = event {
            self.view.page_index = page;
            self.curser_row = 0;
            self.recompute();
        }
    }

    fn on_page_size_event(&mut self, event: Option<PageSizeEvent>) {
        if let Some(PageSizeEvent::Changed(size)) = event {
            self.view.page_size = size;
            self.refilter();
            self.set_status_message(format!("{size} rows per page"));
        }
    }

    fn go_to_page(&mut self, page: usize) {
        let event = self.pager.go_to(page);
        self.on_pager_event(event);
    }

    fn step_page(&mut self, delta: isize) {
        let event = self.pager.step(delta);
        self.on_pager_event(event);
    }

    fn apply_filter_text(&mut self, text: &str) {
        if self.view.filter_text == text {
            return;
        }
        debug!("Filter text {:?} -> {:?}", self.view.filter_text, text);
        self.view.filter_text = text.to_string();
        self.refilter();
        self.set_status_message(format!("{} matches", self.projection.filtered_count));
    }

    fn set_filter_mode(&mut self, mode: FilterMode) {
        self.view.filter_mode = mode;
        self.refilter();
        let label = match mode {
            FilterMode::All => "Showing all rows",
            FilterMode::Checked => "Showing checked rows",
        };
        self.set_status_message(label);
    }

    fn tick(&mut self, now: Instant) {
        if self.debounce.fire(now) {
            let text = self.last_filter_input.input.clone();
            self.apply_filter_text(&text);
        }
    }

    fn enter_filter_input(&mut self) {
        trace!("Entering filter input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::FILTERINPUT;
        // A pending filter keeps its typed text.
        let text = if self.debounce.is_pending() {
            self.filter_input.get().input
        } else {
            self.view.filter_text.clone()
        };
        self.filter_input.set(&text);
        self.last_filter_input = self.filter_input.get();
        self.update_uidata();
    }

    fn filter_key(&mut self, key: KeyEvent) {
        let mut result = self.filter_input.read(key);
        if result.canceled {
            self.filter_input.clear();
            result.input.clear();
            result.changed = true;
        }
        if result.changed {
            // Typing back to the applied text leaves nothing to do.
            if result.input == self.view.filter_text {
                self.debounce.cancel();
            } else {
                self.debounce.schedule(Instant::now());
            }
        }
        if result.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::FILTERINPUT;
        }
        self.last_filter_input = result;
        self.update_uidata();
    }

    fn sort_current_column(&mut self) {
        let Some((field, spec)) = self.columns.get(self.curser_column) else {
            return;
        };
        if !spec.can_sort() {
            self.set_status_message("Column is not sortable");
            return;
        }
        let title = spec.title.clone().unwrap_or_else(|| field.to_string());
        if self.view.sort_field.as_deref() == Some(field) {
            self.view.sort_direction = self.view.sort_direction.flipped();
        } else {
            self.view.sort_field = Some(field.to_string());
        }
        self.recompute();
        self.set_status_message(format!(
            "Sorted by {} {}",
            title,
            self.view.sort_direction.symbol()
        ));
    }

    // -------------------- Checkboxes ---------------------- //

    fn current_record(&self) -> Option<RecordIdx> {
        self.projection.rows.get(self.curser_row).copied()
    }

    fn toggle_current_row(&mut self) {
        if let Some(idx) = self.current_record() {
            let id = self.store.id(idx).to_string();
            let value = !self.store.is_checked(idx);
            self.set_row_checked(&id, value);
        }
    }

    /// Does not refilter, so a row unchecked in checked mode stays visible
    /// until the next filter action.
    pub fn set_row_checked(&mut self, id: &str, value: bool) {
        if let Err(e) = self.store.set_checked(id, value) {
            warn!("Ignoring checkbox toggle: {e}");
            return;
        }
        self.projection.main_checked =
            pipeline::main_checkbox_state(&self.store, &self.projection.rows);
        self.update_uidata();
    }

    /// Applies to every loaded record, not only the visible page.
    pub fn set_all_checked(&mut self, value: bool) {
        self.store.set_all_checked(value);
        if self.view.filter_mode == FilterMode::Checked {
            self.refilter();
        } else {
            self.recompute();
        }
        let label = if value { "Checked" } else { "Unchecked" };
        self.set_status_message(format!("{label} all {} records", self.store.len()));
    }

    fn toggle_all(&mut self) {
        self.set_all_checked(!self.projection.main_checked);
    }

    // -------------------- Inline editing ---------------------- //

    fn edit_current_cell(&mut self) {
        let Some(idx) = self.current_record() else {
            return;
        };
        let Some((field, spec)) = self.columns.get(self.curser_column) else {
            return;
        };
        if !spec.is_editable {
            self.set_status_message("Column is not editable");
            return;
        }
        let field = field.to_string();
        let id = self.store.id(idx).to_string();
        self.start_editing(&id, &field);
    }

    /// Opens the editor on the stored value of `field` in record `id`.
    pub fn start_editing(&mut self, id: &str, field: &str) {
        if !self.columns.spec(field).is_some_and(|s| s.is_editable) {
            warn!("Field \"{field}\" is not editable");
            return;
        }
        let idx = match self.store.find_by_id(id) {
            Ok(idx) => idx,
            Err(e) => {
                warn!("Ignoring edit: {e}");
                return;
            }
        };
        let original = self.store.value(idx, field).unwrap_or("").to_string();
        if let Some(outcome) = self.editor.open(id, field, &original) {
            self.apply_edit(outcome);
        }
        self.previous_modus = self.modus;
        self.modus = Modus::EDITING;
        self.update_uidata();
    }

    /// Resolves the open editor, if any.
    pub fn end_editing(&mut self, commit: bool) {
        let outcome = if commit {
            self.editor.commit()
        } else {
            self.editor.cancel()
        };
        if let Some(outcome) = outcome {
            self.apply_edit(outcome);
        }
        if self.modus == Modus::EDITING {
            self.modus = Modus::TABLE;
        }
        self.update_uidata();
    }

    fn apply_edit(&mut self, outcome: EditOutcome) {
        match outcome {
            EditOutcome::Commit { id, field, value } => {
                match self.store.set_value(&id, &field, value) {
                    Ok(()) => self.set_status_message(format!("Updated {field} of {id}")),
                    Err(e) => warn!("Dropping edit: {e}"),
                }
            }
            EditOutcome::Cancel { id, field, .. } => {
                trace!("Edit of {id}.{field} canceled");
            }
        }
    }

    // -------------------- Cursor ---------------------- //

    fn move_selection_up(&mut self) {
        self.curser_row = self.curser_row.saturating_sub(1);
        self.update_uidata();
    }

    fn move_selection_down(&mut self) {
        if self.curser_row + 1 < self.projection.rows.len() {
            self.curser_row += 1;
        }
        self.update_uidata();
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
        self.update_uidata();
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 < self.columns.len() {
            self.curser_column += 1;
        }
        self.update_uidata();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! w:{}, h:{}", width, height);
        self.update_uidata();
    }

    // -------------------- Popup, clipboard, status ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.uidata.show_popup = false;
    }

    fn set_clipboard(&mut self, content: String) -> bool {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard is not available: {:?}", e);
                    return false;
                }
            }
        }
        match self.clipboard.as_mut().map(|c| c.set_text(content)) {
            Some(Ok(_)) => true,
            Some(Err(e)) => {
                warn!("Error copying to clipboard: {:?}", e);
                false
            }
            None => false,
        }
    }

    fn copy_table_cell(&mut self) {
        let (Some(idx), Some((field, _))) =
            (self.current_record(), self.columns.get(self.curser_column))
        else {
            return;
        };
        let cell = self.store.value(idx, field).unwrap_or("").to_string();
        trace!("Cell content: {}", cell);
        if self.set_clipboard(cell) {
            self.set_status_message("Copied cell");
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_table_row(&mut self) {
        let Some(idx) = self.current_record() else {
            return;
        };
        let mut content = vec![Model::wrap_cell_content(self.store.id(idx))];
        content.extend(
            self.columns
                .iter()
                .map(|(field, _)| Model::wrap_cell_content(self.store.value(idx, field).unwrap_or(""))),
        );
        if self.set_clipboard(content.join(",")) {
            self.set_status_message("Copied row");
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    // -------------------- UI snapshot ---------------------- //

    fn update_uidata(&mut self) {
        let headers: Vec<HeaderView> = self
            .columns
            .iter()
            .map(|(field, spec)| {
                let title = spec.title.clone().unwrap_or_default();
                let sort = (self.view.sort_field.as_deref() == Some(field))
                    .then_some(self.view.sort_direction);
                HeaderView {
                    width: title.chars().count() + if sort.is_some() { 2 } else { 0 },
                    title,
                    sortable: spec.can_sort(),
                    sort,
                }
            })
            .collect();

        let rows: Vec<RowView> = self
            .projection
            .rows
            .iter()
            .map(|&idx| RowView {
                id: self.store.id(idx).to_string(),
                checked: self.store.is_checked(idx),
                cells: self
                    .columns
                    .iter()
                    .map(|(field, spec)| CellView {
                        text: self
                            .store
                            .value(idx, field)
                            .unwrap_or(MISSING_VALUE)
                            .to_string(),
                        photo: spec.has_photo,
                        editable: spec.is_editable,
                    })
                    .collect(),
            })
            .collect();

        let mut headers = headers;
        for (cidx, header) in headers.iter_mut().enumerate() {
            let widest = rows
                .iter()
                .map(|r| r.cells[cidx].text.chars().count())
                .max()
                .unwrap_or(0);
            header.width = std::cmp::min(
                std::cmp::max(header.width, widest),
                self.config.max_column_width,
            );
        }

        let edit_cell = self.editor.session().and_then(|session| {
            let idx = self.store.find_by_id(&session.id).ok()?;
            let row = self.projection.rows.iter().position(|&r| r == idx)?;
            let column = self.columns.iter().position(|(f, _)| f == session.field)?;
            Some((row, column))
        });

        let (min, max, total) = self.pager.range();
        let show_popup = self.uidata.show_popup;
        let popup_message = std::mem::take(&mut self.uidata.popup_message);

        self.uidata = UIData {
            name: self.name.clone(),
            headers,
            rows,
            main_checked: self.projection.main_checked,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            pager: PagerView {
                min,
                max,
                total,
                current: self.pager.current(),
                page_count: self.pager.page_count(),
                prev_enabled: self.pager.prev_enabled(),
                next_enabled: self.pager.next_enabled(),
            },
            page_size: self.page_size.value(),
            page_size_options: self.page_size.options().to_vec(),
            filter_mode: self.view.filter_mode,
            filter_input: self.last_filter_input.clone(),
            filter_pending: self.debounce.is_pending(),
            active_input: match self.modus {
                Modus::FILTERINPUT => Some(InputKind::Filter),
                Modus::EDITING => Some(InputKind::Edit),
                _ => None,
            },
            edit_cell,
            edit_input: self.editor.last_input().clone(),
            show_popup,
            popup_message,
            status_message: self.status_message.clone(),
        };
    }
}
