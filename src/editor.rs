use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, trace};

use crate::inputter::{InputResult, Inputter};

/// The single cell that is currently being edited.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub id: String,
    pub field: String,
    pub original: String,
    input: Inputter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Commit {
        id: String,
        field: String,
        value: String,
    },
    Cancel {
        id: String,
        field: String,
        original: String,
    },
}

/// Inline editor state machine: either displaying (no session) or editing
/// exactly one cell.
#[derive(Debug, Default)]
pub struct CellEditor {
    session: Option<EditSession>,
    last_input: InputResult,
}

impl CellEditor {
    pub fn is_editing(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn last_input(&self) -> &InputResult {
        &self.last_input
    }

    /// Opens an editor showing `original`. An editor that is still open is
    /// committed first and its outcome returned.
    pub fn open(&mut self, id: &str, field: &str, original: &str) -> Option<EditOutcome> {
        let resolved = self.commit();
        let mut input = Inputter::default();
        input.set(original);
        self.last_input = input.get();
        debug!("Editing record {id:?} field \"{field}\"");
        self.session = Some(EditSession {
            id: id.to_string(),
            field: field.to_string(),
            original: original.to_string(),
            input,
        });
        resolved
    }

    /// Feeds a keystroke into the open editor. Enter commits, Escape cancels.
    pub fn key(&mut self, key: KeyEvent) -> Option<EditOutcome> {
        let session = self.session.as_mut()?;
        self.last_input = session.input.read(key);
        if !self.last_input.finished {
            return None;
        }
        if self.last_input.canceled {
            self.cancel()
        } else {
            self.commit()
        }
    }

    pub fn commit(&mut self) -> Option<EditOutcome> {
        let session = self.session.take()?;
        let value = session.input.get().input;
        trace!(
            "Commit edit of {:?}.{}: {:?} -> {:?}",
            session.id, session.field, session.original, value
        );
        self.last_input = InputResult::default();
        Some(EditOutcome::Commit {
            id: session.id,
            field: session.field,
            value,
        })
    }

    pub fn cancel(&mut self) -> Option<EditOutcome> {
        let session = self.session.take()?;
        trace!("Cancel edit of {:?}.{}", session.id, session.field);
        self.last_input = InputResult::default();
        Some(EditOutcome::Cancel {
            id: session.id,
            field: session.field,
            original: session.original,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_commits_typed_text() {
        let mut editor = CellEditor::default();
        assert_eq!(editor.open("nexus-s", "name", "Nexus S"), None);
        assert!(editor.is_editing());
        assert_eq!(editor.last_input().input, "Nexus S");

        assert_eq!(editor.key(press(KeyCode::Char('!'))), None);
        assert_eq!(editor.last_input().input, "Nexus S!");
        let outcome = editor.key(press(KeyCode::Enter));
        assert_eq!(
            outcome,
            Some(EditOutcome::Commit {
                id: "nexus-s".into(),
                field: "name".into(),
                value: "Nexus S!".into(),
            })
        );
        assert!(!editor.is_editing());
    }

    #[test]
    fn escape_discards_and_returns_original() {
        let mut editor = CellEditor::default();
        editor.open("nexus-s", "snippet", "Fast.");
        editor.key(press(KeyCode::Backspace));
        let outcome = editor.key(press(KeyCode::Esc));
        assert_eq!(
            outcome,
            Some(EditOutcome::Cancel {
                id: "nexus-s".into(),
                field: "snippet".into(),
                original: "Fast.".into(),
            })
        );
        assert!(!editor.is_editing());
    }

    #[test]
    fn unchanged_commit_keeps_surrounding_whitespace() {
        let mut editor = CellEditor::default();
        editor.open("dell-streak-7", "snippet", "  Streak ");
        let outcome = editor.key(press(KeyCode::Enter));
        assert_eq!(
            outcome,
            Some(EditOutcome::Commit {
                id: "dell-streak-7".into(),
                field: "snippet".into(),
                value: "  Streak ".into(),
            })
        );
    }

    #[test]
    fn opening_a_second_cell_commits_the_first() {
        let mut editor = CellEditor::default();
        editor.open("a", "name", "Alpha");
        editor.key(press(KeyCode::Char('2')));
        let resolved = editor.open("b", "name", "Beta");
        assert_eq!(
            resolved,
            Some(EditOutcome::Commit {
                id: "a".into(),
                field: "name".into(),
                value: "Alpha2".into(),
            })
        );
        assert_eq!(editor.session().unwrap().id, "b");
    }

    #[test]
    fn ending_without_open_editor_is_a_no_op() {
        let mut editor = CellEditor::default();
        assert_eq!(editor.commit(), None);
        assert_eq!(editor.cancel(), None);
        assert_eq!(editor.key(press(KeyCode::Enter)), None);
    }
}
