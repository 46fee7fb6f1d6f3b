use std::time::{Duration, Instant};
use tracing::trace;

use crate::domain::{Message, TVConfig, TVError};
use crate::model::Model;
use crate::pipeline::FilterMode;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for input. A quiet poll yields a `Tick` so
    /// the model can run its debounced work.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(Some(Message::Tick(Instant::now())));
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
                        return Ok(Some(Message::Quit));
                    }
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(self.handle_key(key))
                }
            }
            Event::Resize(width, height) => {
                Ok(Some(Message::Resize(width as usize, height as usize)))
            }
            _ => Ok(None),
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('a'), _) => Some(Message::FilterMode(FilterMode::All)),
            (KeyCode::Char('c'), _) => Some(Message::FilterMode(FilterMode::Checked)),
            (KeyCode::Char('s'), _) => Some(Message::SortColumn),
            (KeyCode::Char(' '), _) => Some(Message::ToggleRow),
            (KeyCode::Char('t'), _) => Some(Message::ToggleAll),
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => Some(Message::PageSizeNext),
            (KeyCode::Char('-'), _) => Some(Message::PageSizePrev),
            (KeyCode::Char('n'), _) | (KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('p'), _) | (KeyCode::PageUp, _) => Some(Message::PrevPage),
            (KeyCode::Home, _) => Some(Message::GoToPage(0)),
            (KeyCode::Char(d @ '1'..='9'), _) => d
                .to_digit(10)
                .map(|page| Message::GoToPage(page as usize - 1)),
            (KeyCode::Char('e'), _) | (KeyCode::Enter, _) => Some(Message::Edit),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
