use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::domain::{InputKind, TVConfig};
use crate::inputter::InputResult;
use crate::model::{Model, UIData};
use crate::pipeline::FilterMode;

pub const CHECKBOX_WIDTH: u16 = 3;
pub const COLUMN_WIDTH_MARGIN: u16 = 1;
pub const PHOTO_MARKER: &str = "▣ ";

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &TVConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [header_area, table_area, pager_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(self.header_line(uidata), header_area);
        frame.render_widget(self.table(uidata), table_area);
        frame.render_widget(Self::pager_line(uidata), pager_area);
        frame.render_widget(Self::status_line(uidata), status_area);

        if uidata.show_popup {
            Self::render_popup(&uidata.popup_message, frame);
        }
    }

    fn header_line(&self, uidata: &UIData) -> Paragraph<'_> {
        let mode = |m: FilterMode, label: &'static str| {
            if uidata.filter_mode == m {
                label.black().on_yellow()
            } else {
                label.dark_gray()
            }
        };
        let mut spans = vec![
            format!(" {} ", uidata.name).bold(),
            " Per page: ".into(),
            format!("{}", uidata.page_size).yellow().bold(),
            format!(" {:?} ", uidata.page_size_options).dark_gray(),
            mode(FilterMode::All, " Show All "),
            " ".into(),
            mode(FilterMode::Checked, " Show Selected "),
            "  Find: ".into(),
        ];
        spans.extend(Self::input_spans(
            &uidata.filter_input,
            uidata.active_input == Some(InputKind::Filter),
        ));
        if uidata.filter_pending {
            spans.push(" …".dark_gray());
        }
        Paragraph::new(Line::from(spans))
    }

    fn input_spans(input: &InputResult, active: bool) -> Vec<Span<'static>> {
        if !active {
            return vec![input.input.clone().italic()];
        }
        let chars: Vec<char> = input.input.chars().collect();
        let pos = std::cmp::min(input.cursor_pos, chars.len());
        let before: String = chars[..pos].iter().collect();
        let at: String = chars.get(pos).map(|c| c.to_string()).unwrap_or(" ".into());
        let after: String = chars.iter().skip(pos + 1).collect();
        vec![
            before.into(),
            Span::styled(at, Style::default().add_modifier(Modifier::REVERSED)),
            after.into(),
        ]
    }

    fn checkbox(checked: bool) -> &'static str {
        if checked { "[x]" } else { "[ ]" }
    }

    fn table(&self, uidata: &UIData) -> Table<'_> {
        let mut header_cells = vec![Cell::from(Self::checkbox(uidata.main_checked))];
        header_cells.extend(uidata.headers.iter().map(|h| {
            let mut title = h.title.clone();
            if let Some(direction) = h.sort {
                title.push(' ');
                title.push_str(direction.symbol());
            }
            let style = if h.sortable {
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Cell::from(title).style(style)
        }));
        let header = Row::new(header_cells).style(Style::default().fg(Color::Yellow));

        let rows = uidata.rows.iter().enumerate().map(|(ridx, row)| {
            let mut cells = vec![Cell::from(Self::checkbox(row.checked))];
            cells.extend(row.cells.iter().enumerate().map(|(cidx, cell)| {
                let editing = uidata.edit_cell == Some((ridx, cidx));
                if editing {
                    return Cell::from(Line::from(Self::input_spans(&uidata.edit_input, true)))
                        .style(Style::default().fg(Color::Black).bg(Color::Cyan));
                }
                let text = if cell.photo {
                    format!("{PHOTO_MARKER}{}", cell.text)
                } else {
                    cell.text.clone()
                };
                let text = Self::get_visible_text(text, self.max_column_width);
                let mut style = Style::default();
                if cell.photo {
                    style = style.fg(Color::Magenta);
                }
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Cell::from(text).style(style)
            }));
            let row_style = if ridx == uidata.selected_row {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(cells).style(row_style)
        });

        let mut widths = vec![Constraint::Length(CHECKBOX_WIDTH)];
        widths.extend(
            uidata
                .headers
                .iter()
                .map(|h| Constraint::Length(h.width as u16 + COLUMN_WIDTH_MARGIN)),
        );

        Table::new(rows, widths)
            .header(header)
            .block(Block::bordered())
            .column_spacing(1)
    }

    fn get_visible_text(text: String, width: usize) -> String {
        if width < 3 || text.chars().count() <= width {
            return text;
        }
        let mut reduced: String = text.chars().take(width - 3).collect();
        reduced.push_str("...");
        reduced
    }

    fn pager_line(uidata: &UIData) -> Paragraph<'_> {
        let pager = &uidata.pager;
        let arrow = |label: &'static str, enabled: bool| {
            if enabled {
                label.bold()
            } else {
                label.dark_gray()
            }
        };
        let mut spans = vec![
            format!(" {} - {} of {} ", pager.min, pager.max, pager.total).into(),
            arrow(" < ", pager.prev_enabled),
        ];
        for page in 0..pager.page_count {
            let label = format!(" {} ", page + 1);
            spans.push(if page == pager.current {
                label.black().on_yellow()
            } else {
                label.into()
            });
        }
        spans.push(arrow(" > ", pager.next_enabled));
        Paragraph::new(Line::from(spans))
    }

    fn status_line(uidata: &UIData) -> Paragraph<'_> {
        let selected = uidata.rows.get(uidata.selected_row);
        let editable = selected
            .and_then(|r| r.cells.get(uidata.selected_column))
            .is_some_and(|c| c.editable);
        let hint = match uidata.active_input {
            Some(InputKind::Filter) => " Enter: close  Esc: clear ",
            Some(InputKind::Edit) => " Enter: save  Esc: cancel ",
            None if editable => " e: edit  ?: help  q: quit ",
            None => " ?: help  q: quit ",
        };
        let id = selected.map(|r| r.id.as_str()).unwrap_or("-");
        Paragraph::new(Line::from(vec![
            format!(" [{id}] ").cyan(),
            uidata.status_message.clone().into(),
            Span::raw(" "),
            hint.dark_gray(),
        ]))
    }

    fn render_popup(message: &str, frame: &mut Frame) {
        let area = Self::popup_area(frame.area(), 60, 70);
        let block = Block::bordered().title(Line::from(" Help ".bold()).centered());
        let popup = Paragraph::new(Text::from(message.to_string()))
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }

    fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
            .flex(Flex::Center)
            .areas(area);
        area
    }
}
