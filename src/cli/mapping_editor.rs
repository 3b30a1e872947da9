use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::mapping::{ColumnMapping, Field};
use crate::tui::{
    truncate, wrap_text, Screen, ScreenAction, FOOTER_STYLE, HEADER_STYLE, HELP_STYLE, OK_STYLE,
    REQUIRED_STYLE, SELECTED_STYLE, WARN_STYLE,
};
use crate::upload::UploadSession;

const SAMPLE_ROWS: usize = 3;
const NONE_LABEL: &str = "\u{2014} none \u{2014}";

/// Lets the user confirm or correct the detected column mapping.
pub struct MappingEditor<'a> {
    session: &'a mut UploadSession,
    selection: usize,
    status_message: Option<String>,
    /// Remaining keypresses before the status message is cleared.
    status_ttl: u8,
}

impl<'a> MappingEditor<'a> {
    /// `session` must already be editing a mapping.
    pub fn new(session: &'a mut UploadSession) -> Self {
        Self {
            session,
            selection: 0,
            status_message: None,
            status_ttl: 0,
        }
    }

    fn selected_field(&self) -> Option<Field> {
        self.session.order().get(self.selection).copied()
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some(msg);
        self.status_ttl = 3;
    }

    fn draw_fields(&self, width: usize, mapping: &ColumnMapping) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (i, field) in self.session.order().iter().enumerate() {
            let desc = field.descriptor();
            let is_selected = i == self.selection;
            let marker = if is_selected { " > " } else { "   " };
            let row_style = if is_selected {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            let column = mapping.get(*field).unwrap_or(NONE_LABEL);
            let arrows = if is_selected { ("< ", " >") } else { ("  ", "  ") };

            let mut spans = vec![
                Span::styled(format!("{marker}{:<36}", truncate(desc.label, 34)), row_style),
                Span::styled(
                    if desc.required { "* " } else { "  " },
                    REQUIRED_STYLE,
                ),
                Span::styled(
                    format!("{}{}{}", arrows.0, column, arrows.1),
                    if is_selected {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    },
                ),
            ];
            if !mapping.is_assigned(*field) && !is_selected {
                spans[2] = Span::styled(format!("  {column}  "), FOOTER_STYLE);
            }
            lines.push(Line::from(spans));

            if is_selected {
                if let Some(help) = desc.help {
                    let (wrapped, _) = wrap_text(help, width.saturating_sub(8).max(20));
                    for l in wrapped.lines() {
                        lines.push(Line::from(Span::styled(format!("      {l}"), HELP_STYLE)));
                    }
                }
            }
        }
        lines
    }

    fn draw_samples(&self) -> Vec<Line<'static>> {
        let Some(preview) = self.session.preview() else {
            return vec![];
        };
        let mut lines = vec![Line::from(Span::styled(
            " Sample rows",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        let header: Vec<String> = preview.columns.iter().map(|c| truncate(c, 16)).collect();
        lines.push(Line::from(Span::styled(
            format!("   {}", pad_row(&header)),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )));
        let rows = preview.sample_rows.len().min(SAMPLE_ROWS);
        for row in 0..rows {
            let cells: Vec<String> = preview
                .columns
                .iter()
                .map(|c| truncate(&preview.cell(row, c), 16))
                .collect();
            lines.push(Line::from(format!("   {}", pad_row(&cells))));
        }
        lines
    }
}

fn pad_row(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| format!("{c:<17}"))
        .collect::<Vec<_>>()
        .join("")
}

impl Screen for MappingEditor<'_> {
    type Output = ColumnMapping;

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, sep, content_area, status_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let file = self
            .session
            .file()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(format!(" Map CSV columns: {file}")).style(HEADER_STYLE),
            header_area,
        );

        let sep_line = "\u{2501}".repeat(area.width as usize);
        frame.render_widget(Paragraph::new(sep_line.as_str()).style(border_style), sep);

        let Some(mapping) = self.session.mapping() else {
            return;
        };

        let mut lines = vec![Line::from("")];
        lines.extend(self.draw_fields(area.width as usize, mapping));
        lines.push(Line::from(""));
        lines.extend(self.draw_samples());
        frame.render_widget(Paragraph::new(lines), content_area);

        let status = if let Some(msg) = &self.status_message {
            Paragraph::new(format!(" {msg}")).style(WARN_STYLE)
        } else if self.session.can_confirm() {
            Paragraph::new(" Mapping is valid. Press Enter to upload.").style(OK_STYLE)
        } else {
            Paragraph::new(format!(" Cannot upload yet: {}", mapping.problems().join(", ")))
                .style(WARN_STYLE)
        };
        frame.render_widget(status, status_area);

        frame.render_widget(
            Paragraph::new(
                " \u{2191}\u{2193}=field  \u{2190}\u{2192}=column  [/]=move row  Enter=upload  Esc=cancel",
            )
            .style(FOOTER_STYLE),
            hints_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ScreenAction<ColumnMapping> {
        if self.status_ttl > 0 {
            self.status_ttl -= 1;
            if self.status_ttl == 0 {
                self.status_message = None;
            }
        }

        let rows = self.session.order().len();
        match code {
            KeyCode::Up => {
                self.selection = self.selection.saturating_sub(1);
            }
            KeyCode::Down => {
                if rows > 0 {
                    self.selection = (self.selection + 1).min(rows - 1);
                }
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(field) = self.selected_field() {
                    self.session.cycle_column(field, code == KeyCode::Right);
                }
            }
            KeyCode::Char('[') => {
                self.selection = self.session.move_row(self.selection, true);
            }
            KeyCode::Char(']') => {
                self.selection = self.session.move_row(self.selection, false);
            }
            KeyCode::Backspace | KeyCode::Delete => {
                if let Some(field) = self.selected_field() {
                    if let Err(e) = self.session.assign(field, None) {
                        self.set_status(e.to_string());
                    }
                }
            }
            KeyCode::Enter => match self.session.confirm() {
                Ok(mapping) => return ScreenAction::Close(Some(mapping)),
                Err(e) => self.set_status(e.to_string()),
            },
            KeyCode::Esc | KeyCode::Char('q') => {
                self.session.cancel();
                return ScreenAction::Close(None);
            }
            _ => {}
        }
        ScreenAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::models::CsvPreview;

    fn session(columns: &[&str]) -> UploadSession {
        let mut s = UploadSession::new();
        s.load_preview(
            Path::new("bank.csv"),
            CsvPreview {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                sample_rows: vec![],
            },
        );
        s.begin_editing().unwrap();
        s
    }

    fn closed(action: ScreenAction<ColumnMapping>) -> Option<Option<ColumnMapping>> {
        match action {
            ScreenAction::Close(out) => Some(out),
            ScreenAction::Continue => None,
        }
    }

    #[test]
    fn test_enter_confirms_valid_mapping() {
        let mut s = session(&["Date", "Amount"]);
        let mut editor = MappingEditor::new(&mut s);
        let out = closed(editor.handle_key(KeyCode::Enter)).unwrap().unwrap();
        assert_eq!(out.get(Field::Amount), Some("Amount"));
    }

    #[test]
    fn test_enter_blocked_when_invalid() {
        let mut s = session(&["Booked", "Amount"]);
        let mut editor = MappingEditor::new(&mut s);
        assert!(closed(editor.handle_key(KeyCode::Enter)).is_none());
        assert!(editor
            .status_message
            .as_deref()
            .unwrap()
            .contains("a Date column is required"));

        // Date row is first; Right picks the first column.
        assert!(closed(editor.handle_key(KeyCode::Right)).is_none());
        let out = closed(editor.handle_key(KeyCode::Enter)).unwrap().unwrap();
        assert_eq!(out.get(Field::Date), Some("Booked"));
    }

    #[test]
    fn test_escape_cancels() {
        let mut s = session(&["Date", "Amount"]);
        let mut editor = MappingEditor::new(&mut s);
        assert!(closed(editor.handle_key(KeyCode::Esc)).unwrap().is_none());
        assert!(s.is_idle());
    }

    #[test]
    fn test_selection_and_reorder() {
        let mut s = session(&["Date", "Amount"]);
        let mut editor = MappingEditor::new(&mut s);
        editor.handle_key(KeyCode::Up);
        assert_eq!(editor.selection, 0);
        editor.handle_key(KeyCode::Down);
        assert_eq!(editor.selected_field(), Some(Field::Amount));
        editor.handle_key(KeyCode::Char('['));
        assert_eq!(editor.selection, 0);
        assert_eq!(editor.selected_field(), Some(Field::Amount));
        for _ in 0..20 {
            editor.handle_key(KeyCode::Down);
        }
        assert_eq!(editor.selection, 9);
    }

    #[test]
    fn test_backspace_clears_field() {
        let mut s = session(&["Date", "Amount"]);
        let mut editor = MappingEditor::new(&mut s);
        editor.handle_key(KeyCode::Backspace);
        assert!(!editor.session.mapping().unwrap().is_assigned(Field::Date));
        assert!(editor.status_message.is_none());
    }
}
