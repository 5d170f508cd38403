use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::fmt::{money, signed_money};
use crate::models::TransactionKind;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const STATUS_STYLE: Style = Style::new().fg(Color::Yellow);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const BOLD: Style = Style::new().add_modifier(Modifier::BOLD);

pub const COLUMN_HEADER_STYLE: Style = Style::new()
    .fg(Color::DarkGray)
    .add_modifier(Modifier::BOLD);

/// Signed, colored amount for a ledger row (green income, red expense).
pub fn kind_amount_span(kind: TransactionKind, amount: f64, width: usize) -> Span<'static> {
    let style = match kind {
        TransactionKind::Income => AMOUNT_POS_STYLE,
        TransactionKind::Expense => AMOUNT_NEG_STYLE,
    };
    Span::styled(format!("{:>width$}", signed_money(kind, amount)), style)
}

/// Plain total, colored by sign.
pub fn money_span(amount: f64) -> Span<'static> {
    let style = if amount < 0.0 {
        AMOUNT_NEG_STYLE
    } else {
        AMOUNT_POS_STYLE
    };
    Span::styled(money(amount), style)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{truncated}\u{2026}")
    }
}

/// Bold title line with a blank line above and below.
pub fn title_lines(title: String) -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled(format!(" {title}"), BOLD)),
        Line::from(""),
    ]
}

/// What a page tells the dashboard after handling a key.
pub enum PageAction {
    Continue,
    /// Hand focus back to the page menu.
    Back,
}

/// Keep `selection` inside the visible window starting at `offset`.
pub fn ensure_visible(selection: usize, offset: &mut usize, visible_rows: usize) {
    if selection < *offset {
        *offset = selection;
    } else if visible_rows > 0 && selection >= *offset + visible_rows {
        *offset = selection - visible_rows + 1;
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub kind: FieldKind,
}

pub enum FieldKind {
    Text,
    Selector { options: Vec<String>, selected: usize },
}

impl FormField {
    pub fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            kind: FieldKind::Text,
        }
    }

    /// A selector over `options`, starting on `current` (or the first option).
    /// A `current` value missing from `options` is appended so editing never loses it.
    pub fn selector(label: &'static str, mut options: Vec<String>, current: &str) -> Self {
        let selected = match options.iter().position(|o| o == current) {
            Some(i) => i,
            None if !current.is_empty() => {
                options.push(current.to_string());
                options.len() - 1
            }
            None => 0,
        };
        let value = options.get(selected).cloned().unwrap_or_default();
        Self {
            label,
            value,
            kind: FieldKind::Selector { options, selected },
        }
    }
}

pub enum FormAction {
    Continue,
    Submit,
    Cancel,
}

pub struct Form {
    pub title: String,
    pub fields: Vec<FormField>,
    pub focused: usize,
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            fields,
            focused: 0,
        }
    }

    /// Trimmed value of the field at `idx`.
    pub fn value(&self, idx: usize) -> &str {
        self.fields[idx].value.trim()
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormAction {
        if self.fields.is_empty() {
            return FormAction::Cancel;
        }
        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => {
                self.focused = (self.focused + 1) % self.fields.len();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focused = if self.focused == 0 {
                    self.fields.len() - 1
                } else {
                    self.focused - 1
                };
            }
            KeyCode::Left => {
                let field = &mut self.fields[self.focused];
                if let FieldKind::Selector { options, selected } = &mut field.kind {
                    *selected = if *selected == 0 {
                        options.len() - 1
                    } else {
                        *selected - 1
                    };
                    field.value = options[*selected].clone();
                }
            }
            KeyCode::Right => {
                let field = &mut self.fields[self.focused];
                if let FieldKind::Selector { options, selected } = &mut field.kind {
                    *selected = (*selected + 1) % options.len();
                    field.value = options[*selected].clone();
                }
            }
            KeyCode::Char(c) => {
                let field = &mut self.fields[self.focused];
                if let FieldKind::Text = field.kind {
                    field.value.push(c);
                }
            }
            KeyCode::Backspace => {
                let field = &mut self.fields[self.focused];
                if let FieldKind::Text = field.kind {
                    field.value.pop();
                }
            }
            _ => {}
        }
        FormAction::Continue
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = title_lines(self.title.clone());
        let focus_style = Style::default().fg(Color::Cyan);

        for (i, field) in self.fields.iter().enumerate() {
            let is_focused = i == self.focused;
            let label_style = if is_focused { BOLD } else { Style::default() };
            let value_style = if is_focused { focus_style } else { Style::default() };

            let shown = match &field.kind {
                FieldKind::Text => {
                    let cursor = if is_focused { "_" } else { "" };
                    format!("{}{cursor}", field.value)
                }
                FieldKind::Selector { options, selected } => {
                    let arrows = if is_focused { ("< ", " >") } else { ("  ", "  ") };
                    format!("{}{}{}", arrows.0, options[*selected], arrows.1)
                }
            };
            lines.push(Line::from(vec![
                Span::styled(format!("   {:<14} ", field.label), label_style),
                Span::styled(shown, value_style),
            ]));
        }
        lines
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, status: Option<&str>) {
        let mut lines = self.lines();
        if let Some(msg) = status {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(format!("   {msg}"), STATUS_STYLE)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

pub const FORM_HINTS: &str = " Tab=next field  Left/Right=choose  Enter=save  Esc=cancel";

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_form() -> Form {
        Form::new(
            "Sample",
            vec![
                FormField::text("Name", ""),
                FormField::selector("Type", vec!["income".into(), "expense".into()], "expense"),
            ],
        )
    }

    #[test]
    fn test_form_typing_and_navigation() {
        let mut form = sample_form();
        for c in "Rent".chars() {
            form.handle_key(KeyCode::Char(c));
        }
        form.handle_key(KeyCode::Backspace);
        assert_eq!(form.value(0), "Ren");

        form.handle_key(KeyCode::Tab);
        assert_eq!(form.focused, 1);
        // Typing into a selector is ignored
        form.handle_key(KeyCode::Char('x'));
        assert_eq!(form.value(1), "expense");
        form.handle_key(KeyCode::Right);
        assert_eq!(form.value(1), "income");
        form.handle_key(KeyCode::Left);
        assert_eq!(form.value(1), "expense");

        form.handle_key(KeyCode::Tab);
        assert_eq!(form.focused, 0, "focus wraps around");
        form.handle_key(KeyCode::BackTab);
        assert_eq!(form.focused, 1);
    }

    #[test]
    fn test_form_submit_and_cancel() {
        let mut form = sample_form();
        assert!(matches!(form.handle_key(KeyCode::Enter), FormAction::Submit));
        assert!(matches!(form.handle_key(KeyCode::Esc), FormAction::Cancel));
    }

    #[test]
    fn test_selector_keeps_unknown_current_value() {
        let field = FormField::selector("Category", vec!["Rent".into()], "Travel");
        assert_eq!(field.value, "Travel");
        match field.kind {
            FieldKind::Selector { options, selected } => {
                assert_eq!(options, vec!["Rent".to_string(), "Travel".to_string()]);
                assert_eq!(selected, 1);
            }
            FieldKind::Text => panic!("expected selector"),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer description", 8), "a longe\u{2026}");
    }

    #[test]
    fn test_ensure_visible() {
        let mut offset = 0;
        ensure_visible(12, &mut offset, 10);
        assert_eq!(offset, 3);
        ensure_visible(1, &mut offset, 10);
        assert_eq!(offset, 1);
    }
}
