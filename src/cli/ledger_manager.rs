use chrono::{Local, Months};
use crossterm::event::KeyCode;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use rusqlite::Connection;

use crate::error::{Result, TallyError};
use crate::ledger::{self, TransactionFilter};
use crate::models::{NewTransaction, Transaction, TransactionKind, DEFAULT_CATEGORIES};
use crate::tui::{
    ensure_visible, kind_amount_span, title_lines, truncate, Form, FormAction, FormField,
    PageAction, BOLD, COLUMN_HEADER_STYLE, FORM_HINTS, STATUS_STYLE,
};

// Field indices for the transaction form
const DATE_IDX: usize = 0;
const DESCRIPTION_IDX: usize = 1;
const TYPE_IDX: usize = 2;
const CATEGORY_IDX: usize = 3;
const AMOUNT_IDX: usize = 4;

// Field indices for the filter form
const FILTER_TYPE_IDX: usize = 0;
const FILTER_CATEGORY_IDX: usize = 1;
const FILTER_FROM_IDX: usize = 2;
const FILTER_TO_IDX: usize = 3;

const ANY: &str = "all";
/// Category choice stored as NULL.
const NO_CATEGORY: &str = "(none)";

enum Screen {
    List,
    Add(Form),
    Edit { id: i64, form: Form },
    Filter(Form),
    ConfirmDelete { id: i64 },
}

fn kind_options() -> Vec<String> {
    TransactionKind::ALL.iter().map(|k| k.to_string()).collect()
}

fn category_options() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

fn transaction_form(title: &str, txn: Option<&Transaction>) -> Form {
    let mut categories = vec![NO_CATEGORY.to_string()];
    categories.extend(category_options());

    let today = Local::now().date_naive().to_string();
    let (date, description, kind, category, amount) = match txn {
        Some(t) => (
            t.date.clone(),
            t.description.clone(),
            t.kind.to_string(),
            t.category.clone().unwrap_or_else(|| NO_CATEGORY.to_string()),
            t.amount.to_string(),
        ),
        None => (
            today,
            String::new(),
            TransactionKind::Income.to_string(),
            DEFAULT_CATEGORIES[0].to_string(),
            String::new(),
        ),
    };
    Form::new(
        title,
        vec![
            FormField::text("Date", date),
            FormField::text("Description", description),
            FormField::selector("Type", kind_options(), &kind),
            FormField::selector("Category", categories, &category),
            FormField::text("Amount", amount),
        ],
    )
}

fn filter_form(current: &TransactionFilter) -> Form {
    let today = Local::now().date_naive();
    let month_ago = today.checked_sub_months(Months::new(1)).unwrap_or(today);

    let mut types = vec![ANY.to_string()];
    types.extend(kind_options());
    let mut categories = vec![ANY.to_string()];
    categories.extend(category_options());

    let kind = current.kind.map(|k| k.to_string()).unwrap_or_else(|| ANY.to_string());
    let category = current.category.clone().unwrap_or_else(|| ANY.to_string());
    let from = current.from.clone().unwrap_or_else(|| month_ago.to_string());
    let to = current.to.clone().unwrap_or_else(|| today.to_string());

    Form::new(
        "Filter Transactions",
        vec![
            FormField::selector("Type", types, &kind),
            FormField::selector("Category", categories, &category),
            FormField::text("From", from),
            FormField::text("To", to),
        ],
    )
}

/// Parse a user-typed amount, tolerating thousands separators.
pub fn parse_amount(input: &str) -> Result<f64> {
    let cleaned = input.replace([',', ' '], "");
    if cleaned.is_empty() {
        return Err(TallyError::Invalid("Amount is required".into()));
    }
    cleaned
        .parse::<f64>()
        .map_err(|_| TallyError::Invalid(format!("Invalid amount: {input}")))
}

fn read_transaction_form(form: &Form) -> Result<NewTransaction> {
    Ok(NewTransaction {
        date: form.value(DATE_IDX).to_string(),
        description: form.value(DESCRIPTION_IDX).to_string(),
        kind: form.value(TYPE_IDX).parse()?,
        category: match form.value(CATEGORY_IDX) {
            NO_CATEGORY => None,
            other => Some(other.to_string()),
        },
        amount: parse_amount(form.value(AMOUNT_IDX))?,
    })
}

fn read_filter_form(form: &Form) -> Result<TransactionFilter> {
    let kind = match form.value(FILTER_TYPE_IDX) {
        ANY => None,
        other => Some(other.parse()?),
    };
    let category = match form.value(FILTER_CATEGORY_IDX) {
        ANY => None,
        other => Some(other.to_string()),
    };
    let date = |idx: usize| {
        let v = form.value(idx);
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    };
    Ok(TransactionFilter {
        kind,
        category,
        from: date(FILTER_FROM_IDX),
        to: date(FILTER_TO_IDX),
    })
}

/// Transactions page: list, add, edit, delete and filter ledger rows.
pub struct LedgerManager {
    rows: Vec<Transaction>,
    filter: TransactionFilter,
    selection: usize,
    scroll_offset: usize,
    last_visible_rows: usize,
    screen: Screen,
    status_message: Option<String>,
}

impl LedgerManager {
    pub fn new(conn: &Connection) -> Self {
        let mut manager = Self {
            rows: Vec::new(),
            filter: TransactionFilter::default(),
            selection: 0,
            scroll_offset: 0,
            last_visible_rows: 20,
            screen: Screen::List,
            status_message: None,
        };
        manager.reload(conn);
        manager
    }

    /// Re-read the full list (respecting the active filter) after any change.
    pub fn reload(&mut self, conn: &Connection) {
        match ledger::filter_transactions(conn, &self.filter) {
            Ok(rows) => self.rows = rows,
            Err(e) => self.status_message = Some(format!("Could not load transactions: {e}")),
        }
        if self.rows.is_empty() {
            self.selection = 0;
        } else {
            self.selection = self.selection.min(self.rows.len() - 1);
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn selected(&self) -> Option<&Transaction> {
        self.rows.get(self.selection)
    }

    pub fn hints(&self) -> &'static str {
        match self.screen {
            Screen::List => " a=add  e=edit  d=delete  f=filter  c=clear filter  Esc=menu  q=quit",
            Screen::ConfirmDelete { .. } => " y=confirm  n=cancel",
            Screen::Add(_) | Screen::Edit { .. } | Screen::Filter(_) => FORM_HINTS,
        }
    }

    /// True while a form owns the keyboard, so global shortcuts must not fire.
    pub fn is_editing(&self) -> bool {
        !matches!(self.screen, Screen::List)
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect) {
        match &self.screen {
            Screen::List | Screen::ConfirmDelete { .. } => self.draw_list(frame, area),
            Screen::Add(form) | Screen::Edit { form, .. } | Screen::Filter(form) => {
                form.draw(frame, area, self.status_message.as_deref())
            }
        }
    }

    fn draw_list(&mut self, frame: &mut Frame, area: Rect) {
        // 3 title lines + column header + filter line
        let data_rows = (area.height as usize).saturating_sub(5);
        self.last_visible_rows = data_rows;
        ensure_visible(self.selection, &mut self.scroll_offset, data_rows);

        let mut lines = title_lines(format!("Transactions ({})", self.rows.len()));
        lines.push(Line::from(Span::styled(
            format!("   Showing: {}", self.filter.describe()),
            COLUMN_HEADER_STYLE,
        )));

        if self.rows.is_empty() {
            lines.push(Line::from("   No transactions. Press 'a' to add one."));
        } else {
            lines.push(Line::from(Span::styled(
                format!(
                    "   {:<10}  {:<28} {:<8} {:<12} {:>16}",
                    "Date", "Description", "Type", "Category", "Amount"
                ),
                COLUMN_HEADER_STYLE,
            )));

            let end = (self.scroll_offset + data_rows).min(self.rows.len());
            for i in self.scroll_offset..end {
                let row = &self.rows[i];
                let marker = if i == self.selection { " > " } else { "   " };
                let style = if i == self.selection { BOLD } else { Style::default() };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!(
                            "{marker}{:<10}  {:<28} {:<8} {:<12} ",
                            row.date,
                            truncate(&row.description, 27),
                            row.kind,
                            truncate(row.category.as_deref().unwrap_or(""), 12),
                        ),
                        style,
                    ),
                    kind_amount_span(row.kind, row.amount, 16),
                ]));
            }
        }

        if let Screen::ConfirmDelete { id } = self.screen {
            if let Some(row) = self.rows.iter().find(|r| r.id == id) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!(
                        "   Delete '{}' ({}, {})? (y/n)",
                        row.description,
                        row.date,
                        crate::fmt::signed_money(row.kind, row.amount)
                    ),
                    STATUS_STYLE,
                )));
            }
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    pub fn handle_key(&mut self, code: KeyCode, conn: &Connection) -> PageAction {
        match self.screen {
            Screen::List => self.handle_list_key(code, conn),
            Screen::ConfirmDelete { id } => {
                self.handle_delete_key(code, id, conn);
                PageAction::Continue
            }
            Screen::Add(_) | Screen::Edit { .. } | Screen::Filter(_) => {
                self.handle_form_key(code, conn);
                PageAction::Continue
            }
        }
    }

    fn handle_list_key(&mut self, code: KeyCode, conn: &Connection) -> PageAction {
        self.status_message = None;
        match code {
            KeyCode::Up => {
                self.selection = self.selection.saturating_sub(1);
                ensure_visible(self.selection, &mut self.scroll_offset, self.last_visible_rows);
            }
            KeyCode::Down => {
                if !self.rows.is_empty() {
                    self.selection = (self.selection + 1).min(self.rows.len() - 1);
                    ensure_visible(self.selection, &mut self.scroll_offset, self.last_visible_rows);
                }
            }
            KeyCode::Char('a') => {
                self.screen = Screen::Add(transaction_form("Add Transaction", None));
            }
            KeyCode::Char('e') => {
                if let Some(row) = self.selected() {
                    let id = row.id;
                    let form = transaction_form("Edit Transaction", Some(row));
                    self.screen = Screen::Edit { id, form };
                }
            }
            KeyCode::Char('d') => {
                if let Some(row) = self.selected() {
                    self.screen = Screen::ConfirmDelete { id: row.id };
                }
            }
            KeyCode::Char('f') => {
                self.screen = Screen::Filter(filter_form(&self.filter));
            }
            KeyCode::Char('c') => {
                if !self.filter.is_empty() {
                    self.filter = TransactionFilter::default();
                    self.reload(conn);
                    self.status_message = Some("Filter cleared".into());
                }
            }
            KeyCode::Esc => return PageAction::Back,
            _ => {}
        }
        PageAction::Continue
    }

    fn handle_delete_key(&mut self, code: KeyCode, id: i64, conn: &Connection) {
        match code {
            KeyCode::Char('y') => {
                self.screen = Screen::List;
                match ledger::delete_transaction(conn, id) {
                    Ok(true) => {
                        self.reload(conn);
                        self.status_message = Some("Transaction deleted".into());
                    }
                    Ok(false) => {
                        self.reload(conn);
                        self.status_message = Some("Transaction was already removed".into());
                    }
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.screen = Screen::List,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, code: KeyCode, conn: &Connection) {
        let form = match &mut self.screen {
            Screen::Add(f) | Screen::Edit { form: f, .. } | Screen::Filter(f) => f,
            _ => return,
        };
        match form.handle_key(code) {
            FormAction::Continue => {}
            FormAction::Cancel => {
                self.status_message = None;
                self.screen = Screen::List;
            }
            FormAction::Submit => {
                let outcome = match &self.screen {
                    Screen::Add(form) => read_transaction_form(form)
                        .and_then(|txn| ledger::insert_transaction(conn, &txn))
                        .map(|_| "Transaction added".to_string()),
                    Screen::Edit { id, form } => read_transaction_form(form)
                        .and_then(|txn| ledger::update_transaction(conn, *id, &txn))
                        .map(|_| "Transaction updated".to_string()),
                    Screen::Filter(form) => read_filter_form(form).and_then(|filter| {
                        // Validate before committing so a bad range keeps the old list
                        ledger::filter_transactions(conn, &filter)?;
                        let desc = filter.describe();
                        self.filter = filter;
                        Ok(format!("Showing {desc}"))
                    }),
                    _ => return,
                };
                match outcome {
                    Ok(msg) => {
                        self.screen = Screen::List;
                        self.reload(conn);
                        self.status_message = Some(msg);
                    }
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn seed(conn: &Connection, date: &str, kind: TransactionKind, amount: f64) -> i64 {
        ledger::insert_transaction(
            conn,
            &NewTransaction {
                date: date.into(),
                description: format!("{kind} {amount}"),
                kind,
                category: Some("Other".into()),
                amount,
            },
        )
        .unwrap()
    }

    fn press(manager: &mut LedgerManager, conn: &Connection, keys: &[KeyCode]) {
        for key in keys {
            manager.handle_key(*key, conn);
        }
    }

    fn type_text(manager: &mut LedgerManager, conn: &Connection, text: &str) {
        for c in text.chars() {
            manager.handle_key(KeyCode::Char(c), conn);
        }
    }

    fn clear_field(manager: &mut LedgerManager, conn: &Connection) {
        for _ in 0..12 {
            manager.handle_key(KeyCode::Backspace, conn);
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,500.50").unwrap(), 1500.50);
        assert_eq!(parse_amount(" 42 ").unwrap(), 42.0);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_add_transaction_via_form() {
        let (_dir, conn) = test_conn();
        let mut m = LedgerManager::new(&conn);

        press(&mut m, &conn, &[KeyCode::Char('a')]);
        assert!(m.is_editing());
        clear_field(&mut m, &conn);
        type_text(&mut m, &conn, "2025-02-03");
        press(&mut m, &conn, &[KeyCode::Tab]);
        type_text(&mut m, &conn, "Office rent");
        // Type: income -> expense
        press(&mut m, &conn, &[KeyCode::Tab, KeyCode::Right, KeyCode::Tab]);
        // Category: Salary -> Rent
        press(&mut m, &conn, &[KeyCode::Right, KeyCode::Tab]);
        type_text(&mut m, &conn, "1,200.00");
        press(&mut m, &conn, &[KeyCode::Enter]);

        assert!(!m.is_editing());
        assert_eq!(m.status(), Some("Transaction added"));
        let rows = ledger::list_transactions(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2025-02-03");
        assert_eq!(rows[0].description, "Office rent");
        assert_eq!(rows[0].kind, TransactionKind::Expense);
        assert_eq!(rows[0].category.as_deref(), Some("Rent"));
        assert_eq!(rows[0].amount, 1200.0);
        assert_eq!(m.rows.len(), 1, "list reloads after insert");
    }

    #[test]
    fn test_add_with_bad_amount_keeps_form_open() {
        let (_dir, conn) = test_conn();
        let mut m = LedgerManager::new(&conn);
        press(&mut m, &conn, &[KeyCode::Char('a')]);
        for _ in 0..AMOUNT_IDX {
            press(&mut m, &conn, &[KeyCode::Tab]);
        }
        type_text(&mut m, &conn, "-5");
        press(&mut m, &conn, &[KeyCode::Enter]);
        assert!(m.is_editing());
        assert!(m.status().unwrap().contains("Amount must be"));
        assert!(ledger::list_transactions(&conn).unwrap().is_empty());

        press(&mut m, &conn, &[KeyCode::Esc]);
        assert!(!m.is_editing());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (_dir, conn) = test_conn();
        seed(&conn, "2025-01-01", TransactionKind::Income, 10.0);
        let newest = seed(&conn, "2025-01-02", TransactionKind::Expense, 5.0);
        let mut m = LedgerManager::new(&conn);

        press(&mut m, &conn, &[KeyCode::Char('d'), KeyCode::Char('n')]);
        assert_eq!(ledger::list_transactions(&conn).unwrap().len(), 2);

        press(&mut m, &conn, &[KeyCode::Char('d'), KeyCode::Char('y')]);
        let rows = ledger::list_transactions(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| r.id != newest), "selected (newest) row is removed");
        assert_eq!(m.status(), Some("Transaction deleted"));
        assert_eq!(m.rows.len(), 1);
    }

    #[test]
    fn test_edit_selected_transaction() {
        let (_dir, conn) = test_conn();
        seed(&conn, "2025-01-01", TransactionKind::Income, 10.0);
        let id = seed(&conn, "2025-01-05", TransactionKind::Income, 20.0);
        let mut m = LedgerManager::new(&conn);

        press(&mut m, &conn, &[KeyCode::Char('e')]);
        for _ in 0..AMOUNT_IDX {
            press(&mut m, &conn, &[KeyCode::Tab]);
        }
        clear_field(&mut m, &conn);
        type_text(&mut m, &conn, "25.5");
        press(&mut m, &conn, &[KeyCode::Enter]);

        assert_eq!(m.status(), Some("Transaction updated"));
        let stored = ledger::get_transaction(&conn, id).unwrap().unwrap();
        assert_eq!(stored.amount, 25.5);
        assert_eq!(stored.date, "2025-01-05");
    }

    #[test]
    fn test_edit_keeps_untouched_amount_and_blank_category() {
        let (_dir, conn) = test_conn();
        let id = ledger::insert_transaction(
            &conn,
            &NewTransaction {
                date: "2025-01-05".into(),
                description: "fee".into(),
                kind: TransactionKind::Expense,
                category: None,
                amount: 1234.567,
            },
        )
        .unwrap();
        let mut m = LedgerManager::new(&conn);

        press(&mut m, &conn, &[KeyCode::Char('e'), KeyCode::Tab]);
        type_text(&mut m, &conn, "!");
        press(&mut m, &conn, &[KeyCode::Enter]);

        assert_eq!(m.status(), Some("Transaction updated"));
        let stored = ledger::get_transaction(&conn, id).unwrap().unwrap();
        assert_eq!(stored.description, "fee!");
        assert_eq!(stored.amount, 1234.567);
        assert_eq!(stored.category, None);
        assert_eq!(stored.kind, TransactionKind::Expense);
    }

    #[test]
    fn test_edit_can_clear_category() {
        let (_dir, conn) = test_conn();
        let id = seed(&conn, "2025-01-05", TransactionKind::Income, 20.0);
        let mut m = LedgerManager::new(&conn);

        press(&mut m, &conn, &[KeyCode::Char('e')]);
        for _ in 0..CATEGORY_IDX {
            press(&mut m, &conn, &[KeyCode::Tab]);
        }
        // "Other" is last in the list, so one step right wraps to "(none)"
        press(&mut m, &conn, &[KeyCode::Right, KeyCode::Enter]);

        let stored = ledger::get_transaction(&conn, id).unwrap().unwrap();
        assert_eq!(stored.category, None);
        assert_eq!(stored.amount, 20.0);
    }

    #[test]
    fn test_filter_and_clear() {
        let (_dir, conn) = test_conn();
        let today = Local::now().date_naive().to_string();
        seed(&conn, &today, TransactionKind::Income, 10.0);
        seed(&conn, &today, TransactionKind::Expense, 5.0);
        seed(&conn, "2001-01-01", TransactionKind::Expense, 7.0);
        let mut m = LedgerManager::new(&conn);
        assert_eq!(m.rows.len(), 3);

        // Type: all -> income, keep default one-month range
        press(&mut m, &conn, &[KeyCode::Char('f'), KeyCode::Right, KeyCode::Enter]);
        assert!(!m.is_editing());
        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.rows[0].kind, TransactionKind::Income);

        press(&mut m, &conn, &[KeyCode::Char('c')]);
        assert_eq!(m.rows.len(), 3);
        assert_eq!(m.status(), Some("Filter cleared"));
    }

    #[test]
    fn test_filter_with_half_range_reports_error() {
        let (_dir, conn) = test_conn();
        let mut m = LedgerManager::new(&conn);
        press(&mut m, &conn, &[KeyCode::Char('f'), KeyCode::Tab, KeyCode::Tab]);
        clear_field(&mut m, &conn);
        press(&mut m, &conn, &[KeyCode::Enter]);
        assert!(m.is_editing());
        assert!(m.status().unwrap().contains("--to requires --from"));
        assert!(m.filter.is_empty());
    }

    #[test]
    fn test_escape_from_list_returns_to_menu() {
        let (_dir, conn) = test_conn();
        let mut m = LedgerManager::new(&conn);
        assert!(matches!(m.handle_key(KeyCode::Esc, &conn), PageAction::Back));
    }
}
