use chrono::Local;
use crossterm::event::KeyCode;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use rusqlite::Connection;

use super::ledger_manager::parse_amount;
use crate::clients;
use crate::error::Result;
use crate::fmt::money;
use crate::invoices;
use crate::models::Invoice;
use crate::tui::{
    ensure_visible, title_lines, truncate, FieldKind, Form, FormAction, FormField, PageAction,
    BOLD, COLUMN_HEADER_STYLE, FORM_HINTS, STATUS_STYLE,
};

const NUMBER_IDX: usize = 0;
const CLIENT_IDX: usize = 1;
const AMOUNT_IDX: usize = 2;
const ISSUE_IDX: usize = 3;
const DUE_IDX: usize = 4;

const NO_CLIENT: &str = "(none)";

enum Screen {
    List,
    /// `client_ids` runs parallel to the client selector's options.
    Add { form: Form, client_ids: Vec<Option<i64>> },
    ConfirmDelete { id: i64 },
}

fn invoice_form(conn: &Connection) -> Result<(Form, Vec<Option<i64>>)> {
    let mut labels = vec![NO_CLIENT.to_string()];
    let mut ids = vec![None];
    for c in clients::list_clients(conn)? {
        labels.push(format!("{} (#{})", c.name, c.id));
        ids.push(Some(c.id));
    }
    let form = Form::new(
        "New Invoice",
        vec![
            FormField::text("Number", ""),
            FormField::selector("Client", labels, NO_CLIENT),
            FormField::text("Amount", ""),
            FormField::text("Issue date", Local::now().date_naive().to_string()),
            FormField::text("Due date", ""),
        ],
    );
    Ok((form, ids))
}

pub struct InvoiceManager {
    invoices: Vec<Invoice>,
    selection: usize,
    scroll_offset: usize,
    last_visible_rows: usize,
    screen: Screen,
    status_message: Option<String>,
}

impl InvoiceManager {
    pub fn new(conn: &Connection) -> Self {
        let mut manager = Self {
            invoices: Vec::new(),
            selection: 0,
            scroll_offset: 0,
            last_visible_rows: 20,
            screen: Screen::List,
            status_message: None,
        };
        manager.reload(conn);
        manager
    }

    pub fn reload(&mut self, conn: &Connection) {
        match invoices::list_invoices(conn) {
            Ok(rows) => self.invoices = rows,
            Err(e) => self.status_message = Some(format!("Could not load invoices: {e}")),
        }
        if self.invoices.is_empty() {
            self.selection = 0;
        } else {
            self.selection = self.selection.min(self.invoices.len() - 1);
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn is_editing(&self) -> bool {
        !matches!(self.screen, Screen::List)
    }

    pub fn hints(&self) -> &'static str {
        match self.screen {
            Screen::List => " a=add  s=cycle status  d=delete  Esc=menu  q=quit",
            Screen::ConfirmDelete { .. } => " y=confirm  n=cancel",
            Screen::Add { .. } => FORM_HINTS,
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect) {
        match &self.screen {
            Screen::List | Screen::ConfirmDelete { .. } => self.draw_list(frame, area),
            Screen::Add { form, .. } => form.draw(frame, area, self.status_message.as_deref()),
        }
    }

    fn draw_list(&mut self, frame: &mut Frame, area: Rect) {
        let data_rows = (area.height as usize).saturating_sub(4);
        self.last_visible_rows = data_rows;
        ensure_visible(self.selection, &mut self.scroll_offset, data_rows);

        let mut lines = title_lines(format!("Invoices ({})", self.invoices.len()));
        if self.invoices.is_empty() {
            lines.push(Line::from("   No invoices. Press 'a' to add one."));
        } else {
            lines.push(Line::from(Span::styled(
                format!(
                    "   {:<12} {:<22} {:>14} {:<10} {:<10} {:<10}",
                    "Number", "Client", "Amount", "Status", "Issued", "Due"
                ),
                COLUMN_HEADER_STYLE,
            )));
            let end = (self.scroll_offset + data_rows).min(self.invoices.len());
            for i in self.scroll_offset..end {
                let inv = &self.invoices[i];
                let marker = if i == self.selection { " > " } else { "   " };
                let style = if i == self.selection { BOLD } else { Style::default() };
                lines.push(Line::from(Span::styled(
                    format!(
                        "{marker}{:<12} {:<22} {:>14} {:<10} {:<10} {:<10}",
                        truncate(&inv.number, 12),
                        truncate(inv.client_name.as_deref().unwrap_or("\u{2014}"), 22),
                        money(inv.amount),
                        inv.status,
                        inv.issue_date.as_deref().unwrap_or(""),
                        inv.due_date.as_deref().unwrap_or(""),
                    ),
                    style,
                )));
            }
        }

        if let Screen::ConfirmDelete { id } = self.screen {
            if let Some(inv) = self.invoices.iter().find(|i| i.id == id) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("   Delete invoice {}? (y/n)", inv.number),
                    STATUS_STYLE,
                )));
            }
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    pub fn handle_key(&mut self, code: KeyCode, conn: &Connection) -> PageAction {
        match self.screen {
            Screen::List => return self.handle_list_key(code, conn),
            Screen::ConfirmDelete { id } => self.handle_delete_key(code, id, conn),
            Screen::Add { .. } => self.handle_form_key(code, conn),
        }
        PageAction::Continue
    }

    fn handle_list_key(&mut self, code: KeyCode, conn: &Connection) -> PageAction {
        self.status_message = None;
        match code {
            KeyCode::Up => {
                self.selection = self.selection.saturating_sub(1);
                ensure_visible(self.selection, &mut self.scroll_offset, self.last_visible_rows);
            }
            KeyCode::Down => {
                if !self.invoices.is_empty() {
                    self.selection = (self.selection + 1).min(self.invoices.len() - 1);
                    ensure_visible(self.selection, &mut self.scroll_offset, self.last_visible_rows);
                }
            }
            KeyCode::Char('a') => match invoice_form(conn) {
                Ok((form, client_ids)) => self.screen = Screen::Add { form, client_ids },
                Err(e) => self.status_message = Some(format!("Could not load clients: {e}")),
            },
            KeyCode::Char('s') => {
                if let Some(inv) = self.invoices.get(self.selection) {
                    let next = inv.status.next();
                    let number = inv.number.clone();
                    match invoices::set_invoice_status(conn, inv.id, next) {
                        Ok(()) => {
                            self.reload(conn);
                            self.status_message = Some(format!("Invoice {number} marked {next}"));
                        }
                        Err(e) => self.status_message = Some(e.to_string()),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(inv) = self.invoices.get(self.selection) {
                    self.screen = Screen::ConfirmDelete { id: inv.id };
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
                match invoices::delete_invoice(conn, id) {
                    Ok(_) => {
                        self.reload(conn);
                        self.status_message = Some("Invoice deleted".into());
                    }
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.screen = Screen::List,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, code: KeyCode, conn: &Connection) {
        let Screen::Add { form, client_ids } = &mut self.screen else {
            return;
        };
        match form.handle_key(code) {
            FormAction::Continue => {}
            FormAction::Cancel => {
                self.status_message = None;
                self.screen = Screen::List;
            }
            FormAction::Submit => {
                let client_id = match &form.fields[CLIENT_IDX].kind {
                    FieldKind::Selector { selected, .. } => client_ids.get(*selected).copied().flatten(),
                    FieldKind::Text => None,
                };
                let number = form.value(NUMBER_IDX).to_string();
                let result = parse_amount(form.value(AMOUNT_IDX)).and_then(|amount| {
                    invoices::add_invoice(
                        conn,
                        &number,
                        client_id,
                        amount,
                        Some(form.value(ISSUE_IDX)),
                        Some(form.value(DUE_IDX)),
                    )
                });
                match result {
                    Ok(_) => {
                        self.screen = Screen::List;
                        self.reload(conn);
                        self.status_message = Some(format!("Invoice {number} created"));
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
    use crate::models::InvoiceStatus;

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn press_all(m: &mut InvoiceManager, conn: &Connection, keys: impl IntoIterator<Item = KeyCode>) {
        for key in keys {
            m.handle_key(key, conn);
        }
    }

    #[test]
    fn test_create_invoice_for_client() {
        let (_dir, conn) = test_conn();
        let client = clients::add_client(&conn, "Acme", None, None, None).unwrap();
        let mut m = InvoiceManager::new(&conn);

        press_all(&mut m, &conn, [KeyCode::Char('a')]);
        press_all(&mut m, &conn, "INV-7".chars().map(KeyCode::Char));
        // Client: (none) -> Acme
        press_all(&mut m, &conn, [KeyCode::Tab, KeyCode::Right, KeyCode::Tab]);
        press_all(&mut m, &conn, "2500".chars().map(KeyCode::Char));
        press_all(&mut m, &conn, [KeyCode::Enter]);

        assert!(!m.is_editing(), "status: {:?}", m.status());
        assert_eq!(m.status(), Some("Invoice INV-7 created"));
        assert_eq!(m.invoices.len(), 1);
        assert_eq!(m.invoices[0].client_id, Some(client));
        assert_eq!(m.invoices[0].amount, 2500.0);
        assert_eq!(m.invoices[0].status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_cycle_status() {
        let (_dir, conn) = test_conn();
        invoices::add_invoice(&conn, "INV-1", None, 10.0, None, None).unwrap();
        let mut m = InvoiceManager::new(&conn);
        press_all(&mut m, &conn, [KeyCode::Char('s')]);
        assert_eq!(m.invoices[0].status, InvoiceStatus::Paid);
        assert_eq!(m.status(), Some("Invoice INV-1 marked paid"));
    }

    #[test]
    fn test_duplicate_number_reported() {
        let (_dir, conn) = test_conn();
        invoices::add_invoice(&conn, "DUP", None, 10.0, None, None).unwrap();
        let mut m = InvoiceManager::new(&conn);
        press_all(&mut m, &conn, [KeyCode::Char('a')]);
        press_all(&mut m, &conn, "DUP".chars().map(KeyCode::Char));
        press_all(&mut m, &conn, [KeyCode::Tab, KeyCode::Tab]);
        press_all(&mut m, &conn, "5".chars().map(KeyCode::Char));
        press_all(&mut m, &conn, [KeyCode::Enter]);
        assert!(m.is_editing());
        assert!(m.status().unwrap().contains("already exists"));
    }

    #[test]
    fn test_delete_invoice_confirmed() {
        let (_dir, conn) = test_conn();
        invoices::add_invoice(&conn, "DEL", None, 10.0, None, None).unwrap();
        let mut m = InvoiceManager::new(&conn);
        press_all(&mut m, &conn, [KeyCode::Char('d'), KeyCode::Char('y')]);
        assert!(m.invoices.is_empty());
        assert_eq!(m.status(), Some("Invoice deleted"));
    }
}
