use crossterm::event::KeyCode;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use rusqlite::Connection;

use crate::clients::{self, ClientRow};
use crate::fmt::money;
use crate::tui::{
    ensure_visible, title_lines, truncate, Form, FormAction, FormField, PageAction, BOLD,
    COLUMN_HEADER_STYLE, FORM_HINTS, STATUS_STYLE,
};

const NAME_IDX: usize = 0;
const EMAIL_IDX: usize = 1;
const PHONE_IDX: usize = 2;
const ADDRESS_IDX: usize = 3;

enum Screen {
    List,
    Add(Form),
    ConfirmDelete { id: i64 },
}

fn client_form() -> Form {
    Form::new(
        "Add Client",
        vec![
            FormField::text("Name", ""),
            FormField::text("Email", ""),
            FormField::text("Phone", ""),
            FormField::text("Address", ""),
        ],
    )
}

pub struct ClientManager {
    clients: Vec<ClientRow>,
    selection: usize,
    scroll_offset: usize,
    last_visible_rows: usize,
    screen: Screen,
    status_message: Option<String>,
}

impl ClientManager {
    pub fn new(conn: &Connection) -> Self {
        let mut manager = Self {
            clients: Vec::new(),
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
        match clients::list_clients(conn) {
            Ok(rows) => self.clients = rows,
            Err(e) => self.status_message = Some(format!("Could not load clients: {e}")),
        }
        if self.clients.is_empty() {
            self.selection = 0;
        } else {
            self.selection = self.selection.min(self.clients.len() - 1);
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
            Screen::List => " a=add  d=delete  Esc=menu  q=quit",
            Screen::ConfirmDelete { .. } => " y=confirm  n=cancel",
            Screen::Add(_) => FORM_HINTS,
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect) {
        match &self.screen {
            Screen::List | Screen::ConfirmDelete { .. } => self.draw_list(frame, area),
            Screen::Add(form) => form.draw(frame, area, self.status_message.as_deref()),
        }
    }

    fn draw_list(&mut self, frame: &mut Frame, area: Rect) {
        let data_rows = (area.height as usize).saturating_sub(4);
        self.last_visible_rows = data_rows;
        ensure_visible(self.selection, &mut self.scroll_offset, data_rows);

        let mut lines = title_lines(format!("Clients ({})", self.clients.len()));
        if self.clients.is_empty() {
            lines.push(Line::from("   No clients. Press 'a' to add one."));
        } else {
            lines.push(Line::from(Span::styled(
                format!(
                    "   {:<24} {:<26} {:<16} {:>14}",
                    "Name", "Email", "Phone", "Outstanding"
                ),
                COLUMN_HEADER_STYLE,
            )));
            let end = (self.scroll_offset + data_rows).min(self.clients.len());
            for i in self.scroll_offset..end {
                let c = &self.clients[i];
                let marker = if i == self.selection { " > " } else { "   " };
                let style = if i == self.selection { BOLD } else { Style::default() };
                lines.push(Line::from(Span::styled(
                    format!(
                        "{marker}{:<24} {:<26} {:<16} {:>14}",
                        truncate(&c.name, 23),
                        truncate(c.email.as_deref().unwrap_or(""), 25),
                        truncate(c.phone.as_deref().unwrap_or(""), 15),
                        money(c.outstanding),
                    ),
                    style,
                )));
            }
        }

        if let Screen::ConfirmDelete { id } = self.screen {
            if let Some(c) = self.clients.iter().find(|c| c.id == id) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("   Delete client '{}'? (y/n)", c.name),
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
            Screen::Add(_) => self.handle_form_key(code, conn),
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
                if !self.clients.is_empty() {
                    self.selection = (self.selection + 1).min(self.clients.len() - 1);
                    ensure_visible(self.selection, &mut self.scroll_offset, self.last_visible_rows);
                }
            }
            KeyCode::Char('a') => self.screen = Screen::Add(client_form()),
            KeyCode::Char('d') => {
                if let Some(c) = self.clients.get(self.selection) {
                    // Pre-check so the user is not asked to confirm a delete that must fail
                    match clients::blocking_reason(conn, c.id) {
                        Ok(Some(reason)) => self.status_message = Some(reason),
                        Ok(None) => self.screen = Screen::ConfirmDelete { id: c.id },
                        Err(e) => self.status_message = Some(format!("Error: {e}")),
                    }
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
                match clients::delete_client(conn, id) {
                    Ok(()) => {
                        self.reload(conn);
                        self.status_message = Some("Client deleted".into());
                    }
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.screen = Screen::List,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, code: KeyCode, conn: &Connection) {
        let Screen::Add(form) = &mut self.screen else {
            return;
        };
        match form.handle_key(code) {
            FormAction::Continue => {}
            FormAction::Cancel => {
                self.status_message = None;
                self.screen = Screen::List;
            }
            FormAction::Submit => {
                let result = clients::add_client(
                    conn,
                    form.value(NAME_IDX),
                    Some(form.value(EMAIL_IDX)),
                    Some(form.value(PHONE_IDX)),
                    Some(form.value(ADDRESS_IDX)),
                );
                match result {
                    Ok(_) => {
                        let name = form.value(NAME_IDX).to_string();
                        self.screen = Screen::List;
                        self.reload(conn);
                        self.status_message = Some(format!("Added client: {name}"));
                    }
                    Err(e) => self.status_message = Some(e.to_string()),
                }
            }
        }
    }
}
