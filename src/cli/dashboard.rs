use std::path::{Path, PathBuf};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use rusqlite::Connection;

use super::client_manager::ClientManager;
use super::invoice_manager::InvoiceManager;
use super::ledger_manager::LedgerManager;
use crate::clients;
use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::Result;
use crate::fmt::{format_bytes, money};
use crate::invoices;
use crate::ledger::{self, LedgerSummary};
use crate::settings::{load_settings, settings_path, Settings};
use crate::tui::{
    money_span, title_lines, PageAction, BOLD, FOOTER_STYLE, HEADER_STYLE, STATUS_STYLE,
};

const MENU_WIDTH: u16 = 20;

const REPORTS: &[&str] = &["Profit & Loss", "Cash Flow", "Tax Report", "Monthly Report"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Home,
    Transactions,
    Invoices,
    Clients,
    Reports,
    Settings,
}

impl Page {
    const ALL: [Page; 6] = [
        Page::Home,
        Page::Transactions,
        Page::Invoices,
        Page::Clients,
        Page::Reports,
        Page::Settings,
    ];

    fn title(self) -> &'static str {
        match self {
            Page::Home => "Dashboard",
            Page::Transactions => "Transactions",
            Page::Invoices => "Invoices",
            Page::Clients => "Clients",
            Page::Reports => "Reports",
            Page::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Menu,
    Page,
}

struct HomeData {
    summary: LedgerSummary,
    client_count: i64,
    outstanding: f64,
}

struct SettingsInfo {
    config_file: PathBuf,
    data_dir: PathBuf,
    db_path: PathBuf,
    db_size: Option<u64>,
    user_name: String,
}

impl SettingsInfo {
    fn gather(settings: &Settings) -> Self {
        let data_dir = PathBuf::from(&settings.data_dir);
        let db_path = data_dir.join(DB_FILE);
        let db_size = std::fs::metadata(&db_path).ok().map(|m| m.len());
        Self {
            config_file: settings_path(),
            data_dir,
            db_path,
            db_size,
            user_name: settings.user_name.clone(),
        }
    }
}

struct Dashboard {
    page: Page,
    focus: Focus,
    greeting: String,
    home: Option<HomeData>,
    ledger: LedgerManager,
    invoices: InvoiceManager,
    clients: ClientManager,
    report_selection: usize,
    settings_info: SettingsInfo,
    status_message: Option<String>,
}

impl Dashboard {
    fn new(conn: &Connection, settings: &Settings) -> Self {
        let first_name = settings.user_name.split_whitespace().next().unwrap_or("");
        let greeting = if first_name.is_empty() {
            "Tally".to_string()
        } else {
            format!("Tally: hello, {first_name}.")
        };
        let mut dashboard = Self {
            page: Page::Home,
            focus: Focus::Menu,
            greeting,
            home: None,
            ledger: LedgerManager::new(conn),
            invoices: InvoiceManager::new(conn),
            clients: ClientManager::new(conn),
            report_selection: 0,
            settings_info: SettingsInfo::gather(settings),
            status_message: None,
        };
        dashboard.load_home(conn);
        dashboard
    }

    fn load_home(&mut self, conn: &Connection) {
        let data = ledger::summary(conn).and_then(|summary| {
            Ok(HomeData {
                summary,
                client_count: clients::client_count(conn)?,
                outstanding: invoices::outstanding_total(conn)?,
            })
        });
        match data {
            Ok(d) => self.home = Some(d),
            Err(e) => self.status_message = Some(format!("Could not load summary: {e}")),
        }
    }

    /// Switch pages, refreshing whatever the new page shows.
    fn select_page(&mut self, page: Page, conn: &Connection) {
        self.page = page;
        self.status_message = None;
        match page {
            Page::Home => self.load_home(conn),
            Page::Transactions => self.ledger.reload(conn),
            Page::Invoices => self.invoices.reload(conn),
            Page::Clients => self.clients.reload(conn),
            Page::Reports => {}
            Page::Settings => self.settings_info = SettingsInfo::gather(&load_settings()),
        }
    }

    fn page_index(&self) -> usize {
        Page::ALL.iter().position(|p| *p == self.page).unwrap_or(0)
    }

    /// Whether a page is collecting text, in which case `q` is just a letter.
    fn page_is_editing(&self) -> bool {
        match self.page {
            Page::Transactions => self.ledger.is_editing(),
            Page::Invoices => self.invoices.is_editing(),
            Page::Clients => self.clients.is_editing(),
            _ => false,
        }
    }

    /// Returns true when the dashboard should exit.
    fn handle_key(&mut self, code: KeyCode, conn: &Connection) -> bool {
        if code == KeyCode::Char('q') && !(self.focus == Focus::Page && self.page_is_editing()) {
            return true;
        }
        match self.focus {
            Focus::Menu => self.handle_menu_key(code, conn),
            Focus::Page => self.handle_page_key(code, conn),
        }
        false
    }

    fn handle_menu_key(&mut self, code: KeyCode, conn: &Connection) {
        let idx = self.page_index();
        match code {
            KeyCode::Up => self.select_page(Page::ALL[idx.saturating_sub(1)], conn),
            KeyCode::Down => self.select_page(Page::ALL[(idx + 1).min(Page::ALL.len() - 1)], conn),
            KeyCode::Char(c @ '1'..='6') => {
                let n = c as usize - '1' as usize;
                self.select_page(Page::ALL[n], conn);
            }
            KeyCode::Enter | KeyCode::Tab => {
                self.status_message = None;
                self.focus = Focus::Page;
            }
            _ => {}
        }
    }

    fn handle_page_key(&mut self, code: KeyCode, conn: &Connection) {
        let action = match self.page {
            Page::Transactions => self.ledger.handle_key(code, conn),
            Page::Invoices => self.invoices.handle_key(code, conn),
            Page::Clients => self.clients.handle_key(code, conn),
            Page::Reports => self.handle_reports_key(code),
            Page::Home | Page::Settings => match code {
                KeyCode::Esc => PageAction::Back,
                KeyCode::Char('r') if self.page == Page::Home => {
                    self.load_home(conn);
                    PageAction::Continue
                }
                _ => PageAction::Continue,
            },
        };
        if let PageAction::Back = action {
            self.focus = Focus::Menu;
            self.status_message = None;
            self.ledger.clear_status();
            self.invoices.clear_status();
            self.clients.clear_status();
        }
    }

    fn handle_reports_key(&mut self, code: KeyCode) -> PageAction {
        match code {
            KeyCode::Up => self.report_selection = self.report_selection.saturating_sub(1),
            KeyCode::Down => {
                self.report_selection = (self.report_selection + 1).min(REPORTS.len() - 1)
            }
            KeyCode::Enter => {
                self.status_message = Some(format!(
                    "{} is not available yet",
                    REPORTS[self.report_selection]
                ));
            }
            KeyCode::Esc => return PageAction::Back,
            _ => {}
        }
        PageAction::Continue
    }

    fn status(&self) -> Option<&str> {
        let page_status = match self.page {
            Page::Transactions => self.ledger.status(),
            Page::Invoices => self.invoices.status(),
            Page::Clients => self.clients.status(),
            _ => None,
        };
        page_status.or(self.status_message.as_deref())
    }

    fn hints(&self) -> &'static str {
        if self.focus == Focus::Menu {
            return " Up/Down or 1-6=choose page  Enter=open  q=quit";
        }
        match self.page {
            Page::Transactions => self.ledger.hints(),
            Page::Invoices => self.invoices.hints(),
            Page::Clients => self.clients.hints(),
            Page::Reports => " Up/Down=choose  Enter=run  Esc=menu  q=quit",
            Page::Home => " r=refresh  Esc=menu  q=quit",
            Page::Settings => " Esc=menu  q=quit",
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, sep1, body_area, sep2, status_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.greeting)).style(HEADER_STYLE),
            header_area,
        );
        let sep_line = "\u{2501}".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(border_style);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget, sep2);

        let [menu_area, content_area] =
            Layout::horizontal([Constraint::Length(MENU_WIDTH), Constraint::Fill(1)])
                .areas(body_area);
        self.draw_menu(frame, menu_area);

        match self.page {
            Page::Home => self.draw_home(frame, content_area),
            Page::Transactions => self.ledger.draw(frame, content_area),
            Page::Invoices => self.invoices.draw(frame, content_area),
            Page::Clients => self.clients.draw(frame, content_area),
            Page::Reports => self.draw_reports(frame, content_area),
            Page::Settings => self.draw_settings(frame, content_area),
        }

        if let Some(msg) = self.status() {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {msg}"), STATUS_STYLE)),
                status_area,
            );
        }
        frame.render_widget(
            Paragraph::new(Span::styled(self.hints(), FOOTER_STYLE)),
            hints_area,
        );
    }

    fn draw_menu(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from("")];
        for (i, page) in Page::ALL.iter().enumerate() {
            let selected = *page == self.page;
            let marker = if selected { ">" } else { " " };
            let style = match (selected, self.focus) {
                (true, Focus::Menu) => BOLD.fg(Color::Cyan),
                (true, Focus::Page) => BOLD,
                _ => Style::default(),
            };
            lines.push(Line::from(Span::styled(
                format!(" {marker} {} {}", i + 1, page.title()),
                style,
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_home(&self, frame: &mut Frame, area: Rect) {
        let mut lines = title_lines("Overview".to_string());
        if let Some(data) = &self.home {
            let s = &data.summary;
            lines.push(Line::from(vec![
                Span::raw("   Income          "),
                money_span(s.total_income),
            ]));
            lines.push(Line::from(vec![
                Span::raw("   Expenses        "),
                money_span(-s.total_expenses),
            ]));
            lines.push(Line::from(vec![
                Span::raw("   Net             "),
                money_span(s.net),
            ]));
            lines.push(Line::from(format!("   Transactions    {}", s.count)));
            lines.push(Line::from(""));
            lines.push(Line::from(format!("   Clients         {}", data.client_count)));
            lines.push(Line::from(format!(
                "   Outstanding     {}",
                money(data.outstanding)
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_reports(&self, frame: &mut Frame, area: Rect) {
        let mut lines = title_lines("Reports".to_string());
        for (i, name) in REPORTS.iter().enumerate() {
            let selected = i == self.report_selection;
            let marker = if selected { " > " } else { "   " };
            let style = if selected && self.focus == Focus::Page {
                BOLD
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!("{marker}{name}"), style)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_settings(&self, frame: &mut Frame, area: Rect) {
        let info = &self.settings_info;
        let user = if info.user_name.is_empty() {
            "(not set)"
        } else {
            info.user_name.as_str()
        };
        let size = info
            .db_size
            .map(format_bytes)
            .unwrap_or_else(|| "(missing)".to_string());
        let mut lines = title_lines("Settings".to_string());
        lines.push(Line::from(format!("   User          {user}")));
        lines.push(Line::from(format!(
            "   Config file   {}",
            info.config_file.display()
        )));
        lines.push(Line::from(format!("   Data dir      {}", info.data_dir.display())));
        lines.push(Line::from(format!("   Database      {}", info.db_path.display())));
        lines.push(Line::from(format!("   DB size       {size}")));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "   Use `tally init --data-dir` or `tally load` to change the data directory.",
            FOOTER_STYLE,
        )));
        frame.render_widget(Paragraph::new(lines), area);
    }
}

/// Create the data directory and database if they do not exist yet.
fn ensure_database(data_dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(data_dir.join("backups"))?;
    let conn = get_connection(&data_dir.join(DB_FILE))?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let conn = ensure_database(Path::new(&settings.data_dir))?;
    tracing::debug!(data_dir = %settings.data_dir, "opening dashboard");

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut dashboard = Dashboard::new(&conn, &settings);
    let mut terminal = ratatui::init();

    let exit: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| dashboard.draw(frame)) {
            break Err(e.into());
        }
        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                if dashboard.handle_key(key.code, &conn) {
                    break Ok(());
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    exit
}
