//! Terminal application state: tabs, key handling, background loads and rendering.

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, StatefulWidget, Tabs, Widget, Wrap},
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

use crate::error::{AuthError, LoadError};
use crate::export::{cell_text, export_file_name, write_csv};
use crate::paginator::{page_url, LoadMode, LoadOutcome, Paginator, ParamNames};
use crate::persistence::StatePort;
use crate::table::{LoadStatus, TableEvent};
use crate::tabs::TabCollection;
use crate::transport::{login, Credentials, HttpFetcher};
use crate::widgets::controls::{Controls, EDIT_CONTROLS, TABLE_CONTROLS};
use crate::widgets::datatable::{DataTable, DataTableState};
use crate::widgets::text_input::{TextInput, TextInputEvent};
use crate::RunOptions;

pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16), // resized (width, height)
    /// A background load for `tab_id` finished
    LoadFinished {
        tab_id: u64,
        result: Result<LoadOutcome, LoadError>,
    },
    LoginFinished(Result<String, AuthError>),
    Exit,
    Crash(String),
}

/// Field being edited in the input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Endpoint,
    Limit,
    Offset,
    LimitParam,
    OffsetParam,
    Title,
    Username,
    Password,
}

impl EditTarget {
    fn label(self) -> &'static str {
        match self {
            Self::Endpoint => "Endpoint",
            Self::Limit => "Limit",
            Self::Offset => "Offset",
            Self::LimitParam => "Limit parameter",
            Self::OffsetParam => "Offset parameter",
            Self::Title => "Tab title",
            Self::Username => "Username",
            Self::Password => "Password",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Editing(EditTarget),
}

pub struct App {
    pub tabs: TabCollection,
    events: Sender<AppEvent>,
    fetcher: HttpFetcher,
    state_port: Option<Box<dyn StatePort>>,
    pub input_mode: InputMode,
    input: TextInput,
    token: Option<String>,
    auth_url: Option<String>,
    pending_username: Option<String>,
    /// Load to start once a login at startup completes
    pending_load: Option<LoadMode>,
    cancel_flags: HashMap<u64, Arc<AtomicBool>>,
    views: HashMap<u64, DataTableState>,
    /// Transient message for the status line
    message: Option<String>,
    export_dir: PathBuf,
    max_column_width: u16,
    show_meta: bool,
}

impl App {
    pub fn new(
        events: Sender<AppEvent>,
        options: &RunOptions,
        state_port: Option<Box<dyn StatePort>>,
    ) -> App {
        let restored = state_port.as_ref().and_then(|port| match port.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "could not restore saved tabs");
                None
            }
        });
        let tabs = match restored {
            Some(snapshot) => TabCollection::from_snapshot(snapshot, options.cursor.clone()),
            None => TabCollection::new(options.cursor.clone()),
        };

        let mut app = App {
            tabs,
            events,
            fetcher: HttpFetcher::new(options.timeout),
            state_port,
            input_mode: InputMode::Normal,
            input: TextInput::new(),
            token: options.token.clone(),
            auth_url: options.auth_url.clone(),
            pending_username: None,
            pending_load: None,
            cancel_flags: HashMap::new(),
            views: HashMap::new(),
            message: None,
            export_dir: options.export_dir.clone(),
            max_column_width: options.max_column_width,
            show_meta: options.show_meta,
        };
        if let Some(url) = &options.url {
            app.open_url(url, options);
        }
        app
    }

    /// Put `url` in the active tab, or in a new tab when the active one already has an endpoint.
    fn open_url(&mut self, url: &str, options: &RunOptions) {
        if !self.tabs.active().endpoint.trim().is_empty() && self.tabs.active().endpoint != url {
            self.tabs.add_tab();
        }
        let tab = self.tabs.active_mut();
        tab.update(TableEvent::EndpointChanged(url.to_string()));
        tab.update(TableEvent::LimitChanged(options.cursor.limit));
        tab.update(TableEvent::ParamNamesChanged(options.cursor.param_names.clone()));
        if let Some(offset) = options.offset {
            tab.update(TableEvent::OffsetChanged(offset));
        }
    }

    /// Work to do once the event loop runs: log in and load the URL given on the command line.
    pub fn start(&mut self, options: &RunOptions) {
        if options.url.is_none() {
            return;
        }
        match &options.credentials {
            Some(credentials) if self.token.is_none() => {
                self.pending_load = Some(options.load_mode);
                self.start_login(credentials.clone());
            }
            _ => self.start_load(options.load_mode),
        }
    }

    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Key(key) => self.key(&key),
            AppEvent::Resize(_, _) => None,
            AppEvent::LoadFinished { tab_id, result } => {
                self.finish_load(tab_id, result);
                None
            }
            AppEvent::LoginFinished(result) => {
                self.finish_login(result);
                None
            }
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        if let InputMode::Editing(target) = self.input_mode {
            match self.input.handle_key(event) {
                TextInputEvent::Submit => {
                    let value = self.input.value().to_string();
                    self.stop_editing();
                    self.apply_edit(target, value);
                }
                TextInputEvent::Cancel => {
                    self.stop_editing();
                    self.pending_username = None;
                }
                TextInputEvent::None => {}
            }
            return None;
        }

        if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
            return Some(self.exit());
        }

        let num_rows = self.tabs.active().flat_rows.len();
        let num_columns = self.tabs.active().visible_columns().len();
        match event.code {
            KeyCode::Char('q') => return Some(self.exit()),
            KeyCode::Char('t') => {
                self.tabs.add_tab();
                self.persist();
            }
            KeyCode::Char('w') => self.close_active_tab(),
            KeyCode::Tab => self.tabs.select_next(),
            KeyCode::BackTab => self.tabs.select_previous(),
            KeyCode::Char('u') => self.start_editing(EditTarget::Endpoint),
            KeyCode::Char('p') => self.start_editing(EditTarget::Limit),
            KeyCode::Char('o') => self.start_editing(EditTarget::Offset),
            KeyCode::Char('P') => self.start_editing(EditTarget::LimitParam),
            KeyCode::Char('O') => self.start_editing(EditTarget::OffsetParam),
            KeyCode::Char('r') => self.start_editing(EditTarget::Title),
            KeyCode::Char('l') => self.start_load(LoadMode::Single),
            KeyCode::Char('L') => self.start_load(LoadMode::All),
            KeyCode::Char('x') => self.cancel_load(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('m') => self.show_meta = !self.show_meta,
            KeyCode::Char('a') => self.begin_login(),
            KeyCode::Char('A') => {
                self.token = None;
                self.message = Some("Logged out".to_string());
            }
            KeyCode::Char('h') => self.hide_selected_column(),
            KeyCode::Char('H') => {
                self.tabs.active_mut().update(TableEvent::AllColumnsShown);
                self.persist();
            }
            KeyCode::Char('s') => self.sort_by_selected_column(),
            KeyCode::Char('S') => self.tabs.active_mut().update(TableEvent::SortCleared),
            KeyCode::Char('<') => self.move_selected_column(false),
            KeyCode::Char('>') => self.move_selected_column(true),
            KeyCode::Down | KeyCode::Char('j') => self.view().select_next(num_rows),
            KeyCode::Up | KeyCode::Char('k') => self.view().select_previous(),
            KeyCode::PageDown => self.view().page_down(num_rows),
            KeyCode::PageUp => self.view().page_up(),
            KeyCode::Right => self.view().scroll_right(num_columns),
            KeyCode::Left => self.view().scroll_left(),
            _ => {}
        }
        None
    }

    fn exit(&mut self) -> AppEvent {
        for flag in self.cancel_flags.values() {
            flag.store(true, Ordering::Relaxed);
        }
        self.persist();
        AppEvent::Exit
    }

    fn view(&mut self) -> &mut DataTableState {
        let id = self.tabs.active().id;
        self.views.entry(id).or_default()
    }

    fn start_editing(&mut self, target: EditTarget) {
        let tab = self.tabs.active();
        let initial = match target {
            EditTarget::Endpoint => tab.endpoint.clone(),
            EditTarget::Limit => tab.cursor.limit.to_string(),
            EditTarget::Offset => tab.cursor.offset.to_string(),
            EditTarget::LimitParam => tab.cursor.param_names.limit.clone(),
            EditTarget::OffsetParam => tab.cursor.param_names.offset.clone(),
            EditTarget::Title => tab.title.clone(),
            EditTarget::Username | EditTarget::Password => String::new(),
        };
        self.input = if target == EditTarget::Password {
            TextInput::new().with_mask()
        } else {
            TextInput::new()
        };
        self.input.set_value(&initial);
        self.input.set_focused(true);
        self.input_mode = InputMode::Editing(target);
    }

    fn stop_editing(&mut self) {
        self.input.set_focused(false);
        self.input.clear();
        self.input_mode = InputMode::Normal;
    }

    fn apply_edit(&mut self, target: EditTarget, value: String) {
        let value = value.trim().to_string();
        let tab = self.tabs.active_mut();
        match target {
            EditTarget::Endpoint => tab.update(TableEvent::EndpointChanged(value)),
            EditTarget::Limit => match value.parse::<u64>() {
                Ok(limit) if limit > 0 => tab.update(TableEvent::LimitChanged(limit)),
                _ => {
                    self.message = Some("Limit must be a whole number of at least 1".to_string());
                    return;
                }
            },
            EditTarget::Offset => match value.parse::<u64>() {
                Ok(offset) => tab.update(TableEvent::OffsetChanged(offset)),
                Err(_) => {
                    self.message = Some("Offset must be a whole number".to_string());
                    return;
                }
            },
            EditTarget::LimitParam | EditTarget::OffsetParam => {
                let mut names: ParamNames = tab.cursor.param_names.clone();
                if target == EditTarget::LimitParam {
                    names.limit = value;
                } else {
                    names.offset = value;
                }
                if names.limit.is_empty() || names.offset.is_empty() || names.limit == names.offset
                {
                    self.message =
                        Some("Parameter names must be non-empty and different".to_string());
                    return;
                }
                tab.update(TableEvent::ParamNamesChanged(names));
            }
            EditTarget::Title => {
                if !value.is_empty() {
                    tab.update(TableEvent::Renamed(value));
                }
            }
            EditTarget::Username => {
                if value.is_empty() {
                    return;
                }
                self.pending_username = Some(value);
                self.start_editing(EditTarget::Password);
                return;
            }
            EditTarget::Password => {
                if let Some(username) = self.pending_username.take() {
                    self.start_login(Credentials {
                        username,
                        password: value,
                    });
                }
                return;
            }
        }
        self.persist();
    }

    fn start_load(&mut self, mode: LoadMode) {
        let token = self.token.clone();
        let tab = self.tabs.active_mut();
        let request = match tab.begin_load(mode, token.as_deref()) {
            Ok(request) => request,
            Err(e) => {
                self.message = Some(e.user_message());
                return;
            }
        };
        tab.update(TableEvent::LoadStarted(mode));
        let tab_id = tab.id;
        self.message = None;

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flags.insert(tab_id, Arc::clone(&cancel));
        let fetcher = self.fetcher.clone();
        let events = self.events.clone();
        thread::spawn(move || {
            let result = Paginator::new(fetcher)
                .with_cancel_flag(cancel)
                .run(&request);
            // The receiver is gone when the app is shutting down
            let _ = events.send(AppEvent::LoadFinished { tab_id, result });
        });
    }

    fn finish_load(&mut self, tab_id: u64, result: Result<LoadOutcome, LoadError>) {
        self.cancel_flags.remove(&tab_id);
        let Some(tab) = self.tabs.get_mut(tab_id) else {
            // Tab was closed while loading
            return;
        };
        if !tab.is_loading() {
            warn!(tab = tab_id, "dropping result for a tab that is not loading");
            return;
        }
        match result {
            Ok(outcome) => {
                let rows = outcome.rows.len();
                let pages = outcome.pages_fetched;
                tab.update(TableEvent::LoadSucceeded(outcome));
                self.message = Some(format!(
                    "Loaded {} rows from {} page{}",
                    rows,
                    pages,
                    if pages == 1 { "" } else { "s" }
                ));
                self.persist();
            }
            Err(e) => {
                if matches!(e, LoadError::Cancelled) {
                    self.message = Some(e.user_message());
                }
                tab.update(TableEvent::LoadFailed(e));
            }
        }
    }

    fn cancel_load(&mut self) {
        let id = self.tabs.active().id;
        if let Some(flag) = self.cancel_flags.get(&id) {
            flag.store(true, Ordering::Relaxed);
            self.message = Some("Stopping after the current page".to_string());
        }
    }

    fn close_active_tab(&mut self) {
        let id = self.tabs.active().id;
        if self.tabs.close_tab(id) {
            if let Some(flag) = self.cancel_flags.remove(&id) {
                flag.store(true, Ordering::Relaxed);
            }
            self.views.remove(&id);
            self.persist();
        }
    }

    fn selected_column(&mut self) -> Option<(usize, String)> {
        let index = self.view().selected_column;
        self.tabs
            .active()
            .visible_columns()
            .get(index)
            .map(|c| (index, c.to_string()))
    }

    fn hide_selected_column(&mut self) {
        if let Some((_, column)) = self.selected_column() {
            self.tabs.active_mut().update(TableEvent::VisibilityChanged {
                column,
                visible: false,
            });
            self.persist();
        }
    }

    fn sort_by_selected_column(&mut self) {
        if let Some((_, column)) = self.selected_column() {
            self.tabs
                .active_mut()
                .update(TableEvent::SortRequested(column));
        }
    }

    fn move_selected_column(&mut self, right: bool) {
        let Some((from, _)) = self.selected_column() else {
            return;
        };
        let count = self.tabs.active().visible_columns().len();
        let to = if right {
            from + 1
        } else {
            match from.checked_sub(1) {
                Some(to) => to,
                None => return,
            }
        };
        if to >= count {
            return;
        }
        self.tabs
            .active_mut()
            .update(TableEvent::ColumnMoved { from, to });
        self.view().selected_column = to;
        self.persist();
    }

    fn export(&mut self) {
        let tab = self.tabs.active();
        let path = self
            .export_dir
            .join(export_file_name(&tab.title, Local::now().date_naive()));
        self.message = Some(match write_csv(tab, &path) {
            Ok(()) => format!("Exported {} rows to {}", tab.rows.len(), path.display()),
            Err(e) => e.to_string(),
        });
    }

    fn begin_login(&mut self) {
        if self.auth_url.is_none() {
            self.message =
                Some("No auth URL configured. Set http.auth_url or pass --auth-url".to_string());
            return;
        }
        self.start_editing(EditTarget::Username);
    }

    fn start_login(&mut self, credentials: Credentials) {
        let Some(auth_url) = self.auth_url.clone() else {
            self.message = Some("No auth URL configured".to_string());
            return;
        };
        self.message = Some(format!("Logging in as {}...", credentials.username));
        let fetcher = self.fetcher.clone();
        let events = self.events.clone();
        thread::spawn(move || {
            let result = login(fetcher.agent(), &auth_url, &credentials);
            let _ = events.send(AppEvent::LoginFinished(result));
        });
    }

    fn finish_login(&mut self, result: Result<String, AuthError>) {
        match result {
            Ok(token) => {
                info!("logged in");
                self.token = Some(token);
                self.message = Some("Logged in".to_string());
                if let Some(mode) = self.pending_load.take() {
                    self.start_load(mode);
                }
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.pending_load = None;
                self.message = Some(e.user_message());
            }
        }
    }

    fn persist(&self) {
        if let Some(port) = &self.state_port {
            if let Err(e) = port.save(&self.tabs.snapshot()) {
                warn!(error = %e, "could not save tabs");
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn status_line(&self) -> Line<'_> {
        let tab = self.tabs.active();
        let mut spans = Vec::new();
        match &tab.status {
            LoadStatus::LoadingPage => spans.push(Span::from("Loading page...").fg(Color::Yellow)),
            LoadStatus::LoadingAll => {
                spans.push(Span::from("Loading all pages (x to stop)...").fg(Color::Yellow))
            }
            LoadStatus::Error(msg) => spans.push(Span::from(msg.clone()).fg(Color::Red)),
            LoadStatus::Idle => {
                if let Some(msg) = &self.message {
                    spans.push(Span::from(msg.clone()));
                }
            }
        }
        let hidden = tab.hidden_columns();
        if !hidden.is_empty() {
            spans.push(Span::from(format!("  Hidden: {}", hidden.join(", "))).fg(Color::DarkGray));
        }
        if self.token.is_some() {
            spans.push(Span::from("  [auth]").fg(Color::Green));
        }
        Line::from(spans)
    }

    fn request_line(&self) -> Line<'_> {
        let tab = self.tabs.active();
        if tab.endpoint.trim().is_empty() {
            return Line::from(Span::from("No endpoint (u to set)").fg(Color::DarkGray));
        }
        Line::from(vec![
            Span::from("GET ").bold(),
            Span::from(page_url(tab.endpoint.trim(), &tab.cursor, tab.cursor.offset)),
        ])
    }

    fn render_meta(&self, area: Rect, buf: &mut Buffer) {
        let tab = self.tabs.active();
        let loaded = [
            ("Loaded rows", tab.rows.len().to_string()),
            ("Next offset", tab.cursor.offset.to_string()),
        ];
        let lines: Vec<Line> = loaded
            .into_iter()
            .map(|(key, value)| {
                Line::from(vec![
                    Span::from(format!("{key}: ")).fg(Color::Yellow),
                    Span::from(value),
                ])
            })
            .chain(tab.meta.iter().map(|(key, value)| {
                Line::from(vec![
                    Span::from(format!("{key}: ")).fg(Color::Cyan),
                    Span::from(cell_text(Some(value))),
                ])
            }))
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::LEFT).title(" Meta "))
            .render(area, buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // tabs
                Constraint::Length(1), // request / input
                Constraint::Fill(1),   // table
                Constraint::Length(1), // status
                Constraint::Length(1), // controls
            ])
            .split(area);

        let titles: Vec<String> = self
            .tabs
            .iter()
            .map(|t| {
                if t.is_loading() {
                    format!("{}*", t.title)
                } else {
                    t.title.clone()
                }
            })
            .collect();
        Tabs::new(titles)
            .select(self.tabs.active_index())
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .render(layout[0], buf);

        match self.input_mode {
            InputMode::Editing(target) => {
                let label = format!("{}: ", target.label());
                let chunks = Layout::horizontal([
                    Constraint::Length(label.chars().count() as u16),
                    Constraint::Fill(1),
                ])
                .split(layout[1]);
                Paragraph::new(label).bold().render(chunks[0], buf);
                (&self.input).render(chunks[1], buf);
            }
            InputMode::Normal => Paragraph::new(self.request_line()).render(layout[1], buf),
        }

        let mut table_area = layout[2];
        if self.show_meta && !self.tabs.active().rows.is_empty() {
            let chunks = Layout::horizontal([Constraint::Fill(1), Constraint::Length(36)])
                .split(layout[2]);
            table_area = chunks[0];
            self.render_meta(chunks[1], buf);
        }
        let id = self.tabs.active().id;
        let view = self.views.entry(id).or_default();
        DataTable::new(self.tabs.active())
            .with_max_column_width(self.max_column_width)
            .render(table_area, buf, view);

        Paragraph::new(self.status_line()).render(layout[3], buf);

        let editing = matches!(self.input_mode, InputMode::Editing(_));
        let controls = if editing {
            Controls::new(&EDIT_CONTROLS)
        } else {
            Controls::new(&TABLE_CONTROLS).with_row_count(self.tabs.active().rows.len())
        };
        controls.with_dimmed(self.tabs.active().is_loading()).render(layout[4], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginator::PaginationCursor;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn options() -> RunOptions {
        RunOptions {
            cursor: PaginationCursor::with_limit(10),
            timeout: Duration::from_millis(200),
            ..RunOptions::default()
        }
    }

    fn key(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn special(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.event(key(c));
        }
    }

    #[test]
    fn edit_endpoint_resets_offset() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        app.tabs.active_mut().cursor.offset = 30;
        app.event(key('u'));
        assert_eq!(app.input_mode, InputMode::Editing(EditTarget::Endpoint));
        type_text(&mut app, "http://h/x");
        app.event(special(KeyCode::Enter));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.tabs.active().endpoint, "http://h/x");
        assert_eq!(app.tabs.active().cursor.offset, 0);
    }

    #[test]
    fn invalid_limit_is_rejected() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        app.event(key('p'));
        app.event(special(KeyCode::Backspace));
        app.event(special(KeyCode::Backspace));
        app.event(key('0'));
        app.event(special(KeyCode::Enter));
        assert_eq!(app.tabs.active().cursor.limit, 10);
        assert!(app.message().is_some());
    }

    #[test]
    fn load_without_endpoint_is_rejected() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        app.event(key('l'));
        assert_eq!(app.tabs.active().status, LoadStatus::Idle);
        assert_eq!(app.message(), Some("Enter an endpoint URL first."));
    }

    #[test]
    fn tabs_open_and_close() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        app.event(key('t'));
        assert_eq!(app.tabs.len(), 2);
        assert_eq!(app.tabs.active().title, "Tab 2");
        app.event(key('w'));
        app.event(key('w'));
        assert_eq!(app.tabs.len(), 1);
    }

    #[test]
    fn finished_load_for_closed_tab_is_dropped() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        let result = app.event(AppEvent::LoadFinished {
            tab_id: 99,
            result: Err(LoadError::Cancelled),
        });
        assert!(result.is_none());
        assert_eq!(app.tabs.len(), 1);
    }

    fn late_outcome() -> LoadOutcome {
        let rows = vec![serde_json::json!({"id": 1})];
        LoadOutcome {
            mode: LoadMode::Single,
            flat_rows: crate::flatten::flatten_rows(&rows).unwrap(),
            rows,
            meta: serde_json::Map::new(),
            next_offset: 10,
            pages_fetched: 1,
        }
    }

    #[test]
    fn late_result_of_closed_tab_does_not_reach_new_tab() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        app.event(key('t'));
        let loading_id = app.tabs.active().id;
        app.event(key('u'));
        type_text(&mut app, "http://127.0.0.1:9/old");
        app.event(special(KeyCode::Enter));
        app.event(key('l'));
        assert!(app.tabs.active().is_loading());

        app.event(key('w'));
        app.event(key('t'));
        let fresh_id = app.tabs.active().id;
        assert_ne!(fresh_id, loading_id);

        app.event(AppEvent::LoadFinished {
            tab_id: loading_id,
            result: Ok(late_outcome()),
        });
        app.event(AppEvent::LoadFinished {
            tab_id: loading_id,
            result: Err(LoadError::HttpStatus {
                status: 500,
                url: "http://127.0.0.1:9/old".to_string(),
            }),
        });

        let fresh = app.tabs.active();
        assert_eq!(fresh.id, fresh_id);
        assert!(fresh.rows.is_empty());
        assert_eq!(fresh.cursor.offset, 0);
        assert_eq!(fresh.endpoint, "");
        assert_eq!(fresh.status, LoadStatus::Idle);
    }

    #[test]
    fn result_for_idle_tab_is_dropped() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        let id = app.tabs.active().id;
        app.event(AppEvent::LoadFinished {
            tab_id: id,
            result: Ok(late_outcome()),
        });
        assert!(app.tabs.active().rows.is_empty());
        assert_eq!(app.tabs.active().status, LoadStatus::Idle);
    }

    #[test]
    fn sort_key_toggles_selected_column() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        let tab = app.tabs.active_mut();
        tab.update(TableEvent::LoadStarted(LoadMode::Single));
        let id = tab.id;
        app.event(AppEvent::LoadFinished {
            tab_id: id,
            result: Ok(late_outcome()),
        });
        assert_eq!(app.tabs.active().rows.len(), 1);

        app.event(key('s'));
        let sort = app.tabs.active().sort.clone().unwrap();
        assert_eq!(sort.column, "id");
        assert!(sort.ascending);
        app.event(key('s'));
        assert!(!app.tabs.active().sort.as_ref().unwrap().ascending);
        app.event(key('S'));
        assert!(app.tabs.active().sort.is_none());
    }

    #[test]
    fn meta_panel_shows_loaded_rows_and_offset() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        let tab = app.tabs.active_mut();
        tab.update(TableEvent::LoadStarted(LoadMode::Single));
        let id = tab.id;
        let mut outcome = late_outcome();
        outcome
            .meta
            .insert("total".to_string(), serde_json::json!(42));
        app.event(AppEvent::LoadFinished {
            tab_id: id,
            result: Ok(outcome),
        });

        let area = Rect::new(0, 0, 100, 10);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect();
        assert!(text.contains("Loaded rows: 1"));
        assert!(text.contains("Next offset: 10"));
        assert!(text.contains("total: 42"));
    }

    #[test]
    fn quit_emits_exit() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        assert!(matches!(app.event(key('q')), Some(AppEvent::Exit)));
    }

    #[test]
    fn login_requires_auth_url() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        app.event(key('a'));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.is_logged_in());
        app.event(AppEvent::LoginFinished(Ok("tok".to_string())));
        assert!(app.is_logged_in());
        app.event(key('A'));
        assert!(!app.is_logged_in());
    }

    #[test]
    fn url_option_fills_first_tab() {
        let (tx, _rx) = channel();
        let opts = RunOptions {
            url: Some("http://h/items".to_string()),
            offset: Some(20),
            ..options()
        };
        let app = App::new(tx, &opts, None);
        assert_eq!(app.tabs.len(), 1);
        assert_eq!(app.tabs.active().endpoint, "http://h/items");
        assert_eq!(app.tabs.active().cursor.offset, 20);
    }

    #[test]
    fn renders_without_data() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx, &options(), None);
        let area = Rect::new(0, 0, 100, 10);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let text: String = (0..area.width).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(text.contains("Tab 1"));
    }
}
