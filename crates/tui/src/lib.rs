use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};
use ratatui::{Frame, Terminal};
use thiserror::Error;
use tracing::{info, warn};
use veranda_core::catalog::{Catalog, CatalogFilter};
use veranda_core::object_script::ObjectTarget;
use veranda_core::query_service::QueryService;
use veranda_core::result_views::{GridView, RenderedView};
use veranda_core::session::{OpenedObject, QuerySession};
use veranda_core::settings::Settings;
use veranda_core::tab_numbers::TabNumbers;

const POLL_RATE: Duration = Duration::from_millis(120);
const SIDEBAR_WIDTH_PERCENT: u16 = 30;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Search,
    Sidebar,
    Editor,
    Results,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Self::Search => Self::Sidebar,
            Self::Sidebar => Self::Editor,
            Self::Editor => Self::Results,
            Self::Results => Self::Search,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Search => "Search",
            Self::Sidebar => "Objects",
            Self::Editor => "Editor",
            Self::Results => "Results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    NextPane,
    RunQuery,
    NewTab,
    CloseTab,
    CycleView,
    RefreshCatalog,
    Submit,
    Navigate(DirectionKey),
    Input(char),
    Backspace,
}

/// One line of the object sidebar: a category title or one of its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SidebarRow {
    Category(usize),
    Item { category: usize, item: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditorTab {
    number: usize,
    text: String,
}

impl EditorTab {
    fn title(&self) -> String {
        format!("Query {}", self.number)
    }
}

#[derive(Debug)]
struct TuiApp<S: QueryService> {
    session: QuerySession<S>,
    filter: CatalogFilter,
    visible: Catalog,
    sidebar_rows: Vec<SidebarRow>,
    selected_row: usize,
    search: String,
    tabs: Vec<EditorTab>,
    active_tab: usize,
    tab_numbers: TabNumbers,
    pane: Pane,
    results_scroll: usize,
    should_quit: bool,
    status_line: String,
}

impl<S: QueryService> TuiApp<S> {
    fn new(service: S, settings: &Settings) -> Self {
        let session = QuerySession::new(
            service,
            settings.service.clone(),
            settings.views.clone(),
        );
        let mut app = Self {
            session,
            filter: CatalogFilter::new(Catalog::default()),
            visible: Catalog::default(),
            sidebar_rows: Vec::new(),
            selected_row: 0,
            search: String::new(),
            tabs: Vec::new(),
            active_tab: 0,
            tab_numbers: TabNumbers::new(),
            pane: Pane::Search,
            results_scroll: 0,
            should_quit: false,
            status_line: String::new(),
        };
        app.open_tab(String::new());
        app.refresh_catalog();
        app
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::NextPane => {
                self.pane = self.pane.next();
                self.status_line = format!("Focus: {}", self.pane.name());
            }
            Msg::RunQuery => self.run_active_tab(),
            Msg::NewTab => {
                self.open_tab(String::new());
                self.pane = Pane::Editor;
                self.status_line = format!("Opened {}", self.active_title());
            }
            Msg::CloseTab => self.close_active_tab(),
            Msg::CycleView => {
                let kind = self.session.views_mut().next_view().kind();
                self.results_scroll = 0;
                self.status_line = format!("View: {}", kind.label());
            }
            Msg::RefreshCatalog => self.refresh_catalog(),
            Msg::Submit => self.submit(),
            Msg::Navigate(direction) => self.navigate(direction),
            Msg::Input(character) => self.input(character),
            Msg::Backspace => self.backspace(),
        }
    }

    fn refresh_catalog(&mut self) {
        match self.session.load_catalog() {
            Ok(catalog) => {
                self.status_line = format!(
                    "Loaded {} objects in {} categories",
                    catalog.item_count(),
                    catalog.entries.len()
                );
                self.filter = CatalogFilter::new(catalog);
            }
            Err(error) => {
                warn!(%error, "failed to load object catalog");
                self.status_line = format!("Catalog load failed: {error}");
                self.filter = CatalogFilter::new(Catalog::default());
            }
        }
        self.apply_search();
    }

    fn apply_search(&mut self) {
        self.visible = self.filter.find(&self.search);
        self.sidebar_rows = sidebar_rows(&self.visible);
        self.selected_row = self
            .selected_row
            .min(self.sidebar_rows.len().saturating_sub(1));
    }

    fn submit(&mut self) {
        match self.pane {
            Pane::Search => {
                self.pane = Pane::Sidebar;
                self.status_line = format!("{} matching objects", self.visible.item_count());
            }
            Pane::Sidebar => self.activate_selected(),
            Pane::Editor => self.input('\n'),
            Pane::Results => {
                self.status_line = "Nothing to submit in this view".to_string();
            }
        }
    }

    fn activate_selected(&mut self) {
        let Some(row) = self.sidebar_rows.get(self.selected_row).copied() else {
            self.status_line = "No objects to open".to_string();
            return;
        };
        let (category, item) = match row {
            SidebarRow::Category(category) => (category, None),
            SidebarRow::Item { category, item } => (category, Some(item)),
        };
        let target = match ObjectTarget::from_position(&self.visible, category, item) {
            Ok(target) => target,
            Err(error) => {
                self.status_line = format!("Cannot open: {error}");
                return;
            }
        };

        info!(kind = %target.kind, name = %target.name, "opening object");
        match self.session.open_object(&target) {
            Ok(OpenedObject::TablePreview { sql, outcome }) => {
                self.open_tab(sql);
                self.results_scroll = 0;
                self.pane = Pane::Results;
                self.status_line = format!(
                    "{}: {} rows, {} columns in {} ms",
                    target.name,
                    outcome.rows,
                    outcome.columns,
                    outcome.elapsed.as_millis()
                );
            }
            Ok(OpenedObject::Definition { text }) => {
                self.open_tab(text);
                self.pane = Pane::Editor;
                self.status_line = format!("Editing {} `{}`", target.kind, target.name);
            }
            Err(error) => self.status_line = format!("Open failed: {error}"),
        }
    }

    fn run_active_tab(&mut self) {
        let command = self
            .tabs
            .get(self.active_tab)
            .map(|tab| tab.text.trim().to_string())
            .unwrap_or_default();
        if command.is_empty() {
            self.status_line = "Nothing to run".to_string();
            return;
        }

        match self.session.run(&command) {
            Ok(outcome) => {
                self.results_scroll = 0;
                let views = self.session.views();
                self.status_line = format!(
                    "{} rows, {} columns in {} ms | dumps {}/{}, {} dropped",
                    outcome.rows,
                    outcome.columns,
                    outcome.elapsed.as_millis(),
                    views.dump_count(),
                    views.dump_capacity(),
                    views.dumps_evicted()
                );
            }
            Err(error) => self.status_line = format!("Query failed: {error}"),
        }
    }

    fn open_tab(&mut self, text: String) {
        let number = self.tab_numbers.allocate();
        self.tabs.push(EditorTab { number, text });
        self.active_tab = self.tabs.len() - 1;
    }

    fn close_active_tab(&mut self) {
        if self.active_tab >= self.tabs.len() {
            return;
        }
        let closed = self.tabs.remove(self.active_tab);
        self.tab_numbers.release(closed.number);
        if self.tabs.is_empty() {
            self.open_tab(String::new());
        }
        self.active_tab = self.active_tab.min(self.tabs.len() - 1);
        self.status_line = format!("Closed {}", closed.title());
    }

    fn active_title(&self) -> String {
        self.tabs
            .get(self.active_tab)
            .map(EditorTab::title)
            .unwrap_or_default()
    }

    fn navigate(&mut self, direction: DirectionKey) {
        match self.pane {
            Pane::Sidebar | Pane::Search => {
                if self.sidebar_rows.is_empty() {
                    self.status_line = "No matching objects".to_string();
                    return;
                }
                self.selected_row = step(self.selected_row, direction, self.sidebar_rows.len());
            }
            Pane::Results => {
                let rows = self.result_line_count();
                self.results_scroll = step(self.results_scroll, direction, rows.max(1));
            }
            Pane::Editor => {
                if self.tabs.is_empty() {
                    return;
                }
                self.active_tab = match direction {
                    DirectionKey::Up => self.active_tab.checked_sub(1).unwrap_or(self.tabs.len() - 1),
                    DirectionKey::Down => (self.active_tab + 1) % self.tabs.len(),
                };
                self.status_line = format!("Editing {}", self.active_title());
            }
        }
    }

    fn result_line_count(&self) -> usize {
        match self.session.views().current_view() {
            RenderedView::Grid(grid) => grid.rows.len(),
            RenderedView::Text(text) => text.text.lines().count(),
            RenderedView::RawDump(dump) => dump.text.lines().count(),
        }
    }

    fn input(&mut self, character: char) {
        match self.pane {
            Pane::Search => {
                self.search.push(character);
                self.apply_search();
            }
            Pane::Editor => {
                if let Some(tab) = self.tabs.get_mut(self.active_tab) {
                    tab.text.push(character);
                }
            }
            Pane::Sidebar | Pane::Results => {
                self.status_line = format!("{} is read-only", self.pane.name());
            }
        }
    }

    fn backspace(&mut self) {
        match self.pane {
            Pane::Search => {
                if self.search.pop().is_some() {
                    self.apply_search();
                }
            }
            Pane::Editor => {
                if let Some(tab) = self.tabs.get_mut(self.active_tab) {
                    tab.text.pop();
                }
            }
            Pane::Sidebar | Pane::Results => {}
        }
    }
}

fn sidebar_rows(catalog: &Catalog) -> Vec<SidebarRow> {
    let mut rows = Vec::with_capacity(catalog.entries.len() + catalog.item_count());
    for (category, entry) in catalog.entries.iter().enumerate() {
        rows.push(SidebarRow::Category(category));
        rows.extend((0..entry.items.len()).map(|item| SidebarRow::Item { category, item }));
    }
    rows
}

fn step(current: usize, direction: DirectionKey, len: usize) -> usize {
    match direction {
        DirectionKey::Up => current.saturating_sub(1),
        DirectionKey::Down => (current + 1).min(len.saturating_sub(1)),
    }
}

#[must_use]
pub fn ui_name() -> &'static str {
    "veranda-tui"
}

pub fn run<S: QueryService>(service: S, settings: &Settings) -> Result<(), TuiError> {
    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, TuiApp::new(service, settings));
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<S: QueryService>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: TuiApp<S>,
) -> Result<(), TuiError> {
    loop {
        terminal.draw(|frame| render(frame, &app))?;

        if event::poll(POLL_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key) {
                        app.handle(message);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render<S: QueryService>(frame: &mut Frame<'_>, app: &TuiApp<S>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(SIDEBAR_WIDTH_PERCENT),
            Constraint::Percentage(100 - SIDEBAR_WIDTH_PERCENT),
        ])
        .split(frame.area());
    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(columns[0]);
    let workspace = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(columns[1]);

    let search = Paragraph::new(app.search.as_str()).block(pane_block(app, Pane::Search, "Search"));
    frame.render_widget(search, sidebar[0]);
    render_sidebar(frame, app, sidebar[1]);
    render_editor(frame, app, workspace[0]);
    render_results(frame, app, workspace[1]);

    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.pane.name()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(app.status_line.as_str()),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Tab focus | Ctrl+R run | Ctrl+N/W tabs | Ctrl+O view | F5 reload | Esc quit"),
    );
    frame.render_widget(status, workspace[2]);
}

fn pane_block<S: QueryService>(app: &TuiApp<S>, pane: Pane, title: impl Into<String>) -> Block<'static> {
    let style = if app.pane == pane {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title.into())
}

fn render_sidebar<S: QueryService>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let visible_limit = usize::from(area.height.saturating_sub(2)).max(1);
    let window_start = app.selected_row.saturating_sub(visible_limit.saturating_sub(1));

    let lines = app
        .sidebar_rows
        .iter()
        .enumerate()
        .skip(window_start)
        .take(visible_limit)
        .map(|(index, row)| {
            let marker = if index == app.selected_row { ">" } else { " " };
            match *row {
                SidebarRow::Category(category) => Line::from(Span::styled(
                    format!("{marker} {}", app.visible.entries[category].category),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                SidebarRow::Item { category, item } => Line::from(format!(
                    "{marker}   {}",
                    app.visible.entries[category].items[item]
                )),
            }
        })
        .collect::<Vec<_>>();

    let sidebar = Paragraph::new(lines).block(pane_block(app, Pane::Sidebar, "Objects"));
    frame.render_widget(sidebar, area);
}

fn render_editor<S: QueryService>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let title = app
        .tabs
        .iter()
        .enumerate()
        .map(|(index, tab)| {
            if index == app.active_tab {
                format!("[{}]", tab.title())
            } else {
                tab.title()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let text = app
        .tabs
        .get(app.active_tab)
        .map(|tab| tab.text.as_str())
        .unwrap_or_default();

    let editor = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(pane_block(app, Pane::Editor, title));
    frame.render_widget(editor, area);
}

fn render_results<S: QueryService>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let views = app.session.views();
    let title = format!("Results ({})", views.current_kind().label());
    let block = pane_block(app, Pane::Results, title);
    let scroll = u16::try_from(app.results_scroll).unwrap_or(u16::MAX);

    match views.current_view() {
        RenderedView::Grid(grid) => {
            let table = grid_table(grid, views.settings().max_col_width, app.results_scroll);
            frame.render_widget(table.block(block), area);
        }
        RenderedView::Text(text) => {
            let paragraph = Paragraph::new(text.text.as_str())
                .scroll((scroll, 0))
                .block(block);
            frame.render_widget(paragraph, area);
        }
        RenderedView::RawDump(dump) => {
            let paragraph = Paragraph::new(dump.text.as_str())
                .scroll((scroll, 0))
                .block(block);
            frame.render_widget(paragraph, area);
        }
    }
}

fn grid_table(grid: &GridView, max_col_width: usize, skip: usize) -> Table<'_> {
    let widths = grid
        .titles
        .iter()
        .enumerate()
        .map(|(column, title)| {
            let widest = grid
                .rows
                .iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(title.chars().count()))
                .max()
                .unwrap_or_default()
                .min(max_col_width.max(1));
            Constraint::Length(u16::try_from(widest).unwrap_or(u16::MAX))
        })
        .collect::<Vec<_>>();

    let header = Row::new(grid.titles.iter().map(String::as_str))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = grid
        .rows
        .iter()
        .skip(skip)
        .map(|row| Row::new(row.iter().map(String::as_str)));

    Table::new(rows, widths).header(header)
}

fn map_key_event(key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) | (KeyModifiers::CONTROL, KeyCode::Char('q')) => Some(Msg::Quit),
        (KeyModifiers::CONTROL, KeyCode::Char('r')) => Some(Msg::RunQuery),
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(Msg::NewTab),
        (KeyModifiers::CONTROL, KeyCode::Char('w')) => Some(Msg::CloseTab),
        (KeyModifiers::CONTROL, KeyCode::Char('o')) => Some(Msg::CycleView),
        (_, KeyCode::F(5)) => Some(Msg::RefreshCatalog),
        (_, KeyCode::Tab) => Some(Msg::NextPane),
        (_, KeyCode::Enter) => Some(Msg::Submit),
        (_, KeyCode::Backspace) => Some(Msg::Backspace),
        (_, KeyCode::Up) => Some(Msg::Navigate(DirectionKey::Up)),
        (_, KeyCode::Down) => Some(Msg::Navigate(DirectionKey::Down)),
        (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(character)) => {
            Some(Msg::Input(character))
        }
        _ => None,
    }
}
