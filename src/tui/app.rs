#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};

use crate::api::TaskClient;
use crate::config::Config;
use crate::store::{StoreState, TaskStore};
use crate::task::model::{TaskRequest, validate_title};
use crate::tui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    NewTask,
}

#[derive(Debug, Clone)]
struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    fn new() -> Self {
        Self {
            text: String::new(),
            cursor: 0,
        }
    }

    fn as_str(&self) -> &str {
        &self.text
    }

    fn insert_char(&mut self, c: char) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        chars.insert(cur, c);
        self.text = chars.into_iter().collect();
        self.cursor = cur + 1;
    }

    fn backspace(&mut self) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur == 0 {
            return;
        }
        chars.remove(cur - 1);
        self.text = chars.into_iter().collect();
        self.cursor = cur - 1;
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        let len = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(len);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Title,
    Description,
}

#[derive(Debug, Clone)]
struct NewTaskForm {
    title: TextInput,
    description: TextInput,
    field: FormField,
    error: Option<String>,
}

impl NewTaskForm {
    fn new() -> Self {
        Self {
            title: TextInput::new(),
            description: TextInput::new(),
            field: FormField::Title,
            error: None,
        }
    }

    fn active_input_mut(&mut self) -> &mut TextInput {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Description => &mut self.description,
        }
    }
}

struct AppState {
    cfg: Config,
    store: Arc<TaskStore<TaskClient>>,
    snapshot: StoreState,
    table_state: TableState,
    mode: Mode,
    form: NewTaskForm,
    success_deadline: Option<Instant>,
    should_quit: bool,
}

impl AppState {
    fn new(cfg: Config, store: Arc<TaskStore<TaskClient>>) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            cfg,
            store,
            snapshot: StoreState::default(),
            table_state,
            mode: Mode::Normal,
            form: NewTaskForm::new(),
            success_deadline: None,
            should_quit: false,
        }
    }

    fn selected_index(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        if self.snapshot.tasks.is_empty() {
            self.table_state.select(Some(0));
            return;
        }
        let idx = self.selected_index().min(self.snapshot.tasks.len() - 1);
        self.table_state.select(Some(idx));
    }

    fn move_selection(&mut self, delta: i64) {
        if self.snapshot.tasks.is_empty() {
            return;
        }
        let cur = i64::try_from(self.selected_index()).unwrap_or(0);
        let max = i64::try_from(self.snapshot.tasks.len().saturating_sub(1)).unwrap_or(0);
        let next = (cur + delta).clamp(0, max);
        self.table_state.select(Some(usize::try_from(next).unwrap_or(0)));
    }

    fn dispatch_fetch(&self) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let _ = store.fetch().await;
        });
    }

    // Create-then-refetch: the store never inserts locally, so a successful
    // create is followed by a fresh fetch to pick up the server row.
    fn dispatch_create(&self, request: TaskRequest) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if store.create(request).await.is_ok() {
                let _ = store.fetch().await;
            }
        });
    }

    fn dispatch_complete(&self, id: i64) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if store.complete(id).await.is_ok() {
                let _ = store.fetch().await;
            }
        });
    }

    fn dispatch_clear_error(&self) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            store.clear_error().await;
        });
    }

    fn dispatch_clear_success(&self) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            store.clear_success_message().await;
        });
    }
}

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let client = TaskClient::from_config(&cfg)?;
    let store = Arc::new(TaskStore::new(client));

    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);

    let mut app = AppState::new(cfg, store);
    app.dispatch_fetch();

    loop {
        app.snapshot = app.store.snapshot().await;
        app.clamp_selection();
        expire_success_message(&mut app);

        {
            let Some(terminal) = guard.terminal.as_mut() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            handle_key(key, &mut app);
        }
    }

    Ok(())
}

/// Success messages auto-dismiss after a fixed duration; error banners stay
/// until dismissed by hand.
fn expire_success_message(app: &mut AppState) {
    let has_message = app.snapshot.success_message.is_some();
    match (has_message, app.success_deadline) {
        (true, None) => {
            let secs = app.cfg.ui.success_message_secs;
            app.success_deadline = Some(Instant::now() + Duration::from_secs(secs));
        }
        (true, Some(deadline)) => {
            if Instant::now() >= deadline {
                app.dispatch_clear_success();
                app.success_deadline = None;
            }
        }
        (false, Some(_)) => app.success_deadline = None,
        (false, None) => {}
    }
}

fn handle_key(key: KeyEvent, app: &mut AppState) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.mode {
        Mode::Normal => handle_key_normal(key, app),
        Mode::NewTask => handle_key_form(key, app),
    }
}

fn handle_key_normal(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('r') => app.dispatch_fetch(),
        KeyCode::Char('a') => {
            app.form = NewTaskForm::new();
            app.mode = Mode::NewTask;
        }
        KeyCode::Char('e') | KeyCode::Esc => {
            if app.snapshot.error.is_some() {
                app.dispatch_clear_error();
            }
        }
        KeyCode::Enter | KeyCode::Char('c') => {
            if let Some(task) = app.snapshot.tasks.get(app.selected_index()) {
                app.dispatch_complete(task.id);
            }
        }
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        _ => {}
    }
}

fn handle_key_form(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Tab | KeyCode::BackTab => {
            app.form.field = match app.form.field {
                FormField::Title => FormField::Description,
                FormField::Description => FormField::Title,
            };
        }
        KeyCode::Enter => submit_form(app),
        KeyCode::Backspace => {
            app.form.active_input_mut().backspace();
            app.form.error = None;
        }
        KeyCode::Left => app.form.active_input_mut().move_left(),
        KeyCode::Right => app.form.active_input_mut().move_right(),
        KeyCode::Char(c) => {
            app.form.active_input_mut().insert_char(c);
            app.form.error = None;
        }
        _ => {}
    }
}

/// Validation failures stay inline on the form; no transport call is made.
fn submit_form(app: &mut AppState) {
    let title = app.form.title.as_str().to_owned();
    if let Err(err) = validate_title(&title) {
        app.form.error = Some(err.to_string());
        return;
    }
    let description = Some(app.form.description.as_str().to_owned());
    match TaskRequest::new(title, description) {
        Ok(request) => {
            app.dispatch_create(request);
            app.mode = Mode::Normal;
        }
        Err(err) => app.form.error = Some(err.to_string()),
    }
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, root[0], app);
    draw_message(f, root[1], app);
    draw_tasks(f, root[2], app);
    draw_footer(f, root[3], app);

    if app.mode == Mode::NewTask {
        draw_form(f, area, app);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let count = app.snapshot.tasks.len();
    let noun = if count == 1 { "task" } else { "tasks" };
    let mut spans = vec![
        Span::styled(
            " taskdeck ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("— {count} {noun}")),
    ];
    if app.snapshot.loading {
        spans.push(Span::styled(
            "  loading…",
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_message(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    if let Some(err) = &app.snapshot.error {
        let line = Line::from(vec![
            Span::styled(
                format!(" ✖ {err}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  (e to dismiss)", Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(Paragraph::new(line), area);
        return;
    }
    if let Some(msg) = &app.snapshot.success_message {
        let line = Line::from(Span::styled(
            format!(" ✔ {msg}"),
            Style::default().fg(Color::Green),
        ));
        f.render_widget(Paragraph::new(line), area);
    }
}

fn draw_tasks(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    if app.snapshot.tasks.is_empty() {
        let text = if app.snapshot.loading {
            "Loading tasks…"
        } else {
            "No tasks yet. Press 'a' to create your first task."
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Your Tasks"));
        f.render_widget(empty, area);
        return;
    }

    let marker = if app.cfg.ui.icons { "☐ " } else { "" };
    let rows: Vec<Row<'_>> = app
        .snapshot
        .tasks
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.id.to_string()),
                Cell::from(format!("{marker}{}", t.title)),
                Cell::from(t.description.clone().unwrap_or_else(|| "-".to_owned())),
                Cell::from(format_timestamp(&t.created_at)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(40),
            Constraint::Percentage(40),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(["ID", "TITLE", "DESCRIPTION", "CREATED"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::Indexed(237))
            .add_modifier(Modifier::BOLD),
    )
    .block(Block::default().borders(Borders::ALL).title("Your Tasks"));

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let help = match app.mode {
        Mode::Normal => " a add  enter complete  r refresh  e dismiss error  q quit",
        Mode::NewTask => " tab switch field  enter submit  esc cancel",
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_form(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let popup = form_popup_rect(area);
    f.render_widget(Clear, popup);

    let block = Block::default().borders(Borders::ALL).title("New Task");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let field_style = |active: bool| {
        if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let title_active = app.form.field == FormField::Title;
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Title*: ", field_style(title_active)),
            Span::raw(app.form.title.as_str()),
        ])),
        chunks[0],
    );

    let desc_active = app.form.field == FormField::Description;
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Descr.: ", field_style(desc_active)),
            Span::raw(app.form.description.as_str()),
        ])),
        chunks[1],
    );

    if let Some(err) = &app.form.error {
        f.render_widget(
            Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)),
            chunks[2],
        );
    }

    f.render_widget(
        Paragraph::new("enter: create   esc: cancel")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );

    // Cursor on the active field; the label prefix is 8 cells wide.
    let (input, row) = if title_active {
        (&app.form.title, chunks[0])
    } else {
        (&app.form.description, chunks[1])
    };
    let x = row.x + 8 + u16::try_from(input.cursor).unwrap_or(0);
    f.set_cursor_position((x.min(row.x + row.width.saturating_sub(1)), row.y));
}

fn form_popup_rect(area: Rect) -> Rect {
    let width = area.width.saturating_sub(8).min(64).max(24);
    let height = 6;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height.min(area.height))
}

/// Shortens a server timestamp for table display ("2025-01-04T10:15:30" →
/// "2025-01-04 10:15").
fn format_timestamp(raw: &str) -> String {
    let trimmed: String = raw.chars().take(16).collect();
    if trimmed.len() == 16 {
        trimmed.replacen('T', " ", 1)
    } else {
        raw.to_owned()
    }
}

struct TerminalGuard {
    terminal: Option<ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>>,
}

impl TerminalGuard {
    fn new(
        terminal: ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    ) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = tui::restore_terminal(terminal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::new();
        for c in "tak".chars() {
            input.insert_char(c);
        }
        input.move_left();
        input.insert_char('s');
        assert_eq!(input.as_str(), "task");
        input.backspace();
        assert_eq!(input.as_str(), "tak");
    }

    #[test]
    fn timestamp_is_shortened_for_display() {
        assert_eq!(
            format_timestamp("2025-01-04T10:15:30.123"),
            "2025-01-04 10:15"
        );
        assert_eq!(format_timestamp("unknown"), "unknown");
    }
}
