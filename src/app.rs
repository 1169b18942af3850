use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::{
    cli::open_engine,
    config::Config,
    constants::TIME_SETTINGS,
    domain::DayLedger,
    engine::{TimerEngine, TimerView},
    history::HistoryIndex,
};

mod event_handlers;
mod render_views;
mod ui_helpers;
mod view_style;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UiMode {
    Today,
    History,
    ConfirmClear,
}

struct App {
    engine: TimerEngine,
    view: TimerView,
    ui_mode: UiMode,
    editing: bool,
    input: String,
    selected_index: usize,
    history_dates: Vec<String>,
    history_selected: usize,
    history_detail: Option<DayLedger>,
    suggestion_index: Option<usize>,
    status_line: String,
    render_needed: bool,
}

impl App {
    fn new(mut engine: TimerEngine) -> Self {
        let view = engine.view();
        let status_line = if engine.is_ticking() {
            format!("Resumed '{}' from the previous run", view.label)
        } else {
            String::new()
        };

        Self {
            engine,
            view,
            ui_mode: UiMode::Today,
            editing: false,
            input: String::new(),
            selected_index: 0,
            history_dates: Vec::new(),
            history_selected: 0,
            history_detail: None,
            suggestion_index: None,
            status_line,
            render_needed: true,
        }
    }

    fn refresh_view(&mut self) {
        self.view = self.engine.view();
        let len = self.view.today.tasks.len();
        if len == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
        self.render_needed = true;
    }

    /// Today's entries in the order they are displayed.
    fn today_entries(&self) -> Vec<(String, u64)> {
        self.view
            .today
            .entries_by_duration()
            .into_iter()
            .map(|(task, ms)| (task.to_string(), ms))
            .collect()
    }

    fn selected_entry(&self) -> Option<String> {
        self.today_entries()
            .get(self.selected_index)
            .map(|(task, _)| task.clone())
    }

    fn open_history(&mut self) {
        match HistoryIndex::new(self.engine.store()).list_dates() {
            Ok(dates) => self.history_dates = dates,
            Err(e) => {
                self.status_line = format!("Could not read history: {}", e);
                self.history_dates.clear();
            }
        }
        self.history_selected = 0;
        self.history_detail = None;
        self.ui_mode = UiMode::History;
        self.render_needed = true;
    }

    fn open_history_detail(&mut self) {
        if let Some(date) = self.history_dates.get(self.history_selected) {
            let day = HistoryIndex::new(self.engine.store()).get_day(date);
            self.history_detail = Some(day);
            self.render_needed = true;
        }
    }

    fn close_history(&mut self) {
        if self.history_detail.take().is_none() {
            self.ui_mode = UiMode::Today;
        }
        self.render_needed = true;
    }

    /// Fills the input with the next previously used task name.
    fn cycle_suggestion(&mut self, direction: isize) {
        let names = self.engine.overall().task_names();
        if names.is_empty() {
            return;
        }

        let next = match self.suggestion_index {
            None if direction < 0 => names.len() - 1,
            None => 0,
            Some(current) if direction < 0 => ui_helpers::wrap_prev_index(current, names.len()),
            Some(current) => ui_helpers::wrap_next_index(current, names.len()),
        };
        self.suggestion_index = Some(next);
        self.input = names[next].clone();
        self.render_needed = true;
    }
}

pub fn run_ui(config: &Config) -> Result<(), io::Error> {
    let engine = open_engine(config).map_err(io::Error::other)?;
    let mut app = App::new(engine);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!(state = %app.engine.state(), "ui closed");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), io::Error> {
    let poll_rate = Duration::from_millis(TIME_SETTINGS.poll_ms);
    let idle_refresh = Duration::from_millis(TIME_SETTINGS.tick_ms);
    let mut last_refresh = Instant::now();

    loop {
        if app.engine.poll_tick() {
            app.refresh_view();
            last_refresh = Instant::now();
        } else if last_refresh.elapsed() >= idle_refresh {
            // Keeps the date and totals current while nothing is ticking.
            app.refresh_view();
            last_refresh = Instant::now();
        }

        if app.render_needed {
            terminal.draw(|f| app.draw_frame(f))?;
            app.render_needed = false;
        }

        if event::poll(poll_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    break;
                }
            }
        }
    }

    Ok(())
}
