use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

use crate::{domain::TimerState, time_format::format_duration};

use super::{App, UiMode, ui_helpers};

impl App {
    /// Returns true when the UI should exit.
    pub(super) fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        let quit = match self.ui_mode {
            UiMode::ConfirmClear => {
                self.handle_confirm_key(key);
                false
            }
            UiMode::History => self.handle_history_key(key),
            UiMode::Today if self.editing => {
                self.handle_input_key(key);
                false
            }
            UiMode::Today => self.handle_today_key(key),
        };
        self.render_needed = true;
        quit
    }

    fn handle_today_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Enter => {
                self.editing = true;
                self.suggestion_index = None;
            }
            KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('b') => {
                if self.engine.toggle_break() {
                    self.status_line = match self.engine.state() {
                        TimerState::OnBreak => "On break".to_string(),
                        _ => format!("Back to '{}'", self.engine.session().task),
                    };
                }
            }
            KeyCode::Char('s') => self.stop_session(),
            KeyCode::Char('d') | KeyCode::Delete => self.remove_selected(),
            KeyCode::Char('x') => {
                if !self.view.today.is_empty() {
                    self.ui_mode = UiMode::ConfirmClear;
                }
            }
            KeyCode::Char('h') => self.open_history(),
            KeyCode::Up => {
                let len = self.view.today.tasks.len();
                self.selected_index = ui_helpers::wrap_prev_index(self.selected_index, len);
            }
            KeyCode::Down => {
                let len = self.view.today.tasks.len();
                self.selected_index = ui_helpers::wrap_next_index(self.selected_index, len);
            }
            _ => {}
        }
        self.refresh_view();
        false
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editing = false;
                self.input.clear();
            }
            KeyCode::Enter => {
                let task = self.input.trim().to_string();
                if self.engine.start(&task) {
                    self.status_line = format!("Started '{}'", self.engine.session().task);
                } else {
                    self.status_line =
                        format!("Stop or pause '{}' first", self.engine.session().task);
                }
                self.editing = false;
                self.input.clear();
                self.refresh_view();
            }
            KeyCode::Tab => self.cycle_suggestion(1),
            KeyCode::BackTab => self.cycle_suggestion(-1),
            KeyCode::Backspace => {
                self.input.pop();
                self.suggestion_index = None;
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                self.suggestion_index = None;
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char('y') | KeyCode::Char('Y') = key.code {
            let date = self.engine.today();
            if self.engine.clear_day(&date) {
                info!(date = %date, "day cleared from ui");
                self.status_line = format!("Cleared {}", date);
            }
        } else {
            self.status_line = "Clear cancelled".to_string();
        }
        self.ui_mode = UiMode::Today;
        self.refresh_view();
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => self.close_history(),
            KeyCode::Enter => self.open_history_detail(),
            KeyCode::Up if self.history_detail.is_none() => {
                self.history_selected =
                    ui_helpers::wrap_prev_index(self.history_selected, self.history_dates.len());
            }
            KeyCode::Down if self.history_detail.is_none() => {
                self.history_selected =
                    ui_helpers::wrap_next_index(self.history_selected, self.history_dates.len());
            }
            _ => {}
        }
        false
    }

    fn toggle_pause(&mut self) {
        let changed = match self.engine.state() {
            TimerState::Paused => self.engine.resume(),
            _ => self.engine.pause(),
        };
        if !changed {
            return;
        }
        self.status_line = match self.engine.state() {
            TimerState::Paused => format!(
                "Paused '{}' at {}",
                self.engine.session().task,
                format_duration(self.engine.last_elapsed_ms())
            ),
            _ => format!("Resumed '{}'", self.engine.session().task),
        };
    }

    fn stop_session(&mut self) {
        let task = self.engine.session().task.clone();
        self.status_line = match self.engine.stop_and_flush() {
            Some(ms) => format!("Saved {} to '{}'", format_duration(ms), task),
            None => "Nothing to save".to_string(),
        };
    }

    fn remove_selected(&mut self) {
        let Some(task) = self.selected_entry() else {
            return;
        };
        let date = self.engine.today();
        let removed = self.engine.remove_entry(&date, &task);
        self.status_line = format!("Removed '{}' ({})", task, format_duration(removed));
    }
}
