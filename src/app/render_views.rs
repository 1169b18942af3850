use ratatui::prelude::{Line, Span};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::{
    domain::{DayLedger, TimerState},
    time_format::{format_duration, truncate_label},
};

use super::{App, UiMode, ui_helpers, view_style};

const LABEL_WIDTH: usize = 28;

impl App {
    pub(super) fn draw_frame(&self, f: &mut Frame) {
        let size = f.size();

        match self.ui_mode {
            UiMode::History => self.draw_history(f, size),
            UiMode::Today | UiMode::ConfirmClear => self.draw_today(f, size),
        }

        if self.ui_mode == UiMode::ConfirmClear {
            self.draw_confirm_clear(f, size);
        }
    }

    fn draw_today(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(area);

        let view = &self.view;
        let color = view_style::state_color(view.state);

        let label = if view.label.is_empty() {
            "-".to_string()
        } else {
            truncate_label(&view.label, LABEL_WIDTH)
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", view.state.label().to_uppercase()),
                view_style::badge_style(view.state),
            ),
            Span::raw("  "),
            Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(view.elapsed.clone(), Style::default().fg(color)),
        ]))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color))
                .title(Line::from(format!(" {} ", view.today.date)).alignment(Alignment::Left))
                .title(Line::from(" daytimer ").alignment(Alignment::Right)),
        );
        f.render_widget(header, chunks[0]);

        self.draw_entries(f, chunks[1]);

        let totals = Paragraph::new(Line::from(vec![
            Span::raw("Today "),
            Span::styled(
                format_duration(view.today_total_ms),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   Break "),
            Span::styled(
                format_duration(view.today.break_ms),
                Style::default().fg(view_style::state_color(TimerState::OnBreak)),
            ),
            Span::raw("   Lifetime "),
            Span::styled(format_duration(view.overall_total_ms), view_style::dim_style()),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Totals "));
        f.render_widget(totals, chunks[2]);

        let input_line = if self.editing {
            Line::from(vec![
                Span::raw(self.input.clone()),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            ])
        } else {
            Line::from(Span::styled("Enter to name a task", view_style::dim_style()))
        };
        let input = Paragraph::new(input_line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if self.editing {
                    Style::default().fg(color)
                } else {
                    view_style::dim_style()
                })
                .title(" Task "),
        );
        f.render_widget(input, chunks[3]);

        let footer = if self.status_line.is_empty() {
            Span::styled(
                "p pause  b break  s stop  d remove  x clear  h history  q quit",
                view_style::dim_style(),
            )
        } else {
            Span::raw(self.status_line.clone())
        };
        f.render_widget(Paragraph::new(Line::from(footer)), chunks[4]);
    }

    fn draw_entries(&self, f: &mut Frame, area: Rect) {
        let entries = self.today_entries();
        let block = Block::default().borders(Borders::ALL).title(" Tasks ");

        if entries.is_empty() {
            let empty = Paragraph::new(Line::from(Span::styled(
                "No time recorded today",
                view_style::dim_style(),
            )))
            .alignment(Alignment::Center)
            .block(block);
            f.render_widget(empty, area);
            return;
        }

        let items = day_items(&entries, self.view.today.work_total_ms());
        let list = List::new(items)
            .block(block)
            .highlight_style(view_style::highlight_style());

        let mut state = ListState::default();
        state.select(Some(self.selected_index));
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_history(&self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(16), Constraint::Min(20)])
            .split(area);

        let dates: Vec<ListItem> = self
            .history_dates
            .iter()
            .map(|date| ListItem::new(Line::from(date.clone())))
            .collect();
        let list = List::new(dates)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(" History "),
            )
            .highlight_style(view_style::highlight_style());
        let mut state = ListState::default();
        if !self.history_dates.is_empty() {
            state.select(Some(self.history_selected));
        }
        f.render_stateful_widget(list, columns[0], &mut state);

        match &self.history_detail {
            Some(day) => draw_day_detail(f, columns[1], day),
            None => {
                let hint = if self.history_dates.is_empty() {
                    "No history yet"
                } else {
                    "Enter to open a day, Esc to go back"
                };
                let paragraph = Paragraph::new(Line::from(Span::styled(hint, view_style::dim_style())))
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL));
                f.render_widget(paragraph, columns[1]);
            }
        }
    }

    fn draw_confirm_clear(&self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(44, 5, area);
        let text = vec![
            Line::from(format!("Clear all entries for {}?", self.view.today.date)),
            Line::from(Span::styled("y to confirm, any other key to cancel", view_style::dim_style())),
        ];
        let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .title(" Clear day "),
        );
        f.render_widget(Clear, popup);
        f.render_widget(paragraph, popup);
    }
}

fn day_items(entries: &[(String, u64)], work_total_ms: u64) -> Vec<ListItem<'static>> {
    entries
        .iter()
        .map(|(task, ms)| {
            ListItem::new(Line::from(vec![
                Span::raw(format!(
                    "{:<width$}",
                    truncate_label(task, LABEL_WIDTH),
                    width = LABEL_WIDTH
                )),
                Span::raw("  "),
                Span::styled(format_duration(*ms), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {:>3}%", ui_helpers::share_percent(*ms, work_total_ms)),
                    view_style::dim_style(),
                ),
            ]))
        })
        .collect()
}

fn draw_day_detail(f: &mut Frame, area: Rect, day: &DayLedger) {
    let entries: Vec<(String, u64)> = day
        .entries_by_duration()
        .into_iter()
        .map(|(task, ms)| (task.to_string(), ms))
        .collect();

    let mut items = day_items(&entries, day.work_total_ms());
    items.push(ListItem::new(Line::from("")));
    items.push(ListItem::new(Line::from(format!(
        "Work {}   Break {}",
        format_duration(day.work_total_ms()),
        format_duration(day.break_ms)
    ))));

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(format!(" {} ", day.date)),
    );
    f.render_widget(list, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
