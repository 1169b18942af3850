use ratatui::style::{Color, Modifier, Style};

use crate::{constants::STATE_COLORS, domain::TimerState};

pub(super) fn state_color(state: TimerState) -> Color {
    match state {
        TimerState::Idle => STATE_COLORS.idle,
        TimerState::Running => STATE_COLORS.running,
        TimerState::Paused => STATE_COLORS.paused,
        TimerState::OnBreak => STATE_COLORS.on_break,
    }
}

pub(super) fn text_color_for_bg(bg_color: Color) -> Color {
    if let Color::Rgb(r, g, b) = bg_color {
        let brightness = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        if brightness > 128 {
            Color::Black
        } else {
            Color::White
        }
    } else {
        Color::White
    }
}

pub(super) fn badge_style(state: TimerState) -> Style {
    let bg = state_color(state);
    Style::default()
        .bg(bg)
        .fg(text_color_for_bg(bg))
        .add_modifier(Modifier::BOLD)
}

pub(super) fn highlight_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub(super) fn dim_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_color_contrasts_with_state_colors() {
        assert_eq!(text_color_for_bg(STATE_COLORS.paused), Color::Black);
        assert_eq!(text_color_for_bg(Color::Rgb(0, 0, 80)), Color::White);
        assert_eq!(text_color_for_bg(Color::Gray), Color::White);
    }
}
