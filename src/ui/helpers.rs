/// UI helper functions shared across views.
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;

use crate::app::Mode;

/// Computes a rectangle centered inside `area`, sized as percentages
/// of it. Used to place modal overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

pub fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Normal => "NORMAL",
        Mode::Manage => "MANAGE",
        Mode::Git => "GIT",
        Mode::Filter => "FILTER",
    }
}

pub fn mode_color(mode: Mode) -> Color {
    match mode {
        Mode::Normal => Color::Cyan,
        Mode::Manage => Color::Yellow,
        Mode::Git => Color::Green,
        Mode::Filter => Color::Magenta,
    }
}

/// Status summaries render dirty worktrees in yellow, clean in gray.
pub fn summary_color(summary: &str) -> Color {
    if summary == "clean" {
        Color::Gray
    } else {
        Color::Yellow
    }
}

/// Formats one action-log line: `[timestamp] message`.
pub fn format_log_entry(timestamp: &str, message: &str) -> String {
    format!("[{timestamp}] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_parent() {
        let area = Rect::new(0, 0, 100, 100);
        let centered = centered_rect(50, 50, area);
        assert!(centered.x >= area.x);
        assert!(centered.y >= area.y);
        assert!(centered.width <= area.width);
        assert!(centered.height <= area.height);
    }

    #[test]
    fn log_entry_format() {
        assert_eq!(
            format_log_entry("2026-01-01T00:00:00Z", "fetched"),
            "[2026-01-01T00:00:00Z] fetched"
        );
    }

    #[test]
    fn summary_colors() {
        assert_eq!(summary_color("clean"), Color::Gray);
        assert_eq!(summary_color("+1 ~2"), Color::Yellow);
    }
}
