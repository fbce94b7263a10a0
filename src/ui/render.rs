/// Main screen rendering: header, worktree table, footer.
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::app::Mode;

use super::helpers::{mode_color, mode_label, summary_color};

/// One row of the worktree table, precomputed by the app layer so
/// rendering stays a pure function of state.
pub struct WorktreeRow {
    pub name: String,
    pub branch: String,
    pub head: String,
    pub summary: String,
    pub ahead_behind: String,
    pub busy: Option<&'static str>,
}

pub fn render_header(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    project_name: &str,
    total: usize,
    mode: Mode,
    filter: &str,
) {
    let mut spans = vec![
        Span::styled(
            "barehub",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" – {project_name}  ")),
        Span::raw(format!("Worktrees: {total}  Mode: ")),
        Span::styled(
            mode_label(mode),
            Style::default()
                .fg(mode_color(mode))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if !filter.is_empty() {
        spans.push(Span::raw("  Filter: "));
        spans.push(Span::styled(
            filter.to_string(),
            Style::default().fg(Color::Magenta),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Overview"));
    frame.render_widget(header, area);
}

pub fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    rows: &[WorktreeRow],
    selected: usize,
) {
    const SPINNER_CHARS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    let table_rows = rows.iter().enumerate().map(|(idx, row)| {
        let mut style = Style::default();
        if idx == selected {
            style = style.bg(Color::DarkGray).fg(Color::White);
        }

        let activity = match row.busy {
            Some(label) => {
                // Animation frame is folded into the label upstream; a
                // static spinner head keeps this function pure.
                format!("{} {label}", SPINNER_CHARS[0])
            }
            None => String::new(),
        };

        Row::new(vec![
            Cell::from(row.name.clone()),
            Cell::from(row.branch.clone()),
            Cell::from(row.head.clone()),
            Cell::from(row.summary.clone())
                .style(Style::default().fg(summary_color(&row.summary))),
            Cell::from(row.ahead_behind.clone()),
            Cell::from(activity).style(Style::default().fg(Color::Green)),
        ])
        .style(style)
    });

    let header = Row::new(vec![
        Cell::from("NAME"),
        Cell::from("BRANCH"),
        Cell::from("HEAD"),
        Cell::from("STATUS"),
        Cell::from("AHEAD/BEHIND"),
        Cell::from("ACTIVITY"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let widths = [
        ratatui::layout::Constraint::Length(20),
        ratatui::layout::Constraint::Length(24),
        ratatui::layout::Constraint::Length(9),
        ratatui::layout::Constraint::Length(14),
        ratatui::layout::Constraint::Length(13),
        ratatui::layout::Constraint::Min(12),
    ];

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Worktrees"))
        .column_spacing(1)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_widget(table, area);
}

pub fn render_footer(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    mode: Mode,
    status_line: Option<(&str, bool)>,
) {
    let keys: &[(&str, &str)] = match mode {
        Mode::Normal => &[
            ("q", "quit"),
            ("j/k", "select"),
            ("Enter", "switch"),
            ("/", "filter"),
            ("m", "manage"),
            ("g", "git"),
            ("s", "status"),
            ("r", "refresh"),
            ("?", "help"),
        ],
        Mode::Manage => &[
            ("a", "add"),
            ("d", "remove"),
            ("t", "teleport here"),
            ("c", "clean (dry-run)"),
            ("C", "clean"),
            ("Esc", "back"),
        ],
        Mode::Git => &[
            ("f", "fetch"),
            ("p", "push"),
            ("l", "pull"),
            ("r", "rebase"),
            ("c", "commit"),
            ("s", "status"),
            ("h", "history"),
            ("S", "stashes"),
            ("Esc", "back"),
        ],
        Mode::Filter => &[("Enter", "apply"), ("Esc", "clear")],
    };

    let mut key_spans = Vec::new();
    for (idx, (key, action)) in keys.iter().enumerate() {
        if idx > 0 {
            key_spans.push(Span::raw("  "));
        }
        key_spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
        key_spans.push(Span::raw(format!(" {action}")));
    }

    let status = match status_line {
        Some((message, true)) => Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        )),
        Some((message, false)) => Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Green),
        )),
        None => Line::raw(""),
    };

    let footer = Paragraph::new(vec![Line::from(key_spans), status])
        .block(Block::default().borders(Borders::ALL).title("Controls"));
    frame.render_widget(footer, area);
}

pub fn help_lines() -> Vec<Line<'static>> {
    vec![
        Line::raw("Keys by mode"),
        Line::raw(""),
        Line::raw("NORMAL"),
        Line::raw("  j/k or arrows – move selection"),
        Line::raw("  Enter – print selected worktree path and exit (shell cd)"),
        Line::raw("  / – filter worktrees (fuzzy)"),
        Line::raw("  m – manage mode (add/remove/teleport/clean)"),
        Line::raw("  g – git mode (fetch/push/pull/rebase/commit)"),
        Line::raw("  s – status overlay for the selected worktree"),
        Line::raw("  r – refresh the worktree list"),
        Line::raw("  q – quit"),
        Line::raw(""),
        Line::raw("MANAGE"),
        Line::raw("  a – add a worktree (prompts for name)"),
        Line::raw("  d – remove the selected worktree (confirmation; f toggles force)"),
        Line::raw("  t – teleport uncommitted changes from the current worktree here"),
        Line::raw("  c / C – audit stale records (dry-run / prune)"),
        Line::raw(""),
        Line::raw("GIT"),
        Line::raw("  f fetch  p push  l pull  r rebase onto default branch"),
        Line::raw("  c – commit staged changes (message generated, editable)"),
        Line::raw("  h – commit history    S – stash list"),
        Line::raw(""),
        Line::raw("STATUS overlay"),
        Line::raw("  j/k – move file cursor   s/u – stage/unstage file"),
        Line::raw("  a/U – stage/unstage all  c – commit"),
        Line::raw(""),
        Line::raw("Unrecognized keys are ignored in every mode."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_mentions_every_mode() {
        let text = help_lines()
            .iter()
            .map(|line| format!("{line:?}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("NORMAL"));
        assert!(text.contains("MANAGE"));
        assert!(text.contains("GIT"));
        assert!(text.contains("teleport"));
    }
}
