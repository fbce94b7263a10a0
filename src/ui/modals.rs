/// Modal and overlay rendering.
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::gateway::{CommitInfo, StashEntry, WorktreeStatus};

/// Generic modal: cleared background, bordered paragraph.
pub fn render_modal(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, lines: Vec<Line>) {
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(Clear, area);
    frame.render_widget(widget, area);
}

/// Single-line text input, used for worktree names and commit messages.
pub fn render_input_modal(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    hint: &str,
    buffer: &str,
) {
    let lines = vec![
        Line::raw(hint.to_string()),
        Line::raw(""),
        Line::from(Span::styled(
            format!("{buffer}█"),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::raw("Enter to confirm, Esc to cancel"),
    ];
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(Clear, area);
    frame.render_widget(widget, area);
}

/// Yes/no confirmation; `danger` highlights the destructive wording.
pub fn render_confirm_modal(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    question: &str,
    detail: Option<&str>,
    danger: bool,
) {
    let mut lines = vec![
        Line::from(Span::styled(
            question.to_string(),
            Style::default()
                .fg(if danger { Color::Red } else { Color::Yellow })
                .add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
    ];
    if let Some(detail) = detail {
        lines.push(Line::raw(detail.to_string()));
        lines.push(Line::raw(""));
    }
    lines.push(Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Cyan)),
        Span::raw(" confirm   "),
        Span::styled("n/Esc", Style::default().fg(Color::Cyan)),
        Span::raw(" cancel"),
    ]));
    render_modal(frame, area, title, lines);
}

/// Status overlay: staged / unstaged / untracked sections with a file
/// cursor for staging operations.
pub fn render_status_overlay(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    worktree: &str,
    status: &WorktreeStatus,
    cursor: usize,
) {
    let mut lines = Vec::new();
    let mut row = 0usize;

    let push_file = |lines: &mut Vec<Line>, code: &str, path: &str, color: Color, row: usize| {
        let mut style = Style::default().fg(color);
        if row == cursor {
            style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
        }
        lines.push(Line::from(Span::styled(
            format!("  {code} {path}"),
            style,
        )));
    };

    lines.push(Line::from(Span::styled(
        format!("Staged ({})", status.staged.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for change in &status.staged {
        push_file(&mut lines, &change.code, &change.path, Color::Green, row);
        row += 1;
    }
    lines.push(Line::raw(""));

    lines.push(Line::from(Span::styled(
        format!("Unstaged ({})", status.unstaged.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for change in &status.unstaged {
        push_file(&mut lines, &change.code, &change.path, Color::Yellow, row);
        row += 1;
    }
    lines.push(Line::raw(""));

    lines.push(Line::from(Span::styled(
        format!("Untracked ({})", status.untracked.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for path in &status.untracked {
        push_file(&mut lines, "??", path, Color::Red, row);
        row += 1;
    }

    if let (Some(ahead), Some(behind)) = (status.ahead, status.behind) {
        lines.push(Line::raw(""));
        lines.push(Line::raw(format!("upstream: ↑{ahead} ↓{behind}")));
    }
    lines.push(Line::raw(""));
    lines.push(Line::raw("j/k move  s stage  u unstage  a stage all  U unstage all  c commit  Esc close"));

    render_modal(frame, area, &format!("Status – {worktree}"), lines);
}

pub fn render_history_overlay(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    worktree: &str,
    commits: &[CommitInfo],
    scroll: usize,
) {
    let lines: Vec<Line> = commits
        .iter()
        .skip(scroll)
        .map(|commit| {
            Line::from(vec![
                Span::styled(commit.hash.clone(), Style::default().fg(Color::Yellow)),
                Span::raw(format!(" {} ", commit.date)),
                Span::styled(
                    format!("{:<16}", commit.author),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(commit.message.clone()),
            ])
        })
        .collect();
    let lines = if lines.is_empty() {
        vec![Line::raw("no commits")]
    } else {
        lines
    };
    render_modal(frame, area, &format!("History – {worktree}"), lines);
}

pub fn render_stash_overlay(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    worktree: &str,
    stashes: &[StashEntry],
) {
    let lines: Vec<Line> = if stashes.is_empty() {
        vec![Line::raw("no stashes")]
    } else {
        stashes
            .iter()
            .map(|stash| {
                Line::from(vec![
                    Span::styled(
                        stash.reference.clone(),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(format!(" {}", stash.summary)),
                ])
            })
            .collect()
    };
    render_modal(frame, area, &format!("Stashes – {worktree}"), lines);
}
