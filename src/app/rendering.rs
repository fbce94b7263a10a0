use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::text::Line;

use crate::ui::{
    centered_rect, help_lines, render_confirm_modal, render_footer, render_header,
    render_history_overlay, render_input_modal, render_modal, render_stash_overlay,
    render_status_overlay, render_table, WorktreeRow,
};

use super::{App, Overlay, Prompt};

impl App {
    pub fn render(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(5),
            ])
            .split(frame.area());

        let project_name = self
            .project
            .root()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "?".to_string());

        render_header(
            frame,
            chunks[0],
            &project_name,
            self.worktrees.iter().filter(|e| !e.bare).count(),
            self.mode,
            &self.filter_query,
        );

        let rows: Vec<WorktreeRow> = self
            .visible_indices()
            .into_iter()
            .filter_map(|idx| self.worktrees.get(idx))
            .map(|entry| {
                let name = entry.name();
                let summary = self
                    .statuses
                    .get(&name)
                    .map(|status| status.summary())
                    .unwrap_or_else(|| "…".to_string());
                let ahead_behind = match self.statuses.get(&name) {
                    Some(status) => match (status.ahead, status.behind) {
                        (Some(ahead), Some(behind)) => format!("↑{ahead} ↓{behind}"),
                        _ => String::new(),
                    },
                    None => String::new(),
                };
                WorktreeRow {
                    busy: self.busy_label(&name),
                    name,
                    branch: entry.branch.clone().unwrap_or_else(|| {
                        if entry.detached {
                            "(detached)".to_string()
                        } else {
                            String::new()
                        }
                    }),
                    head: entry.head.chars().take(8).collect(),
                    summary,
                    ahead_behind,
                }
            })
            .collect();
        render_table(frame, chunks[1], &rows, self.selected);

        let status_line = self
            .status_line
            .as_ref()
            .map(|line| (line.message.as_str(), line.is_error));
        render_footer(frame, chunks[2], self.mode, status_line);

        self.render_overlay(frame);
        self.render_prompt(frame);
    }

    fn render_overlay(&self, frame: &mut ratatui::Frame<'_>) {
        let Some(overlay) = self.overlay else { return };
        let name = self.selected_name().unwrap_or_default();
        match overlay {
            Overlay::Help => {
                let area = centered_rect(70, 80, frame.area());
                render_modal(frame, area, "Help", help_lines());
            }
            Overlay::Status => {
                let area = centered_rect(70, 70, frame.area());
                match self.statuses.get(&name) {
                    Some(status) => {
                        render_status_overlay(frame, area, &name, status, self.status_cursor);
                    }
                    None => render_modal(frame, area, "Status", vec![Line::raw("loading…")]),
                }
            }
            Overlay::History => {
                let area = centered_rect(80, 70, frame.area());
                let commits = self
                    .histories
                    .get(&name)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                render_history_overlay(frame, area, &name, commits, self.overlay_scroll);
            }
            Overlay::StashList => {
                let area = centered_rect(70, 50, frame.area());
                let stashes = self
                    .stashes
                    .get(&name)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                render_stash_overlay(frame, area, &name, stashes);
            }
        }
    }

    fn render_prompt(&self, frame: &mut ratatui::Frame<'_>) {
        let Some(prompt) = &self.prompt else { return };
        match prompt {
            Prompt::AddWorktree { buffer } => {
                let area = centered_rect(50, 25, frame.area());
                render_input_modal(
                    frame,
                    area,
                    "Add worktree",
                    "Name for the new worktree (branch of the same name):",
                    buffer,
                );
            }
            Prompt::ConfirmRemove { name, force } => {
                let area = centered_rect(50, 25, frame.area());
                let detail = if *force {
                    "force is ON: uncommitted changes will be discarded (f toggles)"
                } else {
                    "refuses dirty worktrees unless forced (f toggles)"
                };
                render_confirm_modal(
                    frame,
                    area,
                    "Remove worktree",
                    &format!("Remove worktree '{name}'?"),
                    Some(detail),
                    *force,
                );
            }
            Prompt::ConfirmTeleport { target } => {
                let area = centered_rect(55, 25, frame.area());
                render_confirm_modal(
                    frame,
                    area,
                    "Teleport changes",
                    &format!("Move uncommitted changes here into '{target}'?"),
                    Some("changes are stashed, then applied in the target"),
                    false,
                );
            }
            Prompt::CommitMessage { worktree, buffer } => {
                let area = centered_rect(60, 30, frame.area());
                render_input_modal(
                    frame,
                    area,
                    &format!("Commit – {worktree}"),
                    "Commit message (edit before confirming):",
                    buffer,
                );
            }
        }
    }
}
