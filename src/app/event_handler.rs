use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tasks::TaskKind;

use super::{App, Mode, Overlay, Prompt};

impl App {
    /// Handles one key press. Returns true when the loop should exit.
    /// Dispatch order: prompt, overlay, then the current mode; a key
    /// unbound in the active scope is ignored, never falls through.
    pub fn handle_key(&mut self, key_event: KeyEvent) -> bool {
        if self.prompt.is_some() {
            self.handle_prompt_key(key_event);
            return false;
        }
        if self.overlay.is_some() {
            self.handle_overlay_key(key_event);
            return false;
        }
        match self.mode {
            Mode::Normal => self.handle_normal_key(key_event),
            Mode::Manage => {
                self.handle_manage_key(key_event);
                false
            }
            Mode::Git => {
                self.handle_git_key(key_event);
                false
            }
            Mode::Filter => {
                self.handle_filter_key(key_event);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key_event: KeyEvent) -> bool {
        match key_event.code {
            KeyCode::Char('q') => return true,
            KeyCode::Enter => {
                if let Some(entry) = self.selected_entry() {
                    self.switch_target = Some(entry.path.clone());
                    return true;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.visible_indices().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(max);
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Filter;
            }
            KeyCode::Char('m') => {
                self.mode = Mode::Manage;
            }
            KeyCode::Char('g') => {
                self.mode = Mode::Git;
            }
            KeyCode::Char('s') => {
                self.open_status_overlay();
            }
            KeyCode::Char('r') => {
                self.submit_refresh();
            }
            KeyCode::Char('?') => {
                self.overlay = Some(Overlay::Help);
            }
            _ => {}
        }
        false
    }

    fn handle_manage_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.mode = Mode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.visible_indices().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(max);
            }
            KeyCode::Char('a') => {
                self.prompt = Some(Prompt::AddWorktree {
                    buffer: String::new(),
                });
            }
            KeyCode::Char('d') => {
                if let Some(name) = self.selected_name() {
                    self.prompt = Some(Prompt::ConfirmRemove { name, force: false });
                }
            }
            KeyCode::Char('t') => {
                if let Some(target) = self.selected_name() {
                    self.prompt = Some(Prompt::ConfirmTeleport { target });
                }
            }
            KeyCode::Char('c') => {
                self.submit_clean(true);
            }
            KeyCode::Char('C') => {
                self.submit_clean(false);
            }
            _ => {}
        }
    }

    fn handle_git_key(&mut self, key_event: KeyEvent) {
        let Some(name) = self.selected_name() else {
            if matches!(key_event.code, KeyCode::Esc | KeyCode::Char('q')) {
                self.mode = Mode::Normal;
            }
            return;
        };
        match key_event.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.mode = Mode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.visible_indices().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(max);
            }
            KeyCode::Char('f') => self.submit_remote_op(&name, TaskKind::Fetch),
            KeyCode::Char('p') => self.submit_remote_op(&name, TaskKind::Push),
            KeyCode::Char('l') => self.submit_remote_op(&name, TaskKind::Pull),
            KeyCode::Char('r') => self.submit_rebase(&name),
            KeyCode::Char('c') => self.submit_generate_message(&name),
            KeyCode::Char('s') => self.open_status_overlay(),
            KeyCode::Char('h') => {
                self.overlay = Some(Overlay::History);
                self.overlay_scroll = 0;
                self.submit_history(&name);
            }
            KeyCode::Char('S') => {
                self.overlay = Some(Overlay::StashList);
                self.submit_stashes(&name);
            }
            _ => {}
        }
    }

    /// Filter mode owns every printable character until committed or
    /// cleared.
    fn handle_filter_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.selected = 0;
            }
            KeyCode::Esc => {
                self.filter_query.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                self.filter_query.pop();
                self.selected = 0;
            }
            KeyCode::Char(c) => {
                if !key_event.modifiers.contains(KeyModifiers::CONTROL)
                    && !key_event.modifiers.contains(KeyModifiers::ALT)
                {
                    self.filter_query.push(c);
                    self.selected = 0;
                }
            }
            _ => {}
        }
    }

    fn handle_overlay_key(&mut self, key_event: KeyEvent) {
        if key_event.code == KeyCode::Esc {
            self.overlay = None;
            self.status_cursor = 0;
            self.overlay_scroll = 0;
            return;
        }
        match self.overlay {
            Some(Overlay::Status) => self.handle_status_overlay_key(key_event),
            Some(Overlay::History) => match key_event.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.overlay_scroll = self.overlay_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.overlay_scroll += 1;
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn handle_status_overlay_key(&mut self, key_event: KeyEvent) {
        let Some(name) = self.selected_name() else {
            return;
        };
        let file_count = self
            .statuses
            .get(&name)
            .map(|s| s.staged.len() + s.unstaged.len() + s.untracked.len())
            .unwrap_or(0);

        match key_event.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.status_cursor = self.status_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.status_cursor = (self.status_cursor + 1).min(file_count.saturating_sub(1));
            }
            KeyCode::Char('s') => {
                if let Some((file, staged)) = self.file_under_cursor(&name)
                    && !staged
                {
                    self.submit_stage_file(&name, file, true);
                }
            }
            KeyCode::Char('u') => {
                if let Some((file, staged)) = self.file_under_cursor(&name)
                    && staged
                {
                    self.submit_stage_file(&name, file, false);
                }
            }
            KeyCode::Char('a') => self.submit_stage_all(&name, true),
            KeyCode::Char('U') => self.submit_stage_all(&name, false),
            KeyCode::Char('c') => self.submit_generate_message(&name),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key_event: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match prompt {
            Prompt::AddWorktree { buffer } => match key_event.code {
                KeyCode::Esc => {
                    self.prompt = None;
                }
                KeyCode::Enter => {
                    let name = buffer.trim().to_string();
                    self.prompt = None;
                    if name.is_empty() {
                        self.set_status("worktree name cannot be empty".to_string(), true);
                    } else {
                        self.submit_add(name);
                    }
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => {
                    if !key_event.modifiers.contains(KeyModifiers::CONTROL)
                        && !key_event.modifiers.contains(KeyModifiers::ALT)
                    {
                        buffer.push(c);
                    }
                }
                _ => {}
            },
            Prompt::ConfirmRemove { name, force } => match key_event.code {
                KeyCode::Esc | KeyCode::Char('n') => {
                    self.prompt = None;
                }
                KeyCode::Char('f') => {
                    *force = !*force;
                }
                KeyCode::Char('y') | KeyCode::Enter => {
                    let (name, force) = (name.clone(), *force);
                    self.prompt = None;
                    self.submit_remove(name, force);
                }
                _ => {}
            },
            Prompt::ConfirmTeleport { target } => match key_event.code {
                KeyCode::Esc | KeyCode::Char('n') => {
                    self.prompt = None;
                }
                KeyCode::Char('y') | KeyCode::Enter => {
                    let target = target.clone();
                    self.prompt = None;
                    self.submit_teleport(target);
                }
                _ => {}
            },
            Prompt::CommitMessage { worktree, buffer } => match key_event.code {
                KeyCode::Esc => {
                    self.prompt = None;
                }
                KeyCode::Enter => {
                    let (worktree, message) = (worktree.clone(), buffer.trim().to_string());
                    self.prompt = None;
                    if message.is_empty() {
                        self.set_status("empty commit message, not committing".to_string(), true);
                    } else {
                        self.submit_commit(worktree, message);
                    }
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => {
                    if !key_event.modifiers.contains(KeyModifiers::CONTROL)
                        && !key_event.modifiers.contains(KeyModifiers::ALT)
                    {
                        buffer.push(c);
                    }
                }
                _ => {}
            },
        }
    }

    fn open_status_overlay(&mut self) {
        if let Some(name) = self.selected_name() {
            self.overlay = Some(Overlay::Status);
            self.status_cursor = 0;
            let _ = self.submit_status(&name);
        }
    }

    /// Resolves the file under the status-overlay cursor. Rows are laid
    /// out staged, then unstaged, then untracked, matching the render
    /// order. Returns (path, currently_staged).
    fn file_under_cursor(&self, name: &str) -> Option<(String, bool)> {
        let status = self.statuses.get(name)?;
        let mut idx = self.status_cursor;
        if idx < status.staged.len() {
            return Some((status.staged[idx].path.clone(), true));
        }
        idx -= status.staged.len();
        if idx < status.unstaged.len() {
            return Some((status.unstaged[idx].path.clone(), false));
        }
        idx -= status.unstaged.len();
        status
            .untracked
            .get(idx)
            .map(|path| (path.clone(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{FileChange, GitCli, WorktreeEntry, WorktreeStatus};
    use crate::project::{Project, ENGINE_DIR, POINTER_CONTENT, POINTER_FILE};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn fixture_app(tag: &str) -> App {
        let root = std::env::temp_dir().join(format!("barehub_keys_{tag}_{}", std::process::id()));
        if root.exists() {
            std::fs::remove_dir_all(&root).unwrap();
        }
        std::fs::create_dir_all(root.join(ENGINE_DIR)).unwrap();
        std::fs::write(root.join(ENGINE_DIR).join("HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::write(root.join(POINTER_FILE), POINTER_CONTENT).unwrap();
        let project = Project::open(&root).unwrap();
        let mut app = App::new(project, Arc::new(GitCli::new())).unwrap();
        app.worktrees = vec![
            WorktreeEntry {
                path: PathBuf::from("/proj/main"),
                head: "abc1234".into(),
                branch: Some("main".into()),
                bare: false,
                detached: false,
            },
            WorktreeEntry {
                path: PathBuf::from("/proj/dev"),
                head: "def5678".into(),
                branch: Some("dev".into()),
                bare: false,
                detached: false,
            },
        ];
        app
    }

    #[test]
    fn mode_transitions_from_normal() {
        let mut app = fixture_app("modes");
        app.handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.mode, Mode::Manage);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Normal);
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.mode, Mode::Git);
        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Char('/')));
        assert_eq!(app.mode, Mode::Filter);
    }

    #[test]
    fn unknown_keys_are_ignored_per_mode() {
        let mut app = fixture_app("ignore");
        app.mode = Mode::Manage;
        // 'f' is a Git-mode key; in Manage it must do nothing.
        app.handle_key(key(KeyCode::Char('x')));
        app.handle_key(key(KeyCode::Char('f')));
        assert_eq!(app.mode, Mode::Manage);
        assert!(app.prompt.is_none());
        assert!(app.overlay.is_none());
    }

    #[test]
    fn filter_mode_captures_printable_input() {
        let mut app = fixture_app("filter");
        app.handle_key(key(KeyCode::Char('/')));
        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('e')));
        app.handle_key(key(KeyCode::Char('v')));
        assert_eq!(app.filter_query, "dev");
        assert_eq!(app.mode, Mode::Filter);

        // Enter commits the query and returns to Normal.
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.filter_query, "dev");
        assert_eq!(app.visible_indices(), vec![1]);
    }

    #[test]
    fn filter_escape_clears_query() {
        let mut app = fixture_app("filter_esc");
        app.handle_key(key(KeyCode::Char('/')));
        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.filter_query.is_empty());
        assert_eq!(app.visible_indices().len(), 2);
    }

    #[test]
    fn quit_and_switch() {
        let mut app = fixture_app("quit");
        assert!(!app.handle_key(key(KeyCode::Char('j'))));
        assert_eq!(app.selected, 1);
        // Enter requests a switch into the selected worktree and exits.
        assert!(app.handle_key(key(KeyCode::Enter)));
        assert_eq!(app.switch_target, Some(PathBuf::from("/proj/dev")));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn remove_prompt_confirms_with_force_toggle() {
        let mut app = fixture_app("remove");
        app.mode = Mode::Manage;
        app.handle_key(key(KeyCode::Char('d')));
        assert!(matches!(
            app.prompt,
            Some(Prompt::ConfirmRemove { ref name, force: false }) if name == "main"
        ));
        app.handle_key(key(KeyCode::Char('f')));
        assert!(matches!(
            app.prompt,
            Some(Prompt::ConfirmRemove { force: true, .. })
        ));
        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.prompt.is_none());
    }

    #[test]
    fn status_cursor_resolves_sections_in_render_order() {
        let mut app = fixture_app("cursor");
        app.statuses.insert(
            "main".to_string(),
            WorktreeStatus {
                staged: vec![FileChange {
                    path: "a.rs".into(),
                    code: "M ".into(),
                }],
                unstaged: vec![FileChange {
                    path: "b.rs".into(),
                    code: " M".into(),
                }],
                untracked: vec!["c.rs".into()],
                ahead: None,
                behind: None,
            },
        );
        app.status_cursor = 0;
        assert_eq!(
            app.file_under_cursor("main"),
            Some(("a.rs".to_string(), true))
        );
        app.status_cursor = 1;
        assert_eq!(
            app.file_under_cursor("main"),
            Some(("b.rs".to_string(), false))
        );
        app.status_cursor = 2;
        assert_eq!(
            app.file_under_cursor("main"),
            Some(("c.rs".to_string(), false))
        );
        app.status_cursor = 3;
        assert_eq!(app.file_under_cursor("main"), None);
    }
}
