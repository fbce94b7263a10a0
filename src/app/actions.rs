use std::sync::Arc;

use crate::audit::Auditor;
use crate::keystore;
use crate::lifecycle::Lifecycle;
use crate::tasks::{SubmitError, TaskEvent, TaskFailure, TaskKind, TaskPayload};
use crate::teleport::{TeleportBridge, TeleportOutcome};
use crate::textgen::{GeminiTextGen, TextGen};

use super::{App, Prompt};

const HISTORY_LIMIT: usize = 50;

/// Task submission and completion handling. Every git-backed operation
/// goes through the executor; the UI thread never runs git itself.
impl App {
    pub fn poll_events(&mut self) {
        while let Some(event) = self.executor.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: TaskEvent) {
        let (worktree, kind) = event.key;
        match event.result {
            Ok(payload) => self.apply_payload(&worktree, kind, payload),
            Err(TaskFailure::Cancelled) => {
                self.push_log(format!(
                    "{kind:?} for '{worktree}' cancelled, result discarded"
                ));
            }
            Err(failure) => {
                let subject = if worktree.is_empty() {
                    format!("{kind:?}")
                } else {
                    format!("{kind:?} ({worktree})")
                };
                self.set_status(format!("{subject} failed: {failure}"), true);
                // Fall back to a manually entered message.
                if kind == TaskKind::GenerateMessage {
                    self.prompt = Some(Prompt::CommitMessage {
                        worktree,
                        buffer: String::new(),
                    });
                }
            }
        }
    }

    fn apply_payload(&mut self, worktree: &str, kind: TaskKind, payload: TaskPayload) {
        match payload {
            TaskPayload::Worktrees(entries) => {
                self.worktrees = entries.into_iter().filter(|e| !e.bare).collect();
                self.clamp_selection();
                let names: Vec<String> = self.worktrees.iter().map(|e| e.name()).collect();
                for name in names {
                    let _ = self.submit_status(&name);
                }
            }
            TaskPayload::Status(name, status) => {
                self.statuses.insert(name, status);
            }
            TaskPayload::History(name, commits) => {
                self.histories.insert(name, commits);
            }
            TaskPayload::Stashes(name, stashes) => {
                self.stashes.insert(name, stashes);
            }
            TaskPayload::Clean(report) => {
                if report.stale.is_empty() && report.artifacts.is_empty() {
                    self.set_status("audit: nothing to clean".to_string(), false);
                } else {
                    let verb = if report.pruned { "pruned" } else { "stale" };
                    self.set_status(
                        format!(
                            "audit: {} {} record(s), {} artifact dir(s)",
                            verb,
                            report.stale.len(),
                            report.artifacts.len()
                        ),
                        false,
                    );
                    for name in &report.stale {
                        self.push_log(format!("  {verb} record: {name}"));
                    }
                }
                if report.pruned {
                    self.submit_refresh();
                }
            }
            TaskPayload::Teleport(outcome) => match outcome {
                TeleportOutcome::NothingToMove => {
                    self.set_status("nothing to teleport, worktree is clean".to_string(), false);
                }
                TeleportOutcome::Moved { target, .. } => {
                    self.set_status(format!("changes teleported to '{target}'"), false);
                    self.submit_refresh();
                }
            },
            TaskPayload::CommitMessage(message) => {
                self.prompt = Some(Prompt::CommitMessage {
                    worktree: worktree.to_string(),
                    buffer: message,
                });
            }
            TaskPayload::Unit => match kind {
                TaskKind::Remove => {
                    self.set_status(format!("removed worktree '{worktree}'"), false);
                    self.executor.cancel_worktree(worktree);
                    self.submit_refresh();
                }
                TaskKind::Add => {
                    self.set_status(format!("added worktree '{worktree}'"), false);
                    self.submit_refresh();
                }
                TaskKind::Commit => {
                    self.set_status(format!("committed in '{worktree}'"), false);
                    let _ = self.submit_status(worktree);
                }
                TaskKind::Stage => {
                    let _ = self.submit_status(worktree);
                }
                _ => {
                    self.set_status(format!("{kind:?} finished for '{worktree}'"), false);
                    let _ = self.submit_status(worktree);
                }
            },
        }
    }

    fn report_submit(&mut self, result: Result<(), SubmitError>) {
        if let Err(err) = result {
            self.set_status(err.to_string(), true);
        }
    }

    pub fn submit_refresh(&mut self) {
        let git = Arc::clone(&self.git);
        let root = self.project.root().to_path_buf();
        let result = self
            .executor
            .submit((String::new(), TaskKind::Refresh), move || {
                git.list_worktrees(&root)
                    .map(TaskPayload::Worktrees)
                    .map_err(|e| e.to_string())
            });
        // A refresh already in flight is fine, the fresh list is coming.
        if let Err(err @ SubmitError::Shutdown) = result {
            self.set_status(err.to_string(), true);
        }
    }

    pub fn submit_status(&mut self, name: &str) -> Result<(), SubmitError> {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return Ok(());
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let name_owned = name.to_string();
        self.executor
            .submit((name.to_string(), TaskKind::Status), move || {
                git.status(&path)
                    .map(|status| TaskPayload::Status(name_owned, status))
                    .map_err(|e| e.to_string())
            })
    }

    pub fn submit_history(&mut self, name: &str) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let name_owned = name.to_string();
        let result = self
            .executor
            .submit((name.to_string(), TaskKind::History), move || {
                git.log(&path, HISTORY_LIMIT)
                    .map(|commits| TaskPayload::History(name_owned, commits))
                    .map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_stashes(&mut self, name: &str) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let name_owned = name.to_string();
        let result = self
            .executor
            .submit((name.to_string(), TaskKind::StashList), move || {
                git.stash_list(&path)
                    .map(|stashes| TaskPayload::Stashes(name_owned, stashes))
                    .map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_remote_op(&mut self, name: &str, kind: TaskKind) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let result = self.executor.submit((name.to_string(), kind), move || {
            let outcome = match kind {
                TaskKind::Fetch => git.fetch(&path),
                TaskKind::Pull => git.pull(&path),
                TaskKind::Push => git.push(&path),
                _ => return Err(format!("{kind:?} is not a remote operation")),
            };
            outcome.map(|()| TaskPayload::Unit).map_err(|e| e.to_string())
        });
        self.report_submit(result);
    }

    pub fn submit_rebase(&mut self, name: &str) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let root = self.project.root().to_path_buf();
        let result = self
            .executor
            .submit((name.to_string(), TaskKind::Rebase), move || {
                let upstream = git.default_branch(&root).map_err(|e| e.to_string())?;
                git.rebase(&path, &upstream)
                    .map(|()| TaskPayload::Unit)
                    .map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_add(&mut self, name: String) {
        let git = Arc::clone(&self.git);
        let project = self.project.clone();
        let name_owned = name.clone();
        let result = self.executor.submit((name, TaskKind::Add), move || {
            Lifecycle::new(git.as_ref())
                .add(&project, &name_owned, None)
                .map(|_| TaskPayload::Unit)
                .map_err(|e| e.to_string())
        });
        self.report_submit(result);
    }

    pub fn submit_remove(&mut self, name: String, force: bool) {
        let git = Arc::clone(&self.git);
        let project = self.project.clone();
        let name_owned = name.clone();
        let result = self.executor.submit((name, TaskKind::Remove), move || {
            Lifecycle::new(git.as_ref())
                .remove(&project, &name_owned, force)
                .map(|()| TaskPayload::Unit)
                .map_err(|e| e.to_string())
        });
        self.report_submit(result);
    }

    pub fn submit_clean(&mut self, dry_run: bool) {
        let git = Arc::clone(&self.git);
        let project = self.project.clone();
        let cwd = self.cwd.clone();
        let result = self
            .executor
            .submit((String::new(), TaskKind::Clean), move || {
                Auditor::new(git.as_ref())
                    .clean(&project, false, dry_run, &cwd)
                    .map(TaskPayload::Clean)
                    .map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_teleport(&mut self, target: String) {
        let Some(source) = self.current_worktree() else {
            self.set_status(
                "not inside a managed worktree, cannot teleport".to_string(),
                true,
            );
            return;
        };
        let source_name = source.name();
        if source_name == target {
            self.set_status("already inside the target worktree".to_string(), true);
            return;
        }
        let git = Arc::clone(&self.git);
        let project = self.project.clone();
        let source_path = source.path.clone();
        let result = self
            .executor
            .submit((source_name, TaskKind::Teleport), move || {
                TeleportBridge::new(git.as_ref())
                    .teleport(&project, &source_path, &target)
                    .map(TaskPayload::Teleport)
                    .map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_stage_file(&mut self, name: &str, file: String, stage: bool) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let result = self
            .executor
            .submit((name.to_string(), TaskKind::Stage), move || {
                let outcome = if stage {
                    git.stage_file(&path, &file)
                } else {
                    git.unstage_file(&path, &file)
                };
                outcome.map(|()| TaskPayload::Unit).map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_stage_all(&mut self, name: &str, stage: bool) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let result = self
            .executor
            .submit((name.to_string(), TaskKind::Stage), move || {
                let outcome = if stage {
                    git.stage_all(&path)
                } else {
                    git.unstage_all(&path)
                };
                outcome.map(|()| TaskPayload::Unit).map_err(|e| e.to_string())
            });
        self.report_submit(result);
    }

    pub fn submit_commit(&mut self, name: String, message: String) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let result = self.executor.submit((name, TaskKind::Commit), move || {
            git.commit(&path, &message)
                .map(|()| TaskPayload::Unit)
                .map_err(|e| e.to_string())
        });
        self.report_submit(result);
    }

    /// Asks the text-generation service for a commit message from the
    /// staged diff. Any failure falls back to manual entry.
    pub fn submit_generate_message(&mut self, name: &str) {
        let Some(entry) = self.worktrees.iter().find(|e| e.name() == name) else {
            return;
        };
        let git = Arc::clone(&self.git);
        let path = entry.path.clone();
        let branch = entry.branch.clone().unwrap_or_else(|| name.to_string());
        let result =
            self.executor
                .submit((name.to_string(), TaskKind::GenerateMessage), move || {
                    let diff = git.diff(&path, true).map_err(|e| e.to_string())?;
                    if diff.trim().is_empty() {
                        return Err("nothing staged to commit".to_string());
                    }
                    let key = keystore::get_api_key()
                        .map_err(|e| e.to_string())?
                        .ok_or_else(|| "no API key configured".to_string())?;
                    GeminiTextGen::new(key)
                        .commit_message(&diff, &branch)
                        .map(TaskPayload::CommitMessage)
                        .map_err(|e| e.to_string())
                });
        if result.is_ok() {
            self.set_status(format!("generating commit message for '{name}'"), false);
        }
        self.report_submit(result);
    }
}
