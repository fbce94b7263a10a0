mod actions;
mod event_handler;
mod rendering;
mod types;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::filter;
use crate::gateway::{CommitInfo, GitGateway, StashEntry, WorktreeEntry, WorktreeStatus};
use crate::project::Project;
use crate::tasks::{TaskExecutor, TaskKind};
use crate::ui::format_log_entry;

pub use types::{Mode, Overlay, Prompt, StatusLine};

const GLOBAL_LOG_CAPACITY: usize = 64;
const STATUS_LINE_TTL: Duration = Duration::from_secs(4);
const TASK_TIMEOUT: Duration = Duration::from_secs(120);
const WORKER_COUNT: usize = 4;

/// Main application state. Owned by the single interactive thread;
/// workers communicate exclusively through the executor's event
/// channel, drained once per tick.
pub struct App {
    pub project: Project,
    pub git: Arc<dyn GitGateway>,
    pub executor: TaskExecutor,
    pub cwd: PathBuf,

    pub mode: Mode,
    pub overlay: Option<Overlay>,
    pub prompt: Option<Prompt>,

    pub worktrees: Vec<WorktreeEntry>,
    pub statuses: HashMap<String, WorktreeStatus>,
    pub histories: HashMap<String, Vec<CommitInfo>>,
    pub stashes: HashMap<String, Vec<StashEntry>>,

    pub selected: usize,
    pub filter_query: String,
    pub status_cursor: usize,
    pub overlay_scroll: usize,

    pub status_line: Option<StatusLine>,
    pub log_messages: VecDeque<String>,

    /// Set by Enter in Normal mode; printed after the terminal is
    /// restored so shell integration can `cd` into it.
    pub switch_target: Option<PathBuf>,
}

impl App {
    pub fn new(project: Project, git: Arc<dyn GitGateway>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to resolve current directory")?;
        let executor = TaskExecutor::new(WORKER_COUNT, TASK_TIMEOUT);

        let mut app = Self {
            project,
            git,
            executor,
            cwd,
            mode: Mode::Normal,
            overlay: None,
            prompt: None,
            worktrees: Vec::new(),
            statuses: HashMap::new(),
            histories: HashMap::new(),
            stashes: HashMap::new(),
            selected: 0,
            filter_query: String::new(),
            status_cursor: 0,
            overlay_scroll: 0,
            status_line: None,
            log_messages: VecDeque::with_capacity(GLOBAL_LOG_CAPACITY),
            switch_target: None,
        };
        app.submit_refresh();
        Ok(app)
    }

    pub fn on_tick(&mut self) {
        self.poll_events();
        self.clamp_selection();
        if let Some(status) = &self.status_line
            && Instant::now() >= status.expires_at
        {
            self.status_line = None;
        }
    }

    /// Indices into `worktrees` currently visible, fuzzy-ranked by the
    /// filter query. An empty query shows everything in list order.
    pub fn visible_indices(&self) -> Vec<usize> {
        let candidates: Vec<(String, Option<String>)> = self
            .worktrees
            .iter()
            .map(|e| (e.name(), e.branch.clone()))
            .collect();
        filter::rank(&self.filter_query, &candidates)
    }

    pub fn selected_entry(&self) -> Option<&WorktreeEntry> {
        let indices = self.visible_indices();
        indices
            .get(self.selected)
            .and_then(|idx| self.worktrees.get(*idx))
    }

    pub fn selected_name(&self) -> Option<String> {
        self.selected_entry().map(WorktreeEntry::name)
    }

    pub fn clamp_selection(&mut self) {
        let count = self.visible_indices().len();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }

    /// Name of the worktree containing the process working directory,
    /// used as the teleport source.
    pub fn current_worktree(&self) -> Option<&WorktreeEntry> {
        let cwd = self
            .cwd
            .canonicalize()
            .unwrap_or_else(|_| self.cwd.clone());
        self.worktrees.iter().filter(|e| !e.bare).find(|e| {
            let path = e.path.canonicalize().unwrap_or_else(|_| e.path.clone());
            cwd.starts_with(path)
        })
    }

    pub fn push_log(&mut self, message: String) {
        if self.log_messages.len() >= GLOBAL_LOG_CAPACITY {
            self.log_messages.pop_front();
        }
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        self.log_messages
            .push_back(format_log_entry(&timestamp, &message));
    }

    pub fn set_status(&mut self, message: String, is_error: bool) {
        self.push_log(message.clone());
        self.status_line = Some(StatusLine {
            message,
            is_error,
            expires_at: Instant::now() + STATUS_LINE_TTL,
        });
    }

    /// Busy label for the table's activity column, if any task is in
    /// flight for this worktree.
    pub fn busy_label(&self, name: &str) -> Option<&'static str> {
        const VISIBLE_KINDS: &[(TaskKind, &str)] = &[
            (TaskKind::Fetch, "fetching"),
            (TaskKind::Pull, "pulling"),
            (TaskKind::Push, "pushing"),
            (TaskKind::Rebase, "rebasing"),
            (TaskKind::Commit, "committing"),
            (TaskKind::GenerateMessage, "generating message"),
            (TaskKind::Teleport, "teleporting"),
            (TaskKind::Remove, "removing"),
        ];
        VISIBLE_KINDS
            .iter()
            .find(|(kind, _)| self.executor.is_busy(&(name.to_string(), *kind)))
            .map(|(_, label)| *label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GitCli;
    use crate::project::{ENGINE_DIR, POINTER_CONTENT, POINTER_FILE};
    use std::fs;

    fn fixture_app(tag: &str) -> App {
        let root = std::env::temp_dir().join(format!("barehub_app_{tag}_{}", std::process::id()));
        if root.exists() {
            fs::remove_dir_all(&root).unwrap();
        }
        fs::create_dir_all(root.join(ENGINE_DIR)).unwrap();
        fs::write(root.join(ENGINE_DIR).join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(root.join(POINTER_FILE), POINTER_CONTENT).unwrap();
        let project = Project::open(&root).unwrap();
        App::new(project, Arc::new(GitCli::new())).unwrap()
    }

    fn entry(name: &str) -> WorktreeEntry {
        WorktreeEntry {
            path: PathBuf::from(format!("/proj/{name}")),
            head: "abc1234".into(),
            branch: Some(name.to_string()),
            bare: false,
            detached: false,
        }
    }

    #[test]
    fn empty_filter_shows_all_in_order() {
        let mut app = fixture_app("all");
        app.worktrees = vec![entry("main"), entry("dev"), entry("feature-x")];
        assert_eq!(app.visible_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn filter_narrows_and_selection_clamps() {
        let mut app = fixture_app("clamp");
        app.worktrees = vec![entry("main"), entry("dev"), entry("feature-x")];
        app.selected = 2;
        app.filter_query = "dev".to_string();
        app.clamp_selection();
        assert_eq!(app.visible_indices(), vec![1]);
        assert_eq!(app.selected, 0);
        assert_eq!(app.selected_name().as_deref(), Some("dev"));
    }

    #[test]
    fn log_ring_is_bounded() {
        let mut app = fixture_app("logs");
        for i in 0..(GLOBAL_LOG_CAPACITY + 10) {
            app.push_log(format!("message {i}"));
        }
        assert_eq!(app.log_messages.len(), GLOBAL_LOG_CAPACITY);
        assert!(app.log_messages.back().unwrap().contains("message 73"));
    }
}
