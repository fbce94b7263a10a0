//! Test doubles shared by the integration tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use barehub::gateway::{
    CommitInfo, GitError, GitGateway, GitResult, StashEntry, WorktreeEntry, WorktreeStatus,
};
use barehub::project::{ENGINE_DIR, POINTER_CONTENT, POINTER_FILE};

/// In-memory gateway: keeps a registry of worktrees and stashes,
/// mirrors registrations onto the real filesystem, and records every
/// mutating call so tests can assert on what ran.
#[derive(Default)]
pub struct ScriptedGit {
    pub worktrees: Mutex<Vec<WorktreeEntry>>,
    pub statuses: Mutex<HashMap<PathBuf, WorktreeStatus>>,
    pub stashes: Mutex<Vec<StashEntry>>,
    pub branches: Mutex<Vec<String>>,
    pub remote_branches: Mutex<Vec<String>>,
    pub current_branch: Mutex<String>,
    pub fail_stash_apply: bool,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self {
            current_branch: Mutex::new("main".to_string()),
            ..Self::default()
        }
    }

    pub fn register(&self, path: &Path, branch: &str) {
        fs::create_dir_all(path).unwrap();
        self.worktrees.lock().unwrap().push(WorktreeEntry {
            path: path.to_path_buf(),
            head: "abc1234".to_string(),
            branch: Some(branch.to_string()),
            bare: false,
            detached: false,
        });
    }

    pub fn set_status(&self, path: &Path, status: WorktreeStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls()
            .iter()
            .any(|call| call.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Scratch project in the bare-hub layout, deleted on drop.
pub struct HubFixture {
    pub root: PathBuf,
}

impl HubFixture {
    pub fn new(tag: &str) -> Self {
        let root =
            std::env::temp_dir().join(format!("barehub_it_{tag}_{}", std::process::id()));
        if root.exists() {
            fs::remove_dir_all(&root).unwrap();
        }
        fs::create_dir_all(root.join(ENGINE_DIR)).unwrap();
        fs::write(
            root.join(ENGINE_DIR).join("HEAD"),
            "ref: refs/heads/main\n",
        )
        .unwrap();
        fs::write(root.join(POINTER_FILE), POINTER_CONTENT).unwrap();
        Self { root }
    }
}

impl Drop for HubFixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

pub fn dirty_status() -> WorktreeStatus {
    WorktreeStatus {
        staged: Vec::new(),
        unstaged: Vec::new(),
        untracked: vec!["scratch.txt".to_string()],
        ahead: None,
        behind: None,
    }
}

impl GitGateway for ScriptedGit {
    fn clone_bare(&self, url: &str, dest: &Path) -> GitResult<()> {
        self.record(format!("clone_bare {url} {}", dest.display()));
        fs::create_dir_all(dest).map_err(|_| GitError::PathMissing(dest.to_path_buf()))?;
        Ok(())
    }

    fn init_bare(&self, dest: &Path) -> GitResult<()> {
        self.record(format!("init_bare {}", dest.display()));
        fs::create_dir_all(dest).map_err(|_| GitError::PathMissing(dest.to_path_buf()))?;
        fs::write(dest.join("HEAD"), "ref: refs/heads/main\n")
            .map_err(|_| GitError::PathMissing(dest.to_path_buf()))?;
        Ok(())
    }

    fn set_head_symref(&self, _repo: &Path, branch: &str) -> GitResult<()> {
        self.record(format!("set_head_symref {branch}"));
        Ok(())
    }

    fn config_set(&self, _repo: &Path, key: &str, value: &str) -> GitResult<()> {
        self.record(format!("config_set {key}={value}"));
        Ok(())
    }

    fn remote_url(&self, _dir: &Path) -> GitResult<Option<String>> {
        Ok(Some("https://example.test/origin.git".to_string()))
    }

    fn list_worktrees(&self, _dir: &Path) -> GitResult<Vec<WorktreeEntry>> {
        Ok(self.worktrees.lock().unwrap().clone())
    }

    fn add_worktree(&self, _dir: &Path, path: &Path, branch: &str) -> GitResult<()> {
        self.record(format!("add_worktree {} {branch}", path.display()));
        self.register(path, branch);
        Ok(())
    }

    fn add_worktree_new_branch(
        &self,
        _dir: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> GitResult<()> {
        self.record(format!(
            "add_worktree_new_branch {} {branch} {base}",
            path.display()
        ));
        self.branches.lock().unwrap().push(branch.to_string());
        self.register(path, branch);
        Ok(())
    }

    fn add_worktree_tracking(&self, _dir: &Path, path: &Path, branch: &str) -> GitResult<()> {
        self.record(format!("add_worktree_tracking {} {branch}", path.display()));
        self.branches.lock().unwrap().push(branch.to_string());
        self.register(path, branch);
        Ok(())
    }

    fn remove_worktree(&self, _dir: &Path, path: &Path, force: bool) -> GitResult<()> {
        self.record(format!("remove_worktree {} force={force}", path.display()));
        self.worktrees
            .lock()
            .unwrap()
            .retain(|entry| entry.path != path);
        let _ = fs::remove_dir_all(path);
        Ok(())
    }

    fn prune_worktrees(&self, _dir: &Path) -> GitResult<()> {
        self.record("prune_worktrees".to_string());
        Ok(())
    }

    fn repair_worktrees(&self, _dir: &Path) -> GitResult<()> {
        self.record("repair_worktrees".to_string());
        Ok(())
    }

    fn fetch(&self, _dir: &Path) -> GitResult<()> {
        self.record("fetch".to_string());
        Ok(())
    }

    fn pull(&self, _dir: &Path) -> GitResult<()> {
        self.record("pull".to_string());
        Ok(())
    }

    fn push(&self, _dir: &Path) -> GitResult<()> {
        self.record("push".to_string());
        Ok(())
    }

    fn rebase(&self, _dir: &Path, onto: &str) -> GitResult<()> {
        self.record(format!("rebase {onto}"));
        Ok(())
    }

    fn status(&self, dir: &Path) -> GitResult<WorktreeStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(dir)
            .cloned()
            .unwrap_or_default())
    }

    fn stage_all(&self, _dir: &Path) -> GitResult<()> {
        self.record("stage_all".to_string());
        Ok(())
    }

    fn stage_file(&self, _dir: &Path, file: &str) -> GitResult<()> {
        self.record(format!("stage_file {file}"));
        Ok(())
    }

    fn unstage_file(&self, _dir: &Path, file: &str) -> GitResult<()> {
        self.record(format!("unstage_file {file}"));
        Ok(())
    }

    fn unstage_all(&self, _dir: &Path) -> GitResult<()> {
        self.record("unstage_all".to_string());
        Ok(())
    }

    fn commit(&self, _dir: &Path, message: &str) -> GitResult<()> {
        self.record(format!("commit {message}"));
        Ok(())
    }

    fn diff(&self, _dir: &Path, staged: bool) -> GitResult<String> {
        self.record(format!("diff staged={staged}"));
        Ok(String::new())
    }

    fn log(&self, _dir: &Path, _limit: usize) -> GitResult<Vec<CommitInfo>> {
        Ok(Vec::new())
    }

    fn checkout(&self, _dir: &Path, branch: &str, discard: bool) -> GitResult<()> {
        self.record(format!("checkout {branch} discard={discard}"));
        Ok(())
    }

    fn current_branch(&self, _dir: &Path) -> GitResult<String> {
        Ok(self.current_branch.lock().unwrap().clone())
    }

    fn default_branch(&self, _dir: &Path) -> GitResult<String> {
        Ok("main".to_string())
    }

    fn branch_exists(&self, _dir: &Path, branch: &str) -> GitResult<bool> {
        Ok(self
            .branches
            .lock()
            .unwrap()
            .iter()
            .any(|b| b == branch))
    }

    fn remote_branch_exists(&self, _dir: &Path, branch: &str) -> GitResult<bool> {
        Ok(self
            .remote_branches
            .lock()
            .unwrap()
            .iter()
            .any(|b| b == branch))
    }

    fn list_branches(&self, _dir: &Path) -> GitResult<Vec<String>> {
        Ok(self.branches.lock().unwrap().clone())
    }

    fn stash_save(&self, _dir: &Path, message: &str) -> GitResult<()> {
        self.record(format!("stash_save {message}"));
        let mut stashes = self.stashes.lock().unwrap();
        stashes.insert(
            0,
            StashEntry {
                reference: "stash@{0}".to_string(),
                summary: format!("On main: {message}"),
            },
        );
        Ok(())
    }

    fn stash_list(&self, _dir: &Path) -> GitResult<Vec<StashEntry>> {
        Ok(self.stashes.lock().unwrap().clone())
    }

    fn stash_apply(&self, _dir: &Path, reference: &str) -> GitResult<()> {
        self.record(format!("stash_apply {reference}"));
        if self.fail_stash_apply {
            return Err(GitError::Failed {
                command: "git stash apply".to_string(),
                stderr: "CONFLICT (content): merge conflict".to_string(),
            });
        }
        Ok(())
    }

    fn stash_pop(&self, _dir: &Path, reference: &str) -> GitResult<()> {
        self.record(format!("stash_pop {reference}"));
        self.stashes
            .lock()
            .unwrap()
            .retain(|s| s.reference != reference);
        Ok(())
    }

    fn stash_drop(&self, _dir: &Path, reference: &str) -> GitResult<()> {
        self.record(format!("stash_drop {reference}"));
        self.stashes
            .lock()
            .unwrap()
            .retain(|s| s.reference != reference);
        Ok(())
    }
}
