use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use thiserror::Error;

/// Environment variable overriding the git executable.
pub const GIT_PATH_ENV: &str = "BAREHUB_GIT_PATH";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("could not launch '{0}'; ensure git is installed and on PATH")]
    ToolMissing(String),

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("could not parse output of git {command}: {detail}")]
    Unparsable { command: String, detail: String },

    #[error("path does not exist: {0}")]
    PathMissing(PathBuf),
}

pub type GitResult<T> = Result<T, GitError>;

/// One entry from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Abbreviated HEAD commit, empty for a bare entry.
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

impl WorktreeEntry {
    /// Directory name, used as the worktree's display name.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A single changed path from porcelain status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    /// Two-character porcelain code, e.g. "M " or " D".
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorktreeStatus {
    pub staged: Vec<FileChange>,
    pub unstaged: Vec<FileChange>,
    pub untracked: Vec<String>,
    /// Commits ahead of / behind upstream; `None` when no upstream is set.
    pub ahead: Option<usize>,
    pub behind: Option<usize>,
}

impl WorktreeStatus {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }

    /// Compact table summary: "+staged ~unstaged ?untracked" or "clean".
    pub fn summary(&self) -> String {
        if self.is_clean() {
            return "clean".to_string();
        }
        let mut parts = Vec::new();
        if !self.staged.is_empty() {
            parts.push(format!("+{}", self.staged.len()));
        }
        if !self.unstaged.is_empty() {
            parts.push(format!("~{}", self.unstaged.len()));
        }
        if !self.untracked.is_empty() {
            parts.push(format!("?{}", self.untracked.len()));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StashEntry {
    /// Stable reference, e.g. "stash@{0}".
    pub reference: String,
    pub summary: String,
}

/// Every git action the orchestration layers need, one method each.
/// Implemented by [`GitCli`] in production and by scripted doubles in
/// tests, so lifecycle and auditor logic can be exercised without a
/// real repository.
pub trait GitGateway: Send + Sync {
    fn clone_bare(&self, url: &str, dest: &Path) -> GitResult<()>;
    fn init_bare(&self, dest: &Path) -> GitResult<()>;
    fn set_head_symref(&self, repo: &Path, branch: &str) -> GitResult<()>;
    fn config_set(&self, repo: &Path, key: &str, value: &str) -> GitResult<()>;
    fn remote_url(&self, dir: &Path) -> GitResult<Option<String>>;

    fn list_worktrees(&self, dir: &Path) -> GitResult<Vec<WorktreeEntry>>;
    fn add_worktree(&self, dir: &Path, path: &Path, branch: &str) -> GitResult<()>;
    fn add_worktree_new_branch(
        &self,
        dir: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> GitResult<()>;
    /// Creates a local branch tracking `origin/<branch>` in one step.
    fn add_worktree_tracking(&self, dir: &Path, path: &Path, branch: &str) -> GitResult<()>;
    fn remove_worktree(&self, dir: &Path, path: &Path, force: bool) -> GitResult<()>;
    fn prune_worktrees(&self, dir: &Path) -> GitResult<()>;
    fn repair_worktrees(&self, dir: &Path) -> GitResult<()>;

    fn fetch(&self, dir: &Path) -> GitResult<()>;
    fn pull(&self, dir: &Path) -> GitResult<()>;
    fn push(&self, dir: &Path) -> GitResult<()>;
    fn rebase(&self, dir: &Path, onto: &str) -> GitResult<()>;

    fn status(&self, dir: &Path) -> GitResult<WorktreeStatus>;
    fn stage_all(&self, dir: &Path) -> GitResult<()>;
    fn stage_file(&self, dir: &Path, file: &str) -> GitResult<()>;
    fn unstage_file(&self, dir: &Path, file: &str) -> GitResult<()>;
    fn unstage_all(&self, dir: &Path) -> GitResult<()>;
    fn commit(&self, dir: &Path, message: &str) -> GitResult<()>;
    fn diff(&self, dir: &Path, staged: bool) -> GitResult<String>;
    fn log(&self, dir: &Path, limit: usize) -> GitResult<Vec<CommitInfo>>;
    fn checkout(&self, dir: &Path, branch: &str, discard: bool) -> GitResult<()>;

    fn current_branch(&self, dir: &Path) -> GitResult<String>;
    fn default_branch(&self, dir: &Path) -> GitResult<String>;
    fn branch_exists(&self, dir: &Path, branch: &str) -> GitResult<bool>;
    fn remote_branch_exists(&self, dir: &Path, branch: &str) -> GitResult<bool>;
    fn list_branches(&self, dir: &Path) -> GitResult<Vec<String>>;

    fn stash_save(&self, dir: &Path, message: &str) -> GitResult<()>;
    fn stash_list(&self, dir: &Path) -> GitResult<Vec<StashEntry>>;
    fn stash_apply(&self, dir: &Path, reference: &str) -> GitResult<()>;
    fn stash_pop(&self, dir: &Path, reference: &str) -> GitResult<()>;
    fn stash_drop(&self, dir: &Path, reference: &str) -> GitResult<()>;
}

/// Production gateway: spawns the `git` binary and consumes only
/// machine-readable output modes.
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        let program = std::env::var(GIT_PATH_ENV).unwrap_or_else(|_| "git".to_string());
        Self { program }
    }

    fn run(&self, dir: Option<&Path>, args: &[&str]) -> GitResult<String> {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = dir {
            if !dir.exists() {
                return Err(GitError::PathMissing(dir.to_path_buf()));
            }
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args);

        let output = cmd
            .output()
            .map_err(|_| GitError::ToolMissing(self.program.clone()))?;

        if !output.status.success() {
            return Err(GitError::Failed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parses `git worktree list --porcelain` output. Blocks are separated
/// by blank lines; attribute lines are `worktree <path>`, `HEAD <sha>`,
/// `branch <ref>`, `bare`, `detached`.
pub fn parse_worktree_list(output: &str) -> Vec<WorktreeEntry> {
    output
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let mut entry = WorktreeEntry {
                path: PathBuf::new(),
                head: String::new(),
                branch: None,
                bare: false,
                detached: false,
            };
            for line in block.lines() {
                if let Some(path) = line.strip_prefix("worktree ") {
                    entry.path = PathBuf::from(path);
                } else if let Some(head) = line.strip_prefix("HEAD ") {
                    entry.head = head.chars().take(7).collect();
                } else if let Some(branch) = line.strip_prefix("branch ") {
                    entry.branch = Some(branch.trim_start_matches("refs/heads/").to_string());
                } else if line == "bare" {
                    entry.bare = true;
                } else if line == "detached" {
                    entry.detached = true;
                }
            }
            entry
        })
        .filter(|e| !e.path.as_os_str().is_empty())
        .collect()
}

/// Parses NUL-delimited `status --porcelain=v1 -z` output. Rename and
/// copy entries carry a second NUL-separated field (the original path)
/// which is consumed and dropped.
pub fn parse_status_z(output: &str) -> WorktreeStatus {
    let mut status = WorktreeStatus::default();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(entry) = fields.next() {
        if entry.len() < 4 {
            continue;
        }
        let code = &entry[..2];
        let path = entry[3..].to_string();
        let (index, tree) = {
            let mut chars = code.chars();
            (chars.next().unwrap_or(' '), chars.next().unwrap_or(' '))
        };

        if index == 'R' || index == 'C' {
            let _original = fields.next();
        }

        if code == "??" {
            status.untracked.push(path);
            continue;
        }
        if index != ' ' && index != '?' {
            status.staged.push(FileChange {
                path: path.clone(),
                code: format!("{index} "),
            });
        }
        if tree != ' ' {
            status.unstaged.push(FileChange {
                path,
                code: format!(" {tree}"),
            });
        }
    }
    status
}

fn parse_history(output: &str) -> Vec<CommitInfo> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.splitn(4, '\0').collect();
            if parts.len() == 4 {
                Some(CommitInfo {
                    hash: parts[0].to_string(),
                    author: parts[1].to_string(),
                    date: parts[2].to_string(),
                    message: parts[3].to_string(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Merges local and remote branch names: locals first, then remote-only
/// branches with the `origin/` prefix stripped, sorted and deduplicated.
pub fn merge_branch_names(output: &str) -> Vec<String> {
    let mut branches = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains("origin/HEAD") || line.starts_with("origin/") {
            continue;
        }
        if seen.insert(line.to_string()) {
            branches.push(line.to_string());
        }
    }
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains("origin/HEAD") {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("origin/")
            && seen.insert(stripped.to_string())
        {
            branches.push(stripped.to_string());
        }
    }
    branches.sort();
    branches
}

impl GitGateway for GitCli {
    fn clone_bare(&self, url: &str, dest: &Path) -> GitResult<()> {
        self.run(None, &["clone", "--bare", "--", url, &dest.to_string_lossy()])?;
        Ok(())
    }

    fn init_bare(&self, dest: &Path) -> GitResult<()> {
        self.run(None, &["init", "--bare", &dest.to_string_lossy()])?;
        Ok(())
    }

    fn set_head_symref(&self, repo: &Path, branch: &str) -> GitResult<()> {
        self.run(
            Some(repo),
            &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")],
        )?;
        Ok(())
    }

    fn config_set(&self, repo: &Path, key: &str, value: &str) -> GitResult<()> {
        self.run(Some(repo), &["config", key, value])?;
        Ok(())
    }

    fn remote_url(&self, dir: &Path) -> GitResult<Option<String>> {
        match self.run(Some(dir), &["remote", "get-url", "origin"]) {
            Ok(out) => Ok(Some(out.trim().to_string())),
            Err(GitError::Failed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_worktrees(&self, dir: &Path) -> GitResult<Vec<WorktreeEntry>> {
        let output = self.run(Some(dir), &["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_list(&output))
    }

    fn add_worktree(&self, dir: &Path, path: &Path, branch: &str) -> GitResult<()> {
        self.run(
            Some(dir),
            &["worktree", "add", "--", &path.to_string_lossy(), branch],
        )?;
        Ok(())
    }

    fn add_worktree_new_branch(
        &self,
        dir: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> GitResult<()> {
        self.run(
            Some(dir),
            &[
                "worktree",
                "add",
                "-b",
                branch,
                "--",
                &path.to_string_lossy(),
                base,
            ],
        )?;
        Ok(())
    }

    fn add_worktree_tracking(&self, dir: &Path, path: &Path, branch: &str) -> GitResult<()> {
        self.run(
            Some(dir),
            &[
                "worktree",
                "add",
                "--track",
                "-b",
                branch,
                "--",
                &path.to_string_lossy(),
                &format!("origin/{branch}"),
            ],
        )?;
        Ok(())
    }

    fn remove_worktree(&self, dir: &Path, path: &Path, force: bool) -> GitResult<()> {
        let path = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push("--");
        args.push(&path);
        self.run(Some(dir), &args)?;
        Ok(())
    }

    fn prune_worktrees(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["worktree", "prune", "-v"])?;
        Ok(())
    }

    fn repair_worktrees(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["worktree", "repair"])?;
        Ok(())
    }

    fn fetch(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["fetch", "--all", "--prune"])?;
        Ok(())
    }

    fn pull(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["pull"])?;
        Ok(())
    }

    fn push(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["push"])?;
        Ok(())
    }

    fn rebase(&self, dir: &Path, onto: &str) -> GitResult<()> {
        self.run(Some(dir), &["rebase", onto])?;
        Ok(())
    }

    fn status(&self, dir: &Path) -> GitResult<WorktreeStatus> {
        let output = self.run(Some(dir), &["status", "--porcelain=v1", "-z"])?;
        let mut status = parse_status_z(&output);

        // "<behind>\t<ahead>" relative to the configured upstream;
        // a missing upstream is not an error, the counts stay None.
        if let Ok(counts) = self.run(
            Some(dir),
            &["rev-list", "--left-right", "--count", "@{upstream}...HEAD"],
        ) {
            let mut it = counts.split_whitespace();
            if let (Some(behind), Some(ahead)) = (it.next(), it.next()) {
                status.behind = behind.parse().ok();
                status.ahead = ahead.parse().ok();
            }
        }
        Ok(status)
    }

    fn stage_all(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["add", "."])?;
        Ok(())
    }

    fn stage_file(&self, dir: &Path, file: &str) -> GitResult<()> {
        self.run(Some(dir), &["add", "--", file])?;
        Ok(())
    }

    fn unstage_file(&self, dir: &Path, file: &str) -> GitResult<()> {
        self.run(Some(dir), &["reset", "HEAD", "--", file])?;
        Ok(())
    }

    fn unstage_all(&self, dir: &Path) -> GitResult<()> {
        self.run(Some(dir), &["restore", "--staged", "."])?;
        Ok(())
    }

    fn commit(&self, dir: &Path, message: &str) -> GitResult<()> {
        self.run(Some(dir), &["commit", "-m", message])?;
        Ok(())
    }

    fn diff(&self, dir: &Path, staged: bool) -> GitResult<String> {
        if staged {
            self.run(Some(dir), &["diff", "--cached"])
        } else {
            self.run(Some(dir), &["diff"])
        }
    }

    fn log(&self, dir: &Path, limit: usize) -> GitResult<Vec<CommitInfo>> {
        let output = self.run(
            Some(dir),
            &[
                "log",
                &format!("-{limit}"),
                "--pretty=format:%h%x00%an%x00%ad%x00%s",
                "--date=short",
            ],
        )?;
        Ok(parse_history(&output))
    }

    fn checkout(&self, dir: &Path, branch: &str, discard: bool) -> GitResult<()> {
        if discard {
            self.run(Some(dir), &["checkout", "--force", branch])?;
        } else {
            self.run(Some(dir), &["checkout", branch])?;
        }
        Ok(())
    }

    fn current_branch(&self, dir: &Path) -> GitResult<String> {
        let out = self.run(Some(dir), &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn default_branch(&self, dir: &Path) -> GitResult<String> {
        if let Ok(out) = self.run(Some(dir), &["symbolic-ref", "refs/remotes/origin/HEAD"]) {
            if let Some(name) = out.trim().rsplit('/').next() {
                return Ok(name.to_string());
            }
        }
        for candidate in ["main", "master"] {
            if self.branch_exists(dir, candidate)? {
                return Ok(candidate.to_string());
            }
        }
        self.current_branch(dir)
    }

    fn branch_exists(&self, dir: &Path, branch: &str) -> GitResult<bool> {
        match self.run(
            Some(dir),
            &[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{branch}"),
            ],
        ) {
            Ok(_) => Ok(true),
            Err(GitError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn remote_branch_exists(&self, dir: &Path, branch: &str) -> GitResult<bool> {
        match self.run(
            Some(dir),
            &[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/remotes/origin/{branch}"),
            ],
        ) {
            Ok(_) => Ok(true),
            Err(GitError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_branches(&self, dir: &Path) -> GitResult<Vec<String>> {
        let output = self.run(Some(dir), &["branch", "-a", "--format=%(refname:short)"])?;
        Ok(merge_branch_names(&output))
    }

    fn stash_save(&self, dir: &Path, message: &str) -> GitResult<()> {
        self.run(
            Some(dir),
            &["stash", "push", "--include-untracked", "-m", message],
        )?;
        Ok(())
    }

    fn stash_list(&self, dir: &Path) -> GitResult<Vec<StashEntry>> {
        let output = self.run(Some(dir), &["stash", "list", "--format=%gd%x00%gs"])?;
        Ok(output
            .lines()
            .filter_map(|line| {
                let (reference, summary) = line.split_once('\0')?;
                Some(StashEntry {
                    reference: reference.to_string(),
                    summary: summary.to_string(),
                })
            })
            .collect())
    }

    fn stash_apply(&self, dir: &Path, reference: &str) -> GitResult<()> {
        self.run(Some(dir), &["stash", "apply", reference])?;
        Ok(())
    }

    fn stash_pop(&self, dir: &Path, reference: &str) -> GitResult<()> {
        self.run(Some(dir), &["stash", "pop", reference])?;
        Ok(())
    }

    fn stash_drop(&self, dir: &Path, reference: &str) -> GitResult<()> {
        self.run(Some(dir), &["stash", "drop", reference])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worktree_list_parses_bare_and_branch_entries() {
        let output = "worktree /proj/.bare\nbare\n\nworktree /proj/main\nHEAD 0123456789abcdef\nbranch refs/heads/main\n\nworktree /proj/spike\nHEAD fedcba9876543210\ndetached\n";
        let entries = parse_worktree_list(output);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].bare);
        assert_eq!(entries[1].branch.as_deref(), Some("main"));
        assert_eq!(entries[1].head, "0123456");
        assert_eq!(entries[1].name(), "main");
        assert!(entries[2].detached);
        assert_eq!(entries[2].branch, None);
    }

    #[test]
    fn status_z_splits_staged_unstaged_untracked() {
        let output = "M  staged.rs\0 M unstaged.rs\0?? new.rs\0MM both.rs\0";
        let status = parse_status_z(output);
        assert_eq!(status.staged.len(), 2);
        assert_eq!(status.unstaged.len(), 2);
        assert_eq!(status.untracked, vec!["new.rs".to_string()]);
        assert_eq!(status.summary(), "+2 ~2 ?1");
    }

    #[test]
    fn status_z_consumes_rename_source_field() {
        let output = "R  new_name.rs\0old_name.rs\0?? other.rs\0";
        let status = parse_status_z(output);
        assert_eq!(status.staged.len(), 1);
        assert_eq!(status.staged[0].path, "new_name.rs");
        assert_eq!(status.untracked, vec!["other.rs".to_string()]);
    }

    #[test]
    fn clean_status_summary() {
        let status = WorktreeStatus::default();
        assert!(status.is_clean());
        assert_eq!(status.summary(), "clean");
    }

    #[test]
    fn branch_merge_prefers_local_and_dedupes_remote() {
        let output = "main\nfeature-x\norigin/HEAD\norigin/main\norigin/feature-y\n";
        let branches = merge_branch_names(output);
        assert_eq!(branches, vec!["feature-x", "feature-y", "main"]);
    }

    #[test]
    fn history_parses_nul_separated_records() {
        let output = "abc1234\0Alice\02026-01-02\0fix parser\n";
        let commits = parse_history(output);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].author, "Alice");
        assert_eq!(commits[0].message, "fix parser");
    }
}
