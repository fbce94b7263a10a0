use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HubError, HubResult};

/// Directory holding the shared object store (the engine).
pub const ENGINE_DIR: &str = ".bare";
/// Root-level marker file redirecting git to the engine.
pub const POINTER_FILE: &str = ".git";
/// Expected pointer file content.
pub const POINTER_CONTENT: &str = "gitdir: ./.bare\n";

/// A bare-hub project: one engine plus N peer worktree directories
/// under a common root. Pure state, no behavior beyond path math
/// and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Opens the project rooted at `root`, validating the pointer file
    /// and the engine it names. An invalid pointer or missing engine is
    /// an error, never silently treated as a normal repository.
    pub fn open(root: &Path) -> HubResult<Self> {
        let pointer = root.join(POINTER_FILE);
        if !pointer.is_file() {
            return Err(HubError::NotAProject(root.to_path_buf()));
        }
        let content =
            fs::read_to_string(&pointer).map_err(|_| HubError::NotAProject(root.to_path_buf()))?;
        let Some(gitdir) = content.trim().strip_prefix("gitdir:") else {
            return Err(HubError::NotAProject(root.to_path_buf()));
        };
        let engine = root.join(gitdir.trim());
        // A bare repository always carries a HEAD file at its top level.
        if !engine.is_dir() || !engine.join("HEAD").is_file() {
            return Err(HubError::NotAProject(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Walks up from `start` looking for a valid project root. Covers
    /// being invoked from inside a worktree, whose own `.git` file
    /// points at the engine's per-worktree admin directory.
    pub fn discover(start: &Path) -> HubResult<Self> {
        for dir in start.ancestors() {
            if let Ok(project) = Self::open(dir) {
                return Ok(project);
            }
        }
        Err(HubError::NotAProject(start.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn engine_dir(&self) -> PathBuf {
        self.root.join(ENGINE_DIR)
    }

    pub fn pointer_file(&self) -> PathBuf {
        self.root.join(POINTER_FILE)
    }

    /// Engine-owned administrative records, one directory per worktree.
    pub fn admin_dir(&self) -> PathBuf {
        self.engine_dir().join("worktrees")
    }

    /// Where a worktree named `name` lives: always a direct child of
    /// the root (flat peer structure).
    pub fn worktree_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// What kind of repository a directory holds, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    BareHub,
    Standard,
    None,
}

/// Filesystem-only probe of `dir`. Used by `convert`/`migrate` to
/// refuse running against the wrong layout.
pub fn probe(dir: &Path) -> RepoKind {
    if Project::open(dir).is_ok() {
        return RepoKind::BareHub;
    }
    if dir.join(".git").is_dir() {
        return RepoKind::Standard;
    }
    RepoKind::None
}
