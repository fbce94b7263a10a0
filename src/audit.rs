use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::HubResult;
use crate::gateway::{GitGateway, WorktreeEntry};
use crate::project::Project;

/// Build-artifact directory names eligible for purging. Nothing
/// outside this list is ever deleted.
pub const ARTIFACT_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "build",
    "dist",
    ".gradle",
    "bin",
    "obj",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Admin records whose linkage diverged from reality.
    pub stale: Vec<String>,
    /// Whether the engine's prune actually ran (false on dry run or
    /// when nothing was stale).
    pub pruned: bool,
    /// Artifact directories removed (or, on dry run, that would be).
    pub artifacts: Vec<PathBuf>,
}

/// Detects and repairs divergence between the engine's administrative
/// records and what is actually on disk.
pub struct Auditor<'a> {
    git: &'a dyn GitGateway,
}

impl<'a> Auditor<'a> {
    pub fn new(git: &'a dyn GitGateway) -> Self {
        Self { git }
    }

    /// Runs the audit. Dry run performs every read and validation step
    /// but mutates nothing; a second dry run reports the identical set.
    pub fn clean(
        &self,
        project: &Project,
        artifacts: bool,
        dry_run: bool,
        current_dir: &Path,
    ) -> HubResult<CleanReport> {
        let registered = self.git.list_worktrees(project.root())?;
        let valid_paths: HashSet<PathBuf> = registered
            .iter()
            .map(|e| canonical_or_raw(&e.path))
            .collect();

        let stale = stale_names(&project.admin_dir(), &valid_paths)?;
        let mut pruned = false;
        if !dry_run && !stale.is_empty() {
            self.git.prune_worktrees(project.root())?;
            pruned = true;
        }

        let mut removed_artifacts = Vec::new();
        if artifacts {
            for target in artifact_targets(&registered, current_dir) {
                if dry_run {
                    removed_artifacts.push(target);
                } else if fs::remove_dir_all(&target).is_ok() {
                    removed_artifacts.push(target);
                }
            }
        }

        Ok(CleanReport {
            stale,
            pruned,
            artifacts: removed_artifacts,
        })
    }
}

/// Scans the engine's per-worktree admin directory. A record is stale
/// when its gitdir link is missing or unreadable, the path it names is
/// gone, or that path is absent from the authoritative list.
pub fn stale_names(admin_dir: &Path, valid_paths: &HashSet<PathBuf>) -> HubResult<Vec<String>> {
    if !admin_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stale = Vec::new();
    for entry in fs::read_dir(admin_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let gitdir_file = entry.path().join("gitdir");

        let is_stale = match fs::read_to_string(&gitdir_file) {
            Ok(content) => {
                let recorded = content.trim().trim_end_matches("/.git");
                if recorded.is_empty() {
                    true
                } else {
                    let path = Path::new(recorded);
                    !path.exists() || !valid_paths.contains(&canonical_or_raw(path))
                }
            }
            Err(_) => true,
        };
        if is_stale {
            stale.push(name);
        }
    }
    stale.sort();
    Ok(stale)
}

/// Enumerates artifact directories eligible for deletion. The current
/// worktree is excluded by canonicalized-path containment, never by
/// string prefix.
pub fn artifact_targets(worktrees: &[WorktreeEntry], current_dir: &Path) -> Vec<PathBuf> {
    let current = canonical_or_raw(current_dir);
    let mut targets = Vec::new();

    for entry in worktrees {
        if entry.bare || !entry.path.exists() {
            continue;
        }
        let worktree = canonical_or_raw(&entry.path);
        if current.starts_with(&worktree) {
            continue;
        }
        for artifact in ARTIFACT_DIRS {
            let target = entry.path.join(artifact);
            if target.is_dir() {
                targets.push(target);
            }
        }
    }
    targets
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
