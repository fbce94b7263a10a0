use std::path::PathBuf;

use thiserror::Error;

use crate::gateway::GitError;

/// Typed failures surfaced by the lifecycle, auditor and teleport layers.
///
/// The interactive layer converts these into transient status messages;
/// the CLI renders them directly.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("'{0}' is not a bare-hub project (missing or invalid pointer/engine)")]
    NotAProject(PathBuf),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("worktree name '{0}' is already in use")]
    NameConflict(String),

    #[error("'{0}' is not a valid worktree name (must be a plain, non-hidden directory name)")]
    InvalidName(String),

    #[error("'{0}' has uncommitted changes; re-run with the explicit override flag")]
    UnsafeOverwrite(String),

    #[error("no worktree named '{0}'")]
    UnknownWorktree(String),

    #[error("branch '{0}' does not exist locally or on origin")]
    UnknownBranch(String),

    #[error("worktree record for '{0}' is stale (metadata and disk state diverged)")]
    StaleMetadata(String),

    #[error("current directory '{0}' is not inside a managed worktree")]
    NotInWorktree(PathBuf),

    #[error("already inside target worktree '{0}'")]
    SameWorktree(String),

    #[error("directory '{0}' is not empty")]
    NotEmpty(PathBuf),

    #[error("changes preserved in {stash_ref}: {reason}")]
    TeleportConflict { stash_ref: String, reason: String },

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),
}

pub type HubResult<T> = Result<T, HubError>;
