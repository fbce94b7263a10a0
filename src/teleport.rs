use std::path::Path;

use serde::Serialize;
use time::OffsetDateTime;

use crate::error::{HubError, HubResult};
use crate::gateway::GitGateway;
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TeleportOutcome {
    /// Source was clean; nothing to move.
    NothingToMove,
    Moved { stash_ref: String, target: String },
}

/// Moves uncommitted changes between worktrees through the shared
/// stash ref. Worktrees of one project share a single engine, so a
/// stash saved in the source is addressable from the target.
pub struct TeleportBridge<'a> {
    git: &'a dyn GitGateway,
}

impl<'a> TeleportBridge<'a> {
    pub fn new(git: &'a dyn GitGateway) -> Self {
        Self { git }
    }

    /// Stash in `source`, apply in the target, drop only on successful
    /// apply. A failed apply leaves the stash listed and returns its
    /// reference, so the change set can never become unrecoverable.
    pub fn teleport(
        &self,
        project: &Project,
        source: &Path,
        target_name: &str,
    ) -> HubResult<TeleportOutcome> {
        let target = self
            .git
            .list_worktrees(project.root())?
            .into_iter()
            .filter(|e| !e.bare)
            .find(|e| e.name() == target_name)
            .ok_or_else(|| HubError::UnknownWorktree(target_name.to_string()))?;

        let same = match (source.canonicalize(), target.path.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => source == target.path,
        };
        if same {
            return Err(HubError::SameWorktree(target_name.to_string()));
        }

        if self.git.status(source)?.is_clean() {
            return Ok(TeleportOutcome::NothingToMove);
        }

        let tag = teleport_tag(OffsetDateTime::now_utc().unix_timestamp());
        self.git.stash_save(source, &tag)?;

        let stash_ref = self
            .git
            .stash_list(source)?
            .into_iter()
            .find(|s| s.summary.contains(&tag))
            .map(|s| s.reference)
            .unwrap_or_else(|| "stash@{0}".to_string());

        if let Err(apply_err) = self.git.stash_apply(&target.path, &stash_ref) {
            return Err(HubError::TeleportConflict {
                stash_ref,
                reason: apply_err.to_string(),
            });
        }
        self.git.stash_drop(source, &stash_ref)?;

        Ok(TeleportOutcome::Moved {
            stash_ref,
            target: target_name.to_string(),
        })
    }
}

fn teleport_tag(timestamp: i64) -> String {
    format!("barehub-teleport-{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_unique_per_timestamp() {
        assert_eq!(teleport_tag(1_700_000_000), "barehub-teleport-1700000000");
        assert_ne!(teleport_tag(1), teleport_tag(2));
    }
}
