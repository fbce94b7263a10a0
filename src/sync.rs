use std::path::{Path, PathBuf};

use crate::error::HubResult;
use crate::project::Project;

/// Manifest file, kept at the project root. One entry per line:
/// `copy <path>` or `symlink <path>`. Blank lines and `#` comments
/// are skipped.
pub const MANIFEST_FILE: &str = ".barehub.sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Copy,
    Symlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRule {
    pub action: SyncAction,
    pub source: PathBuf,
}

/// Parses manifest text into rules; unknown actions and short lines
/// are ignored rather than fatal, so a hand-edited manifest degrades
/// gracefully.
pub fn parse_manifest(content: &str) -> Vec<SyncRule> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (action, source) = line.split_once(char::is_whitespace)?;
            let action = match action {
                "copy" => SyncAction::Copy,
                "symlink" => SyncAction::Symlink,
                _ => return None,
            };
            Some(SyncRule {
                action,
                source: PathBuf::from(source.trim()),
            })
        })
        .collect()
}

/// Applies the project's manifest to a single worktree directory.
/// Returns the root-relative paths that were propagated. Missing
/// sources are skipped, not errors.
pub fn propagate(project: &Project, worktree: &Path) -> HubResult<Vec<PathBuf>> {
    let manifest = project.root().join(MANIFEST_FILE);
    if !manifest.is_file() {
        return Ok(Vec::new());
    }
    let rules = parse_manifest(&std::fs::read_to_string(&manifest)?);
    let mut applied = Vec::new();

    for rule in rules {
        let source = project.root().join(&rule.source);
        let destination = worktree.join(&rule.source);
        if !source.exists() || source.is_dir() {
            continue;
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match rule.action {
            SyncAction::Copy => {
                std::fs::copy(&source, &destination)?;
            }
            SyncAction::Symlink => {
                if destination.exists() {
                    let _ = std::fs::remove_file(&destination);
                }
                #[cfg(unix)]
                std::os::unix::fs::symlink(&source, &destination)?;
                #[cfg(not(unix))]
                std::fs::copy(&source, &destination)?;
            }
        }
        applied.push(rule.source);
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn manifest_parses_actions_and_skips_noise() {
        let content = "# shared local config\ncopy .env.local\n\nsymlink tools/hooks.sh\nbogus entry\ncopy\n";
        let rules = parse_manifest(content);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].action, SyncAction::Copy);
        assert_eq!(rules[0].source, PathBuf::from(".env.local"));
        assert_eq!(rules[1].action, SyncAction::Symlink);
    }

    #[test]
    fn propagate_copies_listed_files_only() {
        let root = std::env::temp_dir().join(format!("barehub_sync_{}", std::process::id()));
        if root.exists() {
            fs::remove_dir_all(&root).unwrap();
        }
        fs::create_dir_all(root.join(".bare")).unwrap();
        fs::write(root.join(".bare").join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(root.join(".git"), "gitdir: ./.bare\n").unwrap();
        fs::write(root.join(MANIFEST_FILE), "copy .env.local\ncopy missing.txt\n").unwrap();
        fs::write(root.join(".env.local"), "KEY=1\n").unwrap();
        let worktree = root.join("dev");
        fs::create_dir_all(&worktree).unwrap();

        let project = Project::open(&root).unwrap();
        let applied = propagate(&project, &worktree).unwrap();

        assert_eq!(applied, vec![PathBuf::from(".env.local")]);
        assert_eq!(fs::read_to_string(worktree.join(".env.local")).unwrap(), "KEY=1\n");
        assert!(!worktree.join("missing.txt").exists());
        fs::remove_dir_all(&root).unwrap();
    }
}
