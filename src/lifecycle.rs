use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{HubError, HubResult};
use crate::gateway::{GitGateway, WorktreeEntry};
use crate::project::{self, Project, RepoKind, ENGINE_DIR, POINTER_CONTENT, POINTER_FILE};
use crate::sync;

/// Staging directory used while migrating in place. Lives under the
/// repository root so every swap step is a same-filesystem rename.
const MIGRATE_STAGING: &str = ".barehub-migrate";

/// What `migrate` would do (dry run) or did (applied).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub root: PathBuf,
    pub engine: PathBuf,
    pub branch: String,
    pub worktree: PathBuf,
    pub carries_changes: bool,
    pub applied: bool,
}

/// Creates, converts and retires worktrees against a [`GitGateway`].
/// All safety checks (collisions, dirty trees, flat-peer layout) live
/// here; the gateway stays a thin process wrapper.
pub struct Lifecycle<'a> {
    git: &'a dyn GitGateway,
}

impl<'a> Lifecycle<'a> {
    pub fn new(git: &'a dyn GitGateway) -> Self {
        Self { git }
    }

    /// Creates a new project at `root`: bare clone of `url` when given,
    /// empty bare engine otherwise. Refuses a non-empty `root` that is
    /// not already a project unless `force` is set.
    pub fn init(&self, root: &Path, url: Option<&str>, force: bool) -> HubResult<Project> {
        if let Ok(existing) = Project::open(root) {
            return Ok(existing);
        }
        if root.exists() {
            let occupied = fs::read_dir(root)?.next().is_some();
            if occupied && !force {
                return Err(HubError::NotEmpty(root.to_path_buf()));
            }
        } else {
            fs::create_dir_all(root)?;
        }

        let engine = root.join(ENGINE_DIR);
        if let Some(url) = url {
            self.git.clone_bare(url, &engine)?;
            self.git.config_set(
                &engine,
                "remote.origin.fetch",
                "+refs/heads/*:refs/remotes/origin/*",
            )?;
        } else {
            self.git.init_bare(&engine)?;
            self.git.set_head_symref(&engine, "main")?;
        }
        fs::write(root.join(POINTER_FILE), POINTER_CONTENT)?;
        if url.is_some() {
            self.git.fetch(root)?;
        }
        Project::open(root)
    }

    /// Ensures the default-branch worktree and a `dev` worktree exist.
    /// Returns the names actually created; both already existing is a
    /// no-op, not an error.
    pub fn setup(&self, project: &Project) -> HubResult<Vec<String>> {
        let root = project.root();
        let existing: Vec<String> = self
            .git
            .list_worktrees(root)?
            .iter()
            .filter(|e| !e.bare)
            .map(WorktreeEntry::name)
            .collect();
        let default = self.git.default_branch(root)?;
        let mut created = Vec::new();

        if !existing.contains(&default) {
            let path = project.worktree_path(&default);
            if self.git.branch_exists(root, &default)? {
                self.git.add_worktree(root, &path, &default)?;
            } else if self.git.remote_branch_exists(root, &default)? {
                self.git.add_worktree_tracking(root, &path, &default)?;
            } else {
                self.git
                    .add_worktree_new_branch(root, &path, &default, "HEAD")?;
            }
            sync::propagate(project, &path)?;
            created.push(default.clone());
        }

        if !existing.contains(&"dev".to_string()) && default != "dev" {
            let path = project.worktree_path("dev");
            if self.git.branch_exists(root, "dev")? {
                self.git.add_worktree(root, &path, "dev")?;
            } else {
                self.git
                    .add_worktree_new_branch(root, &path, "dev", &default)?;
            }
            sync::propagate(project, &path)?;
            created.push("dev".to_string());
        }
        Ok(created)
    }

    /// Adds a worktree named `name`. With `branch`, checks that branch
    /// out (creating a local tracking branch when it only exists on
    /// origin); without, creates a new branch named after the worktree.
    pub fn add(&self, project: &Project, name: &str, branch: Option<&str>) -> HubResult<PathBuf> {
        validate_name(name)?;
        let root = project.root();
        let path = project.worktree_path(name);

        if path.exists() {
            return Err(HubError::NameConflict(name.to_string()));
        }
        let registered = self.git.list_worktrees(root)?;
        if registered.iter().any(|e| e.name() == name) {
            return Err(HubError::NameConflict(name.to_string()));
        }

        match branch {
            Some(branch) => {
                if self.git.branch_exists(root, branch)? {
                    self.git.add_worktree(root, &path, branch)?;
                } else if self.git.remote_branch_exists(root, branch)? {
                    self.git.add_worktree_tracking(root, &path, branch)?;
                } else {
                    return Err(HubError::UnknownBranch(branch.to_string()));
                }
            }
            None => {
                if self.git.branch_exists(root, name)? {
                    self.git.add_worktree(root, &path, name)?;
                } else {
                    self.git.add_worktree_new_branch(root, &path, name, "HEAD")?;
                }
            }
        }
        sync::propagate(project, &path)?;
        Ok(path)
    }

    /// Unregisters and deletes the named worktree. A dirty tree blocks
    /// removal unless `force` is set; `force` always wins.
    pub fn remove(&self, project: &Project, name: &str, force: bool) -> HubResult<()> {
        let entry = self.find(project, name)?;
        if !force && entry.path.exists() {
            let status = self.git.status(&entry.path)?;
            if !status.is_clean() {
                return Err(HubError::UnsafeOverwrite(name.to_string()));
            }
        }
        self.git.remove_worktree(project.root(), &entry.path, force)?;
        Ok(())
    }

    /// Resolves the absolute path of the named worktree. Pure lookup,
    /// mutates nothing; shell integration does the actual `cd`.
    pub fn switch(&self, project: &Project, name: &str) -> HubResult<PathBuf> {
        let entry = self.find(project, name)?;
        if !entry.path.exists() {
            return Err(HubError::StaleMetadata(name.to_string()));
        }
        Ok(entry.path)
    }

    /// Re-points an existing worktree at `branch`. Uncommitted changes
    /// are a hard block without the explicit `discard` flag.
    pub fn checkout(
        &self,
        project: &Project,
        name: &str,
        branch: &str,
        discard: bool,
    ) -> HubResult<()> {
        let entry = self.find(project, name)?;
        let root = project.root();
        if !discard && !self.git.status(&entry.path)?.is_clean() {
            return Err(HubError::UnsafeOverwrite(name.to_string()));
        }
        if !self.git.branch_exists(root, branch)?
            && !self.git.remote_branch_exists(root, branch)?
        {
            return Err(HubError::UnknownBranch(branch.to_string()));
        }
        self.git.checkout(&entry.path, branch, discard)?;
        Ok(())
    }

    /// Builds a fresh sibling hub from a standard repository via a
    /// local bare clone. The original repository is left untouched.
    pub fn convert(
        &self,
        repo: &Path,
        name: Option<&str>,
        branch: Option<&str>,
    ) -> HubResult<Project> {
        if project::probe(repo) != RepoKind::Standard {
            return Err(HubError::NotAProject(repo.to_path_buf()));
        }
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.git.current_branch(repo)?,
        };
        let repo_name = repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let hub_name = name.map_or_else(|| format!("{repo_name}-hub"), ToString::to_string);
        let parent = repo
            .parent()
            .ok_or_else(|| HubError::NotAProject(repo.to_path_buf()))?;
        let hub_dir = parent.join(&hub_name);
        if hub_dir.exists() {
            return Err(HubError::NotEmpty(hub_dir));
        }

        fs::create_dir_all(&hub_dir)?;
        let engine = hub_dir.join(ENGINE_DIR);
        self.git.clone_bare(&repo.to_string_lossy(), &engine)?;
        fs::write(hub_dir.join(POINTER_FILE), POINTER_CONTENT)?;

        // Point origin back at the real remote, not the local source.
        if let Some(url) = self.git.remote_url(repo)? {
            self.git.config_set(&engine, "remote.origin.url", &url)?;
        }

        let worktree = hub_dir.join(dir_name_for_branch(&branch));
        self.git.add_worktree(&hub_dir, &worktree, &branch)?;
        Project::open(&hub_dir)
    }

    /// Converts the standard repository at `cwd` into a bare-hub layout
    /// in place. All expensive work happens in a staging directory; the
    /// visible switch is a short sequence of same-filesystem renames,
    /// rolled back on failure so the repository is never half-converted.
    pub fn migrate(&self, cwd: &Path, force: bool, dry_run: bool) -> HubResult<MigrationPlan> {
        if project::probe(cwd) != RepoKind::Standard {
            return Err(HubError::NotAProject(cwd.to_path_buf()));
        }
        let branch = self.git.current_branch(cwd)?;
        let dirty = !self.git.status(cwd)?.is_clean();
        let worktree_name = dir_name_for_branch(&branch);
        let plan = MigrationPlan {
            root: cwd.to_path_buf(),
            engine: cwd.join(ENGINE_DIR),
            branch: branch.clone(),
            worktree: cwd.join(&worktree_name),
            carries_changes: dirty,
            applied: false,
        };
        if dry_run {
            return Ok(plan);
        }
        if dirty && !force {
            return Err(HubError::UnsafeOverwrite(worktree_name));
        }

        let staging = cwd.join(MIGRATE_STAGING);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let result = self.stage_and_swap(cwd, &staging, &branch, &worktree_name);
        match result {
            Ok(()) => {
                let _ = fs::remove_dir_all(&staging);
                Ok(MigrationPlan {
                    applied: true,
                    ..plan
                })
            }
            Err(e) => {
                rollback_migration(cwd, &staging, &worktree_name);
                Err(e)
            }
        }
    }

    fn stage_and_swap(
        &self,
        cwd: &Path,
        staging: &Path,
        branch: &str,
        worktree_name: &str,
    ) -> HubResult<()> {
        let staged_engine = staging.join("engine");
        copy_dir_all(&cwd.join(".git"), &staged_engine)?;
        self.git.config_set(&staged_engine, "core.bare", "true")?;

        // Per-worktree admin record, written by hand so the existing
        // checkout becomes a registered worktree without re-checkout.
        let admin = staged_engine.join("worktrees").join(worktree_name);
        fs::create_dir_all(&admin)?;
        let worktree_dir = cwd.join(worktree_name);
        fs::write(
            admin.join("gitdir"),
            format!("{}\n", worktree_dir.join(".git").display()),
        )?;
        fs::write(admin.join("HEAD"), format!("ref: refs/heads/{branch}\n"))?;
        fs::write(admin.join("commondir"), "../..\n")?;
        let shared_index = staged_engine.join("index");
        if shared_index.exists() {
            fs::rename(&shared_index, admin.join("index"))?;
        }

        // Swap phase: renames only.
        fs::rename(&staged_engine, cwd.join(ENGINE_DIR))?;
        fs::create_dir_all(&worktree_dir)?;
        for entry in fs::read_dir(cwd)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let keep = [
                ".git",
                ENGINE_DIR,
                MIGRATE_STAGING,
                worktree_name,
            ];
            if keep.iter().any(|k| file_name == *k) {
                continue;
            }
            fs::rename(entry.path(), worktree_dir.join(&file_name))?;
        }
        fs::write(
            worktree_dir.join(".git"),
            format!(
                "gitdir: {}\n",
                cwd.join(ENGINE_DIR).join("worktrees").join(worktree_name).display()
            ),
        )?;
        fs::rename(cwd.join(".git"), staging.join("old_git"))?;
        fs::write(cwd.join(POINTER_FILE), POINTER_CONTENT)?;

        // Let git fix up any linkage details the hand-written record missed.
        self.git.repair_worktrees(&worktree_dir)?;
        Ok(())
    }

    fn find(&self, project: &Project, name: &str) -> HubResult<WorktreeEntry> {
        self.git
            .list_worktrees(project.root())?
            .into_iter()
            .filter(|e| !e.bare)
            .find(|e| e.name() == name)
            .ok_or_else(|| HubError::UnknownWorktree(name.to_string()))
    }
}

/// Best-effort restore of the pre-migration layout. Every step is
/// optional: whatever already moved back stays back.
fn rollback_migration(cwd: &Path, staging: &Path, worktree_name: &str) {
    let worktree_dir = cwd.join(worktree_name);
    if worktree_dir.is_dir() {
        let _ = fs::remove_file(worktree_dir.join(".git"));
        if let Ok(entries) = fs::read_dir(&worktree_dir) {
            for entry in entries.flatten() {
                let _ = fs::rename(entry.path(), cwd.join(entry.file_name()));
            }
        }
        let _ = fs::remove_dir(&worktree_dir);
    }
    let pointer = cwd.join(POINTER_FILE);
    if pointer.is_file() {
        let _ = fs::remove_file(&pointer);
    }
    let old_git = staging.join("old_git");
    if old_git.is_dir() && !cwd.join(".git").exists() {
        let _ = fs::rename(&old_git, cwd.join(".git"));
    }
    let _ = fs::remove_dir_all(cwd.join(ENGINE_DIR));
    let _ = fs::remove_dir_all(staging);
}

fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Flat-peer invariant: a worktree is always a plain, visible directory
/// name directly under the project root.
pub fn validate_name(name: &str) -> HubResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('.')
        || name.contains(['/', '\\'])
    {
        return Err(HubError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Branches may contain slashes; worktree directories may not.
pub fn dir_name_for_branch(branch: &str) -> String {
    branch.replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_must_be_plain_directories() {
        assert!(validate_name("feature-x").is_ok());
        assert!(validate_name("dev2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(".bare").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }

    #[test]
    fn branch_slashes_flatten_to_dashes() {
        assert_eq!(dir_name_for_branch("feature/login"), "feature-login");
        assert_eq!(dir_name_for_branch("main"), "main");
    }

    #[test]
    fn copy_dir_all_recurses() {
        let base = std::env::temp_dir().join(format!("barehub_copy_{}", std::process::id()));
        if base.exists() {
            fs::remove_dir_all(&base).unwrap();
        }
        let src = base.join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested").join("b.txt"), "b").unwrap();

        let dst = base.join("dst");
        copy_dir_all(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(
            fs::read_to_string(dst.join("nested").join("b.txt")).unwrap(),
            "b"
        );
        fs::remove_dir_all(&base).unwrap();
    }
}
