use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::audit::Auditor;
use crate::cli::{Commands, ConfigAction};
use crate::error::HubError;
use crate::gateway::{GitGateway, WorktreeEntry};
use crate::keystore;
use crate::lifecycle::Lifecycle;
use crate::project::Project;
use crate::sync;
use crate::teleport::{TeleportBridge, TeleportOutcome};

/// Rendering policy for command results: JSON for machines, plain
/// lines for humans, nothing informational under --quiet.
pub struct Output {
    json: bool,
    quiet: bool,
}

impl Output {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    fn info(&self, message: &str) {
        if !self.json && !self.quiet {
            println!("{message}");
        }
    }

    fn result(&self, value: serde_json::Value, human: &str) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else if !self.quiet && !human.is_empty() {
            println!("{human}");
        }
        Ok(())
    }
}

/// Runs one CLI subcommand to completion. The interactive UI path
/// never comes through here.
pub fn run(command: Commands, git: &dyn GitGateway, output: &Output) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let lifecycle = Lifecycle::new(git);

    match command {
        Commands::Init { url, name, force } => {
            let dir_name = name.unwrap_or_else(|| {
                url.as_deref()
                    .map_or_else(|| "project".to_string(), repo_name_from_url)
            });
            let root = cwd.join(&dir_name);
            let project = lifecycle.init(&root, url.as_deref(), force)?;
            output.result(
                json!({ "root": project.root() }),
                &format!("initialized bare hub at {}", project.root().display()),
            )
        }
        Commands::Setup => {
            let project = Project::discover(&cwd)?;
            let created = lifecycle.setup(&project)?;
            let human = if created.is_empty() {
                "nothing to do, canonical worktrees already exist".to_string()
            } else {
                format!("created worktrees: {}", created.join(", "))
            };
            output.result(json!({ "created": created }), &human)
        }
        Commands::Add { name, branch } => {
            let project = Project::discover(&cwd)?;
            let path = lifecycle.add(&project, &name, branch.as_deref())?;
            output.result(
                json!({ "name": name, "path": path }),
                &format!("added worktree '{name}' at {}", path.display()),
            )
        }
        Commands::Remove { name, force } => {
            let project = Project::discover(&cwd)?;
            lifecycle.remove(&project, &name, force)?;
            output.result(
                json!({ "removed": name }),
                &format!("removed worktree '{name}'"),
            )
        }
        Commands::Run {
            name,
            branch,
            command,
        } => {
            let project = Project::discover(&cwd)?;
            output.info(&format!(
                "running `{}` in temporary worktree '{name}'",
                command.join(" ")
            ));
            let status = run_in_worktree(git, &project, &name, branch.as_deref(), &command)?;
            if !status.success() {
                return Err(anyhow::anyhow!("command failed with status: {status}"));
            }
            output.result(
                json!({ "status": "success", "exit_code": status.code() }),
                "done",
            )
        }
        Commands::List => {
            let project = Project::discover(&cwd)?;
            let listed = list_with_status(git, &project)?;
            if output.json {
                return output.result(json!(listed), "");
            }
            for item in &listed {
                output.info(&format!(
                    "{:<20} {:<24} {:<8} {}",
                    item.name, item.branch, item.head, item.status
                ));
            }
            Ok(())
        }
        Commands::Switch { name } => {
            let project = Project::discover(&cwd)?;
            let path = lifecycle.switch(&project, &name)?;
            // The path is the contract here, even under --quiet:
            // shell integration consumes stdout.
            if output.json {
                output.result(json!({ "path": path }), "")
            } else {
                println!("{}", path.display());
                Ok(())
            }
        }
        Commands::Checkout {
            name,
            branch,
            discard,
        } => {
            let project = Project::discover(&cwd)?;
            lifecycle.checkout(&project, &name, &branch, discard)?;
            output.result(
                json!({ "worktree": name, "branch": branch }),
                &format!("worktree '{name}' now tracks '{branch}'"),
            )
        }
        Commands::Convert { name, branch } => {
            let project = lifecycle.convert(&cwd, name.as_deref(), branch.as_deref())?;
            output.result(
                json!({ "hub": project.root() }),
                &format!("created bare hub at {}", project.root().display()),
            )
        }
        Commands::Migrate { force, dry_run } => {
            let plan = lifecycle.migrate(&cwd, force, dry_run)?;
            let human = if plan.applied {
                format!(
                    "migrated in place; working files moved to {}",
                    plan.worktree.display()
                )
            } else {
                format!(
                    "would create engine {} and move working files to {} (branch '{}'{})",
                    plan.engine.display(),
                    plan.worktree.display(),
                    plan.branch,
                    if plan.carries_changes {
                        ", carrying uncommitted changes"
                    } else {
                        ""
                    }
                )
            };
            output.result(json!(plan), &human)
        }
        Commands::Clean { dry_run, artifacts } => {
            let project = Project::discover(&cwd)?;
            let auditor = Auditor::new(git);
            let report = auditor.clean(&project, artifacts, dry_run, &cwd)?;
            let mut lines = Vec::new();
            for name in &report.stale {
                lines.push(format!(
                    "{}stale record: {name}",
                    if dry_run { "[dry-run] " } else { "" }
                ));
            }
            for path in &report.artifacts {
                lines.push(format!(
                    "{}build artifacts: {}",
                    if dry_run { "[dry-run] " } else { "" },
                    path.display()
                ));
            }
            if lines.is_empty() {
                lines.push("nothing to clean".to_string());
            }
            output.result(json!(report), &lines.join("\n"))
        }
        Commands::Teleport { target } => {
            let project = Project::discover(&cwd)?;
            let source = current_worktree(git, &project, &cwd)?;
            let bridge = TeleportBridge::new(git);
            match bridge.teleport(&project, &source.path, &target)? {
                TeleportOutcome::NothingToMove => output.result(
                    json!({ "moved": false }),
                    "source worktree is clean, nothing to move",
                ),
                TeleportOutcome::Moved { stash_ref, target } => output.result(
                    json!({ "moved": true, "target": target }),
                    &format!("changes moved to '{target}' (via {stash_ref})"),
                ),
            }
        }
        Commands::Sync { name } => {
            let project = Project::discover(&cwd)?;
            let targets: Vec<WorktreeEntry> = match name {
                Some(name) => {
                    let path = lifecycle.switch(&project, &name)?;
                    vec![WorktreeEntry {
                        path,
                        head: String::new(),
                        branch: None,
                        bare: false,
                        detached: false,
                    }]
                }
                None => git
                    .list_worktrees(project.root())?
                    .into_iter()
                    .filter(|e| !e.bare)
                    .collect(),
            };
            let mut synced = Vec::new();
            for target in &targets {
                let applied = sync::propagate(&project, &target.path)?;
                if !applied.is_empty() {
                    synced.push(json!({ "worktree": target.path, "files": applied }));
                }
            }
            let human = format!("synced {} worktree(s)", synced.len());
            output.result(json!(synced), &human)
        }
        Commands::Push { name } => {
            let project = Project::discover(&cwd)?;
            let path = match name {
                Some(name) => lifecycle.switch(&project, &name)?,
                None => current_worktree(git, &project, &cwd)?.path,
            };
            git.push(&path)?;
            output.result(json!({ "pushed": path }), "pushed")
        }
        Commands::Fetch => {
            let project = Project::discover(&cwd)?;
            git.fetch(project.root())?;
            output.result(json!({ "fetched": true }), "fetched all remotes")
        }
        Commands::Rebase { upstream } => {
            let project = Project::discover(&cwd)?;
            let path = current_worktree(git, &project, &cwd)?.path;
            let upstream = upstream.unwrap_or_else(|| "main".to_string());
            git.rebase(&path, &upstream)?;
            output.result(
                json!({ "rebased_onto": upstream }),
                &format!("rebased onto '{upstream}'"),
            )
        }
        Commands::Config { action } => match action {
            ConfigAction::SetKey { key } => {
                keystore::set_api_key(&key)?;
                output.result(json!({ "stored": true }), "API key stored")
            }
            ConfigAction::GetKey => {
                let configured = keystore::get_api_key()?.is_some();
                let human = if configured {
                    "API key is configured"
                } else {
                    "no API key configured"
                };
                output.result(json!({ "configured": configured }), human)
            }
        },
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ListedWorktree {
    pub name: String,
    pub path: PathBuf,
    pub branch: String,
    pub head: String,
    pub status: String,
}

/// Worktree table data: porcelain listing enriched with a status
/// summary per non-bare entry.
pub fn list_with_status(git: &dyn GitGateway, project: &Project) -> Result<Vec<ListedWorktree>> {
    let entries = git.list_worktrees(project.root())?;
    let mut listed = Vec::new();
    for entry in entries.into_iter().filter(|e| !e.bare) {
        let status = match git.status(&entry.path) {
            Ok(status) => status.summary(),
            Err(_) => "unavailable".to_string(),
        };
        listed.push(ListedWorktree {
            name: entry.name(),
            branch: entry
                .branch
                .clone()
                .unwrap_or_else(|| "(detached)".to_string()),
            head: entry.head.clone(),
            path: entry.path,
            status,
        });
    }
    Ok(listed)
}

/// Creates a temporary worktree, executes a command inside it, then
/// removes it again. Removal is forced and happens whether or not the
/// command succeeded, so a failing command never leaves the temporary
/// worktree behind; the command's exit status decides the result.
pub fn run_in_worktree(
    git: &dyn GitGateway,
    project: &Project,
    name: &str,
    branch: Option<&str>,
    command: &[String],
) -> Result<std::process::ExitStatus> {
    let (program, args) = command
        .split_first()
        .context("no command given to run in the worktree")?;
    let lifecycle = Lifecycle::new(git);
    let path = lifecycle.add(project, name, branch)?;

    let status = std::process::Command::new(program)
        .args(args)
        .current_dir(&path)
        .status();

    let removed = lifecycle.remove(project, name, true);
    let status = status.with_context(|| format!("failed to launch '{program}'"))?;
    removed?;
    Ok(status)
}

/// Resolves which registered worktree contains `cwd`.
pub fn current_worktree(
    git: &dyn GitGateway,
    project: &Project,
    cwd: &Path,
) -> Result<WorktreeEntry, HubError> {
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    git.list_worktrees(project.root())?
        .into_iter()
        .filter(|e| !e.bare)
        .find(|e| {
            let path = e.path.canonicalize().unwrap_or_else(|_| e.path.clone());
            cwd.starts_with(path)
        })
        .ok_or_else(|| HubError::NotInWorktree(cwd))
}

fn repo_name_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|name| name.trim_end_matches(".git"))
        .filter(|name| !name.is_empty())
        .unwrap_or("project")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_name_extraction() {
        assert_eq!(repo_name_from_url("https://host/user/repo.git"), "repo");
        assert_eq!(repo_name_from_url("git@host:team/thing.git"), "thing");
        assert_eq!(repo_name_from_url("repo"), "repo");
        assert_eq!(repo_name_from_url(""), "project");
    }
}
