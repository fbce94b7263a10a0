use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "barehub")]
#[command(
    version,
    about = "Bare-repository worktree orchestrator",
    long_about = "Manages git worktrees in a bare-hub layout: one shared engine \
                  (.bare) plus flat peer worktree directories. Running without a \
                  subcommand starts the interactive terminal UI."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output results as JSON for machine consumption
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bare-hub project, optionally from a remote URL
    Init {
        /// Remote repository to clone (omit for an empty hub)
        url: Option<String>,
        /// Project directory name (defaults to the repo name or 'project')
        #[arg(short, long)]
        name: Option<String>,
        /// Initialize into a non-empty directory
        #[arg(short, long)]
        force: bool,
    },
    /// Ensure the canonical 'main' and 'dev' worktrees exist (idempotent)
    Setup,
    /// Add a new worktree
    Add {
        /// Worktree name (also the new branch name when no branch is given)
        name: String,
        /// Branch to check out, created as a tracking branch if remote-only
        branch: Option<String>,
    },
    /// Remove a worktree and its directory
    Remove {
        name: String,
        /// Remove even with uncommitted changes
        #[arg(short, long)]
        force: bool,
    },
    /// List worktrees with branch, commit and status summary
    List,
    /// Run a command in a temporary worktree and remove it afterward
    ///
    /// Example: barehub run temp-check cargo test
    Run {
        /// Name for the temporary worktree
        name: String,
        /// Branch to check out (defaults to a new branch named after the worktree)
        #[arg(short, long)]
        branch: Option<String>,
        /// Command to execute inside the worktree
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the absolute path of a worktree for shell integration
    ///
    /// Example: cd $(barehub switch dev)
    Switch { name: String },
    /// Point an existing worktree at a different branch
    Checkout {
        name: String,
        branch: String,
        /// Discard uncommitted changes in the worktree
        #[arg(long)]
        discard: bool,
    },
    /// Build a new sibling bare-hub project from a standard repository
    ///
    /// Non-destructive: the original repository is left untouched.
    Convert {
        /// Name for the hub directory (defaults to {project}-hub)
        #[arg(short, long)]
        name: Option<String>,
        /// Initial worktree branch (defaults to the current branch)
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Convert the current standard repository in place into a bare hub
    Migrate {
        /// Migrate even with uncommitted changes (they carry over)
        #[arg(short, long)]
        force: bool,
        /// Report the plan without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },
    /// Detect and prune stale worktree records
    Clean {
        /// Report what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
        /// Also purge build-artifact directories from inactive worktrees
        #[arg(long)]
        artifacts: bool,
    },
    /// Move uncommitted changes from the current worktree to another
    Teleport {
        /// Target worktree name
        target: String,
    },
    /// Propagate manifest-listed config files to one or all worktrees
    Sync {
        /// Worktree to sync (omit for all)
        name: Option<String>,
    },
    /// Push a worktree's branch to the remote
    Push {
        /// Worktree name (defaults to the current worktree)
        name: Option<String>,
    },
    /// Fetch all remotes with pruning
    Fetch,
    /// Rebase the current worktree onto an upstream branch
    Rebase {
        /// Upstream branch (defaults to 'main')
        upstream: Option<String>,
    },
    /// Credential management for the commit-message service
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Store the text-generation API key
    SetKey { key: String },
    /// Show whether an API key is configured
    GetKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init_with_url() {
        let cli = Cli::try_parse_from(["barehub", "init", "git@host:repo.git"]).unwrap();
        match cli.command.unwrap() {
            Commands::Init { url, name, force } => {
                assert_eq!(url.as_deref(), Some("git@host:repo.git"));
                assert_eq!(name, None);
                assert!(!force);
            }
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn parses_add_with_optional_branch() {
        let cli = Cli::try_parse_from(["barehub", "add", "feat", "feature/login"]).unwrap();
        match cli.command.unwrap() {
            Commands::Add { name, branch } => {
                assert_eq!(name, "feat");
                assert_eq!(branch.as_deref(), Some("feature/login"));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn parses_run_with_trailing_command() {
        let cli =
            Cli::try_parse_from(["barehub", "run", "temp-check", "cargo", "test", "--all"]).unwrap();
        match cli.command.unwrap() {
            Commands::Run {
                name,
                branch,
                command,
            } => {
                assert_eq!(name, "temp-check");
                assert_eq!(branch, None);
                assert_eq!(command, vec!["cargo", "test", "--all"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_clean_flags() {
        let cli = Cli::try_parse_from(["barehub", "clean", "--dry-run", "--artifacts"]).unwrap();
        match cli.command.unwrap() {
            Commands::Clean { dry_run, artifacts } => {
                assert!(dry_run);
                assert!(artifacts);
            }
            _ => panic!("expected clean"),
        }
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["barehub", "--json"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.json);
    }

    #[test]
    fn parses_checkout_discard() {
        let cli =
            Cli::try_parse_from(["barehub", "checkout", "dev", "feature/x", "--discard"]).unwrap();
        match cli.command.unwrap() {
            Commands::Checkout {
                name,
                branch,
                discard,
            } => {
                assert_eq!(name, "dev");
                assert_eq!(branch, "feature/x");
                assert!(discard);
            }
            _ => panic!("expected checkout"),
        }
    }

    #[test]
    fn parses_config_set_key() {
        let cli = Cli::try_parse_from(["barehub", "config", "set-key", "abc"]).unwrap();
        match cli.command.unwrap() {
            Commands::Config {
                action: ConfigAction::SetKey { key },
            } => assert_eq!(key, "abc"),
            _ => panic!("expected config set-key"),
        }
    }
}
