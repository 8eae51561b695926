//! CLI struct definitions for the skillpack command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `dispatch/`.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "skillpack",
    version = env!("CARGO_PKG_VERSION"),
    about = "Validate, score, version and release Markdown skill packs.",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// More diagnostics on stderr (-v debug, -vv trace). SKILLPACK_LOG overrides.
    #[clap(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only report errors on stderr.
    #[clap(short, long, global = true)]
    pub quiet: bool,
    /// Run as if started in this directory.
    #[clap(short = 'C', long = "chdir", global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Write skillpack.toml and .changeset/README.md when absent
    Init {
        /// Overwrite an existing skillpack.toml.
        #[clap(long)]
        force: bool,
    },

    /// Score skills against the rubric and fail below the threshold
    Validate(ValidateCli),

    /// Full rubric breakdown for one skill
    Score(ScoreCli),

    /// Skill authoring helpers
    Skill(SkillCli),

    /// Commit gate: skills, packages, changesets and marketplace
    Check(CheckCli),

    /// Pending release intents
    Changeset(ChangesetCli),

    /// Conventional-commit helpers
    Commit(CommitCli),

    /// Tags and GitHub releases
    Release(ReleaseCli),

    /// Plugin marketplace registry
    Marketplace(MarketplaceCli),

    /// Print the skillpack version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ValidateCli {
    /// SKILL.md files or directories; defaults to the configured skill roots.
    pub paths: Vec<PathBuf>,
    /// Require the strict threshold (10/10 by default).
    #[clap(long)]
    pub strict: bool,
    /// Explicit pass threshold, overriding config and --strict.
    #[clap(long)]
    pub threshold: Option<f64>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ScoreCli {
    /// Path to a SKILL.md file or the directory holding it.
    pub path: PathBuf,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct SkillCli {
    #[clap(subcommand)]
    pub command: SkillCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SkillCommand {
    /// Scaffold <dir>/<name>/SKILL.md from the built-in template
    New {
        /// Hyphen-case skill name.
        name: String,
        /// Parent directory, relative to the repository root.
        #[clap(long, default_value = "skills")]
        dir: PathBuf,
        /// Frontmatter description.
        #[clap(
            long,
            default_value = "Describe what this skill does. Use when the user asks for it."
        )]
        description: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct CheckCli {
    /// Use the strict skill threshold.
    #[clap(long)]
    pub strict: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ChangesetCli {
    #[clap(subcommand)]
    pub command: ChangesetCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ChangesetCommand {
    /// Record a release intent for one or more packages
    Add {
        /// Package to release; repeat together with --bump.
        #[clap(long = "package", short = 'p', required = true)]
        packages: Vec<String>,
        /// Bump for the matching --package: major, minor or patch.
        #[clap(long = "bump", short = 'b', required = true)]
        bumps: Vec<String>,
        /// Changelog summary; an empty summary adds no changelog bullet.
        #[clap(long, short = 's', default_value = "")]
        summary: String,
    },
    /// Show pending changesets and the release plan
    Status {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Apply pending changesets: bump versions, write changelogs, delete changesets
    Version {
        /// Print the plan without writing anything.
        #[clap(long)]
        dry_run: bool,
    },
    /// Create a changeset from conventional commits touching a package
    FromCommits {
        /// Package name.
        #[clap(long, short = 'p')]
        package: String,
        /// Start of the commit range (default: newest name@* tag).
        #[clap(long)]
        since: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct CommitCli {
    #[clap(subcommand)]
    pub command: CommitCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CommitCommand {
    /// Lint a commit message (argument, --file, e.g. from a commit-msg hook)
    Lint {
        /// Message text.
        message: Option<String>,
        /// Read the message from a file.
        #[clap(long, conflicts_with = "message")]
        file: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct ReleaseCli {
    #[clap(subcommand)]
    pub command: ReleaseCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ReleaseCommand {
    /// Create missing name@version tags and GitHub releases
    Tag {
        /// Only report what would be created.
        #[clap(long)]
        dry_run: bool,
        /// Push created tags.
        #[clap(long)]
        push: bool,
        /// Remote for --push.
        #[clap(long, default_value = "origin")]
        remote: String,
        /// Skip GitHub releases.
        #[clap(long)]
        no_github: bool,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct MarketplaceCli {
    #[clap(subcommand)]
    pub command: MarketplaceCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum MarketplaceCommand {
    /// Report registry entries that disagree with the repository
    Check,
    /// Copy package.json versions into registry entries
    Sync,
}
