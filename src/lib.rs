//! skillpack: quality gates and release tooling for Markdown skill packs.
//!
//! A skill pack is a repository of `SKILL.md` documents, each carrying YAML
//! frontmatter that tells an assistant what the skill does and when to use it.
//! skillpack keeps such a repository healthy and releasable:
//!
//! - **Validate**: structural frontmatter checks plus a 10-point quality rubric,
//!   gated at a configurable threshold.
//! - **Version**: changesets record release intent; `changeset version` bumps
//!   `package.json`, prepends `CHANGELOG.md` and syncs skill frontmatter.
//! - **Release**: idempotent `name@version` git tags and GitHub releases.
//! - **Marketplace**: keeps `.claude-plugin/marketplace.json` in step with packages.
//!
//! # Examples
//!
//! ```bash
//! skillpack init
//! skillpack skill new pdf-tools
//! skillpack validate --strict
//! skillpack changeset add --package pdf-tools --bump minor --summary "Add form filling"
//! skillpack changeset version
//! skillpack release tag --push
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: configuration, logging, errors, workspace discovery, git and gates
//! - [`plugins`]: skills, scoring, changesets, commits, changelogs, releases, marketplace

pub mod core;
pub mod plugins;

mod cli;
mod dispatch;

use clap::Parser;
use cli::Cli;
use crate::core::error::SkillpackError;
use crate::core::logging;

/// Parse arguments, install logging and run the selected command.
pub fn run() -> Result<(), SkillpackError> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let current_dir = std::env::current_dir()?;
    let cwd = match cli.chdir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => current_dir.join(dir),
        None => current_dir,
    };
    tracing::debug!(cwd = %cwd.display(), "starting");
    dispatch::dispatch(cli.command, &cwd)
}
