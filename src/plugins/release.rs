//! Idempotent `name@version` tags and GitHub releases.
//!
//! Every package with both a `package.json` and a `CHANGELOG.md` gets a tag and
//! a release named `name@version`. Anything that already exists is skipped, so
//! re-running after a partial failure only finishes the remaining work. The
//! first tool failure aborts the run.

use crate::core::config::ReleaseConfig;
use crate::core::error::SkillpackError;
use crate::core::git::{self, Git};
use crate::core::workspace::Package;
use crate::plugins::changelog;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where releases are published.
pub trait ReleaseHost {
    fn release_exists(&self, tag: &str) -> Result<bool, SkillpackError>;
    fn create_release(&self, tag: &str, title: &str, notes: &str) -> Result<(), SkillpackError>;
}

/// GitHub releases through the `gh` CLI.
#[derive(Debug, Clone)]
pub struct GhCli {
    root: PathBuf,
}

impl GhCli {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ReleaseHost for GhCli {
    fn release_exists(&self, tag: &str) -> Result<bool, SkillpackError> {
        git::probe_tool("gh", &self.root, &["release", "view", tag])
    }

    fn create_release(&self, tag: &str, title: &str, notes: &str) -> Result<(), SkillpackError> {
        git::run_tool("gh", &self.root, &gh_create_args(tag, title, notes))?;
        Ok(())
    }
}

/// `gh release create` arguments. `--verify-tag` stops gh from minting its own
/// tag on the default branch when ours never reached the remote.
fn gh_create_args<'a>(tag: &'a str, title: &'a str, notes: &'a str) -> [&'a str; 8] {
    [
        "release",
        "create",
        tag,
        "--verify-tag",
        "--title",
        title,
        "--notes",
        notes,
    ]
}

#[derive(Debug, Clone)]
pub struct TagOptions {
    pub dry_run: bool,
    pub push: bool,
    pub remote: String,
    pub fallback_lines: usize,
}

impl TagOptions {
    /// Options for `release tag`. A hosted release needs the tag on the remote,
    /// so a host forces the push.
    pub fn for_run(
        config: &ReleaseConfig,
        dry_run: bool,
        push: bool,
        remote: String,
        hosted: bool,
    ) -> Self {
        Self {
            dry_run,
            push: push || config.push || hosted,
            remote,
            fallback_lines: config.notes_fallback_lines,
        }
    }
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            push: false,
            remote: "origin".to_string(),
            fallback_lines: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    /// Would be created; dry run.
    Planned,
    Skipped(String),
}

impl Outcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Outcome::Created)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created => f.write_str("created"),
            Outcome::Planned => f.write_str("planned"),
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageRelease {
    pub name: String,
    pub tag: String,
    pub tag_outcome: Outcome,
    pub release_outcome: Outcome,
    pub notes_fallback: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseReport {
    pub packages: Vec<PackageRelease>,
}

impl ReleaseReport {
    pub fn created_tags(&self) -> usize {
        self.packages.iter().filter(|p| p.tag_outcome.is_created()).count()
    }

    pub fn created_releases(&self) -> usize {
        self.packages
            .iter()
            .filter(|p| p.release_outcome.is_created())
            .count()
    }
}

/// Tag and release every package that carries a changelog.
///
/// `host = None` skips GitHub releases entirely.
pub fn tag_packages(
    git: &Git,
    host: Option<&dyn ReleaseHost>,
    packages: &[Package],
    opts: &TagOptions,
) -> Result<ReleaseReport, SkillpackError> {
    let mut report = ReleaseReport::default();
    for pkg in packages {
        let changelog_path = pkg.changelog_path();
        if !changelog_path.is_file() {
            tracing::debug!(package = %pkg.name, "no CHANGELOG.md, not releasable");
            continue;
        }
        let tag = pkg.tag();

        let tag_outcome = if git.tag_exists(&tag)? {
            tracing::info!(%tag, "tag already exists");
            Outcome::Skipped("tag exists".to_string())
        } else if opts.dry_run {
            Outcome::Planned
        } else {
            git.create_tag(&tag)?;
            if opts.push {
                git.push_tag(&opts.remote, &tag)?;
            }
            tracing::info!(%tag, pushed = opts.push, "created tag");
            Outcome::Created
        };

        let mut notes_fallback = false;
        let release_outcome = match host {
            None => Outcome::Skipped("github disabled".to_string()),
            Some(host) => {
                if host.release_exists(&tag)? {
                    tracing::info!(%tag, "release already exists");
                    Outcome::Skipped("release exists".to_string())
                } else {
                    let raw = fs::read_to_string(&changelog_path)?;
                    let notes = changelog::extract_notes(
                        &raw,
                        &pkg.version.to_string(),
                        opts.fallback_lines,
                    );
                    notes_fallback = notes.fallback;
                    if opts.dry_run {
                        Outcome::Planned
                    } else {
                        host.create_release(&tag, &tag, &notes.text)?;
                        tracing::info!(%tag, "created release");
                        Outcome::Created
                    }
                }
            }
        };

        report.packages.push(PackageRelease {
            name: pkg.name.clone(),
            tag,
            tag_outcome,
            release_outcome,
            notes_fallback,
        });
    }
    Ok(report)
}
