//! Conventional-commit parsing, commit-message linting, and changesets
//! derived from git history.

use crate::core::error::SkillpackError;
use crate::core::git::{Commit, Git};
use crate::core::workspace::Package;
use crate::plugins::changeset::{self, Bump};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const ALLOWED_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];
pub const MAX_HEADER_CHARS: usize = 100;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<type>[a-z]+)(?:\((?P<scope>[^()\s]+)\))?(?P<bang>!)?:(?P<space> ?)(?P<subject>.*)$")
            .expect("static regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConventionalCommit {
    pub kind: String,
    pub scope: Option<String>,
    pub breaking: bool,
    pub subject: String,
}

impl ConventionalCommit {
    /// `None` when the header does not follow `type(scope)!: subject`.
    pub fn parse(header: &str, body: &str) -> Option<Self> {
        let caps = header_re().captures(header.trim())?;
        let subject = caps["subject"].trim().to_string();
        let breaking_footer = body.lines().any(|l| {
            let l = l.trim_start();
            l.starts_with("BREAKING CHANGE:") || l.starts_with("BREAKING-CHANGE:")
        });
        Some(Self {
            kind: caps["type"].to_string(),
            scope: caps.name("scope").map(|m| m.as_str().to_string()),
            breaking: caps.name("bang").is_some() || breaking_footer,
            subject,
        })
    }

    pub fn bump(&self) -> Option<Bump> {
        if self.breaking {
            return Some(Bump::Major);
        }
        match self.kind.as_str() {
            "feat" => Some(Bump::Minor),
            "fix" | "perf" | "revert" => Some(Bump::Patch),
            _ => None,
        }
    }
}

/// Problems with a commit message, as a `commit-msg` hook would see it.
/// Comment lines (`#`) are ignored.
pub fn lint(message: &str) -> Vec<String> {
    let cleaned: Vec<&str> = message
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .collect();
    let Some(header) = cleaned.iter().map(|l| l.trim_end()).find(|l| !l.trim().is_empty()) else {
        return vec!["commit message is empty".to_string()];
    };

    let mut problems = Vec::new();
    if header.chars().count() > MAX_HEADER_CHARS {
        problems.push(format!(
            "header is {} characters, maximum is {}",
            header.chars().count(),
            MAX_HEADER_CHARS
        ));
    }
    match header_re().captures(header) {
        None => problems.push(format!(
            "header '{}' does not match 'type(scope)!: subject'",
            header
        )),
        Some(caps) => {
            let kind = &caps["type"];
            if !ALLOWED_TYPES.contains(&kind) {
                problems.push(format!(
                    "type '{}' is not one of: {}",
                    kind,
                    ALLOWED_TYPES.join(", ")
                ));
            }
            if caps["subject"].trim().is_empty() {
                problems.push("subject is empty".to_string());
            } else if caps["space"].is_empty() {
                problems.push("expected a space after ':'".to_string());
            }
        }
    }
    problems
}

/// Highest bump and bullet summary for a run of commits, or `None` when
/// nothing in it is release-worthy.
pub fn summarize(commits: &[Commit]) -> Option<(Bump, String)> {
    let mut bump: Option<Bump> = None;
    let mut lines = Vec::new();
    // oldest first reads better in a changelog
    for commit in commits.iter().rev() {
        let Some(cc) = ConventionalCommit::parse(&commit.subject, &commit.body) else {
            tracing::debug!(hash = %commit.hash, "skipping non-conventional commit");
            continue;
        };
        let Some(b) = cc.bump() else {
            continue;
        };
        bump = Some(bump.map_or(b, |cur| cur.max(b)));
        let prefix = if cc.breaking { "**BREAKING** " } else { "" };
        lines.push(format!("{}{}", prefix, cc.subject));
    }
    let bump = bump?;
    let summary = if lines.len() == 1 {
        lines.remove(0)
    } else {
        lines
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n")
    };
    Some((bump, summary))
}

/// Write one changeset covering the package's release-worthy commits since
/// `since` (default: its newest `name@*` tag, else the whole history).
pub fn changeset_from_commits(
    root: &Path,
    changeset_dir: &Path,
    package: &Package,
    since: Option<&str>,
) -> Result<Option<PathBuf>, SkillpackError> {
    let git = Git::new(root);
    let since = match since {
        Some(s) => Some(s.to_string()),
        None => git
            .tags_matching(&format!("{}@*", package.name))?
            .into_iter()
            .next(),
    };
    tracing::debug!(package = %package.name, since = ?since, "scanning commits");
    let rel = package.dir.strip_prefix(root).unwrap_or(&package.dir);
    let rel = if rel.as_os_str().is_empty() { Path::new(".") } else { rel };
    let commits = git.log_since(since.as_deref(), rel)?;

    let Some((bump, summary)) = summarize(&commits) else {
        tracing::info!(package = %package.name, "no release-worthy commits");
        return Ok(None);
    };
    let path = changeset::write_new(changeset_dir, vec![(package.name.clone(), bump)], &summary)?;
    Ok(Some(path))
}
