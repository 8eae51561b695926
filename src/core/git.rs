//! Thin wrappers over the `git` and `gh` executables.
//!
//! Every call runs in the repository root and maps a non-zero exit status to
//! [`SkillpackError::ToolError`] carrying the captured stderr.

use crate::core::error::SkillpackError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

fn spawn(tool: &str, cwd: &Path, args: &[&str]) -> Result<Output, SkillpackError> {
    tracing::trace!(tool, ?args, "exec");
    Command::new(tool)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| SkillpackError::ToolError {
            tool: tool.to_string(),
            args: args.join(" "),
            stderr: e.to_string(),
        })
}

/// Run a tool and return trimmed stdout, failing on a non-zero exit status.
pub fn run_tool(tool: &str, cwd: &Path, args: &[&str]) -> Result<String, SkillpackError> {
    let output = spawn(tool, cwd, args)?;
    if !output.status.success() {
        return Err(SkillpackError::ToolError {
            tool: tool.to_string(),
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a tool and report only whether it exited successfully.
pub fn probe_tool(tool: &str, cwd: &Path, args: &[&str]) -> Result<bool, SkillpackError> {
    Ok(spawn(tool, cwd, args)?.status.success())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn run(&self, args: &[&str]) -> Result<String, SkillpackError> {
        run_tool("git", &self.root, args)
    }

    pub fn tag_exists(&self, tag: &str) -> Result<bool, SkillpackError> {
        let refname = format!("refs/tags/{}", tag);
        probe_tool("git", &self.root, &["rev-parse", "-q", "--verify", &refname])
    }

    /// Annotated tag on HEAD whose message is the tag name.
    pub fn create_tag(&self, tag: &str) -> Result<(), SkillpackError> {
        self.run(&["tag", "-a", tag, "-m", tag])?;
        Ok(())
    }

    pub fn push_tag(&self, remote: &str, tag: &str) -> Result<(), SkillpackError> {
        let refspec = format!("refs/tags/{}", tag);
        self.run(&["push", remote, &refspec])?;
        Ok(())
    }

    /// Tags matching a `git tag --list` pattern, highest version first.
    pub fn tags_matching(&self, pattern: &str) -> Result<Vec<String>, SkillpackError> {
        let out = self.run(&["tag", "--list", pattern, "--sort=-v:refname"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Commits reachable from HEAD but not from `since`, touching `path`, newest first.
    ///
    /// With `since = None` the whole history is scanned.
    pub fn log_since(&self, since: Option<&str>, path: &Path) -> Result<Vec<Commit>, SkillpackError> {
        let range = since.map(|s| format!("{}..HEAD", s));
        let format = format!("--format=%H{}%s{}%b{}", FIELD_SEP, FIELD_SEP, RECORD_SEP);
        let path_arg = path.to_string_lossy();
        let mut args: Vec<&str> = vec!["log", &format];
        if let Some(range) = range.as_deref() {
            args.push(range);
        } else {
            args.push("HEAD");
        }
        args.push("--");
        args.push(&path_arg);
        let out = self.run(&args)?;
        Ok(parse_log(&out))
    }
}

fn parse_log(raw: &str) -> Vec<Commit> {
    raw.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches(['\n', '\r']);
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(3, FIELD_SEP);
            let hash = fields.next()?.trim().to_string();
            let subject = fields.next()?.trim().to_string();
            let body = fields.next().unwrap_or("").trim().to_string();
            Some(Commit {
                hash,
                subject,
                body,
            })
        })
        .collect()
}
