//! CHANGELOG.md rendering and release-note extraction.
//!
//! Sections are newest-first, one `## <version>` header each, with change
//! bullets grouped under `### Major Changes`, `### Minor Changes` and
//! `### Patch Changes`.

use crate::plugins::changeset::Bump;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub bump: Bump,
    pub summary: String,
}

fn heading_for(bump: Bump) -> &'static str {
    match bump {
        Bump::Major => "### Major Changes",
        Bump::Minor => "### Minor Changes",
        Bump::Patch => "### Patch Changes",
    }
}

fn bullet(summary: &str) -> String {
    let summary = summary.trim();
    // an already bulleted summary keeps its items at the top level
    if summary.starts_with("- ") {
        return summary
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }
    let mut lines = summary.lines();
    let mut out = format!("- {}", lines.next().unwrap_or("").trim_end());
    for line in lines {
        out.push('\n');
        if !line.trim().is_empty() {
            out.push_str("  ");
            out.push_str(line.trim_end());
        }
    }
    out
}

/// Render one `## <version>` section. Empty change groups are omitted.
pub fn render_section(version: &str, entries: &[Entry]) -> String {
    let mut out = format!("## {}\n", version);
    for bump in [Bump::Major, Bump::Minor, Bump::Patch] {
        let bullets: Vec<String> = entries
            .iter()
            .filter(|e| e.bump == bump && !e.summary.trim().is_empty())
            .map(|e| bullet(&e.summary))
            .collect();
        if bullets.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(heading_for(bump));
        out.push_str("\n\n");
        for b in bullets {
            out.push_str(&b);
            out.push('\n');
        }
    }
    out
}

/// Insert `section` right after the `# <title>` line, creating `# <name>` when
/// the changelog has no title.
pub fn prepend_section(existing: Option<&str>, name: &str, section: &str) -> String {
    let existing = existing.unwrap_or("").trim_start_matches('\u{feff}');
    let trimmed = existing.trim_start_matches(['\n', '\r']);

    let (title, rest) = match trimmed.lines().next() {
        Some(first) if first.starts_with("# ") => {
            let rest = &trimmed[first.len()..];
            (first.trim_end().to_string(), rest)
        }
        _ => (format!("# {}", name), trimmed),
    };
    let rest = rest.trim_start_matches(['\n', '\r']);

    let mut out = format!("{}\n\n{}", title, section);
    if !section.ends_with('\n') {
        out.push('\n');
    }
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(rest);
        if !rest.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Release notes pulled from a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notes {
    pub text: String,
    /// True when no section matched and the head of the file was used instead.
    pub fallback: bool,
}

fn header_matches(line: &str, version: &str) -> bool {
    let Some(rest) = line.strip_prefix("## ") else {
        return false;
    };
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('[').unwrap_or(rest);
    let rest = rest.strip_prefix('v').unwrap_or(rest);
    match rest.strip_prefix(version) {
        Some(after) => !after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '+'),
        None => false,
    }
}

/// Slice the section for `version`. Accepts `## 1.2.0`, `## [1.2.0]` and
/// `## v1.2.0`, with trailing text such as a date.
pub fn extract_notes(changelog: &str, version: &str, fallback_lines: usize) -> Notes {
    let mut in_section = false;
    let mut found = false;
    let mut collected: Vec<&str> = Vec::new();
    for line in changelog.lines() {
        if in_section {
            if line.starts_with("## ") {
                break;
            }
            collected.push(line);
        } else if header_matches(line, version) {
            in_section = true;
            found = true;
        }
    }
    let text = collected.join("\n").trim().to_string();
    if found && !text.is_empty() {
        return Notes {
            text,
            fallback: false,
        };
    }
    tracing::warn!(
        version,
        "changelog section not found, falling back to the first {} lines",
        fallback_lines
    );
    Notes {
        text: changelog
            .lines()
            .take(fallback_lines)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        fallback: true,
    }
}
