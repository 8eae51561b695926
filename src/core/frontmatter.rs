//! YAML frontmatter shared by skill documents and changesets.
//!
//! A document opens with a `---` line and the block runs to the next line that
//! is exactly `---`. Everything after the closing delimiter is the body.

use crate::core::error::SkillpackError;
use serde_yaml::Mapping;

const DELIMITER: &str = "---";

/// A document split at its frontmatter delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    pub yaml: &'a str,
    pub body: &'a str,
    /// 1-based line number of the first body line.
    pub body_start_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    Missing,
    Unterminated,
}

impl std::fmt::Display for SplitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing YAML frontmatter start '---'"),
            Self::Unterminated => write!(f, "frontmatter is not closed by a '---' line"),
        }
    }
}

impl From<SplitError> for SkillpackError {
    fn from(e: SplitError) -> Self {
        SkillpackError::FrontmatterError(e.to_string())
    }
}

fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

pub fn split(raw: &str) -> Result<Split<'_>, SplitError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut offset = 0;
    let mut lines = raw.split_inclusive('\n');

    match lines.next() {
        Some(first) if strip_line_ending(first).trim_end() == DELIMITER => {
            offset += first.len();
        }
        _ => return Err(SplitError::Missing),
    }
    let yaml_start = offset;

    for (idx, line) in lines.enumerate() {
        if strip_line_ending(line).trim_end() == DELIMITER {
            let yaml = &raw[yaml_start..offset];
            let body = &raw[offset + line.len()..];
            return Ok(Split {
                yaml,
                body,
                // opening delimiter + yaml lines + closing delimiter, then 1-based
                body_start_line: idx + 3,
            });
        }
        offset += line.len();
    }
    Err(SplitError::Unterminated)
}

/// Parse the frontmatter block into a YAML mapping. An empty block is an empty mapping.
pub fn parse_mapping(yaml: &str) -> Result<Mapping, SkillpackError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    match value {
        serde_yaml::Value::Mapping(map) => Ok(map),
        serde_yaml::Value::Null => Ok(Mapping::new()),
        other => Err(SkillpackError::FrontmatterError(format!(
            "frontmatter must be a mapping, found {}",
            value_kind(&other)
        ))),
    }
}

pub fn value_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a list",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

/// Look up a top-level string value.
pub fn get_str<'m>(map: &'m Mapping, key: &str) -> Option<&'m str> {
    map.get(key).and_then(|v| v.as_str())
}

/// Rewrite a top-level `key: value` line inside the frontmatter, leaving every
/// other byte untouched. When the key is absent it is appended before the
/// closing delimiter.
pub fn replace_scalar(raw: &str, key: &str, value: &str) -> Result<String, SkillpackError> {
    let split = split(raw)?;
    let prefix = format!("{}:", key);
    let mut replaced = false;
    let mut yaml = String::with_capacity(split.yaml.len() + value.len());
    for line in split.yaml.split_inclusive('\n') {
        if !replaced && line.starts_with(&prefix) {
            let ending = if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            };
            yaml.push_str(&format!("{} {}{}", prefix, value, ending));
            replaced = true;
        } else {
            yaml.push_str(line);
        }
    }
    if !replaced {
        if !yaml.is_empty() && !yaml.ends_with('\n') {
            yaml.push('\n');
        }
        yaml.push_str(&format!("{} {}\n", prefix, value));
    }

    let bom = if raw.starts_with('\u{feff}') { "\u{feff}" } else { "" };
    let stripped = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let head_end = stripped.find('\n').map(|i| i + 1).unwrap_or(stripped.len());
    let closing_line_len = stripped.len() - split.body.len() - split.yaml.len() - head_end;
    let closing = &stripped[head_end + split.yaml.len()..head_end + split.yaml.len() + closing_line_len];

    Ok(format!(
        "{}{}{}{}{}",
        bom,
        &stripped[..head_end],
        yaml,
        closing,
        split.body
    ))
}
