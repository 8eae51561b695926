//! Skill documents: discovery, loading, structural validation and scaffolding.
//!
//! A skill is a `SKILL.md` file whose YAML frontmatter names the skill and
//! describes when an assistant should reach for it. Structural problems found
//! here are hard errors; the softer quality rubric lives in [`crate::plugins::score`].

use crate::core::assets;
use crate::core::error::SkillpackError;
use crate::core::frontmatter;
use regex::Regex;
use serde::Serialize;
use serde_yaml::Mapping;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const SKILL_FILE: &str = "SKILL.md";
pub const MAX_NAME_CHARS: usize = 64;
pub const MAX_DESCRIPTION_CHARS: usize = 1024;
pub const ALLOWED_KEYS: &[&str] = &[
    "name",
    "description",
    "version",
    "license",
    "allowed-tools",
    "metadata",
];

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target"];

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static regex"))
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SkillpackError> {
    let name = dir.file_name().and_then(|s| s.to_str()).unwrap_or("");
    if SKIP_DIRS.contains(&name) {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, out)?;
        } else if path.file_name().and_then(|s| s.to_str()) == Some(SKILL_FILE) {
            out.push(path);
        }
    }
    Ok(())
}

/// Every `SKILL.md` below `dir`, sorted.
pub fn discover_under(dir: &Path) -> Result<Vec<PathBuf>, SkillpackError> {
    let mut out = Vec::new();
    collect(dir, &mut out)?;
    out.sort();
    Ok(out)
}

/// Find every `SKILL.md` below the configured roots, sorted.
pub fn discover(root: &Path, roots: &[String]) -> Result<Vec<PathBuf>, SkillpackError> {
    let mut out = Vec::new();
    for r in roots {
        let dir = root.join(r);
        if dir.is_dir() {
            collect(&dir, &mut out)?;
        } else {
            tracing::debug!(root = %dir.display(), "skill root missing, skipping");
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// A loaded skill document. Frontmatter errors are kept as values so a broken
/// file still gets a report instead of aborting the whole run.
#[derive(Debug, Clone)]
pub struct SkillDoc {
    pub path: PathBuf,
    pub raw: String,
    pub frontmatter: Result<Mapping, String>,
    pub body: String,
    pub body_lines: usize,
    pub sha256: String,
}

impl SkillDoc {
    pub fn load(path: &Path) -> Result<Self, SkillpackError> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_source(path, raw))
    }

    pub fn from_source(path: &Path, raw: String) -> Self {
        let sha256 = sha256_hex(raw.as_bytes());
        let (frontmatter, body) = match frontmatter::split(&raw) {
            Ok(split) => (
                frontmatter::parse_mapping(split.yaml).map_err(|e| e.to_string()),
                split.body.to_string(),
            ),
            Err(e) => (Err(e.to_string()), raw.clone()),
        };
        let body_lines = body.lines().count();
        Self {
            path: path.to_path_buf(),
            raw,
            frontmatter,
            body,
            body_lines,
            sha256,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.frontmatter
            .as_ref()
            .ok()
            .and_then(|m| frontmatter::get_str(m, "name"))
    }

    pub fn description(&self) -> Option<&str> {
        self.frontmatter
            .as_ref()
            .ok()
            .and_then(|m| frontmatter::get_str(m, "description"))
    }

    pub fn version(&self) -> Option<&str> {
        self.frontmatter
            .as_ref()
            .ok()
            .and_then(|m| frontmatter::get_str(m, "version"))
    }

    /// Name of the directory holding this SKILL.md.
    pub fn dir_name(&self) -> Option<&str> {
        self.path
            .parent()
            .and_then(Path::file_name)
            .and_then(|s| s.to_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Structural checks on frontmatter. Errors here fail the gate regardless of score.
pub fn quick_validate(doc: &SkillDoc) -> Validation {
    let mut v = Validation::default();
    let map = match &doc.frontmatter {
        Ok(map) => map,
        Err(e) => {
            v.errors.push(e.clone());
            return v;
        }
    };

    let mut unexpected: Vec<String> = map
        .keys()
        .map(|k| match k.as_str() {
            Some(s) => s.to_string(),
            None => format!("{:?}", k),
        })
        .filter(|k| !ALLOWED_KEYS.contains(&k.as_str()))
        .collect();
    if !unexpected.is_empty() {
        unexpected.sort();
        v.errors.push(format!(
            "unexpected frontmatter key(s): {} (allowed: {})",
            unexpected.join(", "),
            ALLOWED_KEYS.join(", ")
        ));
    }

    match map.get("name") {
        None => v.errors.push("frontmatter missing 'name'".to_string()),
        Some(value) => match value.as_str().map(str::trim) {
            None => v.errors.push(format!(
                "'name' must be a string, found {}",
                frontmatter::value_kind(value)
            )),
            Some("") => v.errors.push("'name' is empty".to_string()),
            Some(name) => {
                if !name_re().is_match(name) {
                    v.errors.push(format!(
                        "'name' must be hyphen-case (lowercase letters, digits, single hyphens): '{}'",
                        name
                    ));
                }
                if name.chars().count() > MAX_NAME_CHARS {
                    v.errors.push(format!(
                        "'name' is {} characters, maximum is {}",
                        name.chars().count(),
                        MAX_NAME_CHARS
                    ));
                }
                if let Some(dir) = doc.dir_name() {
                    if dir != name {
                        v.warnings.push(format!(
                            "'name' is '{}' but the skill lives in directory '{}'",
                            name, dir
                        ));
                    }
                }
            }
        },
    }

    match map.get("description") {
        None => v.errors.push("frontmatter missing 'description'".to_string()),
        Some(value) => match value.as_str().map(str::trim) {
            None => v.errors.push(format!(
                "'description' must be a string, found {}",
                frontmatter::value_kind(value)
            )),
            Some("") => v.errors.push("'description' is empty".to_string()),
            Some(desc) => {
                if desc.contains('<') || desc.contains('>') {
                    v.errors
                        .push("'description' must not contain angle brackets".to_string());
                }
                if desc.chars().count() > MAX_DESCRIPTION_CHARS {
                    v.errors.push(format!(
                        "'description' is {} characters, maximum is {}",
                        desc.chars().count(),
                        MAX_DESCRIPTION_CHARS
                    ));
                }
            }
        },
    }

    if let Some(value) = map.get("version") {
        let as_text = match value {
            serde_yaml::Value::String(s) => Some(s.clone()),
            // `version: 1.0` parses as a float
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        match as_text {
            Some(text) if semver::Version::parse(text.trim()).is_ok() => {}
            Some(text) => v
                .errors
                .push(format!("'version' is not semver: '{}'", text)),
            None => v.errors.push(format!(
                "'version' must be a string, found {}",
                frontmatter::value_kind(value)
            )),
        }
    }

    v
}

/// Scaffold `<parent>/<name>/SKILL.md` from the embedded template.
pub fn new_skill(parent: &Path, name: &str, description: &str) -> Result<PathBuf, SkillpackError> {
    if !name_re().is_match(name) || name.len() > MAX_NAME_CHARS {
        return Err(SkillpackError::ValidationError(format!(
            "skill name '{}' must be hyphen-case and at most {} characters",
            name, MAX_NAME_CHARS
        )));
    }
    let dir = parent.join(name);
    let path = dir.join(SKILL_FILE);
    if path.exists() {
        return Err(SkillpackError::ValidationError(format!(
            "{} already exists",
            path.display()
        )));
    }
    let title = name
        .split('-')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let description = serde_yaml::to_string(&serde_yaml::Value::String(description.to_string()))?;
    let content = assets::render(
        assets::TEMPLATE_SKILL,
        &[
            ("name", name),
            ("description", description.trim_end()),
            ("title", &title),
        ],
    );
    fs::create_dir_all(&dir)?;
    fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "scaffolded skill");
    Ok(path)
}
