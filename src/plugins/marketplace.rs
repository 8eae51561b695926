//! Plugin marketplace registry (`.claude-plugin/marketplace.json`).
//!
//! The registry lists each published package with a `name`, `source`
//! directory, `description` and optional `version`. Unknown fields and key
//! order are preserved on rewrite.

use crate::core::error::SkillpackError;
use crate::core::output;
use crate::core::workspace::Package;
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const MARKETPLACE_PATH: &str = ".claude-plugin/marketplace.json";

#[derive(Debug, Clone)]
pub struct Marketplace {
    pub path: PathBuf,
    pub doc: Value,
}

/// Read-only view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub index: usize,
    pub name: Option<String>,
    pub source: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl Marketplace {
    /// `None` when the repository has no marketplace file.
    pub fn load(root: &Path) -> Result<Option<Self>, SkillpackError> {
        let path = root.join(MARKETPLACE_PATH);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let doc: Value = serde_json::from_str(&raw).map_err(|e| {
            SkillpackError::ValidationError(format!("{}: {}", path.display(), e))
        })?;
        if !doc.get("plugins").is_some_and(Value::is_array) {
            return Err(SkillpackError::ValidationError(format!(
                "{}: missing 'plugins' array",
                path.display()
            )));
        }
        Ok(Some(Self { path, doc }))
    }

    pub fn entries(&self) -> Vec<EntryView> {
        let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
        self.doc
            .get("plugins")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .enumerate()
                    .map(|(index, v)| EntryView {
                        index,
                        name: text(v, "name"),
                        source: text(v, "source"),
                        version: text(v, "version"),
                        description: text(v, "description"),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), SkillpackError> {
        fs::write(&self.path, output::to_json_file_string(&self.doc)?)?;
        Ok(())
    }
}

/// Package an entry refers to: by source directory first, then by name.
fn package_for<'p>(root: &Path, entry: &EntryView, packages: &'p [Package]) -> Option<&'p Package> {
    if let Some(source) = &entry.source {
        let target = normalize(&root.join(source));
        if let Some(pkg) = packages.iter().find(|p| normalize(&p.dir) == target) {
            return Some(pkg);
        }
    }
    let name = entry.name.as_deref()?;
    packages.iter().find(|p| p.name == name)
}

/// Consistency issues between the registry and the repository.
pub fn check(root: &Path, packages: &[Package]) -> Result<Vec<String>, SkillpackError> {
    let Some(market) = Marketplace::load(root)? else {
        return Ok(Vec::new());
    };
    let mut issues = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for entry in market.entries() {
        let label = entry
            .name
            .clone()
            .unwrap_or_else(|| format!("plugins[{}]", entry.index));

        match entry.name.as_deref().map(str::trim) {
            None | Some("") => issues.push(format!("{}: empty or missing 'name'", label)),
            Some(name) => {
                if !seen.insert(name.to_string()) {
                    issues.push(format!("{}: duplicate entry name", label));
                }
            }
        }
        if entry.description.as_deref().map(str::trim).unwrap_or("").is_empty() {
            issues.push(format!("{}: empty or missing 'description'", label));
        }
        if let Some(source) = &entry.source {
            if !root.join(source).exists() {
                issues.push(format!("{}: source '{}' does not exist", label, source));
            }
        }
        if let Some(version) = &entry.version {
            if semver::Version::parse(version).is_err() {
                issues.push(format!("{}: version '{}' is not semver", label, version));
            } else if let Some(pkg) = package_for(root, &entry, packages) {
                if pkg.version.to_string() != *version {
                    issues.push(format!(
                        "{}: version {} does not match {} ({})",
                        label,
                        version,
                        pkg.manifest_path().display(),
                        pkg.version
                    ));
                }
            }
        }
    }
    Ok(issues)
}

/// Copy package versions into matching registry entries. Returns how many changed.
pub fn sync_versions(root: &Path, packages: &[Package]) -> Result<usize, SkillpackError> {
    let Some(mut market) = Marketplace::load(root)? else {
        return Ok(0);
    };
    let updates: Vec<(usize, String)> = market
        .entries()
        .iter()
        .filter_map(|entry| {
            let pkg = package_for(root, entry, packages)?;
            let wanted = pkg.version.to_string();
            (entry.version.as_deref() != Some(wanted.as_str())).then_some((entry.index, wanted))
        })
        .collect();
    if updates.is_empty() {
        return Ok(0);
    }

    if let Some(arr) = market.doc.get_mut("plugins").and_then(Value::as_array_mut) {
        for (index, version) in &updates {
            if let Some(obj) = arr.get_mut(*index).and_then(Value::as_object_mut) {
                obj.insert("version".to_string(), Value::String(version.clone()));
            }
        }
    }
    market.save()?;
    tracing::info!(updated = updates.len(), "synced marketplace versions");
    Ok(updates.len())
}
