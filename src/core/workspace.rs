//! Repository root discovery and package enumeration.
//!
//! A package is a directory matched by one of the configured globs that holds a
//! `package.json` with a `name` and a semver `version`.

use crate::core::config::{CONFIG_FILE, Config};
use crate::core::error::SkillpackError;
use crate::core::output;
use rustc_hash::FxHashMap;
use semver::Version;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const PACKAGE_MANIFEST: &str = "package.json";
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Walk up from `start` to the nearest directory holding `skillpack.toml` or `.git`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf, SkillpackError> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(CONFIG_FILE).is_file() || dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(SkillpackError::NotFound(format!(
        "no {} or .git found above {}",
        CONFIG_FILE,
        start.display()
    )))
}

/// An opened repository: its root, the directory commands were invoked from,
/// and the loaded configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub cwd: PathBuf,
    pub config: Config,
}

impl Workspace {
    pub fn open(cwd: &Path) -> Result<Self, SkillpackError> {
        let root = find_repo_root(cwd)?;
        let config = Config::load(&root)?.apply_env()?;
        tracing::debug!(root = %root.display(), "opened workspace");
        Ok(Self {
            root,
            cwd: cwd.to_path_buf(),
            config,
        })
    }

    pub fn packages(&self) -> Result<Vec<Package>, SkillpackError> {
        discover_packages(&self.root, &self.config.packages.globs)
    }

    pub fn package(&self, name: &str) -> Result<Package, SkillpackError> {
        self.packages()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SkillpackError::NotFound(format!("package '{}'", name)))
    }

    pub fn changeset_dir(&self) -> PathBuf {
        self.root.join(&self.config.changeset.dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub version: Version,
    pub dir: PathBuf,
}

impl Package {
    /// Read `<dir>/package.json`.
    pub fn load(dir: &Path) -> Result<Self, SkillpackError> {
        let manifest_path = dir.join(PACKAGE_MANIFEST);
        let raw = fs::read_to_string(&manifest_path)?;
        let manifest: Value = serde_json::from_str(&raw).map_err(|e| {
            SkillpackError::ValidationError(format!("{}: {}", manifest_path.display(), e))
        })?;
        let field = |key: &str| -> Result<String, SkillpackError> {
            manifest
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    SkillpackError::ValidationError(format!(
                        "{}: missing string field '{}'",
                        manifest_path.display(),
                        key
                    ))
                })
        };
        let name = field("name")?;
        let raw_version = field("version")?;
        let version = Version::parse(&raw_version).map_err(|e| {
            SkillpackError::ValidationError(format!(
                "{}: version '{}' is not semver: {}",
                manifest_path.display(),
                raw_version,
                e
            ))
        })?;
        Ok(Self {
            name,
            version,
            dir: dir.to_path_buf(),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(PACKAGE_MANIFEST)
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.dir.join(CHANGELOG_FILE)
    }

    /// `name@version`, the tag and release name for this package.
    pub fn tag(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Rewrite the `version` field of `package.json`, keeping key order and every other field.
    pub fn write_version(&mut self, new: &Version) -> Result<(), SkillpackError> {
        let path = self.manifest_path();
        let raw = fs::read_to_string(&path)?;
        let mut manifest: Value = serde_json::from_str(&raw)?;
        let obj = manifest.as_object_mut().ok_or_else(|| {
            SkillpackError::ValidationError(format!("{}: not a JSON object", path.display()))
        })?;
        obj.insert("version".to_string(), Value::String(new.to_string()));
        fs::write(&path, output::to_json_file_string(&manifest)?)?;
        self.version = new.clone();
        Ok(())
    }
}

/// Enumerate packages under `root` matched by `globs`, sorted by name.
pub fn discover_packages(root: &Path, globs: &[String]) -> Result<Vec<Package>, SkillpackError> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for pattern in globs {
        // the root is literal; only the configured pattern may glob
        let full = Path::new(&glob::Pattern::escape(&root.to_string_lossy())).join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full).map_err(|e| {
            SkillpackError::ConfigError(format!("invalid package glob '{}': {}", pattern, e))
        })?;
        for entry in entries {
            let path = entry.map_err(|e| SkillpackError::IoError(e.into_error()))?;
            if path.is_dir() && path.join(PACKAGE_MANIFEST).is_file() && !dirs.contains(&path) {
                dirs.push(path);
            }
        }
    }

    let mut packages = Vec::with_capacity(dirs.len());
    let mut seen: FxHashMap<String, PathBuf> = FxHashMap::default();
    for dir in dirs {
        let pkg = Package::load(&dir)?;
        if let Some(prev) = seen.insert(pkg.name.clone(), dir.clone()) {
            return Err(SkillpackError::ValidationError(format!(
                "package name '{}' is declared twice: {} and {}",
                pkg.name,
                prev.display(),
                dir.display()
            )));
        }
        packages.push(pkg);
    }
    packages.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(count = packages.len(), "discovered packages");
    Ok(packages)
}

/// Path relative to `root` for display, falling back to the input.
pub fn display_rel(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
