//! Changesets: pending release intents stored as small Markdown files.
//!
//! ```md
//! ---
//! "pdf-tools": minor
//! "shared-refs": patch
//! ---
//!
//! Add form-filling walkthrough.
//! ```
//!
//! Pending changesets fold into a [`ReleasePlan`] (highest bump per package),
//! which [`apply_plan`] writes out as new `package.json` versions and
//! `CHANGELOG.md` sections before deleting the consumed files.

use crate::core::config::Config;
use crate::core::error::SkillpackError;
use crate::core::frontmatter;
use crate::core::workspace::{self, Package};
use crate::plugins::changelog::{self, Entry};
use crate::plugins::marketplace;
use crate::plugins::skill::SKILL_FILE;
use rustc_hash::FxHashMap;
use semver::{BuildMetadata, Prerelease, Version};
use serde::Serialize;
use serde_yaml::{Mapping, Value as YamlValue};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

impl Bump {
    pub fn as_str(self) -> &'static str {
        match self {
            Bump::Patch => "patch",
            Bump::Minor => "minor",
            Bump::Major => "major",
        }
    }

    /// Next version. Pre-release and build metadata are dropped.
    pub fn apply(self, current: &Version) -> Version {
        let mut next = current.clone();
        next.pre = Prerelease::EMPTY;
        next.build = BuildMetadata::EMPTY;
        match self {
            Bump::Major => {
                next.major += 1;
                next.minor = 0;
                next.patch = 0;
            }
            Bump::Minor => {
                next.minor += 1;
                next.patch = 0;
            }
            Bump::Patch => next.patch += 1,
        }
        next
    }
}

impl std::fmt::Display for Bump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bump {
    type Err = SkillpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "patch" => Ok(Bump::Patch),
            "minor" => Ok(Bump::Minor),
            "major" => Ok(Bump::Major),
            other => Err(SkillpackError::ValidationError(format!(
                "unknown bump type '{}': expected major, minor or patch",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changeset {
    pub id: String,
    pub path: Option<PathBuf>,
    /// Package name to bump, in file order.
    pub releases: Vec<(String, Bump)>,
    pub summary: String,
}

impl Changeset {
    pub fn parse(id: &str, raw: &str) -> Result<Self, SkillpackError> {
        let split = frontmatter::split(raw)
            .map_err(|e| SkillpackError::FrontmatterError(format!("changeset {}: {}", id, e)))?;
        let map = frontmatter::parse_mapping(split.yaml)
            .map_err(|e| SkillpackError::FrontmatterError(format!("changeset {}: {}", id, e)))?;

        let mut releases = Vec::with_capacity(map.len());
        for (key, value) in &map {
            let name = key.as_str().ok_or_else(|| {
                SkillpackError::FrontmatterError(format!(
                    "changeset {}: package names must be strings",
                    id
                ))
            })?;
            let bump = value
                .as_str()
                .ok_or_else(|| {
                    SkillpackError::FrontmatterError(format!(
                        "changeset {}: bump for '{}' must be a string",
                        id, name
                    ))
                })?
                .parse::<Bump>()
                .map_err(|e| SkillpackError::ValidationError(format!("changeset {}: {}", id, e)))?;
            if releases.iter().any(|(n, _): &(String, Bump)| n == name) {
                return Err(SkillpackError::ValidationError(format!(
                    "changeset {}: '{}' listed twice",
                    id, name
                )));
            }
            releases.push((name.to_string(), bump));
        }

        Ok(Self {
            id: id.to_string(),
            path: None,
            releases,
            summary: split.body.trim().to_string(),
        })
    }

    pub fn render(&self) -> Result<String, SkillpackError> {
        let mut out = String::from("---\n");
        if !self.releases.is_empty() {
            let mut map = Mapping::new();
            for (name, bump) in &self.releases {
                map.insert(
                    YamlValue::String(name.clone()),
                    YamlValue::String(bump.to_string()),
                );
            }
            out.push_str(&serde_yaml::to_string(&map)?);
        }
        out.push_str("---\n\n");
        out.push_str(self.summary.trim());
        out.push('\n');
        Ok(out)
    }
}

/// Every `*.md` in `dir` except `README.md`, sorted by id. A missing directory has none.
pub fn read_all(dir: &Path) -> Result<Vec<Changeset>, SkillpackError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_md = path.extension().and_then(|s| s.to_str()) == Some("md");
        let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if !path.is_file() || !is_md || file_name.eq_ignore_ascii_case("README.md") {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let raw = fs::read_to_string(&path)?;
        let mut cs = Changeset::parse(&id, &raw)?;
        cs.path = Some(path);
        out.push(cs);
    }
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

/// Write a new changeset named by a fresh lowercase ULID.
pub fn write_new(
    dir: &Path,
    releases: Vec<(String, Bump)>,
    summary: &str,
) -> Result<PathBuf, SkillpackError> {
    if releases.is_empty() {
        return Err(SkillpackError::ValidationError(
            "a changeset needs at least one package".to_string(),
        ));
    }
    let id = Ulid::new().to_string().to_lowercase();
    let cs = Changeset {
        id: id.clone(),
        path: None,
        releases,
        summary: summary.to_string(),
    };
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.md", id));
    fs::write(&path, cs.render()?)?;
    tracing::info!(path = %path.display(), "wrote changeset");
    Ok(path)
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedRelease {
    pub name: String,
    pub dir: PathBuf,
    pub bump: Bump,
    pub old_version: Version,
    pub new_version: Version,
    pub entries: Vec<Entry>,
    pub changesets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleasePlan {
    pub releases: Vec<PlannedRelease>,
    /// Every consumed changeset, including ones that release nothing.
    pub changesets: Vec<Changeset>,
}

impl ReleasePlan {
    pub fn build(changesets: Vec<Changeset>, packages: &[Package]) -> Result<Self, SkillpackError> {
        let by_name: FxHashMap<&str, &Package> =
            packages.iter().map(|p| (p.name.as_str(), p)).collect();

        let mut unknown: Vec<String> = changesets
            .iter()
            .flat_map(|cs| cs.releases.iter().map(|(n, _)| n))
            .filter(|n| !by_name.contains_key(n.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            unknown.dedup();
            return Err(SkillpackError::ValidationError(format!(
                "changesets reference unknown package(s): {}",
                unknown.join(", ")
            )));
        }

        let mut folded: FxHashMap<&str, (Bump, Vec<Entry>, Vec<String>)> = FxHashMap::default();
        for cs in &changesets {
            for (name, bump) in &cs.releases {
                let slot = folded
                    .entry(name.as_str())
                    .or_insert_with(|| (*bump, Vec::new(), Vec::new()));
                slot.0 = slot.0.max(*bump);
                slot.1.push(Entry {
                    bump: *bump,
                    summary: cs.summary.clone(),
                });
                slot.2.push(cs.id.clone());
            }
        }

        let mut releases: Vec<PlannedRelease> = folded
            .into_iter()
            .map(|(name, (bump, entries, ids))| {
                let pkg = by_name[name];
                PlannedRelease {
                    name: name.to_string(),
                    dir: pkg.dir.clone(),
                    bump,
                    old_version: pkg.version.clone(),
                    new_version: bump.apply(&pkg.version),
                    entries,
                    changesets: ids,
                }
            })
            .collect();
        releases.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            releases,
            changesets,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub bumped: Vec<(String, String, String)>,
    pub deleted: Vec<PathBuf>,
    pub skills_synced: Vec<PathBuf>,
    pub marketplace_updates: usize,
}

/// Write the plan: versions, changelogs, skill frontmatter versions, then
/// delete consumed changesets and sync the marketplace.
pub fn apply_plan(
    root: &Path,
    config: &Config,
    plan: &ReleasePlan,
) -> Result<ApplyReport, SkillpackError> {
    let mut report = ApplyReport::default();
    if plan.is_empty() {
        tracing::info!("no pending changesets, nothing to do");
        return Ok(report);
    }

    for release in &plan.releases {
        let mut pkg = Package::load(&release.dir)?;
        if pkg.version != release.old_version {
            return Err(SkillpackError::ValidationError(format!(
                "{} changed on disk ({} -> {}) since the plan was built",
                pkg.manifest_path().display(),
                release.old_version,
                pkg.version
            )));
        }
        pkg.write_version(&release.new_version)?;

        let changelog_path = pkg.changelog_path();
        let existing = if changelog_path.exists() {
            Some(fs::read_to_string(&changelog_path)?)
        } else {
            None
        };
        let section = changelog::render_section(&release.new_version.to_string(), &release.entries);
        fs::write(
            &changelog_path,
            changelog::prepend_section(existing.as_deref(), &release.name, &section),
        )?;

        let skill_path = release.dir.join(SKILL_FILE);
        if skill_path.is_file() {
            let raw = fs::read_to_string(&skill_path)?;
            let declares_version = frontmatter::split(&raw)
                .ok()
                .and_then(|s| frontmatter::parse_mapping(s.yaml).ok())
                .is_some_and(|m| m.contains_key("version"));
            if declares_version {
                let updated =
                    frontmatter::replace_scalar(&raw, "version", &release.new_version.to_string())?;
                if updated != raw {
                    fs::write(&skill_path, updated)?;
                    report.skills_synced.push(skill_path);
                }
            }
        }

        tracing::info!(
            package = %release.name,
            from = %release.old_version,
            to = %release.new_version,
            "bumped"
        );
        report.bumped.push((
            release.name.clone(),
            release.old_version.to_string(),
            release.new_version.to_string(),
        ));
    }

    for cs in &plan.changesets {
        if let Some(path) = &cs.path {
            fs::remove_file(path)?;
            report.deleted.push(path.clone());
        }
    }

    if config.release.sync_marketplace {
        let packages = workspace::discover_packages(root, &config.packages.globs)?;
        report.marketplace_updates = marketplace::sync_versions(root, &packages)?;
    }

    Ok(report)
}
