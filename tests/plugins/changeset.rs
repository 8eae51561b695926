use skillpack::core::config::Config;
use skillpack::core::workspace::{self, Package};
use skillpack::plugins::changeset::{self, Bump, Changeset, ReleasePlan};
use skillpack::plugins::commits;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write file");
}

fn git(root: &Path, args: &[&str]) {
    let out = Command::new("git")
        .current_dir(root)
        .args(args)
        .output()
        .expect("run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
}

fn run_skillpack(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skillpack"))
        .current_dir(root)
        .env_remove("SKILLPACK_THRESHOLD")
        .env("SKILLPACK_NO_GITHUB", "1")
        .args(args)
        .output()
        .expect("run skillpack")
}

/// Two packages; `pdf-tools` carries a versioned SKILL.md, a changelog and a
/// marketplace entry.
fn setup_repo() -> TempDir {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path();
    write(&root.join("skillpack.toml"), "");
    write(
        &root.join("skills/pdf-tools/package.json"),
        "{\n  \"name\": \"pdf-tools\",\n  \"version\": \"1.2.0\",\n  \"private\": true\n}\n",
    );
    write(
        &root.join("skills/pdf-tools/SKILL.md"),
        "---\nname: pdf-tools\ndescription: Fill PDF forms. Use when the user uploads a PDF.\nversion: 1.2.0\n---\n# PDF Tools\n",
    );
    write(
        &root.join("skills/pdf-tools/CHANGELOG.md"),
        "# pdf-tools\n\n## 1.2.0\n\n### Minor Changes\n\n- Old.\n",
    );
    write(
        &root.join("skills/notes/package.json"),
        "{\"name\": \"notes\", \"version\": \"0.1.0\"}",
    );
    write(
        &root.join(".claude-plugin/marketplace.json"),
        "{\n  \"name\": \"demo\",\n  \"plugins\": [\n    {\n      \"name\": \"pdf-tools\",\n      \"source\": \"./skills/pdf-tools\",\n      \"description\": \"PDF helpers\",\n      \"version\": \"1.2.0\"\n    }\n  ]\n}\n",
    );
    tmp
}

fn packages(root: &Path) -> Vec<Package> {
    workspace::discover_packages(root, &Config::default().packages.globs).expect("packages")
}

#[test]
fn version_applies_highest_bump_and_consumes_changesets() {
    let tmp = setup_repo();
    let root = tmp.path();
    let dir = root.join(".changeset");
    write(&dir.join("README.md"), "readme stays\n");
    write(&dir.join("aaa.md"), "---\n\"pdf-tools\": minor\n---\n\nAdd form filling.\n");
    write(&dir.join("bbb.md"), "---\npdf-tools: patch\nnotes: patch\n---\n\nFix typo.\n");

    let plan = ReleasePlan::build(changeset::read_all(&dir).expect("read"), &packages(root))
        .expect("plan");
    assert_eq!(plan.releases.len(), 2);
    let pdf = plan.releases.iter().find(|r| r.name == "pdf-tools").unwrap();
    assert_eq!(pdf.bump, Bump::Minor);
    assert_eq!(pdf.new_version.to_string(), "1.3.0");

    let report = changeset::apply_plan(root, &Config::default(), &plan).expect("apply");
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.skills_synced.len(), 1);
    assert_eq!(report.marketplace_updates, 1);

    assert!(!dir.join("aaa.md").exists());
    assert!(!dir.join("bbb.md").exists());
    assert!(dir.join("README.md").exists());

    let changelog =
        fs::read_to_string(root.join("skills/pdf-tools/CHANGELOG.md")).expect("changelog");
    assert_eq!(
        changelog,
        "# pdf-tools\n\n## 1.3.0\n\n### Minor Changes\n\n- Add form filling.\n\n### Patch Changes\n\n- Fix typo.\n\n## 1.2.0\n\n### Minor Changes\n\n- Old.\n"
    );
    let notes_log = fs::read_to_string(root.join("skills/notes/CHANGELOG.md")).expect("created");
    assert_eq!(notes_log, "# notes\n\n## 0.1.1\n\n### Patch Changes\n\n- Fix typo.\n");

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.join("skills/pdf-tools/package.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["version"], "1.3.0");
    assert_eq!(manifest["private"], true);

    let skill = fs::read_to_string(root.join("skills/pdf-tools/SKILL.md")).unwrap();
    assert!(skill.contains("\nversion: 1.3.0\n"));

    let market = fs::read_to_string(root.join(".claude-plugin/marketplace.json")).unwrap();
    assert!(market.contains("\"version\": \"1.3.0\""));
}

#[test]
fn unknown_package_blocks_the_plan() {
    let tmp = setup_repo();
    let cs = Changeset::parse("x", "---\nghost: major\n---\nboo\n").expect("parse");
    let err = ReleasePlan::build(vec![cs], &packages(tmp.path())).expect_err("unknown");
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn stale_plan_is_refused() {
    let tmp = setup_repo();
    let root = tmp.path();
    let cs = Changeset::parse("x", "---\nnotes: minor\n---\nNew.\n").expect("parse");
    let plan = ReleasePlan::build(vec![cs], &packages(root)).expect("plan");
    write(
        &root.join("skills/notes/package.json"),
        "{\"name\": \"notes\", \"version\": \"0.5.0\"}",
    );
    let err = changeset::apply_plan(root, &Config::default(), &plan).expect_err("stale");
    assert!(err.to_string().contains("changed on disk"));
}

#[test]
fn cli_add_status_version_round_trip() {
    let tmp = setup_repo();
    let root = tmp.path();

    let out = run_skillpack(
        root,
        &[
            "changeset", "add", "--package", "notes", "--bump", "major", "--summary",
            "Rewrite storage.",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("changeset: wrote .changeset/"));

    let out = run_skillpack(root, &["changeset", "status", "--format", "json"]);
    assert!(out.status.success());
    let status: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(status["releases"][0]["name"], "notes");
    assert_eq!(status["releases"][0]["new_version"], "1.0.0");

    let out = run_skillpack(root, &["changeset", "version", "--dry-run"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("notes 0.1.0 -> 1.0.0"));
    assert_eq!(changeset::read_all(&root.join(".changeset")).unwrap().len(), 1);

    let out = run_skillpack(root, &["changeset", "version"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(changeset::read_all(&root.join(".changeset")).unwrap().is_empty());
    let pkg = Package::load(&root.join("skills/notes")).unwrap();
    assert_eq!(pkg.version.to_string(), "1.0.0");

    let out = run_skillpack(root, &["changeset", "version"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("nothing to release"));
}

#[test]
fn cli_add_rejects_unknown_package_and_bad_bump() {
    let tmp = setup_repo();
    let out = run_skillpack(
        tmp.path(),
        &["changeset", "add", "-p", "ghost", "-b", "minor", "-s", "x"],
    );
    assert_eq!(out.status.code(), Some(1));

    let out = run_skillpack(
        tmp.path(),
        &["changeset", "add", "-p", "notes", "-b", "huge", "-s", "x"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown bump type"));
    assert!(!tmp.path().join(".changeset").exists());
}

#[test]
fn from_commits_uses_commits_since_last_tag() {
    let tmp = setup_repo();
    let root = tmp.path();
    git(root, &["init", "-q"]);
    git(root, &["config", "user.name", "Skill Author"]);
    git(root, &["config", "user.email", "author@example.com"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "chore: initial import"]);
    git(root, &["tag", "-a", "pdf-tools@1.2.0", "-m", "pdf-tools@1.2.0"]);

    write(&root.join("skills/pdf-tools/extra.md"), "more\n");
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "feat(pdf): add merge support"]);
    write(&root.join("skills/notes/extra.md"), "other package\n");
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "feat!: unrelated breaking change"]);
    write(&root.join("skills/pdf-tools/extra.md"), "more\nfixed\n");
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "fix: tidy merge output"]);

    let pkg = Package::load(&root.join("skills/pdf-tools")).unwrap();
    let path = commits::changeset_from_commits(root, &root.join(".changeset"), &pkg, None)
        .expect("from commits")
        .expect("a changeset");
    let raw = fs::read_to_string(&path).unwrap();
    let cs = Changeset::parse("new", &raw).unwrap();
    assert_eq!(cs.releases, vec![("pdf-tools".to_string(), Bump::Minor)]);
    assert_eq!(cs.summary, "- add merge support\n- tidy merge output");

    let plan = ReleasePlan::build(
        changeset::read_all(&root.join(".changeset")).expect("read"),
        &packages(root),
    )
    .expect("plan");
    changeset::apply_plan(root, &Config::default(), &plan).expect("apply");
    let changelog =
        fs::read_to_string(root.join("skills/pdf-tools/CHANGELOG.md")).expect("changelog");
    assert!(
        changelog.starts_with(
            "# pdf-tools\n\n## 1.3.0\n\n### Minor Changes\n\n- add merge support\n- tidy merge output\n\n## 1.2.0\n"
        ),
        "{changelog}"
    );
    git(root, &["add", "-A"]);
    git(root, &["commit", "-q", "-m", "chore: release pdf-tools@1.3.0"]);

    // nothing release-worthy after a docs-only commit range
    git(root, &["tag", "-a", "pdf-tools@1.3.0", "-m", "pdf-tools@1.3.0"]);
    write(&root.join("skills/pdf-tools/extra.md"), "docs\n");
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "docs: reword"]);
    let none = commits::changeset_from_commits(root, &root.join(".changeset"), &pkg, None)
        .expect("from commits");
    assert!(none.is_none());
}
