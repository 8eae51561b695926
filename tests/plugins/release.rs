use skillpack::core::error::SkillpackError;
use skillpack::core::git::Git;
use skillpack::core::workspace::{self, Package};
use skillpack::plugins::release::{self, Outcome, ReleaseHost, TagOptions};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// In-memory stand-in for GitHub releases.
#[derive(Default)]
struct FakeHost {
    created: RefCell<Vec<(String, String, String)>>,
}

impl ReleaseHost for FakeHost {
    fn release_exists(&self, tag: &str) -> Result<bool, SkillpackError> {
        Ok(self.created.borrow().iter().any(|(t, _, _)| t == tag))
    }

    fn create_release(&self, tag: &str, title: &str, notes: &str) -> Result<(), SkillpackError> {
        self.created
            .borrow_mut()
            .push((tag.to_string(), title.to_string(), notes.to_string()));
        Ok(())
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write file");
}

fn git(root: &Path, args: &[&str]) -> String {
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
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn run_skillpack(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skillpack"))
        .current_dir(root)
        .env("SKILLPACK_NO_GITHUB", "1")
        .args(args)
        .output()
        .expect("run skillpack")
}

fn setup_repo() -> TempDir {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path();
    write(&root.join("skillpack.toml"), "[release]\nnotes_fallback_lines = 3\n");
    write(
        &root.join("skills/pdf-tools/package.json"),
        "{\"name\": \"pdf-tools\", \"version\": \"1.3.0\"}",
    );
    write(
        &root.join("skills/pdf-tools/CHANGELOG.md"),
        "# pdf-tools\n\n## 1.3.0\n\n### Minor Changes\n\n- Add form filling.\n\n## 1.2.0\n\n- Old.\n",
    );
    write(
        &root.join("skills/notes/package.json"),
        "{\"name\": \"notes\", \"version\": \"0.2.0\"}",
    );
    write(
        &root.join("skills/notes/CHANGELOG.md"),
        "# notes\n\nline one\nline two\nline three\nline four\n",
    );
    write(
        &root.join("skills/draft/package.json"),
        "{\"name\": \"draft\", \"version\": \"0.0.1\"}",
    );

    git(root, &["init", "-q"]);
    git(root, &["config", "user.name", "Skill Author"]);
    git(root, &["config", "user.email", "author@example.com"]);
    git(root, &["config", "tag.gpgsign", "false"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "chore: release"]);
    tmp
}

fn packages(root: &Path) -> Vec<Package> {
    workspace::discover_packages(root, &["skills/*".to_string()]).expect("packages")
}

#[test]
fn second_run_only_skips() {
    let tmp = setup_repo();
    let root = tmp.path();
    let git_repo = Git::new(root);
    let host = FakeHost::default();
    let opts = TagOptions {
        fallback_lines: 3,
        ..TagOptions::default()
    };

    let first = release::tag_packages(&git_repo, Some(&host), &packages(root), &opts)
        .expect("first run");
    assert_eq!(first.packages.len(), 2, "draft has no changelog");
    assert_eq!(first.created_tags(), 2);
    assert_eq!(first.created_releases(), 2);

    let tags = git(root, &["tag", "--list"]);
    let mut tags: Vec<&str> = tags.lines().collect();
    tags.sort();
    assert_eq!(tags, vec!["notes@0.2.0", "pdf-tools@1.3.0"]);

    let second = release::tag_packages(&git_repo, Some(&host), &packages(root), &opts)
        .expect("second run");
    assert_eq!(second.created_tags(), 0);
    assert_eq!(second.created_releases(), 0);
    for p in &second.packages {
        assert_eq!(p.tag_outcome, Outcome::Skipped("tag exists".to_string()));
        assert_eq!(p.release_outcome, Outcome::Skipped("release exists".to_string()));
    }
    assert_eq!(host.created.borrow().len(), 2);
}

#[test]
fn notes_come_from_the_matching_section_or_the_head() {
    let tmp = setup_repo();
    let root = tmp.path();
    let host = FakeHost::default();
    let opts = TagOptions {
        fallback_lines: 3,
        ..TagOptions::default()
    };
    let report = release::tag_packages(&Git::new(root), Some(&host), &packages(root), &opts)
        .expect("release");

    let created = host.created.borrow();
    let pdf = created.iter().find(|(t, _, _)| t == "pdf-tools@1.3.0").unwrap();
    assert_eq!(pdf.1, "pdf-tools@1.3.0");
    assert_eq!(pdf.2, "### Minor Changes\n\n- Add form filling.");

    let notes = created.iter().find(|(t, _, _)| t == "notes@0.2.0").unwrap();
    assert_eq!(notes.2, "# notes\n\nline one");
    let notes_report = report.packages.iter().find(|p| p.name == "notes").unwrap();
    assert!(notes_report.notes_fallback);
}

#[test]
fn dry_run_creates_nothing() {
    let tmp = setup_repo();
    let root = tmp.path();
    let host = FakeHost::default();
    let opts = TagOptions {
        dry_run: true,
        ..TagOptions::default()
    };
    let report = release::tag_packages(&Git::new(root), Some(&host), &packages(root), &opts)
        .expect("dry run");
    assert!(report
        .packages
        .iter()
        .all(|p| p.tag_outcome == Outcome::Planned && p.release_outcome == Outcome::Planned));
    assert!(git(root, &["tag", "--list"]).is_empty());
    assert!(host.created.borrow().is_empty());
}

#[test]
fn release_without_host_still_tags() {
    let tmp = setup_repo();
    let root = tmp.path();
    let report = release::tag_packages(&Git::new(root), None, &packages(root), &TagOptions::default())
        .expect("tags only");
    assert_eq!(report.created_tags(), 2);
    assert!(report
        .packages
        .iter()
        .all(|p| p.release_outcome == Outcome::Skipped("github disabled".to_string())));
}

#[test]
fn push_failure_aborts_the_run() {
    let tmp = setup_repo();
    let root = tmp.path();
    let opts = TagOptions {
        push: true,
        remote: "nowhere".to_string(),
        ..TagOptions::default()
    };
    let err = release::tag_packages(&Git::new(root), None, &packages(root), &opts)
        .expect_err("no such remote");
    assert!(matches!(err, SkillpackError::ToolError { .. }));
}

#[test]
fn cli_release_tag_is_idempotent() {
    let tmp = setup_repo();
    let root = tmp.path();

    let out = run_skillpack(root, &["release", "tag"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("release: summary packages=2 tags_created=2 releases_created=0"));

    let out = run_skillpack(root, &["release", "tag", "--format", "json"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    for p in v["packages"].as_array().expect("packages") {
        assert_eq!(p["tag_outcome"]["status"], "skipped");
        assert_eq!(p["release_outcome"]["detail"], "github disabled");
    }
}
