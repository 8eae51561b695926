use skillpack::core::assets;
use skillpack::core::config::{CONFIG_FILE, Config};
use skillpack::core::frontmatter;
use skillpack::core::output::OutputFormat;
use skillpack::core::validate;
use skillpack::core::workspace::{self, Workspace};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{TempDir, tempdir};

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write file");
}

fn run_skillpack(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skillpack"))
        .current_dir(cwd)
        .env_remove("SKILLPACK_THRESHOLD")
        .env_remove("SKILLPACK_LOG")
        .args(args)
        .output()
        .expect("run skillpack")
}

fn healthy_repo() -> TempDir {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join(CONFIG_FILE), assets::TEMPLATE_CONFIG);
    write(
        &root.join("skills/greeter/package.json"),
        "{\"name\": \"greeter\", \"version\": \"0.1.0\"}",
    );
    write(
        &root.join("skills/greeter/SKILL.md"),
        &assets::render(
            assets::TEMPLATE_SKILL,
            &[
                ("name", "greeter"),
                ("description", "Write greetings. Use when the user wants a friendly opener."),
                ("title", "Greeter"),
            ],
        ),
    );
    tmp
}

#[test]
fn templates_resolve_and_default_config_round_trips() {
    for name in assets::list_templates() {
        let content = assets::get_template(name).expect("listed template");
        assert!(!content.trim().is_empty());
    }
    let parsed: Config = toml::from_str(Config::default_toml()).expect("template parses");
    assert_eq!(parsed.gate.threshold, 8.0);
    assert_eq!(parsed.skills.max_lines, 500);
}

#[test]
fn config_rejects_unknown_keys_and_out_of_range_thresholds() {
    let tmp = tempdir().expect("tempdir");
    write(&tmp.path().join(CONFIG_FILE), "[gate]\nthreshhold = 7.0\n");
    let err = Config::load(tmp.path()).expect_err("typo");
    assert!(err.to_string().contains(CONFIG_FILE));

    write(&tmp.path().join(CONFIG_FILE), "[gate]\nthreshold = 11.0\n");
    assert!(Config::load(tmp.path()).is_err());
}

#[test]
fn workspace_opens_from_nested_dir() {
    let tmp = healthy_repo();
    let nested = tmp.path().join("skills/greeter");
    let ws = Workspace::open(&nested).expect("open");
    assert_eq!(ws.root, tmp.path());
    assert_eq!(ws.cwd, nested);
    let pkg = ws.package("greeter").expect("package");
    assert_eq!(pkg.tag(), "greeter@0.1.0");
    assert!(ws.package("missing").is_err());
    assert_eq!(
        workspace::display_rel(&ws.root, &ws.changeset_dir()),
        ".changeset"
    );
}

#[test]
fn check_passes_on_healthy_repo_and_fails_on_bad_changeset() {
    let tmp = healthy_repo();
    let root = tmp.path();
    let ws = Workspace::open(root).expect("open");
    let report = validate::run_check(&ws, false).expect("check");
    assert!(report.ok(), "{:?}", report.failures());
    let names: Vec<&str> = report.gates.iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["skills", "packages", "changesets", "marketplace"]);

    write(&root.join(".changeset/x.md"), "---\nghost: minor\n---\nboo\n");
    let report = validate::run_check(&ws, false).expect("check");
    assert!(!report.ok());
    assert!(report.failures()[0].starts_with("changesets: "));

    let out = run_skillpack(root, &["check"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("check: summary gates=4 fail=1"), "{stdout}");
}

#[test]
fn init_writes_config_and_changeset_readme_once() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    fs::create_dir_all(root.join(".git")).unwrap();

    let out = run_skillpack(root, &["init"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        fs::read_to_string(root.join(CONFIG_FILE)).unwrap(),
        assets::TEMPLATE_CONFIG
    );
    assert!(root.join(".changeset/README.md").is_file());

    write(&root.join(CONFIG_FILE), "[gate]\nthreshold = 9.0\n");
    let out = run_skillpack(root, &["init"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("init: kept skillpack.toml"));
    assert_eq!(
        fs::read_to_string(root.join(CONFIG_FILE)).unwrap(),
        "[gate]\nthreshold = 9.0\n"
    );
}

#[test]
fn commit_lint_contract() {
    let tmp = tempdir().expect("tempdir");
    let ok = run_skillpack(tmp.path(), &["commit", "lint", "feat(pdf): add merge"]);
    assert!(ok.status.success());

    let bad = run_skillpack(tmp.path(), &["commit", "lint", "Added stuff"]);
    assert_eq!(bad.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad.stdout).contains("does not match"));

    let msg = tmp.path().join("COMMIT_EDITMSG");
    write(&msg, "# Please enter the commit message\nfix: handle empty input\n\nbody\n");
    let from_file = run_skillpack(
        tmp.path(),
        &["commit", "lint", "--file", msg.to_str().unwrap()],
    );
    assert!(from_file.status.success());
}

#[test]
fn version_and_global_dir_flag() {
    let tmp = healthy_repo();
    let out = run_skillpack(tmp.path(), &["version"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        format!("v{}", env!("CARGO_PKG_VERSION"))
    );

    let elsewhere = tempdir().expect("tempdir");
    let out = run_skillpack(
        elsewhere.path(),
        &["-C", tmp.path().to_str().unwrap(), "validate", "--strict"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stdout));
}

#[test]
fn unknown_format_is_an_error() {
    assert!("yaml".parse::<OutputFormat>().is_err());
    let tmp = healthy_repo();
    let out = run_skillpack(tmp.path(), &["validate", "--format", "xml"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn threshold_flag_outside_score_scale_is_an_error() {
    let tmp = healthy_repo();
    let out = run_skillpack(tmp.path(), &["validate", "--threshold", "11"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--threshold must be within 0..=10"), "{stderr}");
}

#[test]
fn frontmatter_split_exposes_body_offset() {
    let raw = "---\nname: a\n---\n# A\n";
    let split = frontmatter::split(raw).expect("split");
    assert_eq!(split.yaml, "name: a\n");
    assert_eq!(split.body, "# A\n");
    assert_eq!(split.body_start_line, 4);
}
