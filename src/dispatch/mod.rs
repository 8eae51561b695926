//! Command dispatch: turns parsed CLI structs into library calls and renders
//! their results on stdout.
//!
//! Failed gates are returned as `ValidationError` so the binary exits 1.

mod release;

use crate::cli::{
    CheckCli, Command, CommitCli, CommitCommand, MarketplaceCli, MarketplaceCommand, ScoreCli,
    SkillCli, SkillCommand, ValidateCli,
};
use crate::core::assets;
use crate::core::config::{CONFIG_FILE, Config};
use crate::core::error::SkillpackError;
use crate::core::output::{self, OutputFormat};
use crate::core::validate::{self, ValidateOptions};
use crate::core::workspace::{self, Workspace};
use crate::plugins::score::{self, ScoreReport};
use crate::plugins::skill::{self, SKILL_FILE, SkillDoc};
use crate::plugins::{commits, marketplace};
use std::fs;
use std::io::Read;
use std::path::Path;

pub(crate) fn dispatch(command: Command, cwd: &Path) -> Result<(), SkillpackError> {
    match command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init { force } => run_init(cwd, force),
        Command::Commit(cli) => run_commit(cli),
        Command::Validate(cli) => run_validate(&Workspace::open(cwd)?, cli),
        Command::Score(cli) => run_score(&Workspace::open(cwd)?, cli),
        Command::Skill(cli) => run_skill(&Workspace::open(cwd)?, cli),
        Command::Check(cli) => run_check(&Workspace::open(cwd)?, cli),
        Command::Changeset(cli) => release::run_changeset(&Workspace::open(cwd)?, cli),
        Command::Release(cli) => release::run_release(&Workspace::open(cwd)?, cli),
        Command::Marketplace(cli) => run_marketplace(&Workspace::open(cwd)?, cli),
    }
}

fn run_init(cwd: &Path, force: bool) -> Result<(), SkillpackError> {
    let root = workspace::find_repo_root(cwd).unwrap_or_else(|_| cwd.to_path_buf());

    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() && !force {
        println!("init: kept {}", CONFIG_FILE);
    } else {
        fs::write(&config_path, Config::default_toml())?;
        println!("init: wrote {}", CONFIG_FILE);
    }

    let config = Config::load(&root)?;
    let readme = root.join(&config.changeset.dir).join("README.md");
    if readme.exists() {
        println!("init: kept {}", workspace::display_rel(&root, &readme));
    } else {
        if let Some(parent) = readme.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&readme, assets::TEMPLATE_CHANGESET_README)?;
        println!("init: wrote {}", workspace::display_rel(&root, &readme));
    }
    Ok(())
}

fn run_validate(ws: &Workspace, cli: ValidateCli) -> Result<(), SkillpackError> {
    let format: OutputFormat = cli.format.parse()?;
    let summary = validate::validate_skills(
        ws,
        &ValidateOptions {
            paths: cli.paths,
            strict: cli.strict,
            threshold: cli.threshold,
        },
    )?;
    validate::print_skills_summary(ws, &summary, format)?;
    if summary.ok() {
        Ok(())
    } else {
        Err(SkillpackError::ValidationError(format!(
            "{} skill(s) failed (threshold {:.1})",
            summary.failed, summary.gate.threshold
        )))
    }
}

fn print_score(ws: &Workspace, report: &ScoreReport) {
    println!(
        "{}  {:.1}/10  {}",
        workspace::display_rel(&ws.root, &report.path),
        report.score,
        report.name.as_deref().unwrap_or("<unnamed>")
    );
    for item in &report.breakdown {
        println!(
            "  {:<12} {:>3.1}/{:.1}",
            item.criterion.as_str(),
            item.earned,
            item.max
        );
    }
    for finding in &report.findings {
        println!("  -{:.1} {}: {}", finding.lost, finding.criterion, finding.message);
    }
    for err in &report.validation.errors {
        println!("  error: {}", err);
    }
    for warning in &report.validation.warnings {
        println!("  warn: {}", warning);
    }
    println!(
        "  body: {} lines, ~{} tokens, sha256 {}",
        report.body_lines,
        report.body_tokens,
        &report.sha256[..12.min(report.sha256.len())]
    );
}

fn run_score(ws: &Workspace, cli: ScoreCli) -> Result<(), SkillpackError> {
    let format: OutputFormat = cli.format.parse()?;
    let mut path = if cli.path.is_absolute() {
        cli.path
    } else {
        ws.cwd.join(cli.path)
    };
    if path.is_dir() {
        path = path.join(SKILL_FILE);
    }
    if !path.is_file() {
        return Err(SkillpackError::NotFound(format!("{}", path.display())));
    }
    let doc = SkillDoc::load(&path)?;
    let report = score::score_doc(&doc, &ws.config.skills);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_score(ws, &report),
    }
    Ok(())
}

fn run_skill(ws: &Workspace, cli: SkillCli) -> Result<(), SkillpackError> {
    match cli.command {
        SkillCommand::New {
            name,
            dir,
            description,
        } => {
            let parent = if dir.is_absolute() { dir } else { ws.root.join(dir) };
            let path = skill::new_skill(&parent, &name, &description)?;
            println!("skill: created {}", workspace::display_rel(&ws.root, &path));
            Ok(())
        }
    }
}

fn run_check(ws: &Workspace, cli: CheckCli) -> Result<(), SkillpackError> {
    let format: OutputFormat = cli.format.parse()?;
    let report = validate::run_check(ws, cli.strict)?;
    validate::print_check_report(&report, format)?;
    if report.ok() {
        Ok(())
    } else {
        Err(SkillpackError::ValidationError(format!(
            "check failed: {}",
            output::preview_messages(&report.failures(), 1, 160)
        )))
    }
}

fn run_commit(cli: CommitCli) -> Result<(), SkillpackError> {
    match cli.command {
        CommitCommand::Lint { message, file } => {
            let text = match (message, file) {
                (Some(m), _) => m,
                (None, Some(f)) => fs::read_to_string(f)?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let problems = commits::lint(&text);
            if problems.is_empty() {
                println!("{} commit message", output::status_tag(true));
                return Ok(());
            }
            println!("{} commit message", output::status_tag(false));
            for p in &problems {
                println!("       {}", p);
            }
            Err(SkillpackError::ValidationError(format!(
                "commit message has {} problem(s)",
                problems.len()
            )))
        }
    }
}

fn run_marketplace(ws: &Workspace, cli: MarketplaceCli) -> Result<(), SkillpackError> {
    let packages = ws.packages()?;
    match cli.command {
        MarketplaceCommand::Check => {
            if marketplace::Marketplace::load(&ws.root)?.is_none() {
                println!("marketplace: no {} found", marketplace::MARKETPLACE_PATH);
                return Ok(());
            }
            let issues = marketplace::check(&ws.root, &packages)?;
            for issue in &issues {
                println!("{} {}", output::status_tag(false), issue);
            }
            println!("marketplace: summary issues={}", issues.len());
            if issues.is_empty() {
                Ok(())
            } else {
                Err(SkillpackError::ValidationError(format!(
                    "marketplace has {} issue(s)",
                    issues.len()
                )))
            }
        }
        MarketplaceCommand::Sync => {
            let updated = marketplace::sync_versions(&ws.root, &packages)?;
            println!("marketplace: summary updated={}", updated);
            Ok(())
        }
    }
}
