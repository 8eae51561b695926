//! `changeset` and `release` commands.

use crate::cli::{ChangesetCli, ChangesetCommand, ReleaseCli, ReleaseCommand};
use crate::core::error::SkillpackError;
use crate::core::git::Git;
use crate::core::output::{self, OutputFormat};
use crate::core::workspace::{self, Workspace};
use crate::plugins::changeset::{self, Bump, ReleasePlan};
use crate::plugins::commits;
use crate::plugins::release::{self, GhCli, Outcome, ReleaseHost, TagOptions};
use rustc_hash::FxHashSet;

pub(super) fn run_changeset(ws: &Workspace, cli: ChangesetCli) -> Result<(), SkillpackError> {
    match cli.command {
        ChangesetCommand::Add {
            packages,
            bumps,
            summary,
        } => add(ws, packages, bumps, &summary),
        ChangesetCommand::Status { format } => status(ws, format.parse()?),
        ChangesetCommand::Version { dry_run } => version(ws, dry_run),
        ChangesetCommand::FromCommits { package, since } => {
            let pkg = ws.package(&package)?;
            match commits::changeset_from_commits(
                &ws.root,
                &ws.changeset_dir(),
                &pkg,
                since.as_deref(),
            )? {
                Some(path) => println!(
                    "changeset: wrote {}",
                    workspace::display_rel(&ws.root, &path)
                ),
                None => println!("changeset: no release-worthy commits for {}", pkg.name),
            }
            Ok(())
        }
    }
}

fn add(
    ws: &Workspace,
    packages: Vec<String>,
    bumps: Vec<String>,
    summary: &str,
) -> Result<(), SkillpackError> {
    if packages.len() != bumps.len() {
        return Err(SkillpackError::ValidationError(format!(
            "got {} --package and {} --bump; pass them in pairs",
            packages.len(),
            bumps.len()
        )));
    }
    let known: FxHashSet<String> = ws.packages()?.into_iter().map(|p| p.name).collect();
    let mut releases: Vec<(String, Bump)> = Vec::with_capacity(packages.len());
    for (name, bump) in packages.into_iter().zip(bumps) {
        if !known.contains(&name) {
            return Err(SkillpackError::NotFound(format!("package '{}'", name)));
        }
        if releases.iter().any(|(n, _)| *n == name) {
            return Err(SkillpackError::ValidationError(format!(
                "package '{}' given twice",
                name
            )));
        }
        releases.push((name, bump.parse()?));
    }
    let path = changeset::write_new(&ws.changeset_dir(), releases, summary)?;
    println!("changeset: wrote {}", workspace::display_rel(&ws.root, &path));
    Ok(())
}

fn plan(ws: &Workspace) -> Result<ReleasePlan, SkillpackError> {
    let pending = changeset::read_all(&ws.changeset_dir())?;
    ReleasePlan::build(pending, &ws.packages()?)
}

fn print_plan(plan: &ReleasePlan) {
    println!("changeset: pending {}", plan.changesets.len());
    for r in &plan.releases {
        println!(
            "  {} {} -> {} ({}, {} changeset{})",
            r.name,
            r.old_version,
            r.new_version,
            r.bump,
            r.changesets.len(),
            if r.changesets.len() == 1 { "" } else { "s" }
        );
    }
}

fn status(ws: &Workspace, format: OutputFormat) -> Result<(), SkillpackError> {
    let plan = plan(ws)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => print_plan(&plan),
    }
    Ok(())
}

fn version(ws: &Workspace, dry_run: bool) -> Result<(), SkillpackError> {
    let plan = plan(ws)?;
    if plan.is_empty() {
        println!("changeset: nothing to release");
        return Ok(());
    }
    if dry_run {
        print_plan(&plan);
        return Ok(());
    }
    let report = changeset::apply_plan(&ws.root, &ws.config, &plan)?;
    for (name, from, to) in &report.bumped {
        println!("{} {} {} -> {}", output::status_tag(true), name, from, to);
    }
    println!(
        "changeset: summary bumped={} consumed={} skills_synced={} marketplace_updates={}",
        report.bumped.len(),
        report.deleted.len(),
        report.skills_synced.len(),
        report.marketplace_updates
    );
    Ok(())
}

pub(super) fn run_release(ws: &Workspace, cli: ReleaseCli) -> Result<(), SkillpackError> {
    match cli.command {
        ReleaseCommand::Tag {
            dry_run,
            push,
            remote,
            no_github,
            format,
        } => {
            let format: OutputFormat = format.parse()?;
            let git = Git::new(&ws.root);
            let gh = GhCli::new(&ws.root);
            let host: Option<&dyn ReleaseHost> = if no_github || !ws.config.release.github {
                None
            } else {
                Some(&gh)
            };
            let opts =
                TagOptions::for_run(&ws.config.release, dry_run, push, remote, host.is_some());
            let report = release::tag_packages(&git, host, &ws.packages()?, &opts)?;

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for p in &report.packages {
                let idle = matches!(p.tag_outcome, Outcome::Skipped(_))
                    && matches!(p.release_outcome, Outcome::Skipped(_));
                let tag = if idle {
                    output::skip_tag()
                } else {
                    output::status_tag(true)
                };
                println!(
                    "{} {}  tag {}  release {}{}",
                    tag,
                    p.tag,
                    p.tag_outcome,
                    p.release_outcome,
                    if p.notes_fallback { "  (notes: fallback)" } else { "" }
                );
            }
            println!(
                "release: summary packages={} tags_created={} releases_created={}",
                report.packages.len(),
                report.created_tags(),
                report.created_releases()
            );
            Ok(())
        }
    }
}
