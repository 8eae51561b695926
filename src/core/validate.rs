//! Validation gates run before a commit or release.
//!
//! `validate` scores skill documents against the rubric and fails any that
//! have structural errors or fall below the threshold. `check` runs that gate
//! plus the package, changeset and marketplace gates, and is what a
//! pre-commit hook should call.
//!
//! Gate results are returned as values; nothing is accumulated globally.

use crate::core::error::SkillpackError;
use crate::core::output::{self, OutputFormat};
use crate::core::workspace::{self, Workspace};
use crate::plugins::changeset::{self, ReleasePlan};
use crate::plugins::marketplace;
use crate::plugins::score::{self, Gate, ScoreReport};
use crate::plugins::skill::{self, SkillDoc, SKILL_FILE};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Files or directories to validate; empty means every configured skill root.
    pub paths: Vec<PathBuf>,
    pub strict: bool,
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillsSummary {
    pub gate: Gate,
    pub reports: Vec<ScoreReport>,
    pub passed: usize,
    pub failed: usize,
}

impl SkillsSummary {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

fn resolve_targets(ws: &Workspace, paths: &[PathBuf]) -> Result<Vec<PathBuf>, SkillpackError> {
    if paths.is_empty() {
        return skill::discover(&ws.root, &ws.config.skills.roots);
    }
    let mut out = Vec::new();
    for p in paths {
        let p = if p.is_absolute() { p.clone() } else { ws.cwd.join(p) };
        if p.is_dir() {
            out.extend(skill::discover_under(&p)?);
        } else if p.is_file() {
            out.push(p);
        } else {
            return Err(SkillpackError::NotFound(format!("{}", p.display())));
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Load and score skills, applying the gate.
pub fn validate_skills(
    ws: &Workspace,
    opts: &ValidateOptions,
) -> Result<SkillsSummary, SkillpackError> {
    let gate = Gate::from_config(&ws.config.gate, opts.strict, opts.threshold)?;
    let targets = resolve_targets(ws, &opts.paths)?;
    tracing::debug!(count = targets.len(), threshold = gate.threshold, "validating skills");

    let docs = targets
        .iter()
        .map(|p| SkillDoc::load(p))
        .collect::<Result<Vec<_>, _>>()?;
    let reports = score::score_all(&docs, &ws.config.skills);
    let passed = reports.iter().filter(|r| gate.passes(r)).count();
    let failed = reports.len() - passed;
    Ok(SkillsSummary {
        gate,
        reports,
        passed,
        failed,
    })
}

pub fn print_skills_summary(
    ws: &Workspace,
    summary: &SkillsSummary,
    format: OutputFormat,
) -> Result<(), SkillpackError> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    if summary.reports.is_empty() {
        println!("validate: no {} files found", SKILL_FILE);
        return Ok(());
    }
    for report in &summary.reports {
        let ok = summary.gate.passes(report);
        println!(
            "{} {:>4.1}/10  {}",
            output::status_tag(ok),
            report.score,
            workspace::display_rel(&ws.root, &report.path)
        );
        for err in &report.validation.errors {
            println!("       error: {}", output::compact_line(err, 140));
        }
        if !ok {
            for finding in &report.findings {
                println!(
                    "       -{:.1} {}: {}",
                    finding.lost,
                    finding.criterion,
                    output::compact_line(&finding.message, 120)
                );
            }
        }
        for warning in &report.validation.warnings {
            println!("       warn: {}", output::compact_line(warning, 140));
        }
    }
    println!(
        "validate: summary pass={} fail={} threshold={:.1}",
        summary.passed, summary.failed, summary.gate.threshold
    );
    Ok(())
}

/// One named gate in `check`.
#[derive(Debug, Clone, Serialize)]
pub struct GateResult {
    pub name: &'static str,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u128,
}

impl GateResult {
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub gates: Vec<GateResult>,
}

impl CheckReport {
    pub fn ok(&self) -> bool {
        self.gates.iter().all(GateResult::ok)
    }

    pub fn failures(&self) -> Vec<String> {
        self.gates
            .iter()
            .flat_map(|g| g.failures.iter().map(move |f| format!("{}: {}", g.name, f)))
            .collect()
    }
}

fn timed<F>(name: &'static str, f: F) -> Result<GateResult, SkillpackError>
where
    F: FnOnce() -> Result<(Vec<String>, Vec<String>), SkillpackError>,
{
    let started = Instant::now();
    let (failures, warnings) = f()?;
    Ok(GateResult {
        name,
        failures,
        warnings,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/// Run every repository gate. Gate failures are collected; only I/O-level
/// errors abort.
pub fn run_check(ws: &Workspace, strict: bool) -> Result<CheckReport, SkillpackError> {
    let mut gates = Vec::new();

    gates.push(timed("skills", || {
        let summary = validate_skills(
            ws,
            &ValidateOptions {
                strict,
                ..Default::default()
            },
        )?;
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        for r in &summary.reports {
            let rel = workspace::display_rel(&ws.root, &r.path);
            if !summary.gate.passes(r) {
                failures.push(format!(
                    "{} scored {:.1} (threshold {:.1}){}",
                    rel,
                    r.score,
                    summary.gate.threshold,
                    if r.validation.is_valid() {
                        String::new()
                    } else {
                        format!(": {}", r.validation.errors.join("; "))
                    }
                ));
            }
            warnings.extend(r.validation.warnings.iter().map(|w| format!("{}: {}", rel, w)));
        }
        Ok((failures, warnings))
    })?);

    let packages = match ws.packages() {
        Ok(p) => {
            gates.push(timed("packages", || Ok((Vec::new(), Vec::new())))?);
            Some(p)
        }
        Err(e) => {
            gates.push(timed("packages", || Ok((vec![e.to_string()], Vec::new())))?);
            None
        }
    };

    if let Some(packages) = &packages {
        gates.push(timed("changesets", || {
            let parsed = match changeset::read_all(&ws.changeset_dir()) {
                Ok(cs) => cs,
                Err(e) => return Ok((vec![e.to_string()], Vec::new())),
            };
            match ReleasePlan::build(parsed, packages) {
                Ok(_) => Ok((Vec::new(), Vec::new())),
                Err(e) => Ok((vec![e.to_string()], Vec::new())),
            }
        })?);

        gates.push(timed("marketplace", || {
            let issues = match marketplace::check(&ws.root, packages) {
                Ok(issues) => issues,
                Err(e) => vec![e.to_string()],
            };
            Ok((issues, Vec::new()))
        })?);
    }

    Ok(CheckReport { gates })
}

pub fn print_check_report(report: &CheckReport, format: OutputFormat) -> Result<(), SkillpackError> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for gate in &report.gates {
        println!(
            "{} {} ({} ms)",
            output::status_tag(gate.ok()),
            gate.name,
            gate.elapsed_ms
        );
        for f in &gate.failures {
            println!("       {}", output::compact_line(f, 160));
        }
    }
    let failures = report.failures();
    let warnings: Vec<String> = report
        .gates
        .iter()
        .flat_map(|g| g.warnings.iter().cloned())
        .collect();
    println!(
        "check: summary gates={} fail={} warn={}",
        report.gates.len(),
        report.gates.iter().filter(|g| !g.ok()).count(),
        warnings.len()
    );
    if !warnings.is_empty() {
        println!(
            "check: warnings {}: {}",
            warnings.len(),
            output::preview_messages(&warnings, 2, 110)
        );
    }
    if !failures.is_empty() {
        println!(
            "check: failures {}: {}",
            failures.len(),
            output::preview_messages(&failures, 2, 110)
        );
    }
    Ok(())
}
