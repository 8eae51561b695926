//! Quality rubric for skill documents.
//!
//! Six criteria add up to 10 points:
//!
//! | criterion   | max | rule |
//! |-------------|-----|------|
//! | frontmatter | 2.0 | structural validation passes |
//! | description | 2.0 | long enough (1.0) and names a trigger (1.0) |
//! | length      | 2.0 | body within `max_lines` (2.0) or 1.5x of it (1.0) |
//! | examples    | 1.5 | at least one closed fenced code block |
//! | structure   | 1.5 | H1 title (0.5) and two or more H2 sections (1.0, 0.5 for one) |
//! | disclosure  | 1.0 | relative links resolve (0.5) and body fits the token budget (0.5) |
//!
//! Scoring is pure over the loaded document, so whole trees are scored in
//! parallel and sorted afterwards for stable output.

use crate::core::config::{self, GateConfig, SkillsConfig};
use crate::core::error::SkillpackError;
use crate::plugins::skill::{self, SkillDoc, Validation};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Frontmatter,
    Description,
    Length,
    Examples,
    Structure,
    Disclosure,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Frontmatter,
        Criterion::Description,
        Criterion::Length,
        Criterion::Examples,
        Criterion::Structure,
        Criterion::Disclosure,
    ];

    pub fn max_points(self) -> f64 {
        match self {
            Criterion::Frontmatter | Criterion::Description | Criterion::Length => 2.0,
            Criterion::Examples | Criterion::Structure => 1.5,
            Criterion::Disclosure => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Frontmatter => "frontmatter",
            Criterion::Description => "description",
            Criterion::Length => "length",
            Criterion::Examples => "examples",
            Criterion::Structure => "structure",
            Criterion::Disclosure => "disclosure",
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub criterion: Criterion,
    pub message: String,
    pub lost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionScore {
    pub criterion: Criterion,
    pub earned: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub path: PathBuf,
    pub name: Option<String>,
    pub score: f64,
    pub breakdown: Vec<CriterionScore>,
    pub findings: Vec<Finding>,
    pub validation: Validation,
    pub body_lines: usize,
    pub body_tokens: usize,
    pub sha256: String,
}

/// Pass/fail threshold applied to a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gate {
    pub threshold: f64,
}

impl Gate {
    pub fn from_config(
        cfg: &GateConfig,
        strict: bool,
        override_threshold: Option<f64>,
    ) -> Result<Self, SkillpackError> {
        let threshold = match (override_threshold, strict) {
            (Some(t), _) => config::check_threshold("--threshold", t)?,
            (None, true) => cfg.strict_threshold,
            (None, false) => cfg.threshold,
        };
        Ok(Self { threshold })
    }

    pub fn passes(&self, report: &ScoreReport) -> bool {
        report.validation.is_valid() && report.score + f64::EPSILON >= self.threshold
    }
}

fn bpe() -> Option<&'static CoreBPE> {
    static BPE: OnceLock<Option<CoreBPE>> = OnceLock::new();
    BPE.get_or_init(|| match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            tracing::warn!(error = %e, "cl100k_base unavailable, estimating tokens from length");
            None
        }
    })
    .as_ref()
}

pub fn estimate_tokens(text: &str) -> usize {
    match bpe() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count().div_ceil(4),
    }
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).expect("static regex")
    })
}

/// Body lines outside fenced code blocks, plus the number of closed fences.
fn prose_lines(body: &str) -> (Vec<&str>, usize) {
    let mut prose = Vec::new();
    let mut open: Option<(char, usize)> = None;
    let mut closed = 0;
    for line in body.lines() {
        let trimmed = line.trim_start();
        let fence = ['`', '~'].into_iter().find_map(|c| {
            let run = trimmed.chars().take_while(|&x| x == c).count();
            (run >= 3).then_some((c, run))
        });
        match (open, fence) {
            (None, Some(f)) => open = Some(f),
            (Some((c, n)), Some((fc, fnum)))
                if c == fc && fnum >= n && trimmed.trim_end().chars().all(|x| x == c) =>
            {
                open = None;
                closed += 1;
            }
            (Some(_), _) => {}
            (None, None) => prose.push(line),
        }
    }
    (prose, closed)
}

/// Relative link targets (anchors, absolute paths and URLs excluded).
pub fn relative_links(body: &str) -> Vec<String> {
    let (prose, _) = prose_lines(body);
    let mut out = Vec::new();
    for line in prose {
        for cap in link_re().captures_iter(line) {
            let target = &cap[1];
            if target.starts_with('#')
                || target.starts_with('/')
                || target.contains("://")
                || target.starts_with("mailto:")
            {
                continue;
            }
            let target = target.split('#').next().unwrap_or(target);
            if !target.is_empty() {
                out.push(target.to_string());
            }
        }
    }
    out
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

struct Tally {
    breakdown: Vec<CriterionScore>,
    findings: Vec<Finding>,
}

impl Tally {
    fn record(&mut self, criterion: Criterion, earned: f64, losses: Vec<(String, f64)>) {
        for (message, lost) in losses {
            self.findings.push(Finding {
                criterion,
                message,
                lost,
            });
        }
        self.breakdown.push(CriterionScore {
            criterion,
            earned,
            max: criterion.max_points(),
        });
    }
}

/// Score one document.
pub fn score_doc(doc: &SkillDoc, cfg: &SkillsConfig) -> ScoreReport {
    let validation = skill::quick_validate(doc);
    let mut tally = Tally {
        breakdown: Vec::with_capacity(Criterion::ALL.len()),
        findings: Vec::new(),
    };

    if validation.is_valid() {
        tally.record(Criterion::Frontmatter, 2.0, vec![]);
    } else {
        tally.record(
            Criterion::Frontmatter,
            0.0,
            vec![(validation.errors.join("; "), 2.0)],
        );
    }

    let desc = doc.description().unwrap_or("").trim();
    let mut earned = 0.0;
    let mut losses = Vec::new();
    if desc.chars().count() >= cfg.min_description_chars {
        earned += 1.0;
    } else {
        losses.push((
            format!(
                "description is {} characters; at least {} make it specific enough to match",
                desc.chars().count(),
                cfg.min_description_chars
            ),
            1.0,
        ));
    }
    let lower = desc.to_lowercase();
    if cfg
        .trigger_phrases
        .iter()
        .any(|p| lower.contains(&p.to_lowercase()))
    {
        earned += 1.0;
    } else {
        losses.push((
            format!(
                "description names no trigger (expected one of: {})",
                cfg.trigger_phrases.join(", ")
            ),
            1.0,
        ));
    }
    tally.record(Criterion::Description, earned, losses);

    let soft_ceiling = cfg.max_lines + cfg.max_lines / 2;
    if doc.body_lines <= cfg.max_lines {
        tally.record(Criterion::Length, 2.0, vec![]);
    } else if doc.body_lines <= soft_ceiling {
        tally.record(
            Criterion::Length,
            1.0,
            vec![(
                format!(
                    "body is {} lines (limit {}); move detail into reference files",
                    doc.body_lines, cfg.max_lines
                ),
                1.0,
            )],
        );
    } else {
        tally.record(
            Criterion::Length,
            0.0,
            vec![(
                format!(
                    "body is {} lines, beyond {} (1.5x the {} line limit)",
                    doc.body_lines, soft_ceiling, cfg.max_lines
                ),
                2.0,
            )],
        );
    }

    let (prose, fences) = prose_lines(&doc.body);
    if fences > 0 {
        tally.record(Criterion::Examples, 1.5, vec![]);
    } else {
        tally.record(
            Criterion::Examples,
            0.0,
            vec![("no fenced code example".to_string(), 1.5)],
        );
    }

    let h1 = prose.iter().any(|l| l.starts_with("# "));
    let h2 = prose.iter().filter(|l| l.starts_with("## ")).count();
    let mut earned = 0.0;
    let mut losses = Vec::new();
    if h1 {
        earned += 0.5;
    } else {
        losses.push(("no '# ' title heading".to_string(), 0.5));
    }
    match h2 {
        0 => losses.push(("no '## ' sections".to_string(), 1.0)),
        1 => {
            earned += 0.5;
            losses.push(("only one '## ' section".to_string(), 0.5));
        }
        _ => earned += 1.0,
    }
    tally.record(Criterion::Structure, earned, losses);

    let base = doc.path.parent().unwrap_or(Path::new("."));
    let broken: Vec<String> = relative_links(&doc.body)
        .into_iter()
        .filter(|t| !base.join(t).exists())
        .collect();
    let body_tokens = estimate_tokens(&doc.body);
    let mut earned = 0.0;
    let mut losses = Vec::new();
    if broken.is_empty() {
        earned += 0.5;
    } else {
        losses.push((format!("broken relative link(s): {}", broken.join(", ")), 0.5));
    }
    if body_tokens <= cfg.token_budget {
        earned += 0.5;
    } else {
        losses.push((
            format!(
                "body is ~{} tokens, budget is {}",
                body_tokens, cfg.token_budget
            ),
            0.5,
        ));
    }
    tally.record(Criterion::Disclosure, earned, losses);

    let score = round1(tally.breakdown.iter().map(|c| c.earned).sum());
    ScoreReport {
        path: doc.path.clone(),
        name: doc.name().map(str::to_string),
        score,
        breakdown: tally.breakdown,
        findings: tally.findings,
        validation,
        body_lines: doc.body_lines,
        body_tokens,
        sha256: doc.sha256.clone(),
    }
}

/// Score many documents in parallel; output is sorted by path.
pub fn score_all(docs: &[SkillDoc], cfg: &SkillsConfig) -> Vec<ScoreReport> {
    let mut reports: Vec<ScoreReport> = docs.par_iter().map(|d| score_doc(d, cfg)).collect();
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    reports
}
