//! Repository metadata: remote, branch naming and commit message style

use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{
    Analysis, BranchConvention, CommitConvention, CommitInfo, CommitStyle, Facet, GitConventions,
};
use chrono::{DateTime, TimeZone, Utc};
use git2::{BranchType, ErrorCode, Repository};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct GitDetector;

/// Share of sampled subjects a style must match to be reported
const STYLE_THRESHOLD: f64 = 0.5;

const ANGULAR_TYPES: &[&str] = &["build", "ci", "docs", "feat", "fix", "perf", "refactor", "test"];

/// Long-lived branches that carry no naming convention
const TRUNK_BRANCHES: &[&str] = &["main", "master", "develop", "development", "trunk", "HEAD"];

static CONVENTIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+)(?:\(([^)]+)\))?!?: \S").expect("valid regex"));

static JIRA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[?[A-Z][A-Z0-9]+-\d+\]?").expect("valid regex"));

static GITMOJI_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:[a-z0-9_+-]+:").expect("valid regex"));

static URL_CREDENTIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://)[^/@]+@").expect("valid regex"));

impl Detector for GitDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Git
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        ctx.check_cancelled()?;

        let repo = match Repository::discover(&ctx.root) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(root = %ctx.root.display(), "Not a git repository");
                return Ok(Facet::Git(None));
            }
            Err(e) => return Err(e.into()),
        };

        let repository = repo
            .find_remote("origin")
            .ok()
            .and_then(|r| r.url().map(redact_remote));

        let recent_commits = recent_commits(&repo, ctx.options.max_commits)?;
        let subjects: Vec<&str> = recent_commits.iter().map(|c| c.subject.as_str()).collect();
        let commit_convention = classify_commits(&subjects);

        let mut branches = Vec::new();
        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                branches.push(name.to_string());
            }
        }
        branches.sort();
        let branch_convention = classify_branches(&branches);

        Ok(Facet::Git(Some(Arc::new(GitConventions {
            repository,
            commit_convention,
            branch_convention,
            recent_commits,
        }))))
    }
}

fn redact_remote(url: &str) -> String {
    URL_CREDENTIALS.replace(url, "$1").into_owned()
}

fn recent_commits(repo: &Repository, max: usize) -> Result<Vec<CommitInfo>, DetectorError> {
    let mut walk = repo.revwalk()?;
    match walk.push_head() {
        Ok(()) => {}
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    }

    let mut commits = Vec::new();
    for oid in walk.take(max) {
        let commit = repo.find_commit(oid?)?;
        let hash = commit.id().to_string();
        let date: DateTime<Utc> = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_default();
        commits.push(CommitInfo {
            hash: hash.chars().take(7).collect(),
            subject: commit.summary().unwrap_or_default().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            date,
        });
    }
    Ok(commits)
}

fn is_gitmoji(subject: &str) -> bool {
    if GITMOJI_CODE.is_match(subject) {
        return true;
    }
    subject.chars().next().is_some_and(|c| {
        let code = c as u32;
        (0x1F300..=0x1FAFF).contains(&code) || (0x2600..=0x27BF).contains(&code)
    })
}

/// Picks the commit style most subjects follow
pub(crate) fn classify_commits(subjects: &[&str]) -> CommitConvention {
    if subjects.is_empty() {
        return CommitConvention::default();
    }

    let conventional: Vec<(String, Option<String>)> = subjects
        .iter()
        .filter_map(|s| CONVENTIONAL.captures(s))
        .map(|c| (c[1].to_string(), c.get(2).map(|m| m.as_str().to_string())))
        .collect();
    let gitmoji: Vec<&str> = subjects.iter().copied().filter(|s| is_gitmoji(s)).collect();
    let jira: Vec<&str> = subjects.iter().copied().filter(|s| JIRA.is_match(s)).collect();

    let threshold = subjects.len() as f64 * STYLE_THRESHOLD;
    let counts = [
        (CommitStyle::Conventional, conventional.len()),
        (CommitStyle::Gitmoji, gitmoji.len()),
        (CommitStyle::Jira, jira.len()),
    ];
    let Some((style, _)) = counts
        .iter()
        .copied()
        .filter(|(_, n)| *n > 0 && *n as f64 >= threshold)
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
    else {
        return CommitConvention::default();
    };

    match style {
        CommitStyle::Conventional => {
            let types = first_seen(conventional.iter().map(|(t, _)| t.as_str()));
            let scopes = first_seen(conventional.iter().filter_map(|(_, s)| s.as_deref()));
            let angular = conventional.iter().all(|(t, s)| s.is_some() && ANGULAR_TYPES.contains(&t.as_str()));
            let example = subjects
                .iter()
                .find(|s| CONVENTIONAL.is_match(s))
                .map(|s| s.to_string())
                .unwrap_or_default();
            if angular {
                CommitConvention {
                    style: CommitStyle::Angular,
                    format: "<type>(<scope>): <subject>".to_string(),
                    types,
                    scopes,
                    example,
                }
            } else {
                CommitConvention {
                    style: CommitStyle::Conventional,
                    format: "<type>(<scope>)?: <description>".to_string(),
                    types,
                    scopes,
                    example,
                }
            }
        }
        CommitStyle::Gitmoji => CommitConvention {
            style: CommitStyle::Gitmoji,
            format: "<emoji> <description>".to_string(),
            types: Vec::new(),
            scopes: Vec::new(),
            example: gitmoji[0].to_string(),
        },
        _ => {
            let projects = first_seen(jira.iter().filter_map(|s| {
                s.trim_start_matches('[').split('-').next()
            }));
            CommitConvention {
                style: CommitStyle::Jira,
                format: "<PROJECT>-<number> <description>".to_string(),
                types: Vec::new(),
                scopes: projects,
                example: jira[0].to_string(),
            }
        }
    }
}

/// Distinct values in first-seen order
fn first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Prefixes of `prefix/description` branch names, most used first
pub(crate) fn classify_branches(branches: &[String]) -> BranchConvention {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut examples = Vec::new();

    for name in branches {
        if TRUNK_BRANCHES.contains(&name.as_str()) {
            continue;
        }
        let Some((prefix, rest)) = name.split_once('/') else {
            continue;
        };
        if prefix.is_empty() || rest.is_empty() {
            continue;
        }
        *counts.entry(prefix).or_default() += 1;
        if examples.len() < 3 {
            examples.push(name.clone());
        }
    }

    if counts.is_empty() {
        return BranchConvention::default();
    }

    let mut prefixes: Vec<(&str, usize)> = counts.into_iter().collect();
    prefixes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    BranchConvention {
        prefixes: prefixes.into_iter().map(|(p, _)| p.to_string()).collect(),
        format: "<prefix>/<description>".to_string(),
        examples,
    }
}
