//! Subcommand handlers
//!
//! Each handler returns a process exit code: `0` on success, `1` on any error.

use super::commands::{InitArgs, ScanArgs, SyncArgs};
use crate::ai::{Enricher, OllamaClient};
use crate::analysis::Analysis;
use crate::config::{AiConfig, ArgusConfig};
use crate::generators::{generator_for, parse_formats, write_files, ClaudeCodeOptions, GeneratedFile, GeneratorId};
use crate::pipeline::{Engine, WorkspaceOrchestrator, WorkspaceResult};
use crate::progress::LoggingHandler;
use crate::VERSION;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Flags shared by every handler
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    pub verbose: bool,
    pub quiet: bool,
}

fn finish(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn resolve_root(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    if !path.is_dir() {
        anyhow::bail!("Repository path is not a directory: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize {}", path.display()))
}

/// Cancels the token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            token.cancel();
        }
    });
    cancel
}

pub fn handle_init(args: &InitArgs, mode: OutputMode) -> i32 {
    finish(run_init(args, mode))
}

fn run_init(args: &InitArgs, mode: OutputMode) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let path = ArgusConfig::write_default(&root, args.force).context("Failed to write configuration")?;
    info!(path = %path.display(), "Configuration written");
    if !mode.quiet {
        println!("Created {}", path.display());
    }
    Ok(())
}

pub fn handle_version() -> i32 {
    println!("argus {}", VERSION);
    0
}

pub async fn handle_scan(args: &ScanArgs, mode: OutputMode) -> i32 {
    finish(run_scan(args, mode).await)
}

async fn run_scan(args: &ScanArgs, mode: OutputMode) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let config = ArgusConfig::load_optional(&root)
        .context("Failed to load configuration")?
        .unwrap_or_default();

    let formats = if args.format.is_empty() {
        config.formats()?
    } else {
        parse_formats(&args.format)?
    };
    let out_dir = args.output.clone().unwrap_or_else(|| root.clone());

    let job = Job {
        root,
        out_dir,
        formats,
        dry_run: args.dry_run,
        ai: args.ai || config.ai.enabled,
        mode,
    };
    job.run(&config).await
}

pub async fn handle_sync(args: &SyncArgs, mode: OutputMode) -> i32 {
    finish(run_sync(args, mode).await)
}

async fn run_sync(args: &SyncArgs, mode: OutputMode) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let config = ArgusConfig::load(&ArgusConfig::path_in(&root)).context("sync requires a configuration file")?;

    let job = Job {
        out_dir: root.clone(),
        root,
        formats: config.formats()?,
        dry_run: args.dry_run,
        ai: config.ai.enabled,
        mode,
    };
    job.run(&config).await
}

/// One analyse-and-generate run shared by `scan` and `sync`
struct Job {
    root: PathBuf,
    out_dir: PathBuf,
    formats: Vec<GeneratorId>,
    dry_run: bool,
    ai: bool,
    mode: OutputMode,
}

impl Job {
    async fn run(&self, config: &ArgusConfig) -> Result<()> {
        debug!(root = %self.root.display(), formats = ?self.formats, "Starting run");
        let cancel = cancel_on_interrupt();

        let engine = Arc::new(Engine::new(config.engine_options()).with_progress(Arc::new(LoggingHandler)));
        let mut analysis = engine
            .analyze(&self.root, cancel.clone())
            .await
            .with_context(|| format!("Failed to analyze {}", self.root.display()))?;

        let mut workspace_files = Vec::new();
        if let Some(info) = analysis.monorepo_info.clone() {
            let orchestrator = WorkspaceOrchestrator::new(Arc::clone(&engine));
            let workspaces = orchestrator.analyze(&self.root, &info, cancel.clone()).await;
            workspace_files = render_workspaces(&workspaces, &self.formats, config.claude_code)?;
        }

        if self.ai {
            analysis = enrich(&config.ai, analysis, cancel).await;
        }

        let mut files = render(&analysis, &self.formats, config.claude_code)?;
        files.extend(workspace_files);
        if self.dry_run {
            for file in &files {
                println!("{}", self.out_dir.join(&file.path).display());
                if self.mode.verbose {
                    println!("{}", file.content);
                }
            }
        } else {
            let written = write_files(&self.out_dir, &files).context("Failed to write output files")?;
            if !self.mode.quiet {
                for path in &written {
                    println!("Wrote {}", path.display());
                }
            }
        }

        if self.mode.verbose && !self.mode.quiet {
            print_summary(&analysis);
        }
        Ok(())
    }
}

fn render(analysis: &Analysis, formats: &[GeneratorId], claude_code: ClaudeCodeOptions) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    for id in formats {
        let generated = generator_for(*id, claude_code)
            .generate(analysis)
            .with_context(|| format!("Failed to render {}", id.name()))?;
        files.extend(generated);
    }
    Ok(files)
}

/// Context files for each analysed workspace, placed under its directory
///
/// Failed workspaces are logged and produce no files.
fn render_workspaces(
    workspaces: &[WorkspaceResult],
    formats: &[GeneratorId],
    claude_code: ClaudeCodeOptions,
) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    for workspace in workspaces {
        match &workspace.result {
            Ok(ws) => {
                info!(
                    workspace = %workspace.name,
                    path = %workspace.path,
                    commands = ws.commands.len(),
                    endpoints = ws.endpoints.len(),
                    "Workspace analyzed"
                );
                let rendered = render(ws, formats, claude_code)
                    .with_context(|| format!("Failed to render workspace {}", workspace.path))?;
                files.extend(rendered.into_iter().map(|file| GeneratedFile {
                    path: Path::new(&workspace.path).join(file.path),
                    content: file.content,
                }));
            }
            Err(e) => warn!(workspace = %workspace.name, error = %e, "Workspace analysis failed"),
        }
    }
    Ok(files)
}

/// Attaches AI insights; any failure leaves the analysis unchanged
async fn enrich(config: &AiConfig, analysis: Analysis, cancel: CancellationToken) -> Analysis {
    let client = match OllamaClient::with_timeout(
        config.endpoint.clone(),
        config.model.clone(),
        Duration::from_secs(config.timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Skipping AI enrichment");
            return analysis;
        }
    };
    let enricher = Enricher::new(Arc::new(client));

    match enricher.health_check().await {
        Ok(true) => {}
        Ok(false) => {
            warn!(endpoint = %config.endpoint, "AI endpoint is not reachable, skipping enrichment");
            return analysis;
        }
        Err(e) => {
            warn!(error = %e, "AI health check failed, skipping enrichment");
            return analysis;
        }
    }

    match enricher.enrich_analysis(&analysis, cancel).await {
        Ok(enriched) => enriched,
        Err(e) => {
            warn!(error = %e, "AI enrichment failed");
            analysis
        }
    }
}

fn print_summary(analysis: &Analysis) {
    println!("\nProject: {}", analysis.project_name);
    let languages: Vec<String> = analysis
        .tech_stack
        .languages
        .iter()
        .map(|l| format!("{} ({:.1}%)", l.name, l.percentage))
        .collect();
    if !languages.is_empty() {
        println!("Languages: {}", languages.join(", "));
    }
    let frameworks: Vec<&str> = analysis.tech_stack.frameworks.iter().map(|f| f.name.as_str()).collect();
    if !frameworks.is_empty() {
        println!("Frameworks: {}", frameworks.join(", "));
    }
    println!(
        "Commands: {}  Conventions: {}  Endpoints: {}",
        analysis.commands.len(),
        analysis.conventions.len(),
        analysis.endpoints.len()
    );
}
