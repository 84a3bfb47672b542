//! Succession assessment CLI
//!
//! The `succession` command runs the assessment pipeline over free-text
//! self-descriptions and inspects its output.
//!
//! ## Commands
//!
//! - `evaluate`: assess one input and print the result as JSON
//! - `config`: show or write the pipeline configuration
//! - `grounding`: check a result's evidence quotes against its input
//! - `cohort`: aggregate several results into cohort statistics

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use succession_core::{
    check_grounding, AssessmentResult, CohortStats, CriterionCode, ParticipantProfile,
    PipelineConfig, Roster,
};
use succession_runtime::{
    ApiCredential, Pipeline, RuntimeConfig, TracingReporter, ANTHROPIC_API_KEY_ENV,
};

/// Fallback for `--config` when the flag is not given.
const CONFIG_ENV: &str = "SUCCESSION_CONFIG";

/// Exit status for an empty `evaluate` input.
const EXIT_EMPTY_INPUT: u8 = 2;

/// Exit status when `grounding` finds violations.
const EXIT_UNGROUNDED: u8 = 1;

#[derive(Parser)]
#[command(name = "succession")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evidence-grounded succession assessment", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one self-description and print the result as JSON
    Evaluate {
        /// Input text file, or `-` for stdin (default: stdin)
        input: Option<PathBuf>,

        /// Pipeline configuration (YAML)
        #[arg(short, long, env = CONFIG_ENV)]
        config: Option<PathBuf>,

        /// Skip model calls and return fallback output
        #[arg(long)]
        dry_run: bool,

        /// Fail the evidence stage on any non-verbatim quote
        #[arg(long)]
        strict_grounding: bool,

        /// Per-stage timeout, e.g. `90s` or `2m`
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Show or initialize the pipeline configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that a result's evidence quotes appear verbatim in its input
    Grounding {
        /// Original input text
        #[arg(short, long)]
        input: PathBuf,

        /// Assessment result JSON
        #[arg(short, long)]
        result: PathBuf,
    },

    /// Cohort statistics over several assessment results
    Cohort {
        /// Result files as `name=path` or `path` (name defaults to the file stem)
        #[arg(required = true)]
        results: Vec<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as YAML
    Show {
        /// Configuration file to load (default: built-in defaults)
        #[arg(short, long, env = CONFIG_ENV)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration to a file
    Init {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            input,
            config,
            dry_run,
            strict_grounding,
            timeout,
            pretty,
        } => {
            let mut pipeline_config = load_config(config.as_deref())?;
            pipeline_config.flags.dry_run |= dry_run;
            pipeline_config.flags.strict_grounding |= strict_grounding;
            cmd_evaluate(input.as_deref(), pipeline_config, timeout, pretty).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => cmd_config_show(config.as_deref()),
            ConfigAction::Init { path, force } => cmd_config_init(&path, force),
        },
        Commands::Grounding { input, result } => cmd_grounding(&input, &result),
        Commands::Cohort { results, json } => cmd_cohort(&results, json),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Loaded pipeline config");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read input from stdin")?;
            Ok(text)
        }
    }
}

fn read_result(path: &Path) -> Result<AssessmentResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read result {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("{} is not an assessment result", path.display()))
}

async fn cmd_evaluate(
    input: Option<&Path>,
    config: PipelineConfig,
    timeout: Option<Duration>,
    pretty: bool,
) -> Result<ExitCode> {
    let raw_text = read_input(input)?;

    let mut runtime = RuntimeConfig::from_env().context("Invalid runtime environment")?;
    if let Some(timeout) = timeout {
        runtime = runtime.with_stage_timeout(timeout);
    }
    let credential = ApiCredential::from_env_optional(ANTHROPIC_API_KEY_ENV, "Anthropic API key");
    if credential.is_none() && !config.flags.dry_run {
        tracing::warn!(env = ANTHROPIC_API_KEY_ENV, "No API key set, output will be fallback data");
    }

    let pipeline = Pipeline::new(runtime);
    let Some(report) = pipeline
        .run_detailed(&raw_text, &config, credential.as_ref(), Some(&TracingReporter))
        .await
    else {
        eprintln!("Input is empty, nothing to assess");
        return Ok(ExitCode::from(EXIT_EMPTY_INPUT));
    };

    tracing::info!(
        outcome = ?report.outcome,
        total_tokens = report.usage.total(),
        "Evaluation finished"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&report.result)?
    } else {
        serde_json::to_string(&report.result)?
    };
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(path: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(path)?;
    print!("{}", config.to_yaml()?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_init(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    PipelineConfig::default()
        .to_yaml_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_grounding(input: &Path, result: &Path) -> Result<ExitCode> {
    let raw_text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    let result = read_result(result)?;

    let report = check_grounding(&result.evidence, &raw_text);
    for violation in &report.violations {
        println!("✗ {}", violation);
    }
    println!(
        "{}/{} evidence quotes grounded",
        report.checked - report.violations.len(),
        report.checked
    );

    if report.is_grounded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_UNGROUNDED))
    }
}

/// Split a `name=path` argument; a bare path is named after its file stem.
fn parse_named_path(arg: &str) -> (String, PathBuf) {
    if let Some((name, path)) = arg.split_once('=') {
        if !name.trim().is_empty() && !path.is_empty() {
            return (name.trim().to_string(), PathBuf::from(path));
        }
    }
    let path = PathBuf::from(arg);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| arg.to_string());
    (name, path)
}

#[derive(Serialize)]
struct ParticipantSummary<'a> {
    id: String,
    name: &'a str,
    dummy: bool,
    #[serde(flatten)]
    profile: ParticipantProfile,
}

#[derive(Serialize)]
struct CohortReport<'a> {
    participants: Vec<ParticipantSummary<'a>>,
    stats: CohortStats,
    summary: String,
}

fn cmd_cohort(args: &[String], json: bool) -> Result<ExitCode> {
    let mut roster = Roster::new();
    for arg in args {
        let (name, path) = parse_named_path(arg);
        let result = read_result(&path)?;
        let id = roster.add(&name, Vec::new())?;
        roster.set_evaluation(id, result)?;
    }

    let Some(stats) = CohortStats::compute(roster.list()) else {
        bail!("No evaluated participants");
    };

    let participants: Vec<ParticipantSummary<'_>> = roster
        .evaluated()
        .into_iter()
        .filter_map(|record| {
            let evaluation = record.evaluation.as_ref()?;
            Some(ParticipantSummary {
                id: record.id.to_string(),
                name: &record.name,
                dummy: evaluation.is_dummy(),
                profile: ParticipantProfile::from_scores(&evaluation.scores.result),
            })
        })
        .collect();

    let report = CohortReport {
        participants,
        summary: stats.summary(),
        stats,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Participants ({}):", report.participants.len());
    for p in &report.participants {
        println!(
            "  {} {:<12} competency {:.2}  readiness {:.2}  strongest {}  growth {}{}",
            p.id,
            p.name,
            p.profile.competency_average,
            p.profile.readiness_average,
            p.profile.strongest.map_or("-", |c| c.as_str()),
            p.profile.growth_area.map_or("-", |c| c.as_str()),
            if p.dummy { "  (fallback)" } else { "" }
        );
    }

    println!("\nCriterion averages:");
    for code in CriterionCode::ALL {
        println!(
            "  {:<4} {:.2}  {}",
            code.as_str(),
            report.stats.average(code),
            code.label()
        );
    }

    println!("\n{}", report.summary);
    Ok(ExitCode::SUCCESS)
}
