use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use veracity::{
    config::{Config, LogFormat},
    orchestrator::{Orchestrator, ValidationReport},
    pipeline::StagePlan,
    task::{ContentCharacteristics, ContextType, ProblemContext, Stakes},
};

#[derive(Parser)]
#[command(name = "veracity", version, about = "Bounded multi-stage content validation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate content from a file or stdin
    Validate {
        /// File to read; stdin when omitted
        file: Option<PathBuf>,

        /// Context profile for the content
        #[arg(long, default_value = "general")]
        context_type: ContextType,

        /// Free-form domain label, such as "finance"
        #[arg(long, default_value = "")]
        domain: String,

        /// Consequence level of errors
        #[arg(long, default_value = "medium")]
        stakes: Stakes,

        /// Content characteristic flag, repeatable: factual-accuracy,
        /// mathematical, professional-tone, technical-accuracy,
        /// risk-factors, conservatism
        #[arg(long = "characteristic")]
        characteristics: Vec<String>,

        /// Emit the full report as JSON instead of pretty text
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical stage plan
    Stages,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    match cli.command {
        Command::Validate {
            file,
            context_type,
            domain,
            stakes,
            characteristics,
            json,
        } => {
            run_validate(
                config,
                file,
                context_type,
                domain,
                stakes,
                characteristics,
                json,
            )
            .await
        }
        Command::Stages => {
            print_stages(&config);
            Ok(())
        }
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_validate(
    config: Config,
    file: Option<PathBuf>,
    context_type: ContextType,
    domain: String,
    stakes: Stakes,
    characteristics: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let content = match &file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut flags = ContentCharacteristics::default();
    for name in &characteristics {
        apply_characteristic(&mut flags, name)?;
    }
    let context = ProblemContext::new(context_type)
        .with_domain(domain)
        .with_stakes(stakes)
        .with_characteristics(flags);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        context_type = %context.context_type,
        "Validator starting"
    );

    let orchestrator = Orchestrator::new(config);
    let report = match orchestrator.validate(content, context).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Validation failed");
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    let stats = orchestrator.stats();
    println!();
    println!(
        "Runs: {} completed, {} failed, mean iterations {:.1}",
        stats.sessions_completed, stats.sessions_failed, stats.mean_iterations
    );
    Ok(())
}

fn apply_characteristic(flags: &mut ContentCharacteristics, name: &str) -> anyhow::Result<()> {
    match name {
        "factual-accuracy" => flags.requires_factual_accuracy = true,
        "mathematical" => flags.mathematical_content = true,
        "professional-tone" => flags.requires_professional_tone = true,
        "technical-accuracy" => flags.requires_technical_accuracy = true,
        "risk-factors" => flags.has_risk_factors = true,
        "conservatism" => flags.requires_conservatism = true,
        other => anyhow::bail!("Unknown characteristic: {other}"),
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    println!("Session      {}", report.session_id);
    println!("Verdict      {}", report.verdict);
    println!(
        "Stopped      {} after {} iteration(s), {} ms",
        report.termination_reason, report.iterations, report.elapsed_ms
    );
    println!(
        "Quality      {:.2} overall, confidence {:.2}",
        report.quality.overall_score, report.quality.confidence
    );

    println!();
    println!("Dimensions");
    for (dimension, score) in &report.quality.dimension_scores {
        println!("  {dimension:<20} {score:.2}");
    }

    if !report.quality.deficiencies.is_empty() {
        println!();
        println!("Deficiencies");
        for deficiency in &report.quality.deficiencies {
            println!(
                "  {:<20} {:.2} (threshold {:.2}): {}",
                deficiency.dimension, deficiency.score, deficiency.threshold,
                deficiency.recommendation
            );
        }
    }

    println!();
    println!(
        "Strict final checks: {}",
        if report.final_quality.passed {
            "passed"
        } else {
            "not met"
        }
    );
    for check in &report.final_quality.checks {
        println!(
            "  {:<20} {:.2} / {:.2} {}",
            check.dimension,
            check.score,
            check.minimum,
            if check.passed { "ok" } else { "below" }
        );
    }

    let issues: usize = report.final_results.iter().map(|r| r.issues.len()).sum();
    println!();
    println!(
        "Results      {} task(s), {} issue(s), {} boundary set(s), {} known solution(s)",
        report.final_results.len(),
        issues,
        report.boundaries.boundaries.len(),
        report.boundaries.known.len()
    );
}

fn print_stages(config: &Config) {
    let plan = StagePlan::new(&config.pipeline);
    println!(
        "{:<22} {:>8} {:>9} {:>11}",
        "stage", "enabled", "priority", "timeout_ms"
    );
    for settings in plan.ordered() {
        println!(
            "{:<22} {:>8} {:>9} {:>11}",
            settings.id.to_string(),
            settings.enabled,
            settings.priority,
            settings.timeout_ms
        );
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
