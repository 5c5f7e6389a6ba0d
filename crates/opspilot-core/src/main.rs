//! `opspilot` command-line interface
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use opspilot_core::{
    AnalysisContract, CycleReport, OpsPipeline, OutcomeFilter, PipelineConfig, RecordedAnalyzer,
};
use opspilot_model::{Issue, OperationalContext};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("opspilot")
        .version(opspilot_core::VERSION)
        .about("Warehouse operations decision pipeline")
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay recorded issues through one pipeline cycle")
                .arg(
                    Arg::new("issues")
                        .long("issues")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file holding an array of issues"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("warehouse")
                        .long("warehouse")
                        .default_value("default")
                        .help("Warehouse identifier for the operational context"),
                )
                .arg(
                    Arg::new("wait")
                        .long("wait")
                        .action(ArgAction::SetTrue)
                        .help("Wait for queued actions to execute before exiting"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the cycle report as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .arg(config_arg()),
        );

    let matches = cli.get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("replay", args)) => replay(args).await,
        Some(("config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        _ => {
            println!("opspilot {}: run with --help for usage", opspilot_core::VERSION);
            Ok(())
        }
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<PipelineConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

async fn replay(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let path = args
        .get_one::<PathBuf>("issues")
        .context("--issues is required")?;
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading issues from {}", path.display()))?;
    let issues: Vec<Issue> = serde_json::from_str(&source)
        .with_context(|| format!("parsing issues from {}", path.display()))?;

    let warehouse = args
        .get_one::<String>("warehouse")
        .map_or("default", String::as_str);
    let context = OperationalContext::new(warehouse);
    let analyzers: Vec<Arc<dyn AnalysisContract>> =
        vec![Arc::new(RecordedAnalyzer::new("replay", issues))];

    let pipeline = OpsPipeline::new(config)?;
    let report = pipeline.run_cycle(&context, &analyzers).await;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if args.get_flag("wait") {
        while !pipeline.get_pending_items().is_empty() {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let stats = pipeline.get_outcome_stats(&OutcomeFilter::new());
        println!();
        println!("Executed actions now tracked: {}", stats.count);
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("Cycle Report");
    println!("============");
    println!(
        "Analyzers: {} ({} degraded)",
        report.analyses.len(),
        report.degraded_analyzers()
    );
    println!(
        "Alerts: {} ({} refreshed)",
        report.alerts.len(),
        report.refreshed.len()
    );
    for alert in &report.alerts {
        println!(
            "  [{}] {} ({}, confidence {:.2}, {:?} scope)",
            alert.severity, alert.title, alert.category, alert.confidence, alert.impact.scope
        );
    }
    println!("Recommendations: {}", report.recommendations.len());
    for action in &report.actions {
        let window = action
            .gestation_period_ms
            .map_or_else(|| "needs approval".to_string(), |ms| format!("executes in {ms}ms"));
        println!(
            "  {} -> {} ({window})",
            action.recommendation.title, action.tier
        );
    }
    println!("Queued: {}", report.queued.len());
    println!("Awaiting approval: {}", report.awaiting_approval.len());
}
