// Main CLI entry point for scanforge
// Uses clap for argument parsing

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use scanforge::config::Config;
use scanforge::engine::Transport;
use scanforge::events::{EventSink, TracingSink};
use scanforge::models::{DetectorOutcome, Target, DEMO_TARGET};
use scanforge::orchestrator::{Orchestrator, TrainingOutcome};
use scanforge::providers::{OllamaGenerator, RuleBasedClassifier, TemplateTextGenerator};
use scanforge::registry::Plugin;
use scanforge::reporting::{export_csv, export_json, export_markdown};
use scanforge::training::{read_examples, ApiTrainingSource, LocalTrainingSource};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEVELOPMENT_GUIDE: &str = "\
scanforge - Pluggable Vulnerability Scanner Development Guide

USAGE:
  scanforge [TARGET] [--config FILE] [--kinds sql,rce] [--train]
            [--training-file FILE] [--with-models] [--ollama-model NAME]
            [--csv-report] [--markdown-report] [--json-report]
            [--output-dir DIR] [--log-level LEVEL]

  Without TARGET you are prompted for one; an empty answer scans the demo
  target. A TARGET without a scheme is scanned over https.

1. Adding a new model provider:
   - implement the ModelProvider trait
     (load_model, train, predict, generate_payload, is_trained)
   - register it with Orchestrator::register_model_provider

2. Adding a new vulnerability type:
   - implement the Detector trait (scan, validate_finding), or take
     Orchestrator::probe_detector(kind) and give it payloads and your own
     ResponseValidator (probes use [transport] method from the config)
   - register it with Orchestrator::register_detector

3. Connecting a training data feed:
   - set [training] api_url in the configuration file, or
   - implement the TrainingSource trait (fetch) for your own feed
   - register it with Orchestrator::register_training_source

4. Adding evasion techniques:
   - Orchestrator::evasion().add_technique(Technique::new(name, fn))
   - or list built-in extras under [evasion] extra = [\"base64\"]
";

fn build_cli() -> Command {
    Command::new("scanforge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Pluggable web vulnerability scanner")
        .disable_help_flag(true)
        .arg(Arg::new("target")
            .num_args(1)
            .help("Target URL (prompted for when omitted)"))
        .arg(Arg::new("help")
            .short('h')
            .long("help")
            .action(ArgAction::SetTrue)
            .help("Print the development guide and exit"))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .num_args(1)
            .help("Path to a TOML configuration file"))
        .arg(Arg::new("kinds")
            .short('k')
            .long("kinds")
            .num_args(1)
            .value_delimiter(',')
            .help("Comma-separated detector kinds to run (default: all registered)"))
        .arg(Arg::new("train")
            .long("train")
            .action(ArgAction::SetTrue)
            .help("Train registered models from the configured training sources before scanning"))
        .arg(Arg::new("training_file")
            .long("training-file")
            .num_args(1)
            .help("Train registered models from a newline-delimited file"))
        .arg(Arg::new("with_models")
            .long("with-models")
            .action(ArgAction::SetTrue)
            .help("Register the rule-based classifier and template generator"))
        .arg(Arg::new("ollama_model")
            .long("ollama-model")
            .num_args(1)
            .help("Register an Ollama-backed payload generator for this model"))
        .arg(Arg::new("csv_report")
            .long("csv-report")
            .action(ArgAction::SetTrue)
            .help("Write findings as CSV"))
        .arg(Arg::new("markdown_report")
            .long("markdown-report")
            .action(ArgAction::SetTrue)
            .help("Write a Markdown report"))
        .arg(Arg::new("json_report")
            .long("json-report")
            .action(ArgAction::SetTrue)
            .help("Write a JSON report"))
        .arg(Arg::new("output_dir")
            .short('o')
            .long("output-dir")
            .num_args(1)
            .default_value(".")
            .help("Directory for report files"))
        .arg(Arg::new("log_level")
            .long("log-level")
            .num_args(1)
            .default_value("info")
            .help("Log level when RUST_LOG is unset (trace, debug, info, warn, error)"))
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn prompt_for_target() -> Result<String> {
    print!("Enter target URL (or press Enter for demo): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    if line.trim().is_empty() {
        println!("Using demo URL: {}", DEMO_TARGET);
    }
    Ok(line)
}

fn register_models(orchestrator: &Orchestrator, with_models: bool, ollama_model: Option<&String>) {
    if with_models {
        let _ = orchestrator.register_model_provider("classifier", Plugin::model(RuleBasedClassifier::new()));
        let _ = orchestrator.register_model_provider("generator", Plugin::model(TemplateTextGenerator::new()));
    }
    if let Some(model) = ollama_model {
        let _ = orchestrator.register_model_provider("ollama", Plugin::model(OllamaGenerator::new(model.clone())));
    }
}

fn register_sources(orchestrator: &Orchestrator, config: &Config, events: Arc<dyn EventSink>) {
    let transport: Arc<dyn Transport> = orchestrator.transport();
    orchestrator.register_training_source(
        "main_api",
        Arc::new(ApiTrainingSource::new("main_api", &config.training, transport, events.clone())),
    );
    if let Some(dir) = &config.training.local_dir {
        orchestrator.register_training_source(
            "local",
            Arc::new(LocalTrainingSource::new("local", dir.clone(), events)),
        );
    }
}

fn print_training(report: &scanforge::orchestrator::TrainingReport) {
    for (name, outcome) in &report.outcomes {
        match outcome {
            TrainingOutcome::Trained { errors, .. } if !errors.is_empty() => {
                println!("[TRAINED] {} ({} source(s) failed: {})", name, errors.len(), errors.join("; "))
            }
            TrainingOutcome::Trained { .. } => println!("[TRAINED] {}", name),
            TrainingOutcome::Skipped => println!("[SKIPPED] {}: no training data", name),
            TrainingOutcome::Failed(reason) => println!("[FAILED] {}: {}", name, reason),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    if matches.get_flag("help") {
        println!("{}", DEVELOPMENT_GUIDE);
        return Ok(());
    }

    let log_level = matches
        .get_one::<String>("log_level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(log_level);

    // Configuration problems stop us before any network activity
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Invalid configuration")?;

    let raw_target = match matches.get_one::<String>("target") {
        Some(t) => t.clone(),
        None => prompt_for_target()?,
    };
    let target = Target::parse(&raw_target).context("Invalid target")?;

    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let orchestrator =
        Orchestrator::from_config(&config, events.clone()).context("Could not set up HTTP transport")?;

    register_models(
        &orchestrator,
        matches.get_flag("with_models"),
        matches.get_one::<String>("ollama_model"),
    );
    register_sources(&orchestrator, &config, events);

    if let Some(file) = matches.get_one::<String>("training_file") {
        let corpus = read_examples(Path::new(file))
            .with_context(|| format!("Could not read training file {}", file))?;
        print_training(&orchestrator.train_models(Some(corpus.as_slice())).await);
    } else if matches.get_flag("train") {
        print_training(&orchestrator.train_models(None).await);
    }

    let cli_kinds: Vec<String> = matches
        .get_many::<String>("kinds")
        .map(|vals| vals.map(|v| v.trim().to_string()).collect())
        .unwrap_or_default();
    let kinds = if cli_kinds.is_empty() { config.scan.kinds.clone() } else { cli_kinds };
    let kind_refs: Vec<&str> = kinds.iter().map(String::as_str).collect();
    let selection = if kind_refs.is_empty() { None } else { Some(kind_refs.as_slice()) };

    let report = orchestrator.scan(&target, selection).await;

    for (kind, outcome) in &report.outcomes {
        if let DetectorOutcome::Failed(reason) = outcome {
            println!("[ERROR] {}: {}", kind, reason);
        }
    }

    if report.findings.is_empty() {
        println!("\nNo vulnerabilities found.");
    } else {
        println!("\n{}", "=".repeat(40));
        println!("SCAN RESULTS");
        println!("{}", "=".repeat(40));
        for finding in &report.findings {
            println!("Type: {}", finding.kind);
            println!("Parameter: {}", finding.parameter.as_deref().unwrap_or(""));
            println!("Payload: {}", finding.payload);
            println!("{}", "-".repeat(20));
        }
    }

    let output_dir = PathBuf::from(
        matches
            .get_one::<String>("output_dir")
            .map(String::as_str)
            .unwrap_or("."),
    );
    if matches.get_flag("csv_report") {
        let path = export_csv(&report.findings, &output_dir)?;
        println!("CSV report: {}", path.display());
    }
    if matches.get_flag("markdown_report") {
        let path = export_markdown(&report, &output_dir)?;
        println!("Markdown report: {}", path.display());
    }
    if matches.get_flag("json_report") {
        let path = export_json(&report, &output_dir)?;
        println!("JSON report: {}", path.display());
    }

    Ok(())
}
