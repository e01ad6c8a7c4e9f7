//! # Intake Configuration Validator
//!
//! Command-line tool for validating intake configuration files across
//! environments before a pipeline is started with them.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use submission_intake::config::{ConfigManager, IntakeConfig};
use submission_intake::rules::rules_from_config;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "intake-config-validator")]
#[command(about = "Validate submission intake configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the whole configuration
    All,

    /// Validate and summarize one section
    Component {
        /// Section name (idempotency, validation, circuit_breaker, enrichment, batch, rules)
        name: String,
    },

    /// Print the effective configuration as JSON
    Show,

    /// Compare the effective configuration of two environments
    Compare {
        /// Base environment for comparison
        #[arg(short, long, default_value = "development")]
        base: String,

        /// Target environment for comparison
        #[arg(short, long)]
        target: String,
    },
}

type CliResult = anyhow::Result<()>;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Show) => show_config(&cli),
        Some(Commands::Compare { base, target }) => compare_configs(&cli, base, target),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli, environment: &str) -> anyhow::Result<IntakeConfig> {
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
        .with_context(|| format!("failed to load configuration for environment '{environment}'"))?;
    Ok(manager.config().clone())
}

fn validate_all_config(cli: &Cli) -> CliResult {
    println!("🔧 Validating Intake Configuration");
    println!("Environment: {}", cli.environment);
    if let Some(config_dir) = &cli.config_dir {
        println!("Config Directory: {}", config_dir.display());
    }
    println!();

    let config = load(cli, &cli.environment)?;
    println!("✅ Configuration loaded and validated");

    for section in SECTIONS {
        summarize_section(&config, section)?;
    }

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

const SECTIONS: [&str; 6] = [
    "idempotency",
    "validation",
    "circuit_breaker",
    "enrichment",
    "batch",
    "rules",
];

fn validate_component(cli: &Cli, component_name: &str) -> CliResult {
    println!("🔧 Validating Component: {component_name}");
    let config = load(cli, &cli.environment)?;
    summarize_section(&config, &component_name.replace('-', "_").to_lowercase())?;
    println!("✅ Component '{component_name}' validation passed!");
    Ok(())
}

fn summarize_section(config: &IntakeConfig, section: &str) -> CliResult {
    match section {
        "idempotency" => {
            println!("🔑 Idempotency");
            println!(
                "   ✅ Excluded fields: {}",
                config.idempotency.excluded_fields.join(", ")
            );
        }
        "validation" => {
            println!("📋 Validation");
            println!(
                "   ✅ Required fields: {}",
                config.validation.required_fields.join(", ")
            );
            println!(
                "   ✅ Identifier field: {}",
                config.validation.identifier_field
            );
        }
        "circuit_breaker" => {
            let breaker = &config.circuit_breaker;
            println!("⚡ Circuit Breaker");
            if breaker.enabled {
                println!(
                    "   ✅ Threshold: {} failures, recovery after {}ms",
                    breaker.failure_threshold, breaker.recovery_timeout_ms
                );
            } else {
                println!("   ℹ️  Disabled: enrichment is always attempted");
            }
        }
        "enrichment" => {
            println!("🌐 Enrichment");
            match config.enrichment.timeout_ms {
                Some(ms) => println!("   ✅ Call timeout: {ms}ms"),
                None => println!("   ℹ️  No call timeout configured"),
            }
        }
        "batch" => {
            println!("📦 Batch");
            println!(
                "   ✅ Max concurrent submissions: {}",
                config.batch.max_concurrent_submissions
            );
        }
        "rules" => {
            println!("⚖️  Rules");
            let rules = rules_from_config(&config.rules);
            if rules.is_empty() {
                println!("   ℹ️  No rules enabled: every valid submission is approved");
            }
            for rule in &rules {
                println!("   ✅ {}", rule.name());
            }
        }
        other => return Err(anyhow!("Unknown component: {other}")),
    }
    Ok(())
}

fn show_config(cli: &Cli) -> CliResult {
    let config = load(cli, &cli.environment)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn compare_configs(cli: &Cli, base: &str, target: &str) -> CliResult {
    println!("🔍 Comparing Configurations: {base} vs {target}");

    let base_json = serde_json::to_value(load(cli, base)?)?;
    let target_json = serde_json::to_value(load(cli, target)?)?;

    let mut differences = Vec::new();
    collect_differences("", &base_json, &target_json, &mut differences);

    if differences.is_empty() {
        println!("✅ No differences");
    }
    for (path, left, right) in differences {
        println!("   {path}: {left} → {right}");
    }
    Ok(())
}

fn collect_differences(path: &str, base: &Value, target: &Value, out: &mut Vec<(String, Value, Value)>) {
    match (base, target) {
        (Value::Object(left), Value::Object(right)) => {
            let mut keys: Vec<&String> = left.keys().chain(right.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                collect_differences(
                    &child,
                    left.get(key).unwrap_or(&Value::Null),
                    right.get(key).unwrap_or(&Value::Null),
                    out,
                );
            }
        }
        (left, right) if left != right => out.push((path.to_string(), left.clone(), right.clone())),
        _ => {}
    }
}
