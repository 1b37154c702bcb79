use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use tap_replay::rules::{PhaseMap, RuleSet};
use tap_replay::{parse_script_file, TestScript};

#[derive(Parser)]
#[command(name = "tap-replay")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Cross-platform recorded-action replay engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a recorded script and print its compiled replay order
    Validate {
        /// Path to the recorded script JSON
        script: PathBuf,
    },

    /// Expand the command rules matching a suite name
    Expand {
        /// Suite name to match against the rule set
        suite: String,

        /// Path to the rule configuration YAML
        #[arg(short, long)]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { script } => validate(&script),
        Commands::Expand { suite, rules } => expand(&suite, &rules),
    }
}

fn validate(path: &PathBuf) -> Result<()> {
    let script = parse_script_file(path)?;
    print_script(&script);
    println!(
        "{} {} drivers, {} actions, replay order verified",
        "✓".green(),
        script.drivers.len(),
        script.actions.len()
    );
    Ok(())
}

fn print_script(script: &TestScript) {
    println!("{}", "Drivers".bold());
    for driver in &script.drivers {
        let mut extras = Vec::new();
        if !driver.launcher_app.is_empty() {
            extras.push(format!("app={}", driver.launcher_app));
        }
        if !driver.init_url.is_empty() {
            extras.push(format!("url={}", driver.init_url));
        }
        println!(
            "  {} [{}] {}",
            driver.id.cyan(),
            driver.platform,
            extras.join(" ")
        );
    }

    println!("{}", "Actions".bold());
    for action in &script.actions {
        let optional = if action.is_optional {
            " (optional)".yellow().to_string()
        } else {
            String::new()
        };
        let element = if action.descriptor.is_none() {
            ""
        } else {
            " +element"
        };
        println!(
            "  {:>4}  {} on {}{}{}",
            action.id,
            action.action_type.cyan(),
            action.driver_id,
            element,
            optional
        );
    }
}

fn expand(suite: &str, rules_path: &PathBuf) -> Result<()> {
    let rules = RuleSet::from_yaml_file(rules_path)
        .with_context(|| format!("Failed to load rules: {}", rules_path.display()))?;

    let mut phases = PhaseMap::new();
    rules.expand(suite, &mut phases);

    if phases.is_empty() {
        println!("{} no rules matched suite `{}`", "ℹ".blue(), suite);
        return Ok(());
    }

    // Stable output order for scripting.
    let mut phase_names: Vec<&String> = phases.keys().collect();
    phase_names.sort();

    for phase in phase_names {
        println!("{}", phase.bold());
        for action in &phases[phase] {
            println!(
                "  [{}] {} {}",
                action.platform,
                action.operation.cyan(),
                action.args.join(" ")
            );
        }
    }
    Ok(())
}
