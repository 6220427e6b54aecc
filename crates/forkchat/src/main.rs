//! Inspect conversation trees and context budgets from the command line.
//!
//! # Examples
//!
//! ```sh
//! # Replay a scripted conversation and show the active path and request window
//! forkchat replay demos/regenerate.json
//!
//! # Same, against a small window, as JSON
//! forkchat replay demos/regenerate.json --context-size 300 --max-tokens 150 --json
//!
//! # Use named model settings from a config file
//! forkchat replay demos/regenerate.json --config demos/forkchat.json --model local
//!
//! # Resolve a model name to its context window
//! forkchat context-size openai/gpt-4o-mini
//! ```

mod script;

use clap::{Args, Parser, Subcommand};
use forkchat::prelude::*;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Inspect conversation trees and context budgets.
#[derive(Parser)]
#[command(name = "forkchat", version)]
struct Cli {
    /// Log tree operations at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON script of tree operations and print the result
    Replay(ReplayArgs),

    /// Print the context window size resolved for a model name
    ContextSize {
        /// Model name, matched exactly first and then loosely
        model: String,

        /// JSON config file with named model settings and a context-size table
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ReplayArgs {
    /// Script file: a JSON array of steps tagged by "op"
    script: PathBuf,

    /// JSON config file with named model settings and a context-size table
    #[arg(long)]
    config: Option<PathBuf>,

    // ── Model settings ─────────────────────────────────────────
    /// Named settings from the config file, or a bare model name
    #[arg(long)]
    model: Option<String>,

    /// Context window in tokens (overrides the table)
    #[arg(long)]
    context_size: Option<usize>,

    /// Tokens reserved for the response
    #[arg(long)]
    max_tokens: Option<usize>,

    /// System personality text counted against the window
    #[arg(long)]
    personality: Option<String>,

    // ── Output ─────────────────────────────────────────────────
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ForkchatConfig, String> {
    match path {
        Some(path) => ForkchatConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(ForkchatConfig::default()),
    }
}

/// Named settings when the config has them, otherwise a bare model name.
fn select_settings(config: &ForkchatConfig, model: Option<&str>) -> ModelSettings {
    match model {
        Some(name) => config
            .model(name)
            .cloned()
            .unwrap_or_else(|_| ModelSettings::new(name)),
        None => config.models.first().cloned().unwrap_or_default(),
    }
}

fn replay(args: &ReplayArgs) -> Result<String, String> {
    let config = load_config(args.config.as_deref())?;
    let mut settings = select_settings(&config, args.model.as_deref());
    if let Some(size) = args.context_size {
        settings = settings.with_context_size(size);
    }
    if let Some(tokens) = args.max_tokens {
        settings = settings.with_max_tokens(tokens);
    }
    if let Some(personality) = &args.personality {
        settings = settings.with_personality(personality.as_str());
    }

    let steps = script::load_script(&args.script).map_err(|e| e.to_string())?;
    let mut replay = script::Replay::new(ChatSession::new(settings, &config.context_sizes));
    replay.run(&steps)?;

    let report = replay.report();
    if args.json {
        serde_json::to_string_pretty(&report)
            .map(|json| format!("{json}\n"))
            .map_err(|e| format!("failed to serialize report: {e}"))
    } else {
        Ok(report.render())
    }
}

fn context_size(model: &str, config_path: Option<&Path>) -> Result<String, String> {
    let config = load_config(config_path)?;
    let size = match config.model(model) {
        Ok(settings) => settings.resolved_context_size(&config.context_sizes),
        Err(_) => config.context_sizes.context_size_for(model),
    };
    Ok(format!("{size}\n"))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Replay(args) => replay(args),
        Command::ContextSize { model, config } => context_size(model, config.as_deref()),
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
