//! Binary entry point for truthpedia.
//!
//! This binary provides the console game and the dataset tooling.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use truthpedia::cli::{PopulateArgs, cmd_categories, cmd_play, cmd_populate};
use truthpedia::config::TruthpediaConfig;
use truthpedia::{Error, observability};

/// Exit status after Ctrl-C, as a shell would report it.
const EXIT_INTERRUPTED: u8 = 130;

/// TruthPedia - spot the fabricated encyclopedia summary.
#[derive(Parser)]
#[command(name = "truthpedia")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Rounds to win.
    #[arg(short, long, global = true, env = "TRUTHPEDIA_ROUNDS")]
    rounds: Option<u32>,

    /// Fallback dataset overriding the bundled one.
    #[arg(short, long, global = true)]
    dataset: Option<PathBuf>,

    /// Serve every round from the dataset without network access.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Play a game (default).
    Play,

    /// Fill the fallback dataset from the live sources.
    Populate {
        /// Output file (defaults to the configured dataset or data/responses.json).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Genuine articles wanted per category.
        #[arg(long, default_value = "8")]
        real: usize,

        /// Fabricated articles wanted per category.
        #[arg(long, default_value = "4")]
        fake: usize,
    },

    /// List the category catalog.
    Categories {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // A missing .env file is normal.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref().map(Path::new)) {
        Ok(config) => apply_flags(config, &cli),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    let prompting = Arc::new(AtomicBool::new(false));
    if let Err(e) = install_interrupt_handler(cancel.clone(), Arc::clone(&prompting)) {
        tracing::warn!(error = %e, "Ctrl-C handler not installed");
    }

    match run_command(cli, &config, &cancel, prompting) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Cancelled) => {
            eprintln!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from an explicit path or the default locations.
fn load_config(path: Option<&Path>) -> truthpedia::Result<TruthpediaConfig> {
    TruthpediaConfig::load(path)
}

/// Applies command-line flags on top of file and environment settings.
fn apply_flags(mut config: TruthpediaConfig, cli: &Cli) -> TruthpediaConfig {
    if let Some(rounds) = cli.rounds {
        config.game.rounds = rounds.max(1);
    }
    if let Some(dataset) = &cli.dataset {
        config.dataset = Some(dataset.clone());
    }
    if cli.offline {
        config.game.offline = true;
    }
    config
}

/// Cancels in-flight work on Ctrl-C.
///
/// A blocked stdin read cannot observe the token, so an interrupt while
/// waiting for input exits immediately.
fn install_interrupt_handler(
    cancel: CancellationToken,
    prompting: Arc<AtomicBool>,
) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        cancel.cancel();
        if prompting.load(Ordering::SeqCst) {
            eprintln!();
            eprintln!("Interrupted");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    })
}

/// Runs the selected command.
fn run_command(
    cli: Cli,
    config: &TruthpediaConfig,
    cancel: &CancellationToken,
    prompting: Arc<AtomicBool>,
) -> truthpedia::Result<()> {
    match cli.command.unwrap_or(Commands::Play) {
        Commands::Play => {
            cmd_play(config, cancel, prompting)?;
            Ok(())
        },
        Commands::Populate { output, real, fake } => {
            let args = PopulateArgs { output, real, fake };
            let stdout = std::io::stdout();
            cmd_populate(config, &args, cancel, &mut stdout.lock())?;
            Ok(())
        },
        Commands::Categories { json } => {
            let stdout = std::io::stdout();
            cmd_categories(&mut stdout.lock(), json)
        },
    }
}
