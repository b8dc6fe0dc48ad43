//! pyhost CLI entry point.
//!
//! Inspects and records which Python interpreter and libpython the host
//! should bind to. `set` persists preferences and validates them through a
//! fresh subprocess; `status` prints the resolved configuration; `check`
//! gates on a complete one.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use pyhost::prefs::{self, Preferences};
use pyhost::{resolve, status};

#[derive(Parser, Debug)]
#[command(name = "pyhost")]
#[command(about = "Discover and record the Python interpreter for embedding")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved configuration
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Re-resolve in a fresh subprocess and pipe its report through
        #[arg(long)]
        fresh: bool,

        /// Trace rejected library candidates
        #[arg(short, long)]
        verbose: bool,
    },

    /// Record interpreter preferences
    Set {
        /// Interpreter name or path
        #[arg(long)]
        python: Option<String>,

        /// The host already has an interpreter loaded; skip discovery
        #[arg(long)]
        inprocess: bool,

        /// Bind to the managed Conda environment
        #[arg(long)]
        conda: bool,

        /// Remove the stored preferences instead
        #[arg(long, conflicts_with_all = ["python", "inprocess", "conda"])]
        clear: bool,

        /// Skip the post-write validation subprocess
        #[arg(long)]
        no_verify: bool,
    },

    /// Validate the resolved configuration
    Check {
        /// Trace rejected library candidates
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Commands::Status {
            json,
            fresh,
            verbose,
        } => status_command(json, fresh, verbose).await,
        Commands::Set {
            python,
            inprocess,
            conda,
            clear,
            no_verify,
        } => set_command(python, inprocess, conda, clear, no_verify).await,
        Commands::Check { verbose } => check_command(verbose).await,
    }
}

async fn status_command(json: bool, fresh: bool, verbose: bool) -> Result<()> {
    if fresh {
        // Cross-validation: a fresh process reloads the record from disk and
        // re-resolves from scratch; its report is piped through untouched.
        let mut args = vec!["status"];
        if json {
            args.push("--json");
        }
        if verbose {
            args.push("--verbose");
        }
        return reinvoke(&args).await;
    }

    let config = resolve::resolve_effective_config(verbose).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        status::print_report(&config);
    }
    Ok(())
}

async fn check_command(verbose: bool) -> Result<()> {
    let config = resolve::resolve_effective_config(verbose).await;
    if let Err(e) = resolve::assert_configured(&config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    info!("configuration OK");
    Ok(())
}

async fn set_command(
    python: Option<String>,
    inprocess: bool,
    conda: bool,
    clear: bool,
    no_verify: bool,
) -> Result<()> {
    if clear {
        prefs::clear_preferences()?;
        info!("preferences cleared");
        return Ok(());
    }

    let preferences = Preferences {
        python,
        inprocess,
        conda,
    };
    prefs::save_preferences(&preferences)?;
    info!("preferences saved to {:?}", prefs::default_config_dir());

    if no_verify || inprocess {
        return Ok(());
    }

    // Validate through a fresh process so the check reads the record from
    // disk exactly the way a dependent would. The preference write stands
    // either way; a failed check exits non-zero with remediation printed.
    warn!("validating stored preferences in a fresh process");
    reinvoke(&["check"]).await
}

/// Spawn a fresh instance of this binary with `args`, inheriting stdio, and
/// propagate a failing exit code.
async fn reinvoke(args: &[&str]) -> Result<()> {
    let exe = std::env::current_exe()?;
    let status = tokio::process::Command::new(exe)
        .args(args)
        .status()
        .await?;
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
