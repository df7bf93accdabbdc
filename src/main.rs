//! Callpath Trace CLI
//!
//! Runs a traced synthetic workload and reports where backend calls come
//! from; validates summary documents.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

mod commands;

use callpath_trace::utils::config::{
    CHANNEL_CAPACITY_ENV, SAMPLE_RATE_ENV, SCHEMA_VERSION, TRACING_ENV,
};
use commands::{execute_simulate, validate_args, OutputFormat, SimulateArgs};

/// Callpath Trace - sampled call-path tracing for storage backends
#[derive(Parser, Debug)]
#[command(name = "callpath-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a traced synthetic workload and summarize its call paths
    Simulate {
        /// Number of synthetic requests
        #[arg(short = 'n', long, default_value = "1000")]
        calls: usize,

        /// Sample every Nth backend call
        #[arg(short, long, env = "CALLPATH_SAMPLE_RATE")]
        rate: Option<u32>,

        /// Use the pass-through tracer
        #[arg(long)]
        no_tracing: bool,

        /// Do not prune children below 1% of their parent
        #[arg(long)]
        complete: bool,

        /// Summary format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Write the summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of hot paths in the report (0 disables it)
        #[arg(long, default_value = "10")]
        top_paths: usize,
    },

    /// Validate a summary JSON file
    Validate {
        /// Path to summary JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Simulate {
            calls,
            rate,
            no_tracing,
            complete,
            format,
            output,
            top_paths,
        } => {
            let args = SimulateArgs {
                calls,
                sample_rate: rate,
                disable_tracing: no_tracing,
                complete,
                format,
                output,
                top_paths,
            };

            validate_args(&args)?;
            execute_simulate(args)?;
        }

        Commands::Validate { file } => {
            validate_summary_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Validate a summary JSON file
///
/// **Private** - internal command implementation
fn validate_summary_file(file_path: PathBuf) -> Result<()> {
    use callpath_trace::output::read_summary;

    println!("Validating summary: {}", file_path.display());

    let summary = read_summary(&file_path)?;

    println!("✓ Valid call-path summary");
    println!("  Top-down samples:  {}", summary.top_down_samples());
    println!("  Bottom-up samples: {}", summary.bottom_up_samples());
    println!(
        "  Top-level callers: {}",
        summary.top_down().map_or(0, |children| children.len())
    );

    if summary.top_down_samples() != summary.bottom_up_samples() {
        anyhow::bail!("Root counts disagree: both trees must hold the same samples");
    }

    Ok(())
}

/// Display schema information
///
/// **Private** - internal command implementation
fn display_schema(show_details: bool) {
    println!("Callpath Trace Summary Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Summary Structure:");
        println!("  \"[N] topDown\": object   - Caller-to-callee tree over N samples");
        println!("  \"[N] bottomUp\": object  - Callee-to-caller tree over the same samples");
        println!("  Inside each tree:");
        println!("    \"[n] <frame>\": object - Frame with children, seen in n samples");
        println!("    \"<frame>\": number     - Leaf frame and its sample count");
        println!("    \"skipped\": number     - Samples of children under 1% of the parent");
        println!("  Children are sorted by sample count, highest first.");
        println!("  A tree with no samples is a bare leaf: \"topDown\": 0");
        println!();
        println!("Environment:");
        println!("  {:<26} sample every Nth call (default 1)", SAMPLE_RATE_ENV);
        println!("  {:<26} on/off (default on)", TRACING_ENV);
        println!("  {:<26} buffered traces per subscriber", CHANNEL_CAPACITY_ENV);
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
///
/// **Private** - internal command implementation
fn display_version() {
    println!("Callpath Trace v{}", env!("CARGO_PKG_VERSION"));
    println!("Summary Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Sampled call-path tracing for storage backends.");
}
