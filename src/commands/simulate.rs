//! Simulate command implementation.
//!
//! The simulate command:
//! 1. Builds the tracer from configuration
//! 2. Wires an aggregator to it
//! 3. Runs a synthetic workload against traced in-memory backends
//! 4. Writes or prints the call-path summary

use anyhow::{Context, Result};
use callpath_trace::aggregator::TraceAggregator;
use callpath_trace::backend::{BlobStore, DataStore, MemoryBlobStore, MemoryDataStore, Record};
use callpath_trace::output::{render_hot_paths, summary_to_string, write_summary, write_text};
use callpath_trace::proxy::{TracedBlobStore, TracedDataStore};
use callpath_trace::utils::config::{TracerConfig, SCHEMA_VERSION};
use clap::ValueEnum;
use futures::TryStreamExt;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Summary output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Arguments for the simulate command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    /// Number of synthetic requests to run
    pub calls: usize,

    /// Sampling rate override (None = configuration / environment)
    pub sample_rate: Option<u32>,

    /// Force the pass-through tracer
    pub disable_tracing: bool,

    /// Emit every node instead of pruning below 1%
    pub complete: bool,

    /// Summary format
    pub format: OutputFormat,

    /// Where to write the summary (None = stdout)
    pub output: Option<PathBuf>,

    /// Number of hot paths in the report (0 = no report)
    pub top_paths: usize,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            calls: 1000,
            sample_rate: None,
            disable_tracing: false,
            complete: false,
            format: OutputFormat::Json,
            output: None,
            top_paths: 10,
        }
    }
}

/// Validate simulate arguments
///
/// **Public** - can be called before execute_simulate for early validation
pub fn validate_args(args: &SimulateArgs) -> Result<()> {
    if args.calls == 0 {
        anyhow::bail!("calls must be greater than 0");
    }

    if args.sample_rate == Some(0) {
        anyhow::bail!("sample rate must be a positive integer");
    }

    if args.top_paths > 1000 {
        anyhow::bail!("top_paths is too large (max 1000)");
    }

    Ok(())
}

/// Resolve the tracer configuration: environment first, CLI overrides last
fn resolve_config(args: &SimulateArgs) -> Result<TracerConfig> {
    let mut config = TracerConfig::from_env().context("Invalid tracer configuration in environment")?;

    if let Some(rate) = args.sample_rate {
        config = config.with_sample_rate(rate)?;
    }
    if args.disable_tracing {
        config.enabled = false;
    }

    Ok(config)
}

/// Execute the simulate command
///
/// **Public** - main entry point called from main.rs
pub fn execute_simulate(args: SimulateArgs) -> Result<()> {
    let start_time = Instant::now();
    let config = resolve_config(&args)?;

    info!(
        "Simulating {} requests (tracing {}, rate 1/{})",
        args.calls,
        if config.enabled { "on" } else { "off" },
        config.sample_rate
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let aggregator = Arc::new(TraceAggregator::default());
    let completed = runtime.block_on(run(&args, &config, &aggregator))?;

    let summary = aggregator.summary(args.complete);
    info!(
        "Workload finished: {} requests, {} samples folded",
        completed,
        summary.top_down_samples()
    );
    info!("Tree: {}", aggregator.stats().summary());

    match (&args.output, args.format) {
        (Some(path), OutputFormat::Json) => {
            write_summary(&summary, path).context("Failed to write summary JSON")?;
            info!("✓ Summary written to: {}", path.display());
        }
        (Some(path), OutputFormat::Text) => {
            write_text(&summary, path).context("Failed to write summary text")?;
            info!("✓ Summary written to: {}", path.display());
        }
        (None, OutputFormat::Json) => println!("{}", summary_to_string(&summary)?),
        (None, OutputFormat::Text) => print!("{}", summary.render_text()),
    }

    if args.top_paths > 0 {
        println!("\n{}", "=".repeat(80));
        println!("CALL-PATH REPORT (schema v{})", SCHEMA_VERSION);
        println!("Generated: {}", chrono::Utc::now().to_rfc3339());
        println!("{}", "=".repeat(80));
        println!("{}", render_hot_paths(&aggregator.hot_paths(args.top_paths)));
        println!("{}", "=".repeat(80));
    }

    let elapsed = start_time.elapsed();
    info!("Simulation completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Wire tracer, aggregator and proxies, then drive the workload
async fn run(args: &SimulateArgs, config: &TracerConfig, aggregator: &Arc<TraceAggregator>) -> Result<usize> {
    let tracer = Arc::new(config.build_tracer());
    let subscription = tracer
        .as_sampling()
        .map(|sampling| aggregator.subscribe(sampling));

    let data = TracedDataStore::new(MemoryDataStore::new(), Arc::clone(&tracer));
    let blobs = TracedBlobStore::new(MemoryBlobStore::new(), Arc::clone(&tracer));

    let completed = run_workload(&data, &blobs, args.calls).await?;

    if let Some(subscription) = subscription {
        let folded = subscription
            .close()
            .await
            .context("Aggregator task failed")?;
        debug!("Aggregator folded {} trace(s)", folded);
    } else {
        warn!("Tracing disabled; the summary will be empty");
    }
    tracer.close();

    Ok(completed)
}

/// Synthetic request mix over the two stores
///
/// Each request kind is its own function so sampled call paths differ
/// by request kind.
pub async fn run_workload<D, B>(data: &D, blobs: &B, calls: usize) -> Result<usize>
where
    D: DataStore,
    B: BlobStore,
{
    for request in 0..calls {
        match request % 8 {
            0..=3 => serve_profile(data, request).await?,
            4 | 5 => update_profile(data, request).await?,
            6 => archive_report(blobs, request).await?,
            _ => list_profiles(data).await?,
        }
    }
    Ok(calls)
}

async fn serve_profile<D: DataStore>(data: &D, request: usize) -> Result<()> {
    let key = format!("profile:{}", request % 16);
    if data.get(&key).await?.is_none() {
        data.put(Record::new(key, format!("created by request {}", request)))
            .await?;
    }
    Ok(())
}

async fn update_profile<D: DataStore>(data: &D, request: usize) -> Result<()> {
    let key = format!("profile:{}", request % 16);
    data.put(Record::new(key, format!("updated by request {}", request)))
        .await?;
    Ok(())
}

async fn archive_report<B: BlobStore>(blobs: &B, request: usize) -> Result<()> {
    let name = format!("reports/{:06}", request);
    blobs.write_object(&name, request.to_le_bytes().to_vec()).await?;
    if !blobs.object_exists(&name).await? {
        anyhow::bail!("report {} vanished after write", name);
    }
    Ok(())
}

async fn list_profiles<D: DataStore>(data: &D) -> Result<()> {
    let records: Vec<Record> = data.scan("profile:").try_collect().await?;
    debug!("Listed {} profiles", records.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpath_trace::capture::{KeepAllFrames, Trace};
    use callpath_trace::tracer::SamplingTracer;
    use std::num::NonZeroU32;

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&SimulateArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_zero_calls() {
        let args = SimulateArgs {
            calls: 0,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_zero_rate() {
        let args = SimulateArgs {
            sample_rate: Some(0),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_paths_too_large() {
        let args = SimulateArgs {
            top_paths: 2000,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[tokio::test]
    async fn test_workload_backend_calls_are_sampled() {
        let tracer = Arc::new(SamplingTracer::with_capture(NonZeroU32::new(1).unwrap(), || {
            Trace::from_call_chain(["request"])
        }));
        let aggregator = Arc::new(TraceAggregator::new(KeepAllFrames));
        let subscription = aggregator.subscribe(&tracer);

        let data = TracedDataStore::new(MemoryDataStore::new(), Arc::clone(&tracer));
        let blobs = TracedBlobStore::new(MemoryBlobStore::new(), Arc::clone(&tracer));
        run_workload(&data, &blobs, 8).await.unwrap();
        subscription.close().await.unwrap();

        // 4 serve (get + put on first sight), 2 update, 1 archive (2 calls), 1 list
        assert_eq!(tracer.samples_published(), 4 * 2 + 2 + 2 + 1);
        assert_eq!(aggregator.total_samples(), tracer.samples_published());
    }
}
