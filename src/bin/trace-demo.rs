//! Record a synthetic workload on two worker pools and write it as a Chrome trace.
//!
//! Each pool records into its own buffer with its own start time; the two are
//! merged onto one timeline before writing.
//!
//! # Usage
//!
//! ```bash
//! # Write a trace, then open it in chrome://tracing or ui.perfetto.dev
//! trace-demo --output trace.json
//!
//! # Bigger workload with a text summary
//! trace-demo --workers 8 --tasks 200 --output trace.json --summary
//!
//! # Custom process name and labels
//! RUST_LOG=debug trace-demo --config trace.toml --output trace.json
//! ```

use std::hint::black_box;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use trace_recorder::{TraceBuffer, TraceConfig, TraceFormatter, summary, trace_args};

#[derive(Parser)]
#[command(about = "Record a synthetic multi-threaded workload as a Chrome trace")]
struct Cli {
    /// Where to write the trace JSON
    #[arg(short, long)]
    output: PathBuf,

    /// Worker threads per pool
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Tasks run on each pool
    #[arg(long, default_value_t = 32)]
    tasks: usize,

    /// TOML file with recorder settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a span summary after writing
    #[arg(long)]
    summary: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => TraceConfig::load(path)?
            .with_context(|| format!("Config file not found: {}", path.display()))?,
        None => TraceConfig::default(),
    };

    let io = capture_pool("io", &config, cli.workers, cli.tasks)?;
    let compute = capture_pool("compute", &config, cli.workers, cli.tasks)?;
    let trace = trace_recorder::merge(&io, &compute);

    TraceFormatter::from_config(&config)
        .write_to_file(&trace, &cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    println!("Wrote {} events to {}", trace.len(), cli.output.display());

    if cli.summary {
        let analysis = summary::analyze(&trace.snapshot());
        println!("{}", summary::render(&analysis));
    }

    Ok(())
}

/// Run `tasks` tasks on a fresh pool, recording into a buffer of its own.
fn capture_pool(
    name: &str,
    config: &TraceConfig,
    workers: usize,
    tasks: usize,
) -> anyhow::Result<Arc<TraceBuffer>> {
    let trace = TraceBuffer::with_config(config);
    let prefix = name.to_string();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("{prefix}-{i}"))
        .build()
        .with_context(|| format!("Failed to start {name} pool"))?;

    pool.install(|| {
        let _pool_span = trace.span_with("pool", trace_args!["name" => name, "tasks" => tasks]);
        (0..tasks)
            .into_par_iter()
            .for_each(|task| run_task(&trace, task));
    });

    trace.stop_tracing();
    log::debug!("{name} pool recorded {} events", trace.len());
    Ok(trace)
}

fn run_task(trace: &TraceBuffer, task: usize) {
    let _span = trace.span_with("task", trace_args!["index" => task]);

    let start = trace.timestamp();
    let checksum = busy_work(task);
    trace.complete_event_with("compute", start, trace_args!["checksum" => checksum]);

    if task % 8 == 0 {
        trace.instant_event_with("checkpoint", trace_args!["tasks" => vec![task, task + 8]]);
    }
}

fn busy_work(seed: usize) -> u64 {
    let mut acc = seed as u64 + 1;
    for i in 0..50_000u64 {
        acc = black_box(acc.wrapping_mul(6364136223846793005).wrapping_add(i));
    }
    acc
}
