//! trace-info - Binary Entry Point
//!
//! Loads a trace file through a [`ModelManager`] and prints a summary of
//! its window, recorded features and per-type statistics.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use profiler_trace::{Feature, ManagerConfig, ManagerResult, ModelManager};

#[derive(Parser)]
#[command(name = "trace-info")]
#[command(about = "summarize a profiler trace file", version)]
struct Args {
    #[arg(help = "trace file to inspect")]
    trace: PathBuf,

    #[arg(short, long, help = "also list the notes stored in the trace")]
    notes: bool,

    #[arg(
        short,
        long,
        default_value_t = 20,
        help = "number of event types to list, by total duration"
    )]
    top: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "failed to inspect trace");
            eprintln!("trace-info: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> ManagerResult<()> {
    let config = ManagerConfig::new().with_worker_thread_name("trace-info");
    let mut manager = ModelManager::with_config(config);
    manager.load(&args.trace)?;
    if let Some(result) = manager.wait_for_codec() {
        result?;
    }

    let window = manager.trace_window();
    println!("trace:    {}", args.trace.display());
    println!(
        "window:   {} .. {} ({} ns)",
        window.start(),
        window.end(),
        window.duration()
    );

    let recorded: Vec<&str> = manager
        .recorded_features()
        .iter()
        .map(Feature::name)
        .collect();
    println!("features: {}", recorded.join(", "));

    let store = manager.event_store();
    let types = store.event_types().unwrap_or_default();
    println!("events:   {} in {} types", store.len(), types.len());

    let mut ranked: Vec<(usize, i64)> = (0..types.len())
        .filter_map(|i| store.type_stats(i as u32).map(|s| (i, s.total_duration)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    if !ranked.is_empty() {
        println!();
        println!(
            "{:<40} {:>8} {:>12} {:>12} {:>12}",
            "type", "count", "total", "average", "max"
        );
    }
    for (index, _) in ranked.into_iter().take(args.top) {
        let index = index as u32;
        let (Some(ty), Some(stats)) = (store.event_type(index), store.type_stats(index)) else {
            continue;
        };
        println!(
            "{:<40} {:>8} {:>12} {:>12} {:>12}",
            ty.display_name,
            stats.count,
            stats.total_duration,
            stats.average_duration(),
            stats.max_duration
        );
    }

    if args.notes {
        println!();
        println!("notes:    {}", manager.notes().len());
        for (id, note) in manager.notes().iter() {
            println!(
                "  #{} @{} (type {}, event {}): {}",
                id, note.start_time, note.type_index, note.event_index, note.text
            );
        }
    }

    Ok(())
}
