use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use parzip_core::{DispatchPolicyKind, Mode, Pipeline, PipelineConfig, RunStats};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "parzip",
    version,
    about = "Parallel block compressor",
    long_about = "Compress and decompress files block-parallel, producing .pz containers."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress every eligible file under a path into .pz containers.
    Compress {
        #[command(flatten)]
        options: RunOptions,
    },
    /// Restore every .pz container under a path to its original bytes.
    Decompress {
        #[command(flatten)]
        options: RunOptions,
    },
}

#[derive(clap::Args)]
struct RunOptions {
    /// File or directory to process.
    input: PathBuf,

    /// Block size threshold (supports suffixes K/M/G, e.g. 512K, 2M).
    #[arg(long, default_value = "2M", value_parser = parse_size)]
    threshold: u64,

    /// Number of splitter threads.
    #[arg(long, default_value_t = 1)]
    splitters: usize,

    /// Number of codec worker threads (defaults to CPU count).
    #[arg(long, default_value_t = num_cpus::get())]
    workers: usize,

    /// Policy for routing blocks to workers.
    #[arg(long, value_enum, default_value_t = DispatchArg::RoundRobin)]
    dispatch: DispatchArg,

    /// Delete each input file after its output is written.
    #[arg(long, default_value_t = false)]
    remove_origin: bool,

    /// Write the run summary as JSON to this path ("-" for stdout).
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DispatchArg {
    RoundRobin,
    HashByFile,
    LeastLoaded,
}

impl From<DispatchArg> for DispatchPolicyKind {
    fn from(value: DispatchArg) -> Self {
        match value {
            DispatchArg::RoundRobin => DispatchPolicyKind::RoundRobin,
            DispatchArg::HashByFile => DispatchPolicyKind::HashByFile,
            DispatchArg::LeastLoaded => DispatchPolicyKind::LeastLoaded,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(stats) if stats.files_failed > 0 => {
            eprintln!("error: {} file(s) failed", stats.files_failed);
            std::process::exit(1);
        }
        Ok(_) => {}
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<RunStats, Box<dyn std::error::Error>> {
    let (mode, options) = match command {
        Commands::Compress { options } => (Mode::Compress, options),
        Commands::Decompress { options } => (Mode::Decompress, options),
    };

    let config = PipelineConfig::new(mode)
        .with_threshold(options.threshold)
        .with_splitters(options.splitters)
        .with_workers(options.workers)
        .with_dispatch(options.dispatch.into())
        .with_remove_original(options.remove_origin);

    let pipeline = Pipeline::new(config);
    let stats = pipeline.run_on_path(&options.input)?;

    print_summary(&options.input, &stats);
    if let Some(path) = &options.stats_json {
        write_stats_json(path, &stats)?;
    }

    Ok(stats)
}

fn print_summary(input: &std::path::Path, stats: &RunStats) {
    let elapsed_secs = stats.elapsed.as_secs_f64().max(1e-6);
    let throughput_bps = stats.input_bytes as f64 / elapsed_secs;
    let ratio = if stats.input_bytes > 0 {
        stats.output_bytes as f64 / stats.input_bytes as f64
    } else {
        1.0
    };
    let mode = match stats.mode {
        Mode::Compress => "compress",
        Mode::Decompress => "decompress",
    };

    println!("{mode} complete");
    println!("  source: {}", input.display());
    println!("  elapsed: {}", format_duration(stats.elapsed));
    println!(
        "  files: {} total | {} completed | {} failed",
        stats.files_total, stats.files_completed, stats.files_failed
    );
    println!("  input bytes: {}", format_bytes(stats.input_bytes));
    println!("  output bytes: {}", format_bytes(stats.output_bytes));
    println!("  size ratio: {ratio:.3}x");
    println!("  throughput: {}/s", format_rate(throughput_bps));

    let total_tasks: usize = stats
        .workers
        .iter()
        .map(|worker| worker.tasks_completed)
        .sum();
    let max_tasks = stats
        .workers
        .iter()
        .map(|worker| worker.tasks_completed)
        .max()
        .unwrap_or(0);
    let min_tasks = stats
        .workers
        .iter()
        .map(|worker| worker.tasks_completed)
        .min()
        .unwrap_or(0);
    println!(
        "  scheduler: {} workers | task balance min/max {min_tasks}/{max_tasks} | total tasks {total_tasks}",
        stats.workers.len()
    );
    for worker in &stats.workers {
        println!(
            "    w{:02} tasks {:>6} | busy {:>8}",
            worker.worker_id,
            worker.tasks_completed,
            format_duration(worker.busy),
        );
    }
}

fn write_stats_json(
    path: &std::path::Path,
    stats: &RunStats,
) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = serde_json::to_string_pretty(stats)?;
    if path.as_os_str() == "-" {
        println!("{rendered}");
    } else {
        let mut file = File::create(path)?;
        file.write_all(rendered.as_bytes())?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn parse_size(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let split_at = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (num_part, suffix_part) = trimmed.split_at(split_at);
    if num_part.is_empty() {
        return Err(format!("invalid size: {value}"));
    }

    let base: u64 = num_part
        .parse()
        .map_err(|_| format!("invalid size number: {value}"))?;

    let multiplier = match suffix_part.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1u64,
        "k" | "kb" => 1024u64,
        "m" | "mb" => 1024u64 * 1024,
        "g" | "gb" => 1024u64 * 1024 * 1024,
        other => {
            return Err(format!("invalid size suffix '{other}' in '{value}'"));
        }
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: {value}"))
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_rate(bytes_per_sec: f64) -> String {
    format_bytes(bytes_per_sec.max(0.0) as u64)
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        return format!("{:.0}ms", duration.as_millis());
    }
    if total_secs < 60.0 {
        return format!("{total_secs:.2}s");
    }
    let minutes = (total_secs / 60.0).floor() as u64;
    let seconds = total_secs - (minutes * 60) as f64;
    format!("{minutes}m{seconds:04.1}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_suffixes() {
        assert_eq!(parse_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("512k").unwrap(), 512 * 1024);
        assert_eq!(parse_size("17").unwrap(), 17);
        assert!(parse_size("12x").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.00 MiB");
    }
}
