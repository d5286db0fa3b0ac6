//! Demand Pager - Main Entry Point
//!
//! Usage: demand-pager [OPTIONS] [WORKLOAD]
//!
//! Replays per-process page access traces against a shared frame pool with
//! FIFO replacement and prints fault counts and final page tables. Without a
//! workload file the built-in two-process demo runs.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::error;

use demand_pager::io::{Workload, format_report, write_report};
use demand_pager::{Replayer, VmConfig, logging};

#[derive(Parser)]
#[command(name = "demand-pager")]
#[command(about = "Demand paging simulator with FIFO page replacement", long_about = None)]
struct Cli {
    /// Workload file: one `<pid> <size> <page>...` line per process
    workload: Option<PathBuf>,

    /// Page size in bytes
    #[arg(long)]
    page_size: Option<usize>,

    /// Number of physical frames
    #[arg(long)]
    pool_size: Option<usize>,

    /// Only frames below this index are handed out
    #[arg(long)]
    candidate_frames: Option<usize>,

    /// Resident pages per process before FIFO eviction
    #[arg(long)]
    capacity: Option<usize>,

    /// Random probes before the linear fallback scan
    #[arg(long)]
    probe_limit: Option<usize>,

    /// RNG seed for reproducible frame placement
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between accesses, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn vm_config(&self) -> VmConfig {
        let mut config = VmConfig::new();
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        if let Some(pool_size) = self.pool_size {
            config = config.with_pool_size(pool_size);
        }
        if let Some(candidates) = self.candidate_frames {
            config = config.with_candidate_frames(candidates);
        }
        if let Some(capacity) = self.capacity {
            config = config.with_resident_capacity(capacity);
        }
        if let Some(probe_limit) = self.probe_limit {
            config = config.with_probe_limit(probe_limit);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(logging::level_from_verbosity(cli.verbose, cli.quiet)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    // Run the simulation and handle any errors
    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> demand_pager::Result<()> {
    let workload = match &cli.workload {
        Some(path) => Workload::from_file(path)?,
        None => Workload::demo(),
    };

    let mut replayer = Replayer::new(cli.vm_config())?;
    if cli.delay_ms > 0 {
        replayer = replayer.with_delay(Duration::from_millis(cli.delay_ms));
    }

    let reports = replayer.run_workload(&workload)?;

    match &cli.output {
        Some(path) => {
            write_report(path, &reports, replayer.frames().frames())?;
            log::info!("report written to {}", path.display());
        }
        None => print!("{}", format_report(&reports, replayer.frames().frames())),
    }

    replayer.terminate_all()?;
    Ok(())
}
