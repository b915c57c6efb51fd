//! Command-line entry point of the W+c event selection

use btv_wc::{config::Configuration, output, pipeline::Processor, scheduling, source, Result};

use clap::Parser;
use eyre::WrapErr;
use log::info;

use std::{path::PathBuf, time::Instant};

/// Select W+c candidate events from NanoAOD-flattened Parquet files
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Analysis configuration file
    config: PathBuf,

    /// Override the output directory of the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // ### CONFIGURATION READOUT ###

    let mut cfg = Configuration::load(&args.config).wrap_err("Failed to load the configuration")?;
    if let Some(output_dir) = args.output_dir {
        cfg.run.output_dir = output_dir;
    }

    // ### PROCESSING INITIALIZATION ###

    let chunks = source::plan_chunks(&cfg.datasets, cfg.run.chunk_size)
        .wrap_err("Failed to split the input files into chunks")?;
    info!(
        "Processing {} chunks of at most {} events",
        chunks.len(),
        cfg.run.chunk_size
    );
    let processor = Processor::new(&cfg)?;

    // NOTE: The clock is started after configuration I/O and input file
    //       metadata readout, which do not depend on the amount of events.
    let saved_time = Instant::now();

    // ### PROCESSING EXECUTION ###

    let cutflow = scheduling::run_chunks(&chunks, |meta| processor.process(meta))?;

    // ### RESULTS DISPLAY AND STORAGE ###

    let elapsed_time = saved_time.elapsed();
    let report = output::dump_results(&cfg.run.output_dir, &cutflow, elapsed_time)
        .wrap_err("Failed to output the cutflow")?;
    info!("Cutflow written to {}", report.display());

    // ...and we're done
    Ok(())
}
