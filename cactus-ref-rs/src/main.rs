mod cli;

use anyhow::{Context, Result};
use cactus_ref_rs::io::{load_threads, open_pinches, write_blocks};
use cactus_ref_rs::{anneal_with_mode, AnnealMode};
use clap::Parser;
use mimalloc::MiMalloc;
use std::fs::File;
use std::io::{self, BufWriter};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if args.quiet {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new("info")
            }
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut threads = load_threads(&args.threads)?;
    let mut pinches = open_pinches(&args.pinches)?;
    let mode = if args.restrict_to_components {
        AnnealMode::SameComponent
    } else {
        AnnealMode::Unrestricted
    };
    let stats = anneal_with_mode(&mut threads, &mut pinches, mode)
        .with_context(|| format!("failed to anneal {}", args.pinches.display()))?;

    let blocks = match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_blocks(&threads, BufWriter::new(file))?
        }
        None => write_blocks(&threads, BufWriter::new(io::stdout().lock()))?,
    };

    tracing::info!(
        threads = threads.thread_count(),
        pinches = stats.pinches,
        merges = stats.merges,
        merged_bases = stats.merged_bases,
        skipped_bases = stats.skipped_bases,
        blocks,
        "cactus-ref-rs: annealing complete"
    );
    Ok(())
}
