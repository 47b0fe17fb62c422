//! Convert simulation event dumps to the columnar HDF5 event store.

use clap::Parser;
use drcal_io::{load_sim_events, read_store, write_store};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    DrcalIo(#[from] drcal_io::Error),
}

/// Dual-readout calorimeter event converter.
///
/// A `.json` simulation dump is converted to an event store next to the
/// input (extension replaced by `.h5`); a `.h5`/`.hdf5` store is loaded
/// and summarized.
#[derive(Parser)]
#[command(name = "drcal")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input file: simulation event dump or event store
    input: PathBuf,

    /// Verbose progress output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let is_store = cli
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("h5") || ext.eq_ignore_ascii_case("hdf5"));

    if is_store {
        summarize(&cli.input, cli.verbose)
    } else {
        convert(&cli.input, cli.verbose)
    }
}

fn convert(input: &Path, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!("Input event dump: {}", input.display());
    }

    let events = load_sim_events(input)?;
    if verbose {
        for (number, entry) in events.iter() {
            eprintln!(
                "event {number}: {} hits, {} particles",
                entry.hits.len(),
                entry.particles.as_ref().map_or(0, drcal_core::McCollection::len)
            );
        }
    }

    let output = input.with_extension("h5");
    let persisted = write_store(&output, &events)?;
    println!(
        "Saved {persisted} of {} events to {}",
        events.len(),
        output.display()
    );
    Ok(())
}

fn summarize(input: &Path, verbose: bool) -> Result<()> {
    let events = read_store(input)?;

    let mut total_hits = 0usize;
    let mut total_particles = 0usize;
    for (number, entry) in events.iter() {
        let particles = entry.particles.as_ref().map_or(0, drcal_core::McCollection::len);
        total_hits += entry.hits.len();
        total_particles += particles;
        if verbose {
            eprintln!("event {number}: {} hits, {particles} particles", entry.hits.len());
        }
    }

    match events.schema() {
        Some(schema) => println!(
            "{}: {} events ({schema} schema), {total_hits} hits, {total_particles} particles",
            input.display(),
            events.len()
        ),
        None => println!("{}: empty store", input.display()),
    }
    Ok(())
}
