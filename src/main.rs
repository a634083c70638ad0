//! LFV cutflow: a collinear mass analysis of tau lepton-flavour violation
//!
//!
//! # Introduction (for the physicist)
//!
//! This program looks for lepton-flavour-violating decays into a prompt
//! lepton and a tau, where the tau itself decays leptonically. Two final
//! state hypotheses are studied: a prompt muon with a tau decaying into an
//! electron (μ+τ_e), and a prompt electron with a tau decaying into a muon
//! (e+τ_μ).
//!
//! Reconstructed events from a fast detector simulation go through a
//! sequence of selection cuts (the "cutflow"), in bins of jet multiplicity.
//! For every event, the invariant mass of the lepton pair is corrected for
//! the neutrinos of the tau decay using the collinear approximation, and
//! filled into one histogram per cutflow gate which the event passed.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The program is organized as a pipeline:
//!
//! * read in the cut configuration and index the input event files
//! * loop over events, in batches, possibly in parallel
//!     * select jets and leptons,
//!     * classify the event under each hypothesis,
//!     * reconstruct the tau decay product and the prompt lepton,
//!     * compute the collinear mass and fill the histograms
//! * then merge the batch results, display the cutflow tables, and store the
//!   histograms.
//!
//! Each stage only depends on the output of the previous one, and the only
//! state that is accumulated across events is the set of histograms.

#![warn(missing_docs)]

mod cli;
mod config;
mod cutflow;
mod event;
mod histogram;
mod kinematics;
mod momentum;
mod numeric;
mod output;
mod reader;
mod resacc;
mod rescont;
mod resfin;
mod scheduling;
mod selection;

use crate::{
    cli::Args,
    config::Configuration,
    reader::{EventFiles, EventSource},
    resacc::ResultsAccumulator,
    rescont::EventAnalysis,
    resfin::FinalResults,
};
use clap::Parser;
use eyre::WrapErr;
use std::{ops::Range, time::Instant};
use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

/// We'll use eyre's type-erased result type throughout the application
type Result<T> = eyre::Result<T>;

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    // Logs go to stderr, stdout is reserved for the cutflow tables
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // ### CONFIGURATION READOUT ###

    let args = Args::parse();
    let cfg = args
        .configuration()
        .wrap_err("Failed to load the configuration")?;
    cfg.print();

    // ### INPUT INDEXING ###

    // NOTE: A pattern which matches no file is not an error, the analysis
    //       then runs over zero events and produces empty histograms.
    let paths = reader::expand_glob(&args.input);
    let files = EventFiles::open(paths).wrap_err("Failed to index the input files")?;
    info!(
        "Found {} events in {} files",
        files.event_count(),
        files.paths().len()
    );

    // ### ANALYSIS EXECUTION ###

    // Start the clock after input indexing, which is dominated by I/O
    let saved_time = Instant::now();
    let results = analyze(&cfg, &files)?;
    let elapsed_time = saved_time.elapsed();

    // ### RESULTS DISPLAY AND STORAGE ###

    output::dump_results(
        &results,
        elapsed_time,
        &args.output,
        args.summary.as_deref(),
    )
    .wrap_err("Failed to output the results")?;

    Ok(())
}

/// Run the analysis over every event of a set of input files
fn analyze<'cfg>(cfg: &'cfg Configuration, files: &EventFiles) -> Result<FinalResults<'cfg>> {
    let analysis = EventAnalysis::new(cfg);

    // This kernel processes a range of events with its own file reader, and
    // returns the accumulated intermediary results
    let process_events = |range: Range<usize>| -> Result<ResultsAccumulator<'cfg>> {
        let mut reader = files.reader();
        let mut accumulator = ResultsAccumulator::new(cfg);
        for entry in range {
            let event = reader.load(entry)?;
            trace!("{event}");
            accumulator.integrate(analysis.analyze(event));
        }
        Ok(accumulator)
    };

    scheduling::run_analysis(files.event_count(), process_events)
}
