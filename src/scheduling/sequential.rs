//! Sequential back-end of the event loop

use crate::{
    resacc::ResultsAccumulator,
    scheduling::{batches, EVENT_BATCH_SIZE},
    Result,
};
use std::ops::Range;
use tracing::{debug, info};

/// Process events in sequential mode
///
/// Events are still processed in batches, so that progress reporting is the
/// same as in multi-threaded mode.
///
pub fn run_analysis_impl<'cfg>(
    num_events: usize,
    process_events: impl Fn(Range<usize>) -> Result<ResultsAccumulator<'cfg>>,
) -> Result<ResultsAccumulator<'cfg>> {
    let mut batch_iter = batches(num_events);
    let first_batch = batch_iter.next().unwrap_or(0..0);
    let mut accumulator = process_events(first_batch)?;
    report_progress(accumulator.processed_events(), num_events);

    for batch in batch_iter {
        debug!("Processing events {:?}", batch);
        accumulator.merge(process_events(batch)?)?;
        report_progress(accumulator.processed_events(), num_events);
    }

    Ok(accumulator)
}

/// Log how far the event loop went
fn report_progress(processed: usize, num_events: usize) {
    if num_events > EVENT_BATCH_SIZE || processed == num_events {
        info!("Processed {} / {} events", processed, num_events);
    }
}
