//! This module takes care of scheduling the event loop, encapsulating use of
//! multiple threads and anything else that will come in the future

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{resacc::ResultsAccumulator, resfin::FinalResults, Result};
use std::ops::Range;

/// Size of the event batches
///
/// Events are processed in batches of a certain size, both to report progress
/// at a regular pace and to give each parallel task a reasonable amount of
/// work. Histogram counts are integers, so the final results do not depend on
/// the order in which batches are merged.
///
const EVENT_BATCH_SIZE: usize = 10_000;

/// Split a number of events into consecutive batches
///
/// There is always at least one (possibly empty) batch, so that even an
/// empty input produces a results accumulator.
///
fn batches(num_events: usize) -> impl Iterator<Item = Range<usize>> {
    let num_batches = num_events / EVENT_BATCH_SIZE
        + if num_events % EVENT_BATCH_SIZE == 0 {
            0
        } else {
            1
        };
    let num_batches = num_batches.max(1);
    (0..num_batches).map(move |batch| {
        let start = batch * EVENT_BATCH_SIZE;
        start..(start + EVENT_BATCH_SIZE).min(num_events)
    })
}

/// Run the event loop in the manner that was configured at build time.
///
/// Takes as parameters the total number of events to be processed, and an
/// analysis kernel that processes a range of events and returns the
/// accumulated results.
///
/// Returns the finalized analysis results
///
pub fn run_analysis<'cfg>(
    num_events: usize,
    process_events: impl Send + Sync + Fn(Range<usize>) -> Result<ResultsAccumulator<'cfg>>,
) -> Result<FinalResults<'cfg>> {
    // Integrate the results...
    let accumulator = {
        // ...in sequential mode
        #[cfg(not(feature = "multi-threading"))]
        {
            sequential::run_analysis_impl(num_events, process_events)?
        }

        // ...in multi-threaded mode
        #[cfg(feature = "multi-threading")]
        {
            multi_threading::run_analysis_impl(num_events, process_events)?
        }
    };

    // Finalize the results
    Ok(accumulator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Configuration, cutflow::tests::*, event::Event, reader::EventSource,
        rescont::EventAnalysis,
    };

    #[test]
    fn batches_cover_all_events() {
        assert_eq!(batches(0).collect::<Vec<_>>(), vec![0..0]);
        assert_eq!(batches(5).collect::<Vec<_>>(), vec![0..5]);
        assert_eq!(
            batches(2 * EVENT_BATCH_SIZE + 1).collect::<Vec<_>>(),
            vec![
                0..EVENT_BATCH_SIZE,
                EVENT_BATCH_SIZE..2 * EVENT_BATCH_SIZE,
                2 * EVENT_BATCH_SIZE..2 * EVENT_BATCH_SIZE + 1
            ]
        );
    }

    #[test]
    fn every_event_is_processed_once() {
        let cfg = Configuration::default();
        let analysis = EventAnalysis::new(&cfg);
        let mut selected = mutau_e_event();
        selected.muons[0].phi = 3.0;
        let events = (0..EVENT_BATCH_SIZE + 10)
            .map(|i| if i % 2 == 0 { selected.clone() } else { Event::default() })
            .collect::<Vec<_>>();

        let results = run_analysis(events.len(), |range| {
            let mut source = events.clone();
            let mut accumulator = ResultsAccumulator::new(&cfg);
            for entry in range {
                let event = source[..].load(entry)?;
                accumulator.integrate(analysis.analyze(event));
            }
            Ok(accumulator)
        })
        .expect("In-memory events should be readable");

        assert_eq!(results.processed_events, events.len());
        let mutau_e = &results.hypotheses[0];
        assert_eq!(mutau_e.paths.clean as usize, events.len() / 2);
        assert_eq!(
            mutau_e.book.jet_bin(0)[7].entries as usize,
            events.len() / 2
        );
    }

    #[test]
    fn no_events_give_empty_results() {
        let cfg = Configuration::default();
        let results = run_analysis(0, |range| {
            assert!(range.is_empty());
            Ok(ResultsAccumulator::new(&cfg))
        })
        .expect("Nothing can fail");
        assert_eq!(results.processed_events, 0);
        assert!(results.histograms().all(|hist| hist.entries == 0));
    }

    #[test]
    fn kernel_errors_are_propagated() {
        let cfg = Configuration::default();
        let outcome = run_analysis(3 * EVENT_BATCH_SIZE, |range| {
            eyre::ensure!(range.start == 0, "Broken batch");
            Ok(ResultsAccumulator::new(&cfg))
        });
        assert!(outcome.is_err());
    }
}
