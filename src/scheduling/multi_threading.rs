//! Multi-threaded back-end of the event loop

use crate::{resacc::ResultsAccumulator, scheduling::batches, Result};
use std::{
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};
use tracing::{debug, info};

/// Process events in multi-threaded mode
///
/// Each batch of events is processed by its own task, with its own partial
/// results. No histogram is ever shared between tasks: partial results are
/// only merged once every task is done.
///
pub fn run_analysis_impl<'cfg>(
    num_events: usize,
    process_events: impl Send + Sync + Fn(Range<usize>) -> Result<ResultsAccumulator<'cfg>>,
) -> Result<ResultsAccumulator<'cfg>> {
    let batches = batches(num_events).collect::<Vec<_>>();
    let results = TaskResults::new(batches.len());
    let processed = AtomicUsize::new(0);

    // This function is a synchronization scope: it will only return
    // once all inner tasks have been executed
    rayon::scope(|scope| {
        for (batch_id, batch) in batches.into_iter().enumerate() {
            let results_ref = &results;
            let processed_ref = &processed;
            let process_events_ref = &process_events;
            scope.spawn(move |_| {
                debug!("Processing events {:?}", batch);
                let result = process_events_ref(batch);
                let batch_size = result
                    .as_ref()
                    .map_or(0, ResultsAccumulator::processed_events);
                let done = processed_ref.fetch_add(batch_size, Ordering::Relaxed) + batch_size;
                info!("Processed {} / {} events", done, num_events);
                results_ref.set_task_result(batch_id, result);
            });
        }
    });

    results.merge()
}

/// Storage for the partial results of parallel tasks
struct TaskResults<'cfg> {
    results: Box<[Mutex<Option<Result<ResultsAccumulator<'cfg>>>>]>,
}
//
impl<'cfg> TaskResults<'cfg> {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        assert!(num_tasks > 0, "There should be at least one task");
        Self {
            results: (0..num_tasks)
                .map(|_| Mutex::new(None))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Record the results of the n-th task
    fn set_task_result(&self, task_id: usize, result: Result<ResultsAccumulator<'cfg>>) {
        let mut lock = self.results[task_id]
            .lock()
            .expect("Mutex data should be valid");
        assert!(lock.is_none(), "Tasks should not report results twice");
        *lock = Some(result);
    }

    /// Merge the results of all tasks, in batch order
    fn merge(self) -> Result<ResultsAccumulator<'cfg>> {
        let mut results_iter = self.results.into_vec().into_iter().map(|entry| {
            entry
                .into_inner()
                .expect("Mutex data should be valid")
                .expect("Result should be ready")
        });

        let mut merged = results_iter
            .next()
            .expect("There should be at least one task")?;
        for result in results_iter {
            merged.merge(result?)?;
        }
        Ok(merged)
    }
}
