//! This module allows accumulating analysis results across events

use crate::{
    config::Configuration,
    histogram::HistogramBook,
    kinematics::Reconstruction,
    rescont::ResultContribution,
    resfin::{FinalResults, HypothesisSummary},
    Result,
};
use eyre::ensure;

/// Number of events which went through each reconstruction path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathCounts {
    /// Tau pair from the cutflow-selected leptons
    pub clean: u64,

    /// Tau pair from the leading leptons
    pub closest_to_met: u64,
}
//
impl PathCounts {
    /// Record one event
    fn count(&mut self, path: Reconstruction) {
        match path {
            Reconstruction::Clean => self.clean += 1,
            Reconstruction::ClosestToMet => self.closest_to_met += 1,
        }
    }

    /// Add the counts of another batch of events
    fn merge(&mut self, other: Self) {
        self.clean += other.clean;
        self.closest_to_met += other.closest_to_met;
    }
}

/// This struct accumulates intermediary results during the event loop, and
/// ultimately produces the final results (see FinalResults).
pub struct ResultsAccumulator<'cfg> {
    /// Number of processed events
    processed_events: usize,

    /// Collinear mass histograms of each enabled hypothesis
    books: Vec<HistogramBook>,

    /// Reconstruction path statistics of each enabled hypothesis
    paths: Vec<PathCounts>,

    /// Configuration of the analysis
    cfg: &'cfg Configuration,
}
//
impl<'cfg> ResultsAccumulator<'cfg> {
    /// Prepare for results accumulation
    pub fn new(cfg: &'cfg Configuration) -> Self {
        let num_jet_bins = cfg.cutflow_cuts.num_jet_bins();
        Self {
            processed_events: 0,
            books: cfg
                .hypotheses
                .iter()
                .map(|&hypothesis| HistogramBook::new(hypothesis, num_jet_bins, cfg.binning))
                .collect(),
            paths: vec![PathCounts::default(); cfg.hypotheses.len()],
            cfg,
        }
    }

    /// Integrate the contribution of one event
    #[allow(clippy::needless_pass_by_value)]
    pub fn integrate(&mut self, contribution: ResultContribution) {
        debug_assert_eq!(contribution.len(), self.books.len());
        self.processed_events += 1;
        for ((book, paths), result) in self
            .books
            .iter_mut()
            .zip(&mut self.paths)
            .zip(&contribution)
        {
            book.fill(&result.classification, result.collinear_mass);
            paths.count(result.path);
        }
    }

    /// Integrate results from another ResultsAccumulator
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) -> Result<()> {
        ensure!(
            self.books.len() == other.books.len(),
            "Cannot merge results about different hypotheses"
        );
        self.processed_events += other.processed_events;
        for (book, other_book) in self.books.iter_mut().zip(&other.books) {
            book.merge(other_book)?;
        }
        for (paths, other_paths) in self.paths.iter_mut().zip(other.paths) {
            paths.merge(other_paths);
        }
        Ok(())
    }

    /// Number of events integrated so far
    pub fn processed_events(&self) -> usize {
        self.processed_events
    }

    /// Turn accumulated data into final results
    pub fn finalize(self) -> FinalResults<'cfg> {
        FinalResults {
            processed_events: self.processed_events,
            hypotheses: self
                .books
                .into_iter()
                .zip(self.paths)
                .map(|(book, paths)| HypothesisSummary { book, paths })
                .collect(),
            cfg: self.cfg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cutflow::tests::*, cutflow::Hypothesis, rescont::EventAnalysis};

    fn accumulate<'cfg>(
        cfg: &'cfg Configuration,
        events: &[crate::event::Event],
    ) -> ResultsAccumulator<'cfg> {
        let analysis = EventAnalysis::new(cfg);
        let mut accumulator = ResultsAccumulator::new(cfg);
        for event in events {
            accumulator.integrate(analysis.analyze(event));
        }
        accumulator
    }

    #[test]
    fn empty_accumulator_has_empty_books() {
        let cfg = Configuration::default();
        let results = ResultsAccumulator::new(&cfg).finalize();
        assert_eq!(results.processed_events, 0);
        assert_eq!(results.hypotheses.len(), 2);
        for summary in &results.hypotheses {
            assert!(summary.book.histograms().all(|hist| hist.entries == 0));
            assert_eq!(summary.paths, PathCounts::default());
        }
    }

    #[test]
    fn merging_is_the_same_as_integrating_everything() {
        let cfg = Configuration::default();
        let mut selected = mutau_e_event();
        selected.muons[0].phi = 3.0;
        let events = vec![
            mutau_e_event(),
            selected,
            etau_mu_event(),
            crate::event::Event::default(),
        ];

        let whole = accumulate(&cfg, &events).finalize();
        let mut first = accumulate(&cfg, &events[..1]);
        first
            .merge(accumulate(&cfg, &events[1..]))
            .expect("Same layout");
        assert_eq!(first.processed_events(), 4);
        let merged = first.finalize();

        assert_eq!(merged.processed_events, whole.processed_events);
        for (a, b) in merged.hypotheses.iter().zip(&whole.hypotheses) {
            assert_eq!(a.book, b.book);
            assert_eq!(a.paths, b.paths);
        }

        let mutau_e = &whole.hypotheses[0];
        assert_eq!(mutau_e.book.hypothesis(), Hypothesis::MuTauE);
        assert_eq!(
            mutau_e.paths,
            PathCounts {
                clean: 1,
                closest_to_met: 3
            }
        );
        assert_eq!(mutau_e.book.inclusive()[0].entries, 4);
    }

    #[test]
    fn mismatched_accumulators_do_not_merge() {
        let both = Configuration::default();
        let one = Configuration {
            hypotheses: vec![Hypothesis::MuTauE],
            ..Configuration::default()
        };
        let mut accumulator = ResultsAccumulator::new(&both);
        assert!(accumulator.merge(ResultsAccumulator::new(&one)).is_err());
    }
}
