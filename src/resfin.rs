//! This module contains the final results of the analysis, and what is needed
//! to display them as cutflow tables

use crate::{
    config::Configuration,
    histogram::{Histogram, HistogramBook},
    resacc::PathCounts,
};
use std::fmt::{self, Display, Formatter};

/// Final results of one hypothesis
#[derive(Clone, Debug, PartialEq)]
pub struct HypothesisSummary {
    /// Collinear mass histograms
    pub book: HistogramBook,

    /// Reconstruction path statistics
    pub paths: PathCounts,
}
//
impl HypothesisSummary {
    /// Number of events which passed each gate, in booking order
    pub fn cutflow(&self) -> impl Iterator<Item = &Histogram> {
        self.book.histograms()
    }
}

/// Final results of the analysis
pub struct FinalResults<'cfg> {
    /// Number of processed events
    pub processed_events: usize,

    /// Results of each enabled hypothesis, in output order
    pub hypotheses: Vec<HypothesisSummary>,

    /// Configuration of the analysis, reported in the table header
    pub cfg: &'cfg Configuration,
}
//
impl FinalResults<'_> {
    /// All histograms, hypothesis by hypothesis, in booking order
    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        self.hypotheses.iter().flat_map(|summary| summary.book.histograms())
    }

    /// Display the cutflow tables on stdout
    pub fn print(&self) {
        print!("{self}");
    }
}
//
impl Display for FinalResults<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed events: {}", self.processed_events)?;
        let binning = &self.cfg.binning;
        writeln!(
            f,
            "Mass binning: {} bins from {} to {} GeV, {} jet bins",
            binning.bins,
            binning.low,
            binning.high,
            self.cfg.cutflow_cuts.num_jet_bins()
        )?;
        for summary in &self.hypotheses {
            let book = &summary.book;
            writeln!(f)?;
            writeln!(f, "=== {} cutflow ===", book.hypothesis().prefix())?;
            for hist in book.inclusive() {
                writeln!(f, "{:<24}{:<40}{:>12}", hist.name, hist.title, hist.entries)?;
            }
            for jets in 0..book.num_jet_bins() {
                writeln!(f, "--- {jets} jet bin ---")?;
                for hist in book.jet_bin(jets) {
                    writeln!(f, "{:<24}{:<40}{:>12}", hist.name, hist.title, hist.entries)?;
                }
            }
            writeln!(
                f,
                "Tau pairs from selected leptons: {}, from leading leptons: {}",
                summary.paths.clean, summary.paths.closest_to_met
            )?;
        }
        Ok(())
    }
}
