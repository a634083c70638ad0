//! Fixed-binning one-dimensional histograms, and their organization into
//! per-hypothesis books following the cutflow structure

use crate::{
    cutflow::{Classification, Hypothesis, NUM_BIN_GATES, NUM_INCLUSIVE_GATES},
    numeric::Float,
    Result,
};
use eyre::ensure;
use num_traits::ToPrimitive;
use serde::Serialize;

/// Binning of the collinear mass histograms
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Binning {
    /// Number of bins
    pub bins: usize,

    /// Lower edge of the first bin
    pub low: Float,

    /// Upper edge of the last bin
    pub high: Float,
}
//
impl Binning {
    /// 200 bins of 10 GeV from 0 to 2 TeV
    pub const FINE: Binning = Binning {
        bins: 200,
        low: 0.,
        high: 2000.,
    };

    /// 20 bins of 10 GeV from 0 to 200 GeV
    pub const COARSE: Binning = Binning {
        bins: 20,
        low: 0.,
        high: 200.,
    };

    /// Check that this binning makes sense
    pub fn validate(&self) -> Result<()> {
        ensure!(self.bins > 0, "Histograms need at least one bin");
        ensure!(
            self.low.is_finite() && self.high.is_finite() && self.low < self.high,
            "Invalid histogram range [{}, {}]",
            self.low,
            self.high
        );
        Ok(())
    }

    /// Width of a bin
    pub fn bin_width(&self) -> Float {
        (self.high - self.low) / (self.bins as Float)
    }
}

/// Where a value lands in a histogram
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Underflow,
    Bin(usize),
    Overflow,
    NonFinite,
}

/// One-dimensional histogram of unweighted entries
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// Short identifier
    pub name: String,

    /// Human-readable description
    pub title: String,

    /// Binning
    #[serde(flatten)]
    pub binning: Binning,

    /// Contents of the in-range bins
    pub counts: Vec<u64>,

    /// Number of values below the range
    pub underflow: u64,

    /// Number of values at or above the upper edge
    pub overflow: u64,

    /// Number of NaN values
    pub non_finite: u64,

    /// Total number of fills
    pub entries: u64,
}
//
impl Histogram {
    /// Create an empty histogram
    pub fn new(name: impl Into<String>, title: impl Into<String>, binning: Binning) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            binning,
            counts: vec![0; binning.bins],
            underflow: 0,
            overflow: 0,
            non_finite: 0,
            entries: 0,
        }
    }

    /// Find where a value belongs
    fn slot(&self, x: Float) -> Slot {
        let Binning { bins, low, high } = self.binning;
        if x.is_nan() {
            Slot::NonFinite
        } else if x < low {
            Slot::Underflow
        } else if x >= high {
            Slot::Overflow
        } else {
            // Rounding may push values right below the upper edge out
            let bin = ((x - low) / self.binning.bin_width()).floor();
            match bin.to_usize() {
                Some(bin) if bin < bins => Slot::Bin(bin),
                _ => Slot::Overflow,
            }
        }
    }

    /// Record one value
    pub fn fill(&mut self, x: Float) {
        self.entries += 1;
        match self.slot(x) {
            Slot::Underflow => self.underflow += 1,
            Slot::Bin(bin) => self.counts[bin] += 1,
            Slot::Overflow => self.overflow += 1,
            Slot::NonFinite => self.non_finite += 1,
        }
    }

    /// Add the contents of another histogram with the same binning
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        ensure!(
            self.binning == other.binning,
            "Cannot merge histogram {} into {}: binnings differ",
            other.name,
            self.name
        );
        self.counts
            .iter_mut()
            .zip(other.counts.iter())
            .for_each(|(c1, c2)| *c1 += c2);
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.non_finite += other.non_finite;
        self.entries += other.entries;
        Ok(())
    }
}

/// Names of the per-jet-bin histograms, by gate
const BIN_GATE_NAMES: [&str; NUM_BIN_GATES] = [
    "step03", "step04", "step05", "step06", "step07", "step08", "step09", "step10", "highmass",
    "lowmass",
];

/// Ordered set of histograms for one hypothesis
///
/// Holds one histogram per inclusive gate, followed by one histogram per
/// gate of each jet bin.
///
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBook {
    /// Hypothesis which this book is about
    hypothesis: Hypothesis,

    /// Histograms of the inclusive gates
    inclusive: [Histogram; NUM_INCLUSIVE_GATES],

    /// Histograms of each jet bin, then each gate within the bin
    per_jet_bin: Vec<[Histogram; NUM_BIN_GATES]>,
}
//
impl HistogramBook {
    /// Book histograms for a hypothesis
    pub fn new(hypothesis: Hypothesis, num_jet_bins: usize, binning: Binning) -> Self {
        let prefix = hypothesis.prefix();
        let primary = hypothesis.primary();
        let secondary = hypothesis.secondary();
        let max_jets = num_jet_bins.saturating_sub(1);
        let inclusive_titles = [
            format!("{prefix} no cuts"),
            format!("{prefix} no b-jets"),
            format!("{prefix} 0-{max_jets} jet"),
        ];
        let inclusive = std::array::from_fn(|gate| {
            Histogram::new(
                format!("{prefix}_step{gate:02}"),
                inclusive_titles[gate].clone(),
                binning,
            )
        });

        let per_jet_bin = (0..num_jet_bins)
            .map(|jets| {
                let titles = [
                    format!("{prefix} {jets} jet"),
                    format!("{prefix} 1+ {} {jets} jet", primary.name()),
                    format!("{prefix} 1 {} {jets} jet", primary.name()),
                    format!("{prefix} 1+ {} {jets} jet", secondary.name()),
                    format!("{prefix} 1 {} {jets} jet", secondary.name()),
                    format!("{prefix} min pT {jets} jet"),
                    format!("{prefix} max deltaPhi {}, met {jets} jet", secondary.symbol()),
                    format!("{prefix} min deltaPhi e, mu {jets} jet"),
                    format!("{prefix} high mass {jets} jet"),
                    format!("{prefix} low mass {jets} jet"),
                ];
                std::array::from_fn(|gate| {
                    Histogram::new(
                        format!("{prefix}_{}_{jets}j", BIN_GATE_NAMES[gate]),
                        titles[gate].clone(),
                        binning,
                    )
                })
            })
            .collect();

        Self {
            hypothesis,
            inclusive,
            per_jet_bin,
        }
    }

    /// Hypothesis which this book is about
    pub fn hypothesis(&self) -> Hypothesis {
        self.hypothesis
    }

    /// Fill a value into the histogram of every gate that the event passed
    pub fn fill(&mut self, classification: &Classification, value: Float) {
        debug_assert_eq!(classification.hypothesis, self.hypothesis);
        debug_assert_eq!(classification.bins.len(), self.per_jet_bin.len());
        let inclusive_gates = classification.inclusive.gates();
        for (hist, _) in self
            .inclusive
            .iter_mut()
            .zip(inclusive_gates)
            .filter(|(_, passed)| *passed)
        {
            hist.fill(value);
        }
        for (hists, outcome) in self.per_jet_bin.iter_mut().zip(&classification.bins) {
            for (hist, _) in hists
                .iter_mut()
                .zip(outcome.gates())
                .filter(|(_, passed)| *passed)
            {
                hist.fill(value);
            }
        }
    }

    /// Add the contents of another book about the same hypothesis
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        ensure!(
            self.hypothesis == other.hypothesis
                && self.per_jet_bin.len() == other.per_jet_bin.len(),
            "Cannot merge histogram books of different layouts"
        );
        for (h1, h2) in self.histograms_mut().zip(other.histograms()) {
            h1.merge(h2)?;
        }
        Ok(())
    }

    /// Iterate over the histograms, in booking order
    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        self.inclusive
            .iter()
            .chain(self.per_jet_bin.iter().flat_map(|hists| hists.iter()))
    }

    /// Iterate mutably over the histograms, in booking order
    fn histograms_mut(&mut self) -> impl Iterator<Item = &mut Histogram> {
        self.inclusive
            .iter_mut()
            .chain(self.per_jet_bin.iter_mut().flat_map(|hists| hists.iter_mut()))
    }

    /// Histograms of the inclusive gates
    pub fn inclusive(&self) -> &[Histogram; NUM_INCLUSIVE_GATES] {
        &self.inclusive
    }

    /// Histograms of one jet bin
    pub fn jet_bin(&self, jets: usize) -> &[Histogram; NUM_BIN_GATES] {
        &self.per_jet_bin[jets]
    }

    /// Number of jet bins
    pub fn num_jet_bins(&self) -> usize {
        self.per_jet_bin.len()
    }
}
