//! Command-line interface

use crate::{config::Configuration, cutflow::Hypothesis, histogram::Binning, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Cutflow analysis of lepton-flavour-violating tau decay candidates
#[derive(Debug, Parser)]
#[command(name = "lfv-cutflow", version, about)]
pub struct Args {
    /// Glob pattern of the event record files (e.g. "~/data/run_*/*.jsonl")
    pub input: String,

    /// Path of the output histogram container
    pub output: PathBuf,

    /// Cut card overriding the default thresholds and binning
    #[arg(long)]
    pub card: Option<PathBuf>,

    /// Histogram binning, overriding the cut card
    #[arg(long, value_enum)]
    pub binning: Option<BinningChoice>,

    /// Hypotheses to classify events under
    #[arg(long, value_enum, default_value_t = HypothesisChoice::Both)]
    pub hypothesis: HypothesisChoice,

    /// Also write a text cutflow summary to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,
}
//
impl Args {
    /// Assemble the analysis configuration
    pub fn configuration(&self) -> Result<Configuration> {
        let mut cfg = match &self.card {
            Some(card) => Configuration::load(card)?,
            None => Configuration::default(),
        };
        if let Some(binning) = self.binning {
            cfg.binning = binning.binning();
        }
        cfg.hypotheses = self.hypothesis.hypotheses();
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Histogram binning presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BinningChoice {
    /// 200 bins from 0 to 2000 GeV
    Fine,

    /// 20 bins from 0 to 200 GeV
    Coarse,
}
//
impl BinningChoice {
    fn binning(self) -> Binning {
        match self {
            BinningChoice::Fine => Binning::FINE,
            BinningChoice::Coarse => Binning::COARSE,
        }
    }
}

/// Hypothesis selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HypothesisChoice {
    /// mu+tau_e, then e+tau_mu
    Both,

    /// mu+tau_e only
    MutauE,

    /// e+tau_mu only
    EtauMu,
}
//
impl HypothesisChoice {
    fn hypotheses(self) -> Vec<Hypothesis> {
        match self {
            HypothesisChoice::Both => Hypothesis::ALL.to_vec(),
            HypothesisChoice::MutauE => vec![Hypothesis::MuTauE],
            HypothesisChoice::EtauMu => vec![Hypothesis::ETauMu],
        }
    }
}
