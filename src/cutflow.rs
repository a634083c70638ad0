//! Cutflow classification of events under the two lepton-flavour hypotheses
//!
//! For each hypothesis, an event first goes through three inclusive gates
//! (no cut, b-jet veto, jet multiplicity window). Then, for each jet bin, an
//! ordered chain of stages is evaluated with early exit. The first stage
//! which fails is recorded, so a later stage can never pass when an earlier
//! one failed.

use crate::{
    event::{Event, Species},
    numeric::{functions::delta_phi, Float},
    selection::{select_jets, select_leptons, JetSelection, ObjectCuts},
};

/// Number of inclusive (jet-bin-independent) gates
pub const NUM_INCLUSIVE_GATES: usize = 3;

/// Number of gates per jet bin: the stage chain, then the two mass regions
pub const NUM_BIN_GATES: usize = NUM_STAGES + 2;

/// Number of stages in the per-jet-bin chain
pub const NUM_STAGES: usize = 8;

/// Gate index of the high mass region tag
pub const HIGH_MASS: usize = NUM_STAGES;

/// Gate index of the low mass region tag
pub const LOW_MASS: usize = NUM_STAGES + 1;

/// Thresholds of the event-level cutflow
#[derive(Clone, Debug, PartialEq)]
pub struct CutflowCuts {
    /// Highest jet multiplicity which gets its own bin
    pub max_jets: usize,

    /// Minimal transverse momentum of a primary muon candidate (GeV)
    pub muon_primary_pt_min: Float,

    /// Minimal transverse momentum of a primary electron candidate (GeV)
    pub electron_primary_pt_min: Float,

    /// Minimal transverse momentum of a secondary lepton candidate (GeV)
    pub secondary_pt_min: Float,

    /// Transverse momentum that the primary lepton must exceed (GeV)
    pub primary_final_pt_min: Float,

    /// Maximal azimuthal separation between secondary lepton and MET
    pub secondary_met_dphi_max: Float,

    /// Minimal azimuthal separation between the two leptons
    pub back_to_back_dphi_min: Float,

    /// High mass region: primary transverse momentum to exceed (GeV)
    pub high_mass_primary_pt_min: Float,

    /// High mass region: maximal secondary lepton / MET separation
    pub high_mass_met_dphi_max: Float,

    /// Low mass region: primary transverse momentum to exceed (GeV)
    pub low_mass_primary_pt_min: Float,

    /// Low mass region: maximal secondary lepton / MET separation
    pub low_mass_met_dphi_max: Float,
}
//
impl CutflowCuts {
    /// Tight transverse momentum cut applied to primary leptons of a species
    pub fn primary_pt_min(&self, species: Species) -> Float {
        match species {
            Species::Electron => self.electron_primary_pt_min,
            Species::Muon => self.muon_primary_pt_min,
        }
    }

    /// Number of jet multiplicity bins
    pub fn num_jet_bins(&self) -> usize {
        self.max_jets + 1
    }
}
//
impl Default for CutflowCuts {
    fn default() -> Self {
        Self {
            max_jets: 2,
            muon_primary_pt_min: 53.,
            electron_primary_pt_min: 26.,
            secondary_pt_min: 10.,
            primary_final_pt_min: 60.,
            secondary_met_dphi_max: 0.7,
            back_to_back_dphi_min: 2.2,
            high_mass_primary_pt_min: 150.,
            high_mass_met_dphi_max: 0.3,
            low_mass_primary_pt_min: 60.,
            low_mass_met_dphi_max: 0.7,
        }
    }
}

/// Lepton-flavour hypotheses
///
/// Both are the same selection with the roles of electrons and muons swapped:
/// the primary lepton is prompt, the secondary one comes from the tau decay.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hypothesis {
    /// Prompt muon, tau decaying into an electron
    MuTauE,

    /// Prompt electron, tau decaying into a muon
    ETauMu,
}
//
impl Hypothesis {
    /// All hypotheses, in output order
    pub const ALL: [Hypothesis; 2] = [Hypothesis::MuTauE, Hypothesis::ETauMu];

    /// Species of the prompt lepton
    pub fn primary(self) -> Species {
        match self {
            Hypothesis::MuTauE => Species::Muon,
            Hypothesis::ETauMu => Species::Electron,
        }
    }

    /// Species of the lepton from the tau decay
    pub fn secondary(self) -> Species {
        self.primary().partner()
    }

    /// Prefix of histogram names
    pub fn prefix(self) -> &'static str {
        match self {
            Hypothesis::MuTauE => "mutau_e",
            Hypothesis::ETauMu => "etau_mu",
        }
    }
}

/// Stages of the per-jet-bin chain, in evaluation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Exactly the bin's number of selected jets
    JetMultiplicity,

    /// At least one primary lepton candidate
    AnyPrimary,

    /// Exactly one primary lepton candidate
    OnePrimary,

    /// At least one secondary lepton candidate
    AnySecondary,

    /// Exactly one secondary lepton candidate
    OneSecondary,

    /// Hard enough primary lepton
    PrimaryPt,

    /// Secondary lepton aligned with the missing momentum
    SecondaryMetAlignment,

    /// Leptons back to back in the transverse plane
    BackToBack,
}
//
impl Stage {
    /// Position of the stage in the chain (= its gate index)
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Lepton pair which made it through the whole stage chain
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectedPair {
    /// Index of the primary lepton in its collection
    pub primary: usize,

    /// Index of the secondary lepton in its collection
    pub secondary: usize,

    /// Whether the event falls in the high mass region
    pub high_mass: bool,

    /// Whether the event falls in the low mass region
    pub low_mass: bool,
}

/// Outcome of the stage chain for one jet bin
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinOutcome {
    /// Evaluation stopped at this stage, all previous ones passed
    Rejected {
        /// First stage which did not pass
        failed: Stage,
    },

    /// All stages passed
    Selected(SelectedPair),
}
//
impl BinOutcome {
    /// Truth value of each gate of the bin
    pub fn gates(&self) -> [bool; NUM_BIN_GATES] {
        let mut gates = [false; NUM_BIN_GATES];
        match self {
            BinOutcome::Rejected { failed } => {
                gates[..failed.index()].iter_mut().for_each(|g| *g = true);
            }
            BinOutcome::Selected(pair) => {
                gates[..NUM_STAGES].iter_mut().for_each(|g| *g = true);
                gates[HIGH_MASS] = pair.high_mass;
                gates[LOW_MASS] = pair.low_mass;
            }
        }
        gates
    }
}

/// Jet-bin-independent gates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InclusiveGates {
    /// No selected jet is b-tagged
    pub no_bjets: bool,

    /// No b-jet, and no more selected jets than the last jet bin
    pub jet_window: bool,
}
//
impl InclusiveGates {
    /// Truth value of each gate, starting with the "no cuts" baseline
    pub fn gates(&self) -> [bool; NUM_INCLUSIVE_GATES] {
        [true, self.no_bjets, self.jet_window]
    }
}

/// Classification of one event under one hypothesis
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// Hypothesis which the event was classified under
    pub hypothesis: Hypothesis,

    /// Inclusive gates
    pub inclusive: InclusiveGates,

    /// Stage chain outcome of each jet bin
    pub bins: Vec<BinOutcome>,
}
//
impl Classification {
    /// Lepton pair selected in any jet bin, if any
    ///
    /// Jet bins are mutually exclusive, so there is at most one.
    ///
    pub fn selected(&self) -> Option<&SelectedPair> {
        self.bins.iter().find_map(|outcome| match outcome {
            BinOutcome::Selected(pair) => Some(pair),
            BinOutcome::Rejected { .. } => None,
        })
    }
}

/// Event classifier for one hypothesis
pub struct Classifier<'cfg> {
    /// Hypothesis being tested
    hypothesis: Hypothesis,

    /// Object-level cuts
    object_cuts: &'cfg ObjectCuts,

    /// Event-level cuts
    cutflow_cuts: &'cfg CutflowCuts,
}
//
impl<'cfg> Classifier<'cfg> {
    /// Set up a classifier
    pub fn new(
        hypothesis: Hypothesis,
        object_cuts: &'cfg ObjectCuts,
        cutflow_cuts: &'cfg CutflowCuts,
    ) -> Self {
        Self {
            hypothesis,
            object_cuts,
            cutflow_cuts,
        }
    }

    /// Hypothesis being tested
    pub fn hypothesis(&self) -> Hypothesis {
        self.hypothesis
    }

    /// Classify an event
    pub fn classify(&self, event: &Event) -> Classification {
        let cuts = self.cutflow_cuts;
        let jets = select_jets(event, self.object_cuts);
        let no_bjets = jets.b_tagged.is_empty();
        let inclusive = InclusiveGates {
            no_bjets,
            jet_window: no_bjets && jets.passed.len() <= cuts.max_jets,
        };

        let bins = (0..cuts.num_jet_bins())
            .map(|num_jets| {
                if !inclusive.jet_window {
                    return BinOutcome::Rejected {
                        failed: Stage::JetMultiplicity,
                    };
                }
                match self.run_stages(event, &jets, num_jets) {
                    Ok(pair) => BinOutcome::Selected(pair),
                    Err(failed) => BinOutcome::Rejected { failed },
                }
            })
            .collect();

        Classification {
            hypothesis: self.hypothesis,
            inclusive,
            bins,
        }
    }

    /// Run the stage chain of one jet bin, stopping at the first failure
    fn run_stages(
        &self,
        event: &Event,
        jets: &JetSelection,
        num_jets: usize,
    ) -> Result<SelectedPair, Stage> {
        let cuts = self.cutflow_cuts;
        let primary_species = self.hypothesis.primary();
        let secondary_species = self.hypothesis.secondary();

        require(Stage::JetMultiplicity, jets.passed.len() == num_jets)?;

        let primaries = select_leptons(
            event,
            primary_species,
            cuts.primary_pt_min(primary_species),
            self.object_cuts,
            None,
        );
        let primary_index = unique(&primaries, Stage::AnyPrimary, Stage::OnePrimary)?;

        let secondaries = select_leptons(
            event,
            secondary_species,
            cuts.secondary_pt_min,
            self.object_cuts,
            Some(primary_index),
        );
        let secondary_index = unique(&secondaries, Stage::AnySecondary, Stage::OneSecondary)?;

        let primary = &event.leptons(primary_species)[primary_index];
        let secondary = &event.leptons(secondary_species)[secondary_index];
        require(Stage::PrimaryPt, primary.pt > cuts.primary_final_pt_min)?;

        let met_dphi = delta_phi(secondary.phi, event.met().phi);
        require(
            Stage::SecondaryMetAlignment,
            met_dphi < cuts.secondary_met_dphi_max,
        )?;

        let lepton_dphi = delta_phi(secondary.phi, primary.phi);
        require(Stage::BackToBack, lepton_dphi > cuts.back_to_back_dphi_min)?;

        Ok(SelectedPair {
            primary: primary_index,
            secondary: secondary_index,
            high_mass: primary.pt > cuts.high_mass_primary_pt_min
                && met_dphi < cuts.high_mass_met_dphi_max,
            low_mass: primary.pt > cuts.low_mass_primary_pt_min
                && met_dphi < cuts.low_mass_met_dphi_max,
        })
    }
}

/// Let a stage pass if a condition holds
fn require(stage: Stage, condition: bool) -> Result<(), Stage> {
    if condition {
        Ok(())
    } else {
        Err(stage)
    }
}

/// Extract the only candidate of a selection, failing the "any" stage if
/// there is none and the "one" stage if there are several
fn unique(candidates: &[usize], any: Stage, one: Stage) -> Result<usize, Stage> {
    match candidates {
        [] => Err(any),
        [only] => Ok(*only),
        _ => Err(one),
    }
}
