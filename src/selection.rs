//! Mechanism to select the physics objects of reconstructed events

use crate::{
    event::{Event, Species},
    numeric::Float,
};
use prefix_num_ops::real::*;

/// Bits of the jet b-tagging mask which flag a b-jet
///
/// Each bit is one working point of the upstream tagging algorithm, any of
/// the three lowest ones is enough.
///
pub const BTAG_MASK: u32 = 0b111;

/// Kinematic and quality cuts on individual physics objects
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectCuts {
    /// Minimal jet transverse momentum (GeV)
    pub jet_pt_min: Float,

    /// Maximal absolute pseudorapidity of any selected object
    pub eta_max: Float,

    /// Minimal (η, φ) distance between an electron and a muon
    pub overlap_dr_min: Float,
}
//
impl Default for ObjectCuts {
    fn default() -> Self {
        Self {
            jet_pt_min: 30.,
            eta_max: 6.0,
            overlap_dr_min: 0.3,
        }
    }
}

/// Jets which passed the selection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JetSelection {
    /// Indices of the selected jets
    pub passed: Vec<usize>,

    /// Indices of the selected jets which are b-tagged
    pub b_tagged: Vec<usize>,
}

/// Select the jets of an event
pub fn select_jets(event: &Event, cuts: &ObjectCuts) -> JetSelection {
    let mut selection = JetSelection::default();
    for (index, jet) in event.jets.iter().enumerate() {
        if jet.pt < cuts.jet_pt_min || abs(jet.eta) > cuts.eta_max {
            continue;
        }
        selection.passed.push(index);
        if jet.btag & BTAG_MASK != 0 {
            selection.b_tagged.push(index);
        }
    }
    selection
}

/// Select the leptons of one species
///
/// When `veto` designates a lepton of the partner species, candidates which
/// overlap with it or carry the same charge are rejected, since they cannot
/// come from the same neutral decay. Without a veto, only the kinematic cuts
/// apply.
///
pub fn select_leptons(
    event: &Event,
    species: Species,
    pt_min: Float,
    cuts: &ObjectCuts,
    veto: Option<usize>,
) -> Vec<usize> {
    let veto = veto.map(|index| &event.leptons(species.partner())[index]);
    event
        .leptons(species)
        .iter()
        .enumerate()
        .filter(|(_, lepton)| lepton.pt >= pt_min && abs(lepton.eta) <= cuts.eta_max)
        .filter(|(_, lepton)| match veto {
            None => true,
            Some(other) => {
                // NOTE: The azimuths are compared without wrapping here, unlike
                //       in the rest of the analysis.
                let dr = sqrt((lepton.eta - other.eta).powi(2) + (lepton.phi - other.phi).powi(2));
                dr >= cuts.overlap_dr_min && lepton.charge != other.charge
            }
        })
        .map(|(index, _)| index)
        .collect()
}
