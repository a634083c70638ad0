//! This module defines the properties and storage of reconstructed events

use crate::{momentum::FourMomentum, numeric::Float};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Electron rest mass (GeV)
pub const ELECTRON_MASS: Float = 0.000511;

/// Muon rest mass (GeV)
pub const MUON_MASS: Float = 0.10566;

/// Reconstructed jet
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Jet {
    /// Transverse momentum (GeV)
    pub pt: Float,

    /// Pseudorapidity
    pub eta: Float,

    /// Azimuthal angle
    pub phi: Float,

    /// Invariant mass (GeV)
    pub mass: Float,

    /// B-tagging bitmask, one bit per working point
    pub btag: u32,

    /// Tau-tagging bitmask
    pub tau_tag: u32,

    /// Electric charge
    pub charge: i32,
}

/// Reconstructed charged lepton (electrons and muons share this layout)
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Lepton {
    /// Transverse momentum (GeV)
    pub pt: Float,

    /// Pseudorapidity
    pub eta: Float,

    /// Azimuthal angle
    pub phi: Float,

    /// Electric charge
    pub charge: i32,
}

/// Missing transverse energy
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MissingEt {
    /// Magnitude (GeV)
    pub met: Float,

    /// Azimuthal angle
    pub phi: Float,
}
//
impl MissingEt {
    /// 4-momentum attributed to the undetected particles
    ///
    /// Lies in the transverse plane and is massless by construction.
    ///
    pub fn momentum(&self) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(self.met, 0., self.phi, 0.)
    }
}

/// Charged lepton flavours considered by the analysis
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Species {
    /// Electrons
    Electron,

    /// Muons
    Muon,
}
//
impl Species {
    /// Rest mass used when building 4-momenta of this species
    pub fn rest_mass(self) -> Float {
        match self {
            Species::Electron => ELECTRON_MASS,
            Species::Muon => MUON_MASS,
        }
    }

    /// The other lepton flavour
    pub fn partner(self) -> Self {
        match self {
            Species::Electron => Species::Muon,
            Species::Muon => Species::Electron,
        }
    }

    /// Name of the species, used in histogram titles
    pub fn name(self) -> &'static str {
        match self {
            Species::Electron => "electron",
            Species::Muon => "muon",
        }
    }

    /// One-letter symbol of the species
    pub fn symbol(self) -> &'static str {
        match self {
            Species::Electron => "e",
            Species::Muon => "mu",
        }
    }
}

/// Storage for one reconstructed event
///
/// Collections are indexed positionally: object `i` of one collection has no
/// relationship with object `i` of another one.
///
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Event {
    /// Event number, as assigned by the generator
    pub number: u64,

    /// Reconstructed jets
    pub jets: Vec<Jet>,

    /// Reconstructed electrons
    pub electrons: Vec<Lepton>,

    /// Reconstructed muons
    pub muons: Vec<Lepton>,

    /// Missing transverse energy (a singleton in practice)
    pub missing_et: Vec<MissingEt>,
}
//
impl Event {
    /// Access the leptons of a given species
    pub fn leptons(&self, species: Species) -> &[Lepton] {
        match species {
            Species::Electron => &self.electrons,
            Species::Muon => &self.muons,
        }
    }

    /// Missing transverse energy of the event
    ///
    /// An event without a missing energy entry is treated as perfectly
    /// balanced.
    ///
    pub fn met(&self) -> MissingEt {
        self.missing_et.first().copied().unwrap_or_default()
    }

    /// 4-momentum of a lepton of a given species
    pub fn lepton_momentum(&self, species: Species, index: usize) -> FourMomentum {
        let lepton = &self.leptons(species)[index];
        FourMomentum::from_pt_eta_phi_m(lepton.pt, lepton.eta, lepton.phi, species.rest_mass())
    }

    /// 4-momentum of the leading object of a lepton collection
    ///
    /// An empty collection yields a particle at rest, which still carries the
    /// rest mass of its species.
    ///
    pub fn leading_momentum(&self, species: Species) -> FourMomentum {
        if self.leptons(species).is_empty() {
            FourMomentum::from_pt_eta_phi_m(0., 0., 0., species.rest_mass())
        } else {
            self.lepton_momentum(species, 0)
        }
    }
}

impl Display for Event {
    /// Dump a short description of the event content
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(fmt, "Event {}", self.number)?;
        for (name, leptons) in [("e", &self.electrons), ("mu", &self.muons)] {
            for lepton in leptons.iter() {
                writeln!(
                    fmt,
                    "  {}\tpt={}\teta={}\tphi={}\tq={}",
                    name, lepton.pt, lepton.eta, lepton.phi, lepton.charge
                )?;
            }
        }
        for jet in self.jets.iter() {
            writeln!(
                fmt,
                "  jet\tpt={}\teta={}\tphi={}\tbtag={:#b}",
                jet.pt, jet.eta, jet.phi, jet.btag
            )?;
        }
        let met = self.met();
        write!(fmt, "  met\tpt={}\tphi={}", met.met, met.phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_are_partners() {
        assert_eq!(Species::Electron.partner(), Species::Muon);
        assert_eq!(Species::Muon.partner(), Species::Electron);
        assert_eq!(Species::Muon.rest_mass(), MUON_MASS);
    }

    #[test]
    fn missing_met_entry_means_balanced_event() {
        let event = Event::default();
        assert_eq!(event.met(), MissingEt::default());
        assert_eq!(event.met().momentum().pt(), 0.);
    }

    #[test]
    fn empty_collections_give_particles_at_rest() {
        let event = Event::default();
        let p = event.leading_momentum(Species::Muon);
        assert_eq!(p.pt(), 0.);
        assert!((p.mass() - MUON_MASS).abs() < 1e-9);
    }

    #[test]
    fn records_deserialize_with_missing_fields() {
        let event: Event = serde_json::from_str(
            r#"{"number": 7, "muons": [{"pt": 80.0, "eta": 0.5, "charge": -1}],
                "missing_et": [{"met": 40.0, "phi": 0.02}]}"#,
        )
        .expect("Valid event record");
        assert_eq!(event.number, 7);
        assert!(event.jets.is_empty() && event.electrons.is_empty());
        assert_eq!(event.muons[0].phi, 0.);
        assert_eq!(event.muons[0].charge, -1);
        assert_eq!(event.met().met, 40.0);
    }
}
