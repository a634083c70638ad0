//! Kinematic reconstruction of the tau and prompt lepton, and computation of
//! the collinear mass
//!
//! In the collinear approximation, the neutrinos from the tau decay are
//! assumed to fly along the visible tau decay product, so that the missing
//! transverse momentum can be split between them and the rest of the event.

use crate::{
    cutflow::{Hypothesis, SelectedPair},
    event::{Event, MissingEt, Species},
    momentum::FourMomentum,
    numeric::{functions::delta_phi, Float},
};
use prefix_num_ops::real::*;

/// How the tau and lepton proxies were chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconstruction {
    /// From the lepton pair selected by the cutflow
    Clean,

    /// From the leading electron and muon, the one closest to MET being
    /// taken as the tau decay product
    ClosestToMet,
}

/// 4-momenta of the visible tau decay product and of the prompt lepton
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TauPair {
    /// Visible tau decay product
    pub tau: FourMomentum,

    /// Prompt lepton
    pub lepton: FourMomentum,

    /// Reconstruction path which was followed
    pub path: Reconstruction,
}
//
impl TauPair {
    /// Reconstruct the pair of an event under some hypothesis
    ///
    /// If the cutflow selected a lepton pair, the secondary lepton is the tau
    /// proxy and the primary one is the prompt lepton. Otherwise, the leading
    /// muon and electron are used, whichever is closest to the missing
    /// momentum in (η, φ) space being the tau proxy.
    ///
    pub fn reconstruct(
        event: &Event,
        hypothesis: Hypothesis,
        selected: Option<&SelectedPair>,
    ) -> Self {
        match selected {
            Some(pair) => Self {
                tau: event.lepton_momentum(hypothesis.secondary(), pair.secondary),
                lepton: event.lepton_momentum(hypothesis.primary(), pair.primary),
                path: Reconstruction::Clean,
            },
            None => Self::closest_to_met(event),
        }
    }

    /// Fallback reconstruction from the leading leptons
    //
    // NOTE: When both collections are empty, both proxies sit at rest at the
    //       same (η, φ) and the tie goes to the electron as tau proxy. This
    //       is an artifact of the comparison, not a physics choice.
    //
    fn closest_to_met(event: &Event) -> Self {
        let p_muon = event.leading_momentum(Species::Muon);
        let p_electron = event.leading_momentum(Species::Electron);
        let p_met = event.met().momentum();
        let (tau, lepton) = if p_muon.delta_r(&p_met) < p_electron.delta_r(&p_met) {
            (p_muon, p_electron)
        } else {
            (p_electron, p_muon)
        };
        Self {
            tau,
            lepton,
            path: Reconstruction::ClosestToMet,
        }
    }

    /// Visible fraction of the tau transverse momentum
    ///
    /// The neutrino transverse momentum is estimated as the projection of the
    /// missing momentum on the tau proxy direction, which may be negative.
    /// Nothing guards against a vanishing or negative denominator.
    ///
    pub fn visible_fraction(&self, met: &MissingEt) -> Float {
        let pt_nu = met.met * cos(delta_phi(met.phi, self.tau.phi()));
        let pt_tau = self.tau.pt();
        pt_tau / (pt_tau + pt_nu)
    }

    /// Collinear mass of the pair
    ///
    /// May be infinite or NaN when the visible fraction is not positive.
    ///
    pub fn collinear_mass(&self, met: &MissingEt) -> Float {
        (self.tau + self.lepton).mass() / sqrt(self.visible_fraction(met))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cutflow::{tests::*, Classifier, CutflowCuts},
        event::{ELECTRON_MASS, MUON_MASS},
        selection::ObjectCuts,
    };

    const EPS: Float = 1e-4;

    fn selected_pair(hypothesis: Hypothesis, event: &Event) -> Option<SelectedPair> {
        let object_cuts = ObjectCuts::default();
        let cutflow_cuts = CutflowCuts::default();
        Classifier::new(hypothesis, &object_cuts, &cutflow_cuts)
            .classify(event)
            .selected()
            .copied()
    }

    #[test]
    fn clean_path_uses_the_selected_pair() {
        let mut event = mutau_e_event();
        event.muons[0].phi = 3.0;
        let pair = selected_pair(Hypothesis::MuTauE, &event);
        assert!(pair.is_some());
        let tau_pair = TauPair::reconstruct(&event, Hypothesis::MuTauE, pair.as_ref());
        assert_eq!(tau_pair.path, Reconstruction::Clean);
        assert!((tau_pair.tau.pt() - 20.).abs() < EPS);
        assert!((tau_pair.tau.mass() - ELECTRON_MASS).abs() < EPS);
        assert!((tau_pair.lepton.pt() - 80.).abs() < EPS);
        assert!((tau_pair.lepton.mass() - MUON_MASS).abs() < EPS);

        // Electron and MET are nearly aligned, so almost all MET goes to the
        // neutrinos: x = 20 / (20 + 40 cos(0.03))
        let met = event.met();
        let x_vis = 20. / (20. + 40. * cos(0.03 as Float));
        assert!((tau_pair.visible_fraction(&met) - x_vis).abs() < EPS);
        let m_vis = (tau_pair.tau + tau_pair.lepton).mass();
        assert!((tau_pair.collinear_mass(&met) - m_vis / sqrt(x_vis)).abs() < EPS);
    }

    #[test]
    fn fallback_picks_the_lepton_closest_to_met() {
        // The muon is nearly aligned with MET, the electron is far away
        let mut event = mutau_e_event();
        event.electrons[0].phi = -2.0;
        let pair = TauPair::reconstruct(&event, Hypothesis::MuTauE, None);
        assert_eq!(pair.path, Reconstruction::ClosestToMet);
        assert!((pair.tau.pt() - 80.).abs() < EPS);
        assert!((pair.tau.mass() - MUON_MASS).abs() < EPS);
        assert!((pair.lepton.pt() - 20.).abs() < EPS);
    }

    #[test]
    fn fallback_without_leptons_ties_towards_the_electron() {
        // Scenario 4: both proxies are at rest, at the same distance from MET
        let event = Event {
            missing_et: vec![MissingEt { met: 25., phi: 1.0 }],
            ..Event::default()
        };
        let pair = TauPair::reconstruct(&event, Hypothesis::ETauMu, None);
        let p_met = event.met().momentum();
        assert_eq!(pair.tau.delta_r(&p_met), pair.lepton.delta_r(&p_met));
        assert!((pair.tau.mass() - ELECTRON_MASS).abs() < 1e-9);
        assert!((pair.lepton.mass() - MUON_MASS).abs() < 1e-9);

        // Zero visible momentum and positive neutrino estimate: x = 0
        assert_eq!(pair.visible_fraction(&event.met()), 0.);
        assert!(pair.collinear_mass(&event.met()).is_infinite());
    }

    #[test]
    fn collinear_mass_depends_on_which_lepton_is_the_tau() {
        let event = mutau_e_event();
        let met = event.met();
        let pair = TauPair {
            tau: event.lepton_momentum(Species::Electron, 0),
            lepton: event.lepton_momentum(Species::Muon, 0),
            path: Reconstruction::Clean,
        };
        let swapped = TauPair {
            tau: pair.lepton,
            lepton: pair.tau,
            path: Reconstruction::Clean,
        };

        // The visible mass is symmetric...
        let m_vis = (pair.tau + pair.lepton).mass();
        let m_vis_swapped = (swapped.tau + swapped.lepton).mass();
        assert!((m_vis - m_vis_swapped).abs() < EPS);

        // ...but the visible fraction is not
        let x = pair.visible_fraction(&met);
        let x_swapped = swapped.visible_fraction(&met);
        assert!((x - x_swapped).abs() > 0.1);
        assert!((pair.collinear_mass(&met) - swapped.collinear_mass(&met)).abs() > 1.);
    }

    #[test]
    fn opposite_met_gives_nan_mass() {
        // Neutrino estimate larger than, and opposite to, the tau proxy
        let mut event = mutau_e_event();
        event.muons[0].phi = 3.0;
        event.missing_et[0].met = 100.;
        event.missing_et[0].phi = 0.05 + 3.1;
        let pair = TauPair {
            tau: event.lepton_momentum(Species::Electron, 0),
            lepton: event.lepton_momentum(Species::Muon, 0),
            path: Reconstruction::Clean,
        };
        assert!(pair.visible_fraction(&event.met()) < 0.);
        assert!(pair.collinear_mass(&event.met()).is_nan());
    }
}
