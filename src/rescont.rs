//! Per-event analysis, producing what each event contributes to the results

use crate::{
    config::Configuration,
    cutflow::{Classification, Classifier},
    event::Event,
    kinematics::{Reconstruction, TauPair},
    numeric::Float,
};

/// Outcome of the analysis of one event under one hypothesis
#[derive(Clone, Debug, PartialEq)]
pub struct HypothesisResult {
    /// Gates which the event passed
    pub classification: Classification,

    /// How the tau and lepton proxies were chosen
    pub path: Reconstruction,

    /// Collinear mass (GeV), which may be infinite or NaN
    pub collinear_mass: Float,
}

/// Contribution of one event to the results, in hypothesis order
pub type ResultContribution = Vec<HypothesisResult>;

/// Analysis applied to every event
pub struct EventAnalysis<'cfg> {
    /// One classifier per enabled hypothesis
    classifiers: Vec<Classifier<'cfg>>,
}
//
impl<'cfg> EventAnalysis<'cfg> {
    /// Set up the analysis of the configured hypotheses
    pub fn new(cfg: &'cfg Configuration) -> Self {
        Self {
            classifiers: cfg
                .hypotheses
                .iter()
                .map(|&hypothesis| {
                    Classifier::new(hypothesis, &cfg.object_cuts, &cfg.cutflow_cuts)
                })
                .collect(),
        }
    }

    /// Analyze an event under every hypothesis
    ///
    /// The collinear mass is computed for every event, whether or not it
    /// passed the cutflow. Events with no selected lepton pair go through the
    /// fallback reconstruction and only populate the gates they passed.
    ///
    pub fn analyze(&self, event: &Event) -> ResultContribution {
        let met = event.met();
        self.classifiers
            .iter()
            .map(|classifier| {
                let classification = classifier.classify(event);
                let tau_pair =
                    TauPair::reconstruct(event, classifier.hypothesis(), classification.selected());
                HypothesisResult {
                    path: tau_pair.path,
                    collinear_mass: tau_pair.collinear_mass(&met),
                    classification,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutflow::{tests::*, BinOutcome, Hypothesis, Stage};

    #[test]
    fn each_enabled_hypothesis_gets_a_result() {
        let cfg = Configuration::default();
        let analysis = EventAnalysis::new(&cfg);

        let mut event = mutau_e_event();
        event.muons[0].phi = 3.0;
        let results = analysis.analyze(&event);
        let hypotheses = results
            .iter()
            .map(|result| result.classification.hypothesis)
            .collect::<Vec<_>>();
        assert_eq!(hypotheses, Hypothesis::ALL);

        let mutau_e = &results[0];
        assert_eq!(mutau_e.classification.hypothesis, Hypothesis::MuTauE);
        assert_eq!(mutau_e.path, Reconstruction::Clean);
        assert!(mutau_e.collinear_mass.is_finite());

        // The prompt electron of e+tau_mu is too soft
        let etau_mu = &results[1];
        assert_eq!(etau_mu.classification.hypothesis, Hypothesis::ETauMu);
        assert_eq!(etau_mu.path, Reconstruction::ClosestToMet);
        assert_eq!(
            etau_mu.classification.bins[0],
            BinOutcome::Rejected {
                failed: Stage::AnyPrimary
            }
        );
    }

    #[test]
    fn disabled_hypotheses_are_skipped() {
        let cfg = Configuration {
            hypotheses: vec![Hypothesis::ETauMu],
            ..Configuration::default()
        };
        let analysis = EventAnalysis::new(&cfg);
        let results = analysis.analyze(&etau_mu_event());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].classification.hypothesis, Hypothesis::ETauMu);
        assert_eq!(results[0].path, Reconstruction::Clean);
    }

    #[test]
    fn huge_azimuths_are_analyzed() {
        let record = r#"{"number": 7,
            "muons": [{"pt": 80.0, "eta": 0.5, "phi": 1e20, "charge": -1}],
            "electrons": [{"pt": 20.0, "eta": -0.3, "phi": 0.05, "charge": 1}],
            "missing_et": [{"met": 40.0, "phi": -1e20}]}"#;
        let event: crate::event::Event =
            serde_json::from_str(record).expect("Huge azimuths should parse");
        let cfg = Configuration::default();
        let results = EventAnalysis::new(&cfg).analyze(&event);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.classification.inclusive.jet_window);
            assert_eq!(result.classification.bins.len(), 3);
        }
    }
}
