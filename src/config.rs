//! Mechanism for loading and sharing the analysis configuration

use crate::{
    cutflow::{CutflowCuts, Hypothesis},
    histogram::Binning,
    selection::ObjectCuts,
    Result,
};
use eyre::{ensure, eyre, WrapErr};
use std::{fs, path::Path, str::FromStr};
use tracing::info;

/// Analysis configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Cuts on individual jets and leptons
    pub object_cuts: ObjectCuts,

    /// Cuts of the event-level cutflow
    pub cutflow_cuts: CutflowCuts,

    /// Binning of the collinear mass histograms
    pub binning: Binning,

    /// Hypotheses under which events are classified, in output order
    pub hypotheses: Vec<Hypothesis>,
}
//
impl Default for Configuration {
    fn default() -> Self {
        Self {
            object_cuts: ObjectCuts::default(),
            cutflow_cuts: CutflowCuts::default(),
            binning: Binning::FINE,
            hypotheses: Hypothesis::ALL.to_vec(),
        }
    }
}
//
impl Configuration {
    /// Load the cuts and binning from a card file
    pub fn load(file_name: &Path) -> Result<Self> {
        let card = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("Failed to read cut card {}", file_name.display()))?;
        Self::parse_card(&card)
    }

    /// Decode the contents of a cut card
    ///
    /// In the card format, each configuration item is the first
    /// non-whitespace chunk of text on a line, the rest of the line being a
    /// free-form comment. Blank lines are ignored and items come in a fixed
    /// order.
    ///
    pub fn parse_card(card: &str) -> Result<Self> {
        let mut items = card
            .lines()
            .filter_map(|line| line.split_whitespace().next());

        let mut next_item = |name: &'static str| -> Result<ConfigItem> {
            items
                .next()
                .map(|data| ConfigItem::new(name, data))
                .ok_or_else(|| eyre!("Missing configuration of {}", name))
        };

        let config = Configuration {
            object_cuts: ObjectCuts {
                jet_pt_min: next_item("jet_pt_min")?.parse()?,
                eta_max: next_item("eta_max")?.parse()?,
                overlap_dr_min: next_item("overlap_dr_min")?.parse()?,
            },
            cutflow_cuts: CutflowCuts {
                max_jets: next_item("max_jets")?.parse()?,
                muon_primary_pt_min: next_item("muon_primary_pt_min")?.parse()?,
                electron_primary_pt_min: next_item("electron_primary_pt_min")?.parse()?,
                secondary_pt_min: next_item("secondary_pt_min")?.parse()?,
                primary_final_pt_min: next_item("primary_final_pt_min")?.parse()?,
                secondary_met_dphi_max: next_item("secondary_met_dphi_max")?.parse()?,
                back_to_back_dphi_min: next_item("back_to_back_dphi_min")?.parse()?,
                high_mass_primary_pt_min: next_item("high_mass_primary_pt_min")?.parse()?,
                high_mass_met_dphi_max: next_item("high_mass_met_dphi_max")?.parse()?,
                low_mass_primary_pt_min: next_item("low_mass_primary_pt_min")?.parse()?,
                low_mass_met_dphi_max: next_item("low_mass_met_dphi_max")?.parse()?,
            },
            binning: Binning {
                bins: next_item("bins")?.parse()?,
                low: next_item("low")?.parse()?,
                high: next_item("high")?.parse()?,
            },
            hypotheses: Hypothesis::ALL.to_vec(),
        };
        ensure!(
            items.next().is_none(),
            "Unexpected trailing items in the cut card"
        );

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration makes sense
    pub fn validate(&self) -> Result<()> {
        let objects = &self.object_cuts;
        let cutflow = &self.cutflow_cuts;
        let thresholds = [
            ("jet_pt_min", objects.jet_pt_min),
            ("eta_max", objects.eta_max),
            ("overlap_dr_min", objects.overlap_dr_min),
            ("muon_primary_pt_min", cutflow.muon_primary_pt_min),
            ("electron_primary_pt_min", cutflow.electron_primary_pt_min),
            ("secondary_pt_min", cutflow.secondary_pt_min),
            ("primary_final_pt_min", cutflow.primary_final_pt_min),
            ("secondary_met_dphi_max", cutflow.secondary_met_dphi_max),
            ("back_to_back_dphi_min", cutflow.back_to_back_dphi_min),
            ("high_mass_primary_pt_min", cutflow.high_mass_primary_pt_min),
            ("high_mass_met_dphi_max", cutflow.high_mass_met_dphi_max),
            ("low_mass_primary_pt_min", cutflow.low_mass_primary_pt_min),
            ("low_mass_met_dphi_max", cutflow.low_mass_met_dphi_max),
        ];
        for (name, value) in thresholds {
            ensure!(
                value.is_finite() && value >= 0.,
                "Cut {} should be finite and non-negative, got {}",
                name,
                value
            );
        }
        self.binning.validate()?;
        ensure!(
            !self.hypotheses.is_empty(),
            "Please enable at least one hypothesis"
        );
        Ok(())
    }

    /// Log the configuration
    pub fn print(&self) {
        let objects = &self.object_cuts;
        let cutflow = &self.cutflow_cuts;
        info!("Jet pT min               : {} GeV", objects.jet_pt_min);
        info!("|eta| max                : {}", objects.eta_max);
        info!("e/mu overlap dR min      : {}", objects.overlap_dr_min);
        info!("Max jets                 : {}", cutflow.max_jets);
        info!("Primary muon pT min      : {} GeV", cutflow.muon_primary_pt_min);
        info!("Primary electron pT min  : {} GeV", cutflow.electron_primary_pt_min);
        info!("Secondary pT min         : {} GeV", cutflow.secondary_pt_min);
        info!("Primary final pT         : > {} GeV", cutflow.primary_final_pt_min);
        info!("Secondary/MET dPhi max   : {}", cutflow.secondary_met_dphi_max);
        info!("Lepton dPhi min          : {}", cutflow.back_to_back_dphi_min);
        info!(
            "High mass region         : pT > {} GeV, dPhi < {}",
            cutflow.high_mass_primary_pt_min, cutflow.high_mass_met_dphi_max
        );
        info!(
            "Low mass region          : pT > {} GeV, dPhi < {}",
            cutflow.low_mass_primary_pt_min, cutflow.low_mass_met_dphi_max
        );
        info!(
            "Binning                  : {} bins in [{}, {}]",
            self.binning.bins, self.binning.low, self.binning.high
        );
        let prefixes = self
            .hypotheses
            .iter()
            .map(|hypothesis| hypothesis.prefix())
            .collect::<Vec<_>>();
        info!("Hypotheses               : {}", prefixes.join(", "));
    }
}

/// A value from the cut card, tagged with the struct field which it is
/// supposed to map for error reporting purposes.
struct ConfigItem<'data> {
    name: &'static str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from a struct field tag and raw card data
    fn new(name: &'static str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(self) -> Result<T>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        self.data
            .parse::<T>()
            .wrap_err_with(|| format!("Could not parse configuration of {}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Float;

    /// Render a configuration as a cut card
    fn to_card(config: &Configuration) -> String {
        let objects = &config.object_cuts;
        let cutflow = &config.cutflow_cuts;
        let values: [(Float, &str); 14] = [
            (objects.jet_pt_min, "jet pT min"),
            (objects.eta_max, "|eta| max"),
            (objects.overlap_dr_min, "overlap dR min"),
            (cutflow.muon_primary_pt_min, "primary muon pT min"),
            (cutflow.electron_primary_pt_min, "primary electron pT min"),
            (cutflow.secondary_pt_min, "secondary pT min"),
            (cutflow.primary_final_pt_min, "primary final pT"),
            (cutflow.secondary_met_dphi_max, "secondary/MET dPhi max"),
            (cutflow.back_to_back_dphi_min, "lepton dPhi min"),
            (cutflow.high_mass_primary_pt_min, "high mass pT"),
            (cutflow.high_mass_met_dphi_max, "high mass dPhi"),
            (cutflow.low_mass_primary_pt_min, "low mass pT"),
            (cutflow.low_mass_met_dphi_max, "low mass dPhi"),
            (config.binning.low, "histogram low edge"),
        ];
        let line = |(value, comment): (Float, &str)| format!("{value:<12} {comment}\n");
        let mut card = String::new();
        values[..3].iter().copied().map(line).for_each(|l| card += &l);
        card += &format!("{:<12} max jets\n\n", cutflow.max_jets);
        values[3..13].iter().copied().map(line).for_each(|l| card += &l);
        card += &format!("{:<12} bins\n", config.binning.bins);
        card += &line(values[13]);
        card += &format!("{:<12} histogram high edge\n", config.binning.high);
        card
    }

    #[test]
    fn default_card_gives_default_configuration() {
        let default = Configuration::default();
        let card = to_card(&default);
        let parsed = Configuration::parse_card(&card).expect("Default card should be valid");
        assert_eq!(parsed, default);
        assert_eq!(parsed.cutflow_cuts.max_jets, 2);
        assert_eq!(parsed.binning, Binning::FINE);
    }

    #[test]
    fn card_values_come_in_order() {
        let mut config = Configuration::default();
        config.cutflow_cuts.max_jets = 1;
        config.cutflow_cuts.muon_primary_pt_min = 50.;
        config.binning = Binning::COARSE;
        let parsed = Configuration::parse_card(&to_card(&config)).expect("Valid card");
        assert_eq!(parsed, config);
    }

    #[test]
    fn card_errors_name_the_item() {
        let card = to_card(&Configuration::default()).replacen("6", "six", 1);
        let error = Configuration::parse_card(&card).expect_err("Unparseable eta_max");
        assert!(format!("{error:?}").contains("eta_max"));

        let truncated = to_card(&Configuration::default())
            .lines()
            .take(6)
            .collect::<Vec<_>>()
            .join("\n");
        let error = Configuration::parse_card(&truncated).expect_err("Truncated card");
        assert!(error.to_string().contains("electron_primary_pt_min"));

        let extra = to_card(&Configuration::default()) + "42\n";
        assert!(Configuration::parse_card(&extra).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Configuration::default();
        config.cutflow_cuts.secondary_pt_min = -1.;
        assert!(Configuration::parse_card(&to_card(&config)).is_err());

        let mut config = Configuration::default();
        config.binning.bins = 0;
        assert!(Configuration::parse_card(&to_card(&config)).is_err());

        let mut config = Configuration::default();
        config.hypotheses.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_card_is_an_error() {
        assert!(Configuration::load(Path::new("/nonexistent/cuts.card")).is_err());
    }
}
