//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::SimError;

/// Top-level scenario configuration parsed from TOML.
///
/// Scenario-level policy knobs live under `[scenario]`; the asset portfolio
/// is a list of `[[sources]]` entries referencing catalogue type names.
/// Load from TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario-level simulation parameters.
    #[serde(default)]
    pub scenario: ScenarioParams,
    /// Configured source instances.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// Scenario-level simulation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioParams {
    /// Scenario name used in logs and exports.
    pub name: String,
    /// Master random seed for availability seeding.
    pub seed: u64,
    /// Global spinning reserve requirement, percent of hourly demand.
    pub spinning_reserve_perc: f64,
    /// BESS non-emergency policy: 0 none, 1 equal distribution,
    /// 2 sequential utilisation.
    pub bess_non_emergency_use: u8,
    /// Dispatch BESS at its priority position instead of post-hoc.
    pub bess_priority_wise_use: bool,
    /// Hours a full recharge is spread over; divides the hourly charging
    /// allowance.
    pub bess_charge_hours: f64,
    /// Multiplier on night-hour charging, percent.
    pub charge_ratio_night: f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            name: "scenario".to_string(),
            seed: 42,
            spinning_reserve_perc: 0.0,
            bess_non_emergency_use: 2,
            bess_priority_wise_use: false,
            bess_charge_hours: 1.0,
            charge_ratio_night: 100.0,
        }
    }
}

/// One configured source instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    /// Instance name, unique within the scenario.
    pub name: String,
    /// Catalogue type key.
    #[serde(rename = "type")]
    pub type_name: String,
    /// First simulated year the source exists (1-based).
    #[serde(default = "default_start_year")]
    pub start_year: usize,
    /// Last simulated year the source exists, inclusive.
    #[serde(default = "default_end_year")]
    pub end_year: usize,
    /// Rating in MW, or MWh for BESS.
    pub rating: f64,
    /// `"MW"` or `"MWh"`.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Dispatch priority group; lower dispatches first.
    pub priority: u32,
    /// Group contribution share of the scenario spinning reserve, percent.
    #[serde(default)]
    pub spinning_reserve: f64,
    /// Minimum loading when running, percent. Falls back to the type's
    /// default when omitted.
    pub min_loading: Option<f64>,
    /// Maximum loading, percent of rating. Falls back to the type's
    /// default when omitted.
    pub max_loading: Option<f64>,
}

fn default_start_year() -> usize {
    1
}

fn default_end_year() -> usize {
    crate::calendar::YEARS
}

fn default_unit() -> String {
    "MW".to_string()
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 5 MW solar plant, three captive gas
    /// gensets, and a 2 MWh BESS.
    pub fn baseline() -> Self {
        Self {
            scenario: ScenarioParams {
                name: "baseline".to_string(),
                spinning_reserve_perc: 10.0,
                ..ScenarioParams::default()
            },
            sources: vec![
                SourceEntry {
                    name: "solar-1".to_string(),
                    type_name: "solar-pv".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 5.0,
                    unit: "MW".to_string(),
                    priority: 1,
                    spinning_reserve: 0.0,
                    min_loading: Some(0.0),
                    max_loading: Some(100.0),
                },
                SourceEntry {
                    name: "gas-1".to_string(),
                    type_name: "gas-genset".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 1.5,
                    unit: "MW".to_string(),
                    priority: 2,
                    spinning_reserve: 100.0,
                    min_loading: Some(10.0),
                    max_loading: Some(100.0),
                },
                SourceEntry {
                    name: "gas-2".to_string(),
                    type_name: "gas-genset".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 1.5,
                    unit: "MW".to_string(),
                    priority: 2,
                    spinning_reserve: 100.0,
                    min_loading: Some(10.0),
                    max_loading: Some(100.0),
                },
                SourceEntry {
                    name: "gas-3".to_string(),
                    type_name: "gas-genset".to_string(),
                    start_year: 2,
                    end_year: 12,
                    rating: 1.5,
                    unit: "MW".to_string(),
                    priority: 2,
                    spinning_reserve: 100.0,
                    min_loading: Some(10.0),
                    max_loading: Some(100.0),
                },
                SourceEntry {
                    name: "bess-1".to_string(),
                    type_name: "bess".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 2.0,
                    unit: "MWh".to_string(),
                    priority: 3,
                    spinning_reserve: 0.0,
                    min_loading: Some(0.0),
                    max_loading: Some(100.0),
                },
            ],
        }
    }

    /// Returns the thermal-heavy preset: no renewables, HFO plus diesel
    /// backup with a tight spinning-reserve mandate.
    pub fn thermal_heavy() -> Self {
        Self {
            scenario: ScenarioParams {
                name: "thermal_heavy".to_string(),
                spinning_reserve_perc: 20.0,
                bess_non_emergency_use: 0,
                ..ScenarioParams::default()
            },
            sources: vec![
                SourceEntry {
                    name: "hfo-1".to_string(),
                    type_name: "hfo-genset".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 3.0,
                    unit: "MW".to_string(),
                    priority: 1,
                    spinning_reserve: 50.0,
                    min_loading: Some(10.0),
                    max_loading: Some(100.0),
                },
                SourceEntry {
                    name: "hfo-2".to_string(),
                    type_name: "hfo-genset".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 3.0,
                    unit: "MW".to_string(),
                    priority: 1,
                    spinning_reserve: 50.0,
                    min_loading: Some(10.0),
                    max_loading: Some(100.0),
                },
                SourceEntry {
                    name: "diesel-1".to_string(),
                    type_name: "diesel-genset".to_string(),
                    start_year: 1,
                    end_year: 12,
                    rating: 1.2,
                    unit: "MW".to_string(),
                    priority: 2,
                    spinning_reserve: 0.0,
                    min_loading: Some(0.0),
                    max_loading: Some(100.0),
                },
            ],
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "thermal_heavy"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, SimError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "thermal_heavy" => Ok(Self::thermal_heavy()),
            _ => Err(SimError::config(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or the
    /// TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, SimError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::config(
                "scenario",
                format!("cannot read \"{}\": {e}", path.display()),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is invalid or contains
    /// unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        toml::from_str(s).map_err(|e| SimError::config("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. Catalogue
    /// lookups and per-source range checks happen later, when the scenario
    /// is assembled against a catalogue.
    pub fn validate(&self) -> Vec<SimError> {
        let mut errors = Vec::new();
        let s = &self.scenario;

        if !(0.0..=100.0).contains(&s.spinning_reserve_perc) {
            errors.push(SimError::config(
                "scenario.spinning_reserve_perc",
                "must be in [0, 100]",
            ));
        }
        if s.bess_non_emergency_use > 2 {
            errors.push(SimError::config(
                "scenario.bess_non_emergency_use",
                "must be 0 (none), 1 (equal distribution), or 2 (sequential)",
            ));
        }
        if s.bess_charge_hours <= 0.0 {
            errors.push(SimError::config(
                "scenario.bess_charge_hours",
                "must be > 0",
            ));
        }
        if !(0.0..=100.0).contains(&s.charge_ratio_night) {
            errors.push(SimError::config(
                "scenario.charge_ratio_night",
                "must be in [0, 100]",
            ));
        }

        if self.sources.is_empty() {
            errors.push(SimError::config("sources", "at least one source required"));
        }
        for (i, entry) in self.sources.iter().enumerate() {
            let field = |f: &str| format!("sources[{i}].{f}");
            if entry.name.is_empty() {
                errors.push(SimError::config(field("name"), "must not be empty"));
            }
            if entry.unit != "MW" && entry.unit != "MWh" {
                errors.push(SimError::config(
                    field("unit"),
                    format!("must be \"MW\" or \"MWh\", got \"{}\"", entry.unit),
                ));
            }
            if self.sources[..i].iter().any(|e| e.name == entry.name) {
                errors.push(SimError::config(field("name"), "duplicate source name"));
            }
        }

        errors
    }
}
