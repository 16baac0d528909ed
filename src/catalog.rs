//! Source-type catalogue: the library of configurable supply technologies.
//!
//! A [`SourceType`] carries everything that is fixed per technology
//! (reliability statistics, loading limits, cost coefficients), while a
//! `Source` instance adds per-deployment configuration (rating, priority,
//! commissioning year). Catalogues are loaded from TOML or assembled from
//! the built-in types.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::SimError;

/// Broad technology class, driving capacity rules and dispatch branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Solar-profile-driven generation.
    Renewable,
    /// On-site combustion generation.
    CaptiveThermal,
    /// Purchased-power feed billed through a PPA tariff.
    PpaFeed,
    /// Battery energy storage.
    Bess,
}

/// How the source is financed and therefore costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinanceMode {
    /// Owned asset: CAPEX depreciation plus fuel and OPEX.
    Captive,
    /// Power purchase agreement: fixed plus variable tariff.
    Ppa,
}

/// Fuel burned by captive thermal sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelKind {
    Gas,
    Hfo,
    Diesel,
    /// Non-combustion sources.
    #[default]
    None,
}

/// Immutable per-technology metadata.
///
/// Percentages are stored as 0..=100 values, matching the source-metadata
/// sheet they originate from. Cost baselines are in currency units per MW
/// (capital, fixed OPEX, fixed tariff) or per MWh (variable OPEX, variable
/// tariff, fuel cost).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceType {
    /// Catalogue key referenced by scenario configurations.
    pub name: String,
    pub kind: SourceKind,
    pub finance: FinanceMode,
    #[serde(default)]
    pub fuel: FuelKind,
    /// Capacity lost per year of operation, percent.
    #[serde(default)]
    pub annual_degradation_pct: f64,
    /// Planned failure events per operating year.
    #[serde(default)]
    pub num_annual_fails: u32,
    /// Hours of unavailability each failure causes, including the failure
    /// hour itself.
    #[serde(default = "default_downtime")]
    pub downtime_per_fail: u32,
    /// Seeded sudden output reductions per day (renewables only).
    #[serde(default)]
    pub solar_sudden_drops: u32,
    /// Share of rating the source can pick up instantaneously, percent.
    #[serde(default)]
    pub block_load_acceptance_pct: f64,
    /// Default minimum loading for instances, percent of capacity.
    #[serde(default)]
    pub min_loading_pct: f64,
    /// Default maximum loading for instances, percent of rating.
    #[serde(default = "default_max_loading")]
    pub max_loading_pct: f64,
    /// Capital cost baseline, currency per MW.
    #[serde(default)]
    pub capital_cost_baseline: f64,
    /// Fuel price, currency per fuel unit.
    #[serde(default)]
    pub fuel_cost: f64,
    /// Fuel units consumed per MWh generated.
    #[serde(default)]
    pub fuel_consumption: f64,
    /// Fixed OPEX baseline, currency per MW per year.
    #[serde(default)]
    pub fixed_opex_baseline: f64,
    /// Variable OPEX baseline, currency per MWh.
    #[serde(default)]
    pub var_opex_baseline: f64,
    /// PPA fixed tariff, currency per MW per year.
    #[serde(default)]
    pub tariff_fixed: f64,
    /// PPA variable tariff, currency per MWh.
    #[serde(default)]
    pub tariff_var: f64,
    /// Minimum annual offtake billed under the PPA, MWh.
    #[serde(default)]
    pub min_annual_offtake_mwh: f64,
    /// Depreciation horizon, years.
    #[serde(default = "default_useful_life")]
    pub useful_life_years: f64,
    /// Cost inflation, fraction per year.
    #[serde(default)]
    pub inflation_rate: f64,
}

fn default_downtime() -> u32 {
    1
}

fn default_max_loading() -> f64 {
    100.0
}

fn default_useful_life() -> f64 {
    20.0
}

impl SourceType {
    /// Validates the metadata, returning the field paths that fail.
    pub fn validate(&self) -> Vec<SimError> {
        let mut errors = Vec::new();
        let prefix = format!("types.{}", self.name);
        if self.name.is_empty() {
            errors.push(SimError::config("types.name", "must not be empty"));
        }
        if self.downtime_per_fail == 0 {
            errors.push(SimError::config(
                format!("{prefix}.downtime_per_fail"),
                "must be >= 1",
            ));
        }
        if self.useful_life_years <= 0.0 {
            errors.push(SimError::config(
                format!("{prefix}.useful_life_years"),
                "must be > 0",
            ));
        }
        for (field, value) in [
            ("annual_degradation_pct", self.annual_degradation_pct),
            ("block_load_acceptance_pct", self.block_load_acceptance_pct),
            ("min_loading_pct", self.min_loading_pct),
            ("max_loading_pct", self.max_loading_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                errors.push(SimError::config(
                    format!("{prefix}.{field}"),
                    "must be in [0, 100]",
                ));
            }
        }
        if self.solar_sudden_drops > 0 && self.kind != SourceKind::Renewable {
            errors.push(SimError::config(
                format!("{prefix}.solar_sudden_drops"),
                "only renewable types seed output drops",
            ));
        }
        errors
    }

    /// Built-in 5 MW-class solar PV type.
    pub fn solar_pv() -> Self {
        Self {
            name: "solar-pv".to_string(),
            kind: SourceKind::Renewable,
            finance: FinanceMode::Captive,
            fuel: FuelKind::None,
            annual_degradation_pct: 0.5,
            num_annual_fails: 0,
            downtime_per_fail: 1,
            solar_sudden_drops: 1,
            block_load_acceptance_pct: 0.0,
            min_loading_pct: 0.0,
            max_loading_pct: 100.0,
            capital_cost_baseline: 620_000.0,
            fuel_cost: 0.0,
            fuel_consumption: 0.0,
            fixed_opex_baseline: 9_500.0,
            var_opex_baseline: 0.0,
            tariff_fixed: 0.0,
            tariff_var: 0.0,
            min_annual_offtake_mwh: 0.0,
            useful_life_years: 25.0,
            inflation_rate: 0.05,
        }
    }

    /// Built-in captive gas genset type.
    pub fn gas_genset() -> Self {
        Self {
            name: "gas-genset".to_string(),
            kind: SourceKind::CaptiveThermal,
            finance: FinanceMode::Captive,
            fuel: FuelKind::Gas,
            annual_degradation_pct: 1.0,
            num_annual_fails: 6,
            downtime_per_fail: 4,
            solar_sudden_drops: 0,
            block_load_acceptance_pct: 30.0,
            min_loading_pct: 10.0,
            max_loading_pct: 100.0,
            capital_cost_baseline: 750_000.0,
            fuel_cost: 9.5,
            fuel_consumption: 9.8,
            fixed_opex_baseline: 21_000.0,
            var_opex_baseline: 4.2,
            tariff_fixed: 0.0,
            tariff_var: 0.0,
            min_annual_offtake_mwh: 0.0,
            useful_life_years: 20.0,
            inflation_rate: 0.06,
        }
    }

    /// Built-in captive HFO genset type.
    pub fn hfo_genset() -> Self {
        Self {
            name: "hfo-genset".to_string(),
            fuel: FuelKind::Hfo,
            num_annual_fails: 8,
            downtime_per_fail: 6,
            block_load_acceptance_pct: 25.0,
            capital_cost_baseline: 900_000.0,
            fuel_cost: 11.0,
            fuel_consumption: 10.4,
            fixed_opex_baseline: 26_000.0,
            var_opex_baseline: 5.5,
            ..Self::gas_genset()
        }
    }

    /// Built-in captive diesel genset type (backup duty).
    pub fn diesel_genset() -> Self {
        Self {
            name: "diesel-genset".to_string(),
            fuel: FuelKind::Diesel,
            num_annual_fails: 2,
            downtime_per_fail: 2,
            block_load_acceptance_pct: 60.0,
            capital_cost_baseline: 480_000.0,
            fuel_cost: 18.0,
            fuel_consumption: 10.9,
            fixed_opex_baseline: 12_000.0,
            var_opex_baseline: 6.8,
            useful_life_years: 15.0,
            ..Self::gas_genset()
        }
    }

    /// Built-in purchased-power feed.
    pub fn ppa_feed() -> Self {
        Self {
            name: "ppa-feed".to_string(),
            kind: SourceKind::PpaFeed,
            finance: FinanceMode::Ppa,
            fuel: FuelKind::None,
            annual_degradation_pct: 0.0,
            num_annual_fails: 12,
            downtime_per_fail: 2,
            solar_sudden_drops: 0,
            block_load_acceptance_pct: 0.0,
            min_loading_pct: 0.0,
            max_loading_pct: 100.0,
            capital_cost_baseline: 0.0,
            fuel_cost: 0.0,
            fuel_consumption: 0.0,
            fixed_opex_baseline: 0.0,
            var_opex_baseline: 0.0,
            tariff_fixed: 180_000.0,
            tariff_var: 95.0,
            min_annual_offtake_mwh: 2_000.0,
            useful_life_years: 20.0,
            inflation_rate: 0.04,
        }
    }

    /// Built-in battery energy storage type.
    pub fn bess() -> Self {
        Self {
            name: "bess".to_string(),
            kind: SourceKind::Bess,
            finance: FinanceMode::Captive,
            fuel: FuelKind::None,
            annual_degradation_pct: 0.0,
            num_annual_fails: 1,
            downtime_per_fail: 12,
            solar_sudden_drops: 0,
            block_load_acceptance_pct: 100.0,
            min_loading_pct: 0.0,
            max_loading_pct: 100.0,
            capital_cost_baseline: 410_000.0,
            fuel_cost: 0.0,
            fuel_consumption: 0.0,
            fixed_opex_baseline: 7_000.0,
            var_opex_baseline: 0.0,
            tariff_fixed: 0.0,
            tariff_var: 0.0,
            min_annual_offtake_mwh: 0.0,
            useful_life_years: 12.0,
            inflation_rate: 0.05,
        }
    }
}

/// A named collection of source types.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceCatalog {
    #[serde(default, rename = "types")]
    types: Vec<SourceType>,
}

impl SourceCatalog {
    /// Catalogue holding all built-in types.
    pub fn builtin() -> Self {
        Self {
            types: vec![
                SourceType::solar_pv(),
                SourceType::gas_genset(),
                SourceType::hfo_genset(),
                SourceType::diesel_genset(),
                SourceType::ppa_feed(),
                SourceType::bess(),
            ],
        }
    }

    /// Parses a catalogue from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is invalid or any type
    /// fails validation.
    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        let catalog: Self =
            toml::from_str(s).map_err(|e| SimError::config("catalog", e.to_string()))?;
        for ty in &catalog.types {
            if let Some(err) = ty.validate().into_iter().next() {
                return Err(err);
            }
        }
        Ok(catalog)
    }

    /// Parses a catalogue from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self, SimError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::config(
                "catalog",
                format!("cannot read \"{}\": {e}", path.display()),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Looks up a type by catalogue key.
    pub fn get(&self, name: &str) -> Option<&SourceType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// All type names in catalogue order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    /// Adds or replaces a type.
    pub fn insert(&mut self, ty: SourceType) {
        if let Some(existing) = self.types.iter_mut().find(|t| t.name == ty.name) {
            *existing = ty;
        } else {
            self.types.push(ty);
        }
    }
}
