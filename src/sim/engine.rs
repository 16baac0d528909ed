//! Scenario engine: owns the source fleet and walks the 12-year hourly
//! timeline, strictly in calendar order.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::calendar::{self, HourStamp};
use crate::catalog::SourceCatalog;
use crate::config::ScenarioConfig;
use crate::error::SimError;
use crate::project::ProjectContext;
use crate::source::{RatingUnit, Source, SourceConfig, Status};

use super::POWER_TOLERANCE_MW;
use super::bess::{self, BessMode, BessPolicy};
use super::dispatch;
use super::sudden_drop;
use super::types::HourlyRecord;

/// A configured scenario: the source fleet, the dispatch policy, and the
/// per-hour result grid.
///
/// The project context is shared read-only; each source exclusively owns
/// its operational tensor and is mutated only through the dispatch passes.
pub struct Scenario<'a> {
    name: String,
    project: &'a ProjectContext,
    sources: Vec<Source>,
    spinning_reserve_perc: f64,
    bess_policy: BessPolicy,
    results: Vec<HourlyRecord>,
}

impl<'a> Scenario<'a> {
    /// Creates a scenario from already-seeded sources.
    ///
    /// The source list is sorted by priority; [`Scenario::simulate`] keeps
    /// it sorted across hours.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the fleet is empty or the reserve
    /// percentage is out of range.
    pub fn new(
        name: impl Into<String>,
        project: &'a ProjectContext,
        mut sources: Vec<Source>,
        spinning_reserve_perc: f64,
        bess_policy: BessPolicy,
    ) -> Result<Self, SimError> {
        if sources.is_empty() {
            return Err(SimError::config("sources", "at least one source required"));
        }
        if !(0.0..=100.0).contains(&spinning_reserve_perc) {
            return Err(SimError::config(
                "spinning_reserve_perc",
                "must be in [0, 100]",
            ));
        }
        sources.sort_by_key(|s| s.config.priority);
        Ok(Self {
            name: name.into(),
            project,
            sources,
            spinning_reserve_perc,
            bess_policy,
            results: vec![HourlyRecord::default(); calendar::TENSOR_CELLS],
        })
    }

    /// Assembles and seeds a scenario from a TOML configuration against a
    /// type catalogue.
    ///
    /// Sources are seeded from a single random stream in priority order,
    /// so equal seeds and inputs reproduce identical availability masks.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found, or a lookup failure
    /// for an unknown catalogue type.
    pub fn from_config(
        config: &ScenarioConfig,
        catalog: &SourceCatalog,
        project: &'a ProjectContext,
    ) -> Result<Self, SimError> {
        if let Some(error) = config.validate().into_iter().next() {
            return Err(error);
        }
        let mut sources = Vec::with_capacity(config.sources.len());
        for entry in &config.sources {
            let ty = catalog.get(&entry.type_name).ok_or_else(|| {
                SimError::config(
                    format!("sources.{}.type", entry.name),
                    format!("unknown catalogue type \"{}\"", entry.type_name),
                )
            })?;
            let source_config = SourceConfig {
                start_year: entry.start_year,
                end_year: entry.end_year,
                rating: entry.rating,
                unit: if entry.unit == "MWh" {
                    RatingUnit::Mwh
                } else {
                    RatingUnit::Mw
                },
                priority: entry.priority,
                spinning_reserve_pct: entry.spinning_reserve,
                min_loading_pct: entry.min_loading.unwrap_or(ty.min_loading_pct),
                max_loading_pct: entry.max_loading.unwrap_or(ty.max_loading_pct),
            };
            sources.push(Source::new(entry.name.clone(), ty.clone(), source_config)?);
        }
        let params = &config.scenario;
        let bess_policy = BessPolicy {
            non_emergency_use: BessMode::from_code(params.bess_non_emergency_use).ok_or_else(
                || {
                    SimError::config(
                        "scenario.bess_non_emergency_use",
                        "must be 0, 1, or 2",
                    )
                },
            )?,
            priority_wise: params.bess_priority_wise_use,
            charge_hours: params.bess_charge_hours,
            charge_ratio_night_pct: params.charge_ratio_night,
        };
        let mut scenario = Self::new(
            params.name.clone(),
            project,
            sources,
            params.spinning_reserve_perc,
            bess_policy,
        )?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        for source in &mut scenario.sources {
            source.seed(project, &mut rng);
        }
        Ok(scenario)
    }

    /// Runs the full 12-year simulation.
    ///
    /// For every hour, in fixed order: record the demand, roll BESS reserve
    /// across the hour boundary, run the priority dispatch passes, drain
    /// residual reserve against any shortfall, apply the BESS non-emergency
    /// policy, and (once demand is met) recharge BESS and absorb any sudden
    /// drop. The source list is re-sorted by priority before the next hour.
    ///
    /// # Errors
    ///
    /// Returns a `DataGap` for a non-finite demand cell, or an
    /// `InvariantViolation` if a dispatch pass breaches its bounds.
    pub fn simulate(&mut self) -> Result<(), SimError> {
        for year in 1..=calendar::YEARS {
            tracing::debug!(scenario = %self.name, year, "simulating year");
            for at in calendar::iter_hours_of_year(year) {
                self.simulate_hour(at)?;
            }
        }
        tracing::info!(scenario = %self.name, "simulation complete");
        Ok(())
    }

    fn simulate_hour(&mut self, at: HourStamp) -> Result<(), SimError> {
        let power_req = self.project.load_mw(at);
        if !power_req.is_finite() {
            return Err(SimError::DataGap(format!(
                "load_data at y{} m{} d{} h{} is not finite",
                at.year, at.month, at.day, at.hour
            )));
        }

        bess::start_of_hour(&mut self.sources, at);

        let outcome = dispatch::priority_dispatch(
            &mut self.sources,
            at,
            power_req,
            self.spinning_reserve_perc,
            &self.bess_policy,
        );
        let mut unserved = outcome.unserved_power_req;
        let sudden_power_drop = outcome.sudden_power_drop;

        if unserved > 0.0 {
            unserved = dispatch::drain_residual_reserve(&mut self.sources, at, unserved);
        }
        if unserved > 0.0
            && self.bess_policy.non_emergency_use != BessMode::None
            && !self.bess_policy.priority_wise
        {
            let delivered = bess::non_emergency_contribution(
                &mut self.sources,
                at,
                unserved,
                self.bess_policy.non_emergency_use,
            );
            unserved = (unserved - delivered).max(0.0);
            if unserved < POWER_TOLERANCE_MW {
                unserved = 0.0;
            }
        }

        let mut bess_charge_mw = 0.0;
        let mut drop_outcome = sudden_drop::DropOutcome::default();
        if unserved <= 0.0 {
            bess_charge_mw = bess::charge(&mut self.sources, at, &self.bess_policy);
            if sudden_power_drop > POWER_TOLERANCE_MW {
                drop_outcome = sudden_drop::handle_sudden_drop(
                    &mut self.sources,
                    at,
                    sudden_power_drop,
                    power_req,
                    self.project,
                );
            }
        }

        // A failed source delivers nothing this hour, even if the staging
        // pass had min-loaded it before its group was reached.
        for source in &mut self.sources {
            let cell = source.cell_mut(at);
            if cell.status == Status::Failed {
                cell.power_output = 0.0;
                cell.energy_output = 0.0;
                cell.reserve = 0.0;
                cell.mandatory_reserve = 0.0;
            }
        }

        let log = self.hour_log(at, unserved, drop_outcome.load_shed);
        self.results[at.flat()] = HourlyRecord {
            power_req,
            unserved_power_req: unserved,
            sudden_power_drop,
            unserved_power_drop: drop_outcome.unserved_power_drop,
            load_shed: drop_outcome.load_shed,
            bess_charge_mw,
            log,
        };

        self.sources.sort_by_key(|s| s.config.priority);
        self.check_hour_invariants(at)
    }

    fn hour_log(&self, at: HourStamp, unserved: f64, load_shed: f64) -> String {
        if unserved > 0.0 {
            return format!(
                "Total power requirements could not be satisfied. Shortfall = {unserved:.2} MW"
            );
        }
        let mut parts = Vec::new();
        for source in &self.sources {
            match source.cell(at).status {
                Status::Failed => parts.push(format!("{} failed", source.name)),
                Status::Reduced => parts.push(format!("{} output reduced", source.name)),
                _ => {}
            }
        }
        if load_shed > 0.0 {
            parts.push(format!("non-critical load shed = {load_shed:.2} MW"));
        }
        if parts.is_empty() {
            "Normal Operation".to_string()
        } else {
            parts.join("; ")
        }
    }

    fn check_hour_invariants(&self, at: HourStamp) -> Result<(), SimError> {
        const EPS: f64 = 1e-6;
        for source in &self.sources {
            let cell = source.cell(at);
            let violation = if cell.power_output < -EPS {
                Some("negative power output")
            } else if cell.power_output > cell.capacity + EPS {
                Some("power output above capacity")
            } else if cell.reserve < -EPS {
                Some("negative reserve")
            } else if cell.energy_output < -EPS {
                Some("negative energy output")
            } else {
                None
            };
            if let Some(message) = violation {
                return Err(SimError::InvariantViolation {
                    source_name: source.name.clone(),
                    year: at.year,
                    month: at.month,
                    day: at.day,
                    hour: at.hour,
                    message: message.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Scenario name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared project context.
    pub fn project(&self) -> &ProjectContext {
        self.project
    }

    /// The source fleet, sorted by priority.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// The scenario record for one hour. Meaningful after
    /// [`Scenario::simulate`].
    pub fn hourly(&self, at: HourStamp) -> &HourlyRecord {
        &self.results[at.flat()]
    }
}
