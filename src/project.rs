//! Shared read-only project context: load demand, solar profile, load
//! projection, and scalar site parameters.
//!
//! A [`ProjectContext`] is built once from out-of-core loaded data and then
//! passed by shared reference to seeding and dispatch; nothing mutates it
//! during simulation.

use crate::calendar::{self, HOURS, HourStamp, MAX_DAYS, MONTHS, YEARS};
use crate::error::SimError;

/// Projected critical and total load for one year, in MW.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProjection {
    /// Load whose loss constitutes a business-impact interruption.
    pub critical_load_mw: f64,
    /// Total site load.
    pub total_load_mw: f64,
}

/// Scalar site parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteData {
    /// Monetary loss per critical-load interruption event (currency units).
    pub loss_during_failure: f64,
}

/// Immutable inputs shared by every source and the dispatch engine.
///
/// Tensors are stored flat with the same 28/30/31 calendar layout the
/// per-source operational data uses; cells for invalid days are never read.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Demand in MW, indexed by (year, month, day, hour).
    load_data: Vec<f64>,
    /// Solar output in MW per 5 MW installed, indexed by (month, day, hour).
    solar_profile: Vec<f64>,
    /// Per-year load projection, years 1..=12.
    pub load_projection: [LoadProjection; YEARS],
    /// Scalar site parameters.
    pub site: SiteData,
}

/// Cells in the (month, day, hour) solar-profile tensor.
const PROFILE_CELLS: usize = MONTHS * MAX_DAYS * HOURS;

fn profile_index(month: usize, day: usize, hour: usize) -> usize {
    (month - 1) * MAX_DAYS * HOURS + (day - 1) * HOURS + hour
}

impl ProjectContext {
    /// Builds a context from pre-loaded tensors.
    ///
    /// # Errors
    ///
    /// Returns a `DataGap` if a tensor has the wrong length.
    pub fn new(
        load_data: Vec<f64>,
        solar_profile: Vec<f64>,
        load_projection: [LoadProjection; YEARS],
        site: SiteData,
    ) -> Result<Self, SimError> {
        if load_data.len() != calendar::TENSOR_CELLS {
            return Err(SimError::DataGap(format!(
                "load_data has {} cells, expected {}",
                load_data.len(),
                calendar::TENSOR_CELLS
            )));
        }
        if solar_profile.len() != PROFILE_CELLS {
            return Err(SimError::DataGap(format!(
                "solar_profile has {} cells, expected {PROFILE_CELLS}",
                solar_profile.len()
            )));
        }
        Ok(Self {
            load_data,
            solar_profile,
            load_projection,
            site,
        })
    }

    /// A context with a constant load everywhere, a zero solar profile, and
    /// a flat load projection. The starting point for fixtures and demos;
    /// chain [`Self::with_solar_profile`] / [`Self::with_load_projection`]
    /// to refine it.
    pub fn uniform(load_mw: f64) -> Self {
        let mut load_data = vec![0.0; calendar::TENSOR_CELLS];
        for s in calendar::iter_hours() {
            load_data[s.flat()] = load_mw;
        }
        Self {
            load_data,
            solar_profile: vec![0.0; PROFILE_CELLS],
            load_projection: [LoadProjection {
                critical_load_mw: load_mw,
                total_load_mw: load_mw,
            }; YEARS],
            site: SiteData {
                loss_during_failure: 0.0,
            },
        }
    }

    /// Replaces the solar profile with `f(month, day, hour)` in MW per
    /// 5 MW installed.
    pub fn with_solar_profile(mut self, f: impl Fn(usize, usize, usize) -> f64) -> Self {
        for month in 1..=MONTHS {
            for day in 1..=calendar::days_in_month(month) {
                for hour in 0..HOURS {
                    self.solar_profile[profile_index(month, day, hour)] = f(month, day, hour);
                }
            }
        }
        self
    }

    /// Replaces the per-year load projection.
    pub fn with_load_projection(mut self, projection: [LoadProjection; YEARS]) -> Self {
        self.load_projection = projection;
        self
    }

    /// Sets the monetary loss per interruption event.
    pub fn with_loss_during_failure(mut self, loss: f64) -> Self {
        self.site.loss_during_failure = loss;
        self
    }

    /// Overwrites the load for every hour of the horizon with
    /// `f(stamp)` in MW.
    pub fn with_load(mut self, f: impl Fn(HourStamp) -> f64) -> Self {
        for s in calendar::iter_hours() {
            self.load_data[s.flat()] = f(s);
        }
        self
    }

    /// Demand in MW at the given hour.
    pub fn load_mw(&self, at: HourStamp) -> f64 {
        self.load_data[at.flat()]
    }

    /// Solar output in MW per 5 MW installed at the given calendar hour.
    pub fn solar_output_per_5mw(&self, month: usize, day: usize, hour: usize) -> f64 {
        self.solar_profile[profile_index(month, day, hour)]
    }
}
