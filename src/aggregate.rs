//! Post-simulation aggregation: day, month, and year statistics plus the
//! yearly cost rollup.
//!
//! Everything here is a pure function over the final operational tensors
//! and the scenario's hourly records; running an aggregation twice yields
//! bit-identical results.

use crate::calendar::{self, HOURS, HOURS_PER_YEAR, HourStamp};
use crate::catalog::FinanceMode;
use crate::sim::POWER_TOLERANCE_MW;
use crate::sim::engine::Scenario;
use crate::source::{Source, Status};

/// Day-level operational statistics for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayStats {
    pub min_power_mw: f64,
    pub avg_power_mw: f64,
    pub max_power_mw: f64,
    pub energy_mwh: f64,
    pub failures: u32,
    pub reductions: u32,
    pub downtime_hours: u32,
    pub operation_hours: u32,
}

/// Month-level sums for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthStats {
    pub energy_mwh: f64,
    pub failures: u32,
    pub reductions: u32,
    pub downtime_hours: u32,
    pub operation_hours: u32,
}

/// Year-level operational and financial statistics for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSourceStats {
    pub name: String,
    pub energy_mwh: f64,
    pub failures: u32,
    pub downtime_hours: u32,
    pub operation_hours: u32,
    /// Fraction of the year's 8,760 hours the source ran.
    pub operation_hour_fraction: f64,
    pub fuel_cost: f64,
    pub fixed_opex: f64,
    pub var_opex: f64,
    pub depreciation: f64,
    pub ppa_cost: f64,
    pub total_cost: f64,
    /// Currency per kWh delivered by this source; zero when idle all year.
    pub unit_cost: f64,
}

/// One simulated year rolled up across the scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct YearRecord {
    pub year: usize,
    pub total_energy_req_mwh: f64,
    pub energy_served_mwh: f64,
    /// Percentage of hours fully served.
    pub fulfilment_pct: f64,
    /// Contiguous runs of shortfall hours, plus hours with an unserved
    /// drop; a single hour can contribute to both counts.
    pub critical_interruptions: u32,
    pub shedding_events: u32,
    pub total_cost: f64,
    /// Currency per kWh across the whole fleet.
    pub unit_cost: f64,
    pub sources: Vec<YearSourceStats>,
}

/// Day-level rollup for one source.
pub fn day_stats(source: &Source, year: usize, month: usize, day: usize) -> DayStats {
    let mut stats = DayStats {
        min_power_mw: f64::INFINITY,
        ..DayStats::default()
    };
    for hour in 0..HOURS {
        let cell = source.cell(HourStamp::new(year, month, day, hour));
        stats.min_power_mw = stats.min_power_mw.min(cell.power_output);
        stats.max_power_mw = stats.max_power_mw.max(cell.power_output);
        stats.avg_power_mw += cell.power_output;
        stats.energy_mwh += cell.energy_output;
        match cell.status {
            Status::Failed => {
                stats.failures += 1;
                stats.downtime_hours += 1;
            }
            Status::Downtime => stats.downtime_hours += 1,
            Status::Reduced => stats.reductions += 1,
            Status::On => stats.operation_hours += 1,
            _ => {}
        }
    }
    stats.avg_power_mw /= HOURS as f64;
    if stats.min_power_mw == f64::INFINITY {
        stats.min_power_mw = 0.0;
    }
    stats
}

/// Month-level rollup for one source.
pub fn month_stats(source: &Source, year: usize, month: usize) -> MonthStats {
    let mut stats = MonthStats::default();
    for day in 1..=calendar::days_in_month(month) {
        let d = day_stats(source, year, month, day);
        stats.energy_mwh += d.energy_mwh;
        stats.failures += d.failures;
        stats.reductions += d.reductions;
        stats.downtime_hours += d.downtime_hours;
        stats.operation_hours += d.operation_hours;
    }
    stats
}

/// Year-level rollup for one source, including the cost arithmetic.
///
/// Fuel, OPEX, and tariff components are inflated by
/// `(1 + inflation)^(year - 1)`; straight-line depreciation applies to
/// captive assets only and carries no inflation.
pub fn year_source_stats(source: &Source, year: usize) -> YearSourceStats {
    let mut energy_mwh = 0.0;
    let mut failures = 0;
    let mut downtime_hours = 0;
    let mut operation_hours = 0;
    for month in 1..=calendar::MONTHS {
        let m = month_stats(source, year, month);
        energy_mwh += m.energy_mwh;
        failures += m.failures;
        downtime_hours += m.downtime_hours;
        operation_hours += m.operation_hours;
    }

    let ty = &source.ty;
    let rating = source.config.rating;
    let inflation = (1.0 + ty.inflation_rate).powi(year as i32 - 1);
    let present = source.present_in_year(year);

    let (mut fuel_cost, mut fixed_opex, mut var_opex, mut depreciation, mut ppa_cost) =
        (0.0, 0.0, 0.0, 0.0, 0.0);
    if present {
        match ty.finance {
            FinanceMode::Captive => {
                fuel_cost = energy_mwh * ty.fuel_consumption * ty.fuel_cost * inflation;
                fixed_opex = rating * ty.fixed_opex_baseline * inflation;
                var_opex = energy_mwh * ty.var_opex_baseline * inflation;
                depreciation = rating * ty.capital_cost_baseline / ty.useful_life_years;
            }
            FinanceMode::Ppa => {
                fuel_cost = energy_mwh * ty.fuel_cost * inflation;
                ppa_cost = (rating * ty.tariff_fixed
                    + ty.min_annual_offtake_mwh.max(energy_mwh) * ty.tariff_var)
                    * inflation;
            }
        }
    }
    let total_cost = fuel_cost + fixed_opex + var_opex + depreciation + ppa_cost;
    let unit_cost = if energy_mwh > 0.0 {
        total_cost / (energy_mwh * 1000.0)
    } else {
        0.0
    };

    YearSourceStats {
        name: source.name.clone(),
        energy_mwh,
        failures,
        downtime_hours,
        operation_hours,
        operation_hour_fraction: operation_hours as f64 / HOURS_PER_YEAR as f64,
        fuel_cost,
        fixed_opex,
        var_opex,
        depreciation,
        ppa_cost,
        total_cost,
        unit_cost,
    }
}

/// Rolls a simulated scenario up into per-year records.
pub fn aggregate_scenario(scenario: &Scenario<'_>) -> Vec<YearRecord> {
    let mut records = Vec::with_capacity(calendar::YEARS);
    for year in 1..=calendar::YEARS {
        let mut total_energy_req_mwh = 0.0;
        let mut energy_served_mwh = 0.0;
        let mut served_hours = 0usize;
        let mut critical_interruptions = 0;
        let mut shedding_events = 0;
        let mut in_shortfall = false;
        for at in calendar::iter_hours_of_year(year) {
            let record = scenario.hourly(at);
            total_energy_req_mwh += record.power_req;
            energy_served_mwh += record.power_req - record.unserved_power_req;
            if record.unserved_power_req <= POWER_TOLERANCE_MW {
                served_hours += 1;
                in_shortfall = false;
            } else {
                if !in_shortfall {
                    critical_interruptions += 1;
                }
                in_shortfall = true;
            }
            if record.unserved_power_drop > POWER_TOLERANCE_MW {
                critical_interruptions += 1;
            }
            if record.load_shed > POWER_TOLERANCE_MW {
                shedding_events += 1;
            }
        }

        let sources: Vec<YearSourceStats> = scenario
            .sources()
            .iter()
            .map(|s| year_source_stats(s, year))
            .collect();
        let total_cost: f64 = sources.iter().map(|s| s.total_cost).sum();
        let year_energy: f64 = sources.iter().map(|s| s.energy_mwh).sum();
        let unit_cost = if year_energy > 0.0 {
            total_cost / (year_energy * 1000.0)
        } else {
            0.0
        };

        records.push(YearRecord {
            year,
            total_energy_req_mwh,
            energy_served_mwh,
            fulfilment_pct: 100.0 * served_hours as f64 / HOURS_PER_YEAR as f64,
            critical_interruptions,
            shedding_events,
            total_cost,
            unit_cost,
            sources,
        });
    }
    records
}
