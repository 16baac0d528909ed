//! Scenario KPI rollup from the yearly records.

use std::fmt;

use crate::aggregate::YearRecord;

/// Key performance indicators for one simulated scenario.
///
/// Computed post-hoc from the year records so step data and reported
/// metrics cannot drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioKpis {
    /// Average of the yearly unit costs, currency per kWh. Years that
    /// delivered no energy are excluded.
    pub average_unit_cost: f64,
    /// Average of the yearly fulfilment percentages.
    pub energy_fulfilment_pct: f64,
    /// Total critical-load interruptions over the horizon.
    pub critical_load_interruptions: u64,
    /// Estimated monetary loss from interruptions, millions of currency.
    pub interruption_loss_m: f64,
    /// Total non-critical shedding events over the horizon.
    pub load_shedding_events: u64,
}

impl ScenarioKpis {
    /// Computes KPIs from the per-year records.
    ///
    /// # Arguments
    ///
    /// * `records` - Year records from the aggregator
    /// * `loss_during_failure` - Currency loss per interruption event
    pub fn from_year_records(records: &[YearRecord], loss_during_failure: f64) -> Self {
        if records.is_empty() {
            return Self {
                average_unit_cost: 0.0,
                energy_fulfilment_pct: 0.0,
                critical_load_interruptions: 0,
                interruption_loss_m: 0.0,
                load_shedding_events: 0,
            };
        }

        let mut cost_sum = 0.0;
        let mut cost_years = 0usize;
        let mut fulfilment_sum = 0.0;
        let mut interruptions = 0u64;
        let mut shedding = 0u64;
        for record in records {
            if record.energy_served_mwh > 0.0 && record.unit_cost > 0.0 {
                cost_sum += record.unit_cost;
                cost_years += 1;
            }
            fulfilment_sum += record.fulfilment_pct;
            interruptions += u64::from(record.critical_interruptions);
            shedding += u64::from(record.shedding_events);
        }

        Self {
            average_unit_cost: if cost_years > 0 {
                cost_sum / cost_years as f64
            } else {
                0.0
            },
            energy_fulfilment_pct: fulfilment_sum / records.len() as f64,
            critical_load_interruptions: interruptions,
            interruption_loss_m: interruptions as f64 * loss_during_failure / 1_000_000.0,
            load_shedding_events: shedding,
        }
    }
}

impl fmt::Display for ScenarioKpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Scenario KPIs ---")?;
        writeln!(f, "Average unit cost:       {:.4} /kWh", self.average_unit_cost)?;
        writeln!(f, "Energy fulfilment:       {:.2} %", self.energy_fulfilment_pct)?;
        writeln!(
            f,
            "Critical interruptions:  {}",
            self.critical_load_interruptions
        )?;
        writeln!(f, "Interruption loss:       {:.3} M", self.interruption_loss_m)?;
        write!(f, "Shedding events:         {}", self.load_shedding_events)
    }
}
