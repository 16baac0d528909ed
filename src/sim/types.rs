//! Per-hour scenario results.

/// Scenario-level record of one simulated hour.
///
/// Per-source state lives in each source's own tensor; this captures what
/// the hour looked like from the site's perspective.
#[derive(Debug, Clone, Default)]
pub struct HourlyRecord {
    /// Demand this hour, MW.
    pub power_req: f64,
    /// Demand left unserved after all dispatch stages, MW.
    pub unserved_power_req: f64,
    /// Within-hour output loss from seeded failures and reductions, MW.
    pub sudden_power_drop: f64,
    /// Portion of the drop that hit critical load, MW.
    pub unserved_power_drop: f64,
    /// Non-critical load shed to absorb the drop, MW.
    pub load_shed: f64,
    /// Power drawn by generators to recharge BESS this hour, MW.
    pub bess_charge_mw: f64,
    /// Human-readable summary of the hour.
    pub log: String,
}
