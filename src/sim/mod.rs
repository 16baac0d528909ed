//! Hourly dispatch engine: priority allocation, BESS behaviour,
//! sudden-drop handling, and KPI rollup.

pub mod bess;
pub mod dispatch;
pub mod engine;
pub mod kpi;
pub mod sudden_drop;
pub mod types;

/// Residuals below this many MW are snapped to exact zero, keeping
/// accumulated floating-point drift from registering as spurious
/// shortfalls.
pub const POWER_TOLERANCE_MW: f64 = 0.01;
