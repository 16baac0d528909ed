//! Hour-by-hour simulator for hybrid on-site power supplies.
//!
//! Models a portfolio of heterogeneous sources (solar plants, captive
//! combustion generators, purchased-power feeds, battery storage)
//! dispatched against an hourly demand profile over a 12-year horizon.
//! Availability (failures, downtime, renewable output drops) is seeded
//! deterministically up front; the dispatch engine then allocates sources
//! in priority order under spinning-reserve and loading constraints,
//! manages BESS charge/discharge across hour boundaries, absorbs sudden
//! power drops through block-load acceptance, and rolls results up into
//! yearly statistics and scenario KPIs.

/// Day/month/year rollup and cost arithmetic.
pub mod aggregate;
/// Fixed simulation calendar and hour-stamp arithmetic.
pub mod calendar;
/// Source-type catalogue and metadata.
pub mod catalog;
/// TOML scenario configuration and presets.
pub mod config;
pub mod error;
/// CSV export of hourly and yearly results.
pub mod io;
/// Shared read-only project inputs.
pub mod project;
/// Simulation engine, dispatch passes, BESS behaviour, and KPIs.
pub mod sim;
pub mod source;
