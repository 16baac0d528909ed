//! Shared fixtures for integration tests.

use rand::SeedableRng;
use rand::rngs::StdRng;

use energymix_sim::catalog::SourceType;
use energymix_sim::project::ProjectContext;
use energymix_sim::sim::bess::{BessMode, BessPolicy};
use energymix_sim::source::{RatingUnit, Source, SourceConfig};

/// A captive genset type with failures and degradation switched off, so
/// scenarios are fully deterministic without touching the random stream.
pub fn quiet_genset_type() -> SourceType {
    let mut ty = SourceType::gas_genset();
    ty.num_annual_fails = 0;
    ty.annual_degradation_pct = 0.0;
    ty
}

/// A BESS type with failures switched off.
pub fn quiet_bess_type() -> SourceType {
    let mut ty = SourceType::bess();
    ty.num_annual_fails = 0;
    ty
}

/// A solar type with failures off and one seeded output drop per day.
pub fn solar_type_with_daily_drop() -> SourceType {
    let mut ty = SourceType::solar_pv();
    ty.num_annual_fails = 0;
    ty.annual_degradation_pct = 0.0;
    ty.solar_sudden_drops = 1;
    ty
}

/// Generator instance configuration covering the whole horizon.
pub fn gen_config(rating: f64, priority: u32) -> SourceConfig {
    SourceConfig {
        start_year: 1,
        end_year: 12,
        rating,
        unit: RatingUnit::Mw,
        priority,
        spinning_reserve_pct: 0.0,
        min_loading_pct: 10.0,
        max_loading_pct: 100.0,
    }
}

/// BESS instance configuration covering the whole horizon.
pub fn bess_config(rating_mwh: f64, priority: u32) -> SourceConfig {
    SourceConfig {
        start_year: 1,
        end_year: 12,
        rating: rating_mwh,
        unit: RatingUnit::Mwh,
        priority,
        spinning_reserve_pct: 0.0,
        min_loading_pct: 0.0,
        max_loading_pct: 100.0,
    }
}

/// Builds and seeds a source against the given project.
pub fn seeded_source(
    name: &str,
    ty: SourceType,
    config: SourceConfig,
    project: &ProjectContext,
    seed: u64,
) -> Source {
    let source = Source::new(name, ty, config);
    assert!(source.is_ok(), "fixture source should build: {:?}", source.err());
    let mut source = source.ok().unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    source.seed(project, &mut rng);
    source
}

/// Policy with BESS completely passive.
pub fn no_bess_policy() -> BessPolicy {
    BessPolicy {
        non_emergency_use: BessMode::None,
        priority_wise: false,
        charge_hours: 1.0,
        charge_ratio_night_pct: 100.0,
    }
}

/// Policy with sequential BESS utilisation (mode 2), post-hoc.
pub fn sequential_bess_policy() -> BessPolicy {
    BessPolicy {
        non_emergency_use: BessMode::SequentialUtilisation,
        priority_wise: false,
        charge_hours: 1.0,
        charge_ratio_night_pct: 100.0,
    }
}
