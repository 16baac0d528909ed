//! Post-simulation invariant sweeps over full scenario runs, plus
//! determinism and aggregation idempotence checks.

mod common;

use energymix_sim::aggregate::{aggregate_scenario, year_source_stats};
use energymix_sim::calendar::{self, HourStamp};
use energymix_sim::catalog::SourceCatalog;
use energymix_sim::config::ScenarioConfig;
use energymix_sim::project::ProjectContext;
use energymix_sim::sim::engine::Scenario;
use energymix_sim::source::Status;

const EPS: f64 = 1e-6;

/// A fleet with seeded failures, a solar profile, and a BESS: enough churn
/// to exercise every dispatch branch over the horizon.
fn churny_project() -> ProjectContext {
    ProjectContext::uniform(3.0).with_solar_profile(|_, _, hour| {
        let h = hour as f64;
        (5.0 * (1.0 - ((h - 12.0) / 6.0).powi(2))).max(0.0)
    })
}

fn churny_scenario(project: &ProjectContext, seed: u64) -> Scenario<'_> {
    let catalog = SourceCatalog::builtin();
    // The baseline preset keeps spinning reserve on (10 %, carried by the
    // gas group), so these sweeps also cover staged-but-unreached groups.
    let mut config = ScenarioConfig::baseline();
    config.scenario.seed = seed;
    let mut scenario = Scenario::from_config(&config, &catalog, project);
    assert!(scenario.is_ok(), "{:?}", scenario.err());
    let mut scenario = scenario.ok().unwrap();
    assert!(scenario.simulate().is_ok());
    scenario
}

#[test]
fn per_cell_bounds_hold_everywhere() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 7);
    for at in calendar::iter_hours() {
        for source in scenario.sources() {
            let cell = source.cell(at);
            let ctx = || format!("{} at {at:?}", source.name);
            assert!(cell.power_output >= -EPS, "negative output for {}", ctx());
            assert!(
                cell.power_output <= cell.capacity + EPS,
                "output above capacity for {}: {} > {}",
                ctx(),
                cell.power_output,
                cell.capacity
            );
            assert!(cell.energy_output >= -EPS, "negative energy for {}", ctx());
            assert!(cell.reserve >= -EPS, "negative reserve for {}", ctx());
            if !source.is_bess() {
                assert!(
                    cell.energy_output <= cell.power_output + EPS,
                    "energy above power for {}",
                    ctx()
                );
            }
        }
    }
}

#[test]
fn failed_sources_hold_nothing() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 11);
    for at in calendar::iter_hours() {
        for source in scenario.sources() {
            let cell = source.cell(at);
            if cell.status == Status::Failed {
                assert_eq!(cell.power_output, 0.0);
                assert_eq!(cell.energy_output, 0.0);
                assert_eq!(cell.reserve, 0.0);
            }
        }
    }
}

#[test]
fn absent_exactly_outside_commissioning_window() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 13);
    for at in calendar::iter_hours() {
        for source in scenario.sources() {
            let in_window = at.year >= source.config.start_year
                && at.year <= source.config.end_year;
            let absent = source.cell(at).status == Status::Absent;
            assert_eq!(
                absent, !in_window,
                "{} at {at:?}: absent={absent}, in_window={in_window}",
                source.name
            );
        }
    }
}

#[test]
fn hourly_power_balance_closes() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 17);
    for at in calendar::iter_hours() {
        let record = scenario.hourly(at);
        let supply: f64 = scenario
            .sources()
            .iter()
            .map(|s| s.cell(at).power_output)
            .sum();
        // The drop handler only runs on fully served hours; its absorbed
        // share plus shed plus the critical residual then accounts for the
        // whole drop.
        let drop_term = if record.unserved_power_req <= 0.0 {
            record.sudden_power_drop
        } else {
            0.0
        };
        let lhs =
            supply + record.load_shed + record.unserved_power_req + record.unserved_power_drop;
        let rhs = record.power_req + record.bess_charge_mw + drop_term;
        // Two snap points (shortfall residual and drop residual) can each
        // discard up to the 0.01 MW tolerance.
        assert!(
            (lhs - rhs).abs() <= 0.025,
            "balance off at {at:?}: lhs={lhs:.4} rhs={rhs:.4}"
        );
    }
}

#[test]
fn failure_counts_match_drawn_plan_per_year() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 19);
    for source in scenario.sources() {
        let plan = source.ty.num_annual_fails;
        let downtime_span = source.ty.downtime_per_fail.saturating_sub(1);
        let mut total_failed = 0u32;
        for year in source.config.start_year..=source.config.end_year {
            let mut failed = 0u32;
            for at in calendar::iter_hours_of_year(year) {
                if source.cell(at).status == Status::Failed {
                    failed += 1;
                }
            }
            let half = plan.div_ceil(2).max(1);
            assert!(
                failed == 0 || failed == half || failed == plan,
                "{} year {year}: {failed} failures against plan {plan}",
                source.name
            );
            total_failed += failed;
        }
        // Downtime windows can spill across year boundaries, so bound them
        // over the whole horizon.
        let total_downtime = calendar::iter_hours()
            .filter(|at| source.cell(*at).status == Status::Downtime)
            .count() as u32;
        assert!(
            total_downtime <= total_failed * downtime_span,
            "{}: {total_downtime} downtime hours for {total_failed} failures",
            source.name
        );
    }
}

#[test]
fn aggregation_is_idempotent() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 23);
    let first = aggregate_scenario(&scenario);
    let second = aggregate_scenario(&scenario);
    assert_eq!(first, second);
}

#[test]
fn equal_seeds_reproduce_the_run() {
    let project = churny_project();
    let a = churny_scenario(&project, 29);
    let b = churny_scenario(&project, 29);
    for at in calendar::iter_hours() {
        for (sa, sb) in a.sources().iter().zip(b.sources()) {
            assert_eq!(sa.name, sb.name);
            assert_eq!(sa.cell(at).status, sb.cell(at).status);
            assert_eq!(sa.cell(at).power_output, sb.cell(at).power_output);
            assert_eq!(sa.cell(at).reserve, sb.cell(at).reserve);
        }
        assert_eq!(
            a.hourly(at).unserved_power_req,
            b.hourly(at).unserved_power_req
        );
    }
}

#[test]
fn different_seeds_change_the_availability_mask() {
    let project = churny_project();
    let a = churny_scenario(&project, 31);
    let b = churny_scenario(&project, 32);
    let mask = |s: &Scenario<'_>| {
        let mut failed_hours = Vec::new();
        for at in calendar::iter_hours() {
            for source in s.sources() {
                if source.cell(at).status == Status::Failed {
                    failed_hours.push((source.name.clone(), at.flat()));
                }
            }
        }
        failed_hours
    };
    assert_ne!(mask(&a), mask(&b));
}

#[test]
fn late_commissioned_source_idles_until_start_year() {
    let project = ProjectContext::uniform(5.0);
    let mut cfg = common::gen_config(10.0, 1);
    cfg.start_year = 5;
    let late = common::seeded_source("late", common::quiet_genset_type(), cfg, &project, 3);
    let backup = common::seeded_source(
        "backup",
        common::quiet_genset_type(),
        common::gen_config(10.0, 2),
        &project,
        4,
    );
    let mut scenario = Scenario::new(
        "late-start",
        &project,
        vec![late, backup],
        0.0,
        common::no_bess_policy(),
    )
    .ok()
    .unwrap();
    assert!(scenario.simulate().is_ok());

    let late = &scenario.sources()[0];
    for year in 1..=4 {
        assert_eq!(year_source_stats(late, year).energy_mwh, 0.0);
        assert_eq!(late.cell(HourStamp::new(year, 6, 6, 6)).capacity, 0.0);
    }
    assert!(late.cell(HourStamp::new(5, 1, 1, 0)).capacity > 0.0);
    assert!(year_source_stats(late, 5).energy_mwh > 0.0);
}

#[test]
fn renewable_only_fleet_starves_when_dark() {
    let project = ProjectContext::uniform(2.0)
        .with_solar_profile(|_, _, hour| if (10..=14).contains(&hour) { 5.0 } else { 0.0 });
    let mut ty = common::solar_type_with_daily_drop();
    ty.solar_sudden_drops = 0;
    let mut cfg = common::gen_config(5.0, 1);
    cfg.min_loading_pct = 0.0;
    let solar = common::seeded_source("solar", ty, cfg, &project, 5);
    let mut scenario = Scenario::new(
        "solar-only",
        &project,
        vec![solar],
        0.0,
        common::no_bess_policy(),
    )
    .ok()
    .unwrap();
    assert!(scenario.simulate().is_ok());

    for at in calendar::iter_hours() {
        let record = scenario.hourly(at);
        let capacity = scenario.sources()[0].cell(at).capacity;
        if record.power_req > capacity + 0.01 {
            assert!(
                record.unserved_power_req > 0.0,
                "expected shortfall at {at:?} with capacity {capacity}"
            );
        }
    }
}

#[test]
fn failed_bess_holds_no_capacity_after_start_of_hour() {
    let project = ProjectContext::uniform(1.0);
    let genset = common::seeded_source(
        "gen",
        common::quiet_genset_type(),
        common::gen_config(5.0, 1),
        &project,
        6,
    );
    let mut bess = common::seeded_source(
        "bess",
        common::quiet_bess_type(),
        common::bess_config(2.0, 2),
        &project,
        7,
    );
    let failure = HourStamp::new(2, 2, 2, 2);
    bess.cell_mut(failure).status = Status::Failed;

    let mut scenario = Scenario::new(
        "bess-fail",
        &project,
        vec![genset, bess],
        0.0,
        common::sequential_bess_policy(),
    )
    .ok()
    .unwrap();
    assert!(scenario.simulate().is_ok());

    let cell = scenario.sources()[1].cell(failure);
    assert_eq!(cell.status, Status::Failed);
    assert_eq!(cell.capacity, 0.0);
    assert_eq!(cell.reserve, 0.0);
}

#[test]
fn aggregated_energy_matches_cell_sums() {
    let project = churny_project();
    let scenario = churny_scenario(&project, 37);
    let records = aggregate_scenario(&scenario);
    for record in &records {
        for per_source in &record.sources {
            let source = scenario
                .sources()
                .iter()
                .find(|s| s.name == per_source.name);
            assert!(source.is_some());
            let direct: f64 = calendar::iter_hours_of_year(record.year)
                .map(|at| source.map(|s| s.cell(at).energy_output).unwrap_or(0.0))
                .sum();
            assert!(
                (direct - per_source.energy_mwh).abs() < 1e-6,
                "{} year {}: {direct} vs {}",
                per_source.name,
                record.year,
                per_source.energy_mwh
            );
        }
    }
}
