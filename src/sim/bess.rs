//! BESS behaviour across the hour boundary: reserve carry-over,
//! non-emergency discharge, and recharging from generator headroom.
//!
//! A BESS cell's `capacity` is its energy capacity in MWh and `reserve` is
//! the energy currently stored; within a one-hour step the two read
//! directly as MW limits.

use crate::calendar::HourStamp;
use crate::source::{Source, Status};

use super::POWER_TOLERANCE_MW;
use super::dispatch::priority_groups;

/// How BESS participates outside emergencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BessMode {
    /// BESS only reacts to sudden drops.
    None,
    /// Shortfalls are spread across all operable BESS pro-rata to their
    /// stored energy.
    EqualDistribution,
    /// BESS are drained one by one in list order.
    SequentialUtilisation,
}

impl BessMode {
    /// Maps the configuration code (0/1/2) to a mode.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::EqualDistribution),
            2 => Some(Self::SequentialUtilisation),
            _ => None,
        }
    }
}

/// Scenario-level BESS policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct BessPolicy {
    pub non_emergency_use: BessMode,
    /// Dispatch BESS at its priority position instead of after all
    /// generator groups.
    pub priority_wise: bool,
    /// Hours a full recharge is spread over.
    pub charge_hours: f64,
    /// Multiplier on night-hour charging, percent.
    pub charge_ratio_night_pct: f64,
}

/// Start-of-hour pass: carry stored energy across the hour boundary.
///
/// Operable BESS reset to `Off` and inherit the previous hour's reserve;
/// the very first hour of the simulation (and the first hour after
/// commissioning) keeps the seeded initial reserve. Failed or down BESS
/// hold no usable capacity or energy.
pub fn start_of_hour(sources: &mut [Source], at: HourStamp) {
    let prev = at.prev();
    for src in sources.iter_mut().filter(|s| s.is_bess()) {
        let carried = prev.and_then(|p| {
            let cell = src.cell(p);
            (cell.status != Status::Absent).then_some(cell.reserve)
        });
        let cell = src.cell_mut(at);
        match cell.status {
            Status::Off | Status::On | Status::Charging => {
                cell.status = Status::Off;
                if let Some(reserve) = carried {
                    cell.reserve = reserve.min(cell.capacity);
                }
            }
            Status::Failed | Status::Downtime => {
                cell.capacity = 0.0;
                cell.reserve = 0.0;
            }
            _ => {}
        }
    }
}

/// Discharges BESS against a shortfall according to the configured mode.
/// Returns the power delivered.
pub fn non_emergency_contribution(
    sources: &mut [Source],
    at: HourStamp,
    demand: f64,
    mode: BessMode,
) -> f64 {
    if demand <= 0.0 {
        return 0.0;
    }
    match mode {
        BessMode::None => 0.0,
        BessMode::EqualDistribution => {
            let total: f64 = sources
                .iter()
                .filter(|s| s.is_bess())
                .map(|s| s.cell(at))
                .filter(|c| c.status.is_available())
                .map(|c| c.reserve)
                .sum();
            if total <= 0.0 {
                return 0.0;
            }
            let loading_factor = (demand / total).min(1.0);
            let mut delivered = 0.0;
            for src in sources.iter_mut().filter(|s| s.is_bess()) {
                let cell = src.cell_mut(at);
                if !cell.status.is_available() || cell.reserve <= 0.0 {
                    continue;
                }
                let share = cell.reserve * loading_factor;
                cell.power_output += share;
                cell.energy_output += share;
                cell.reserve -= share;
                cell.status = Status::On;
                delivered += share;
            }
            delivered
        }
        BessMode::SequentialUtilisation => {
            let mut remaining = demand;
            let mut delivered = 0.0;
            for src in sources.iter_mut().filter(|s| s.is_bess()) {
                if remaining < POWER_TOLERANCE_MW {
                    break;
                }
                let cell = src.cell_mut(at);
                if !cell.status.is_available() || cell.reserve <= 0.0 {
                    continue;
                }
                let share = remaining.min(cell.reserve);
                cell.power_output += share;
                cell.energy_output += share;
                cell.reserve -= share;
                cell.status = if cell.reserve > 1e-9 {
                    Status::On
                } else {
                    Status::Off
                };
                delivered += share;
                remaining -= share;
            }
            delivered
        }
    }
}

/// Recharges BESS from generator headroom. Runs only when demand is
/// satisfied. Returns the power drawn from generators this hour.
///
/// The total charge deficit is scaled by the night ratio during hours
/// 19..23 and 0..8, divided over `charge_hours`, then sourced from
/// non-BESS groups in priority order, pro-rata to each member's headroom.
/// Captive diesel groups do not charge BESS between 09:00 and 17:00.
/// The energy actually delivered is apportioned back to the batteries via
/// the requirement-to-delivery ratio.
pub fn charge(sources: &mut [Source], at: HourStamp, policy: &BessPolicy) -> f64 {
    let mut deficit = 0.0;
    for src in sources.iter().filter(|s| s.is_bess()) {
        let cell = src.cell(at);
        if matches!(cell.status, Status::Off | Status::Charging) {
            deficit += (cell.capacity - cell.reserve).max(0.0);
        }
    }
    if deficit <= POWER_TOLERANCE_MW {
        return 0.0;
    }

    let night = at.hour >= 19 || at.hour <= 8;
    let scaled = if night {
        deficit * policy.charge_ratio_night_pct / 100.0
    } else {
        deficit
    };
    let charge_req = scaled / policy.charge_hours;
    if charge_req <= 0.0 {
        return 0.0;
    }

    let daytime = (9..=17).contains(&at.hour);
    let mut remaining = charge_req;
    let mut delivered = 0.0;
    for group in priority_groups(sources) {
        if remaining < POWER_TOLERANCE_MW {
            break;
        }
        let lead = &sources[group.start];
        if lead.is_bess() {
            continue;
        }
        if daytime
            && lead.ty.kind == crate::catalog::SourceKind::CaptiveThermal
            && lead.ty.fuel == crate::catalog::FuelKind::Diesel
        {
            continue;
        }

        let member_headroom = |cell: &crate::source::HourCell| {
            if matches!(cell.status, Status::On | Status::Off) && cell.capacity > 0.0 {
                (cell.capacity - cell.power_output).max(0.0)
            } else {
                0.0
            }
        };
        let group_reserve: f64 = group
            .clone()
            .map(|i| member_headroom(sources[i].cell(at)))
            .sum();
        if group_reserve <= 0.0 {
            continue;
        }

        let contribution = remaining.min(group_reserve);
        for i in group {
            let cell = sources[i].cell_mut(at);
            let headroom = member_headroom(cell);
            if headroom <= 0.0 {
                continue;
            }
            let share = contribution * headroom / group_reserve;
            cell.power_output += share;
            cell.energy_output += share;
            cell.reserve = (cell.capacity - cell.power_output).max(0.0);
            if cell.status == Status::Off {
                cell.status = Status::On;
            }
        }
        delivered += contribution;
        remaining -= contribution;
    }
    if delivered <= 0.0 {
        return 0.0;
    }

    // Apportion the delivered charge among the batteries: requirement to
    // delivery, so each battery recovers the same fraction of its deficit.
    let ratio = deficit / delivered;
    for src in sources.iter_mut().filter(|s| s.is_bess()) {
        let cell = src.cell_mut(at);
        if !matches!(cell.status, Status::Off | Status::Charging) {
            continue;
        }
        let gain = (cell.capacity - cell.reserve).max(0.0) / ratio;
        cell.reserve = (cell.reserve + gain).min(cell.capacity);
        cell.status = if cell.reserve >= cell.capacity - 1e-9 {
            Status::Off
        } else {
            Status::Charging
        };
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceType;
    use crate::project::ProjectContext;
    use crate::source::{RatingUnit, SourceConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bess(name: &str, rating_mwh: f64, priority: u32) -> Source {
        let mut ty = SourceType::bess();
        ty.num_annual_fails = 0;
        let cfg = SourceConfig {
            start_year: 1,
            end_year: 12,
            rating: rating_mwh,
            unit: RatingUnit::Mwh,
            priority,
            spinning_reserve_pct: 0.0,
            min_loading_pct: 0.0,
            max_loading_pct: 100.0,
        };
        let mut src = Source::new(name, ty, cfg).ok().unwrap();
        let project = ProjectContext::uniform(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        src.seed(&project, &mut rng);
        src
    }

    fn genset(name: &str, rating: f64, priority: u32) -> Source {
        let mut ty = SourceType::gas_genset();
        ty.num_annual_fails = 0;
        ty.annual_degradation_pct = 0.0;
        let cfg = SourceConfig {
            start_year: 1,
            end_year: 12,
            rating,
            unit: RatingUnit::Mw,
            priority,
            spinning_reserve_pct: 0.0,
            min_loading_pct: 0.0,
            max_loading_pct: 100.0,
        };
        let mut src = Source::new(name, ty, cfg).ok().unwrap();
        let project = ProjectContext::uniform(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        src.seed(&project, &mut rng);
        src
    }

    fn policy() -> BessPolicy {
        BessPolicy {
            non_emergency_use: BessMode::SequentialUtilisation,
            priority_wise: false,
            charge_hours: 1.0,
            charge_ratio_night_pct: 100.0,
        }
    }

    #[test]
    fn start_of_hour_carries_reserve_forward() {
        let mut sources = vec![bess("b1", 2.0, 1)];
        let h0 = HourStamp::new(1, 1, 1, 0);
        let h1 = HourStamp::new(1, 1, 1, 1);
        sources[0].cell_mut(h0).reserve = 0.7;
        start_of_hour(&mut sources, h1);
        assert!((sources[0].cell(h1).reserve - 0.7).abs() < 1e-12);
        assert_eq!(sources[0].cell(h1).status, Status::Off);
    }

    #[test]
    fn first_hour_keeps_seeded_reserve() {
        let mut sources = vec![bess("b1", 2.0, 1)];
        let h0 = HourStamp::new(1, 1, 1, 0);
        start_of_hour(&mut sources, h0);
        assert!((sources[0].cell(h0).reserve - 2.0).abs() < 1e-12);
    }

    #[test]
    fn failed_bess_loses_capacity_and_reserve() {
        let mut sources = vec![bess("b1", 2.0, 1)];
        let at = HourStamp::new(1, 3, 3, 3);
        sources[0].cell_mut(at).status = Status::Failed;
        start_of_hour(&mut sources, at);
        let cell = sources[0].cell(at);
        assert_eq!(cell.capacity, 0.0);
        assert_eq!(cell.reserve, 0.0);
    }

    #[test]
    fn sequential_mode_drains_in_list_order() {
        let mut sources = vec![bess("b1", 1.0, 1), bess("b2", 2.0, 1)];
        let at = HourStamp::new(1, 1, 1, 0);
        start_of_hour(&mut sources, at);
        let delivered =
            non_emergency_contribution(&mut sources, at, 1.5, BessMode::SequentialUtilisation);
        assert!((delivered - 1.5).abs() < 1e-9);
        assert!((sources[0].cell(at).reserve - 0.0).abs() < 1e-9);
        assert!((sources[1].cell(at).reserve - 1.5).abs() < 1e-9);
        assert_eq!(sources[0].cell(at).status, Status::Off);
        assert_eq!(sources[1].cell(at).status, Status::On);
    }

    #[test]
    fn equal_mode_distributes_pro_rata() {
        let mut sources = vec![bess("b1", 1.0, 1), bess("b2", 3.0, 1)];
        let at = HourStamp::new(1, 1, 1, 0);
        start_of_hour(&mut sources, at);
        let delivered =
            non_emergency_contribution(&mut sources, at, 2.0, BessMode::EqualDistribution);
        assert!((delivered - 2.0).abs() < 1e-9);
        // loading factor 0.5 applied to 1.0 and 3.0 of stored energy
        assert!((sources[0].cell(at).power_output - 0.5).abs() < 1e-9);
        assert!((sources[1].cell(at).power_output - 1.5).abs() < 1e-9);
    }

    #[test]
    fn none_mode_delivers_nothing() {
        let mut sources = vec![bess("b1", 2.0, 1)];
        let at = HourStamp::new(1, 1, 1, 0);
        start_of_hour(&mut sources, at);
        assert_eq!(
            non_emergency_contribution(&mut sources, at, 1.0, BessMode::None),
            0.0
        );
    }

    #[test]
    fn charging_draws_from_generator_headroom() {
        let mut sources = vec![genset("g1", 5.0, 1), bess("b1", 2.0, 2)];
        let at = HourStamp::new(1, 1, 1, 12);
        start_of_hour(&mut sources, at);
        // Battery half empty; generator idle with full headroom.
        sources[1].cell_mut(at).reserve = 1.0;
        let drawn = charge(&mut sources, at, &policy());
        assert!((drawn - 1.0).abs() < 1e-9);
        let genset = sources[0].cell(at);
        assert!((genset.power_output - 1.0).abs() < 1e-9);
        assert_eq!(genset.status, Status::On);
        // Full delivery at charge_hours = 1 refills the battery.
        let cell = sources[1].cell(at);
        assert!((cell.reserve - 2.0).abs() < 1e-9);
        assert_eq!(cell.status, Status::Off);
    }

    #[test]
    fn partial_delivery_leaves_bess_charging() {
        let mut sources = vec![genset("g1", 0.4, 1), bess("b1", 2.0, 2)];
        let at = HourStamp::new(1, 1, 1, 12);
        start_of_hour(&mut sources, at);
        sources[1].cell_mut(at).reserve = 1.0;
        let drawn = charge(&mut sources, at, &policy());
        assert!((drawn - 0.4).abs() < 1e-9);
        let cell = sources[1].cell(at);
        assert!(cell.reserve > 1.0 && cell.reserve < 2.0);
        assert_eq!(cell.status, Status::Charging);
    }

    #[test]
    fn night_ratio_scales_charge_requirement() {
        let mut sources = vec![genset("g1", 5.0, 1), bess("b1", 2.0, 2)];
        let at = HourStamp::new(1, 1, 1, 22);
        start_of_hour(&mut sources, at);
        sources[1].cell_mut(at).reserve = 0.0;
        let mut p = policy();
        p.charge_ratio_night_pct = 50.0;
        let drawn = charge(&mut sources, at, &p);
        // deficit 2.0 scaled to 1.0 by the night ratio
        assert!((drawn - 1.0).abs() < 1e-9);
    }

    #[test]
    fn daytime_diesel_does_not_charge() {
        let mut diesel = genset("d1", 5.0, 1);
        diesel.ty.fuel = crate::catalog::FuelKind::Diesel;
        let mut sources = vec![diesel, bess("b1", 2.0, 2)];
        let at = HourStamp::new(1, 1, 1, 12);
        start_of_hour(&mut sources, at);
        sources[1].cell_mut(at).reserve = 0.0;
        assert_eq!(charge(&mut sources, at, &policy()), 0.0);

        // The same fleet at night does charge.
        let night = HourStamp::new(1, 1, 1, 20);
        start_of_hour(&mut sources, night);
        sources[1].cell_mut(night).reserve = 0.0;
        assert!(charge(&mut sources, night, &policy()) > 0.0);
    }

    #[test]
    fn full_bess_needs_no_charge() {
        let mut sources = vec![genset("g1", 5.0, 1), bess("b1", 2.0, 2)];
        let at = HourStamp::new(1, 1, 1, 12);
        start_of_hour(&mut sources, at);
        assert_eq!(charge(&mut sources, at, &policy()), 0.0);
    }

    #[test]
    fn charge_hours_divides_hourly_allowance() {
        let mut sources = vec![genset("g1", 5.0, 1), bess("b1", 2.0, 2)];
        let at = HourStamp::new(1, 1, 1, 12);
        start_of_hour(&mut sources, at);
        sources[1].cell_mut(at).reserve = 0.0;
        let mut p = policy();
        p.charge_hours = 4.0;
        let drawn = charge(&mut sources, at, &p);
        assert!((drawn - 0.5).abs() < 1e-9);
        // Quarter of the deficit recovered this hour.
        let cell = sources[1].cell(at);
        assert!((cell.reserve - 0.5).abs() < 1e-9);
        assert_eq!(cell.status, Status::Charging);
    }
}
