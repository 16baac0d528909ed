//! Sudden-power-drop handling via block-load acceptance.
//!
//! When seeded failures or renewable reductions remove output mid-hour,
//! sources capable of picking up load instantaneously absorb what they can,
//! bounded by their block-load acceptance rating and remaining reserve.
//! Whatever remains is split into non-critical load shed and a critical
//! unserved drop.

use crate::calendar::HourStamp;
use crate::project::ProjectContext;
use crate::source::{Source, Status};

use super::POWER_TOLERANCE_MW;

/// Residual of a drop after block-load absorption.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DropOutcome {
    /// Portion of the drop that hit critical load, MW.
    pub unserved_power_drop: f64,
    /// Non-critical load shed, MW.
    pub load_shed: f64,
}

/// Absorbs `drop` MW of sudden output loss with block-load-capable sources.
///
/// Reorders the source list by descending block-load acceptance; the caller
/// restores priority order before the next hour. BESS absorb in any
/// operable state, other sources only while running. A BESS whose
/// contribution is small relative to its stored energy returns to its
/// prior state with the reserve refunded, modelling a sub-hour pickup and
/// return to idle.
pub fn handle_sudden_drop(
    sources: &mut [Source],
    at: HourStamp,
    drop: f64,
    current_load: f64,
    project: &ProjectContext,
) -> DropOutcome {
    let year_one = project.load_projection[0];
    let sheddable = if year_one.total_load_mw > 0.0 {
        (year_one.total_load_mw - year_one.critical_load_mw).max(0.0)
            * (current_load / year_one.total_load_mw).min(1.0)
    } else {
        0.0
    };

    sources.sort_by(|a, b| {
        b.ty.block_load_acceptance_pct
            .partial_cmp(&a.ty.block_load_acceptance_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut deficit = drop;
    let mut start = 0;
    while start < sources.len() && deficit >= POWER_TOLERANCE_MW {
        let block_pct = sources[start].ty.block_load_acceptance_pct;
        let mut end = start + 1;
        while end < sources.len() && sources[end].ty.block_load_acceptance_pct == block_pct {
            end += 1;
        }
        let group = start..end;
        start = end;
        if block_pct <= 0.0 {
            // Sorted descending, so nothing below can accept block load.
            break;
        }

        let eligible = |src: &Source| {
            let cell = src.cell(at);
            if src.is_bess() {
                cell.status.is_available()
            } else {
                cell.status == Status::On
            }
        };

        let mut group_block_cap = 0.0;
        let mut group_reserve = 0.0;
        for i in group.clone() {
            if !eligible(&sources[i]) {
                continue;
            }
            group_block_cap += sources[i].config.rating * block_pct / 100.0;
            group_reserve += sources[i].cell(at).reserve;
        }
        if group_block_cap <= 0.0 || group_reserve <= 0.0 {
            continue;
        }

        let contribution = group_block_cap.min(deficit).min(group_reserve);
        for i in group {
            if !eligible(&sources[i]) {
                continue;
            }
            let is_bess = sources[i].is_bess();
            let cell = sources[i].cell_mut(at);
            let prior_reserve = cell.reserve;
            if prior_reserve <= 0.0 {
                continue;
            }
            let prior_status = cell.status;
            let share = contribution * prior_reserve / group_reserve;
            cell.power_output += share;
            cell.energy_output += share;
            cell.reserve -= share;
            if is_bess {
                if share / prior_reserve <= 0.2 {
                    // Sub-hour pickup: the battery returns to idle with its
                    // stored energy intact.
                    cell.reserve = prior_reserve;
                    cell.status = prior_status;
                } else {
                    cell.status = Status::On;
                }
            }
        }
        deficit -= contribution;
    }

    // Failed sources deliver nothing, whatever the passes left behind.
    for src in sources.iter_mut() {
        let cell = src.cell_mut(at);
        if cell.status == Status::Failed {
            cell.power_output = 0.0;
            cell.energy_output = 0.0;
            cell.reserve = 0.0;
        }
    }

    if deficit < POWER_TOLERANCE_MW {
        deficit = 0.0;
    }
    let load_shed = sheddable.min(deficit);
    DropOutcome {
        unserved_power_drop: (deficit - load_shed).max(0.0),
        load_shed,
    }
}
