//! Priority-grouped dispatch: spinning-reserve staging (Pass A), load
//! satisfaction (Pass B), and residual-reserve utilisation.
//!
//! Sources are grouped by configured priority, ascending. Pass A forces the
//! groups that are contractually obligated to hold spinning reserve to run
//! at minimum load first, so Pass B can compute available headroom
//! correctly; the two-pass split avoids double-committing capacity.

use crate::calendar::HourStamp;
use crate::source::{Source, Status};

use super::POWER_TOLERANCE_MW;
use super::bess::{self, BessPolicy};

/// Outcome of the dispatch passes for one hour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOutcome {
    /// Demand left unserved after Pass B, MW.
    pub unserved_power_req: f64,
    /// Output lost mid-hour to seeded failures and reductions, MW.
    pub sudden_power_drop: f64,
}

/// Contiguous index ranges of equal-priority groups.
///
/// Requires `sources` sorted by priority; the engine re-sorts at the end of
/// every hour to restore this after the sudden-drop handler reorders.
pub(crate) fn priority_groups(sources: &[Source]) -> Vec<std::ops::Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < sources.len() {
        let priority = sources[start].config.priority;
        let mut end = start + 1;
        while end < sources.len() && sources[end].config.priority == priority {
            end += 1;
        }
        groups.push(start..end);
        start = end;
    }
    groups
}

/// Pass A: stage spinning-reserve-obligated groups at minimum load.
///
/// Each group's required contribution is
/// `power_req * reserve_perc * contribution_pct / 10_000`. Members are
/// min-loaded until the accumulated headroom covers the requirement, then
/// the mandatory reserve is split evenly across the staged members.
fn stage_spinning_reserve(
    sources: &mut [Source],
    at: HourStamp,
    power_req: f64,
    reserve_perc: f64,
) {
    if reserve_perc <= 0.0 || power_req <= 0.0 {
        return;
    }
    for group in priority_groups(sources) {
        if sources[group.start].is_bess() {
            continue;
        }
        let contribution_pct = sources[group.start].config.spinning_reserve_pct;
        let required = power_req * reserve_perc * contribution_pct / 10_000.0;
        if required <= 0.0 {
            continue;
        }

        let mut group_reserve = 0.0;
        let mut staged = Vec::new();
        for i in group {
            let min_loading = sources[i].config.min_loading_pct / 100.0;
            let cell = sources[i].cell_mut(at);
            if !matches!(
                cell.status,
                Status::Off | Status::On | Status::Failed | Status::Reduced
            ) || cell.capacity <= 0.0
            {
                continue;
            }
            cell.power_output = cell.capacity * min_loading;
            group_reserve += cell.capacity - cell.power_output;
            if cell.status == Status::Off {
                cell.status = Status::SrStaged;
            }
            staged.push(i);
            if group_reserve >= required {
                break;
            }
        }
        if staged.is_empty() {
            continue;
        }

        let min_reserve_each = required / staged.len() as f64;
        for i in staged {
            let cell = sources[i].cell_mut(at);
            cell.mandatory_reserve = min_reserve_each;
            cell.reserve = cell.capacity - cell.power_output;
            cell.energy_output = cell.power_output;
        }
    }
}

/// Runs Pass A then Pass B over the priority groups.
///
/// Pass B walks each group marking participants until the accumulated
/// headroom (net of Pass-A output and mandatory reserve) covers the
/// remaining demand, then loads every participant by a common factor.
/// Failed participants contribute their would-be output to the sudden
/// power drop instead of the supply; reduced renewables deliver at the
/// reduced level and contribute the delta against their previous-hour
/// output.
pub fn priority_dispatch(
    sources: &mut [Source],
    at: HourStamp,
    power_req: f64,
    spinning_reserve_perc: f64,
    policy: &BessPolicy,
) -> DispatchOutcome {
    stage_spinning_reserve(sources, at, power_req, spinning_reserve_perc);

    let mut rem = power_req;
    let mut sudden_power_drop = 0.0;

    for group in priority_groups(sources) {
        if rem <= 0.0 {
            break;
        }

        if sources[group.start].is_bess() {
            if policy.priority_wise {
                let delivered = bess::non_emergency_contribution(
                    &mut sources[group],
                    at,
                    rem,
                    policy.non_emergency_use,
                );
                rem = (rem - delivered).max(0.0);
                if rem < POWER_TOLERANCE_MW {
                    rem = 0.0;
                }
            }
            continue;
        }

        // Walk the group until its headroom covers the remaining demand.
        let mut group_potential = 0.0;
        let mut any_participant = false;
        for i in group.clone() {
            let cell = sources[i].cell_mut(at);
            if matches!(cell.status, Status::Absent | Status::Downtime) {
                continue;
            }
            // Zero-capacity sources stay out, except reduced renewables:
            // their vanished output must still register as a drop.
            if cell.capacity <= 0.0 && cell.status != Status::Reduced {
                continue;
            }
            let headroom = (cell.capacity - cell.power_output - cell.mandatory_reserve).max(0.0);
            cell.participating = true;
            any_participant = true;
            if cell.status == Status::Off {
                cell.status = Status::On;
            }
            group_potential += headroom;
            if group_potential >= rem {
                break;
            }
        }
        if !any_participant {
            continue;
        }

        let loading_factor = if group_potential > 0.0 {
            (rem / group_potential).min(1.0)
        } else {
            0.0
        };
        let mut delivered = 0.0;
        for i in group {
            let prev_output = at.prev().map_or(0.0, |p| sources[i].cell(p).power_output);
            let cell = sources[i].cell_mut(at);
            if !cell.participating {
                continue;
            }
            let headroom = (cell.capacity - cell.power_output - cell.mandatory_reserve).max(0.0);
            let output = loading_factor * headroom;
            match cell.status {
                Status::On | Status::SrStaged => {
                    cell.power_output = output;
                    cell.energy_output = output;
                    cell.reserve = cell.capacity - output;
                    cell.status = Status::On;
                    delivered += output;
                }
                Status::Failed => {
                    sudden_power_drop += output;
                    cell.power_output = 0.0;
                    cell.energy_output = 0.0;
                    cell.reserve = 0.0;
                    cell.mandatory_reserve = 0.0;
                }
                Status::Reduced => {
                    sudden_power_drop += (prev_output - output).max(0.0);
                    cell.power_output = output;
                    cell.energy_output = output;
                    cell.reserve = (cell.capacity - output).max(0.0);
                    delivered += output;
                }
                _ => {}
            }
        }
        rem = (rem - delivered).max(0.0);
        if rem < POWER_TOLERANCE_MW {
            rem = 0.0;
        }
    }

    // Finalise every cell the allocation loop never rewrote. Pass-A
    // staging is provisional: a source staged for reserve whose group (or
    // position within it) was never reached reverts to idle, so its
    // min-load output cannot leak into the hourly balance. A reduced
    // renewable left unallocated still registers the output it was
    // carrying an hour ago as a sudden drop.
    for src in sources.iter_mut() {
        let prev_output = at.prev().map_or(0.0, |p| src.cell(p).power_output);
        let cell = src.cell_mut(at);
        if cell.participating {
            cell.participating = false;
            continue;
        }
        match cell.status {
            Status::SrStaged => {
                cell.status = Status::Off;
                cell.power_output = 0.0;
                cell.energy_output = 0.0;
                cell.reserve = 0.0;
                cell.mandatory_reserve = 0.0;
            }
            Status::Reduced => {
                sudden_power_drop += prev_output.max(0.0);
                cell.power_output = 0.0;
                cell.energy_output = 0.0;
                cell.reserve = 0.0;
                cell.mandatory_reserve = 0.0;
            }
            Status::Failed => {
                cell.power_output = 0.0;
                cell.energy_output = 0.0;
                cell.reserve = 0.0;
                cell.mandatory_reserve = 0.0;
            }
            _ => {}
        }
    }

    DispatchOutcome {
        unserved_power_req: rem,
        sudden_power_drop,
    }
}

/// Drains remaining spinning headroom of running non-BESS sources, in
/// priority order, against a residual shortfall. Returns the demand still
/// unserved.
pub fn drain_residual_reserve(sources: &mut [Source], at: HourStamp, mut remaining: f64) -> f64 {
    for src in sources.iter_mut() {
        if remaining < POWER_TOLERANCE_MW {
            return 0.0;
        }
        if src.is_bess() {
            continue;
        }
        let cell = src.cell_mut(at);
        if cell.status != Status::On || cell.capacity <= 0.0 || cell.reserve <= 0.0 {
            continue;
        }
        let contribution = remaining.min(cell.reserve);
        cell.power_output += contribution;
        cell.energy_output += contribution;
        cell.reserve -= contribution;
        remaining -= contribution;
    }
    if remaining < POWER_TOLERANCE_MW {
        remaining = 0.0;
    }
    remaining
}
