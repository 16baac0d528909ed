//! Source instances: per-deployment configuration, the hourly operational
//! tensor, and the pre-simulation seeding pass.
//!
//! Each source owns a dense tensor of [`HourCell`]s covering the whole
//! 12-year horizon. Seeding fills the tensor with capacities and a fully
//! determined availability mask (failures, downtime windows, renewable
//! output drops) before any dispatch happens, so the simulate loop never
//! touches the random stream.

use rand::rngs::StdRng;
use rand::Rng;

use crate::calendar::{self, HOURS, HourStamp, TENSOR_CELLS, YEARS};
use crate::catalog::{SourceKind, SourceType};
use crate::error::SimError;
use crate::project::ProjectContext;

/// Operational state of a source for one hour.
///
/// CSV exports encode the state numerically via [`Status::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Source not present this year (outside its commissioning window).
    Absent,
    /// Seeded failure at this hour.
    Failed,
    /// Within the downtime window following a failure.
    Downtime,
    /// Operable, not dispatched this hour.
    Off,
    /// Dispatched to deliver power.
    On,
    /// Renewable with a seeded sudden output drop this hour.
    Reduced,
    /// Transient marker: selected to hold spinning reserve at minimum load.
    SrStaged,
    /// BESS receiving charge this hour.
    Charging,
}

impl Status {
    /// Numeric code used in CSV exports.
    pub fn code(self) -> f64 {
        match self {
            Status::Absent => -3.0,
            Status::Failed => -1.0,
            Status::Downtime => -2.0,
            Status::Off => 0.0,
            Status::On => 1.0,
            Status::Reduced => 0.5,
            Status::SrStaged => 0.1,
            Status::Charging => 2.0,
        }
    }

    /// Whether the source can physically run this hour.
    pub fn is_available(self) -> bool {
        !matches!(self, Status::Absent | Status::Failed | Status::Downtime)
    }
}

/// One hour of per-source operational state.
///
/// Written exactly once per hour during dispatch; `participating` marks
/// membership in the current allocation pass without overloading the
/// power field.
#[derive(Debug, Clone, Copy)]
pub struct HourCell {
    /// Available capacity in MW, or stored-energy capacity in MWh for BESS.
    pub capacity: f64,
    /// Power delivered this hour, MW.
    pub power_output: f64,
    /// Energy delivered over the hour, MWh.
    pub energy_output: f64,
    /// Spinning headroom in MW, or stored energy in MWh for BESS.
    pub reserve: f64,
    /// Reserve this source is contractually required to hold, MW.
    pub mandatory_reserve: f64,
    pub status: Status,
    /// Set while the source takes part in the current Pass-B allocation.
    pub participating: bool,
}

impl Default for HourCell {
    fn default() -> Self {
        Self {
            capacity: 0.0,
            power_output: 0.0,
            energy_output: 0.0,
            reserve: 0.0,
            mandatory_reserve: 0.0,
            status: Status::Absent,
            participating: false,
        }
    }
}

/// Unit of a source's rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingUnit {
    /// Power rating (generators, feeds).
    Mw,
    /// Energy capacity (BESS).
    Mwh,
}

/// Per-deployment configuration of a source instance.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// First simulated year the source exists, 1-based.
    pub start_year: usize,
    /// Last simulated year the source exists, inclusive.
    pub end_year: usize,
    /// Rating in MW, or MWh for BESS.
    pub rating: f64,
    pub unit: RatingUnit,
    /// Dispatch priority group; lower dispatches first.
    pub priority: u32,
    /// This group's contribution share of the scenario spinning reserve,
    /// percent.
    pub spinning_reserve_pct: f64,
    /// Minimum loading when running, percent of capacity.
    pub min_loading_pct: f64,
    /// Maximum loading, percent of rating.
    pub max_loading_pct: f64,
}

/// A configured source with its operational tensor.
pub struct Source {
    pub name: String,
    pub ty: SourceType,
    pub config: SourceConfig,
    ops: Vec<HourCell>,
}

impl Source {
    /// Creates a source from a catalogue type and instance configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an inverted year window, a
    /// non-positive rating, inconsistent loading limits, or a rating unit
    /// that does not match the technology class.
    pub fn new(
        name: impl Into<String>,
        ty: SourceType,
        config: SourceConfig,
    ) -> Result<Self, SimError> {
        let name = name.into();
        let field = |f: &str| format!("sources.{name}.{f}");
        if config.start_year < 1 || config.start_year > YEARS {
            return Err(SimError::config(
                field("start_year"),
                format!("must be in [1, {YEARS}]"),
            ));
        }
        if config.end_year < config.start_year || config.end_year > YEARS {
            return Err(SimError::config(
                field("end_year"),
                format!("must be in [start_year, {YEARS}]"),
            ));
        }
        if config.rating <= 0.0 {
            return Err(SimError::config(field("rating"), "must be > 0"));
        }
        if !(0.0..=100.0).contains(&config.min_loading_pct)
            || !(0.0..=100.0).contains(&config.max_loading_pct)
            || config.min_loading_pct > config.max_loading_pct
        {
            return Err(SimError::config(
                field("min_loading_pct"),
                "loading limits must satisfy 0 <= min <= max <= 100",
            ));
        }
        if !(0.0..=100.0).contains(&config.spinning_reserve_pct) {
            return Err(SimError::config(
                field("spinning_reserve_pct"),
                "must be in [0, 100]",
            ));
        }
        let expected_unit = if ty.kind == SourceKind::Bess {
            RatingUnit::Mwh
        } else {
            RatingUnit::Mw
        };
        if config.unit != expected_unit {
            return Err(SimError::config(
                field("unit"),
                match expected_unit {
                    RatingUnit::Mwh => "BESS ratings are energy capacities in MWh",
                    RatingUnit::Mw => "non-BESS ratings are power ratings in MW",
                },
            ));
        }
        Ok(Self {
            name,
            ty,
            config,
            ops: vec![HourCell::default(); TENSOR_CELLS],
        })
    }

    /// Whether this is a battery energy storage source.
    pub fn is_bess(&self) -> bool {
        self.ty.kind == SourceKind::Bess
    }

    /// The cell for the given hour.
    pub fn cell(&self, at: HourStamp) -> &HourCell {
        &self.ops[at.flat()]
    }

    /// Mutable access to the cell for the given hour.
    pub fn cell_mut(&mut self, at: HourStamp) -> &mut HourCell {
        &mut self.ops[at.flat()]
    }

    /// Whether `year` falls inside the commissioning window.
    pub fn present_in_year(&self, year: usize) -> bool {
        year >= self.config.start_year && year <= self.config.end_year
    }

    /// Runs the full seeding pass: capacity fill, failure/downtime seeding,
    /// then renewable sudden-drop seeding.
    ///
    /// Consumes the scenario's single random stream; two runs with the same
    /// stream state and inputs produce identical tensors.
    pub fn seed(&mut self, project: &ProjectContext, rng: &mut StdRng) {
        self.fill_capacity(project);
        self.seed_failures(rng);
        self.seed_output_drops(rng);
    }

    /// Capacity rule per technology class. BESS cells also start with a
    /// full reserve, the stored-energy initial condition at commissioning.
    fn fill_capacity(&mut self, project: &ProjectContext) {
        let start_year = self.config.start_year;
        let rating = self.config.rating;
        let max_loading = self.config.max_loading_pct / 100.0;
        let degradation = 1.0 - self.ty.annual_degradation_pct / 100.0;
        for stamp in calendar::iter_hours() {
            if !self.present_in_year(stamp.year) {
                continue;
            }
            let capacity = match self.ty.kind {
                SourceKind::CaptiveThermal => {
                    let years_of_operation = (stamp.year - start_year) as f64;
                    rating * max_loading * degradation.powf(years_of_operation)
                }
                SourceKind::Renewable => {
                    project.solar_output_per_5mw(stamp.month, stamp.day, stamp.hour) / 5.0 * rating
                }
                SourceKind::PpaFeed => rating,
                SourceKind::Bess => rating,
            };
            let cell = &mut self.ops[stamp.flat()];
            cell.capacity = capacity;
            cell.status = Status::Off;
            if self.ty.kind == SourceKind::Bess {
                cell.reserve = capacity;
            }
        }
    }

    /// Draws this year's actual failure count from the planned one: one
    /// third of years honour the plan, one third see half of it (rounded
    /// up, at least one), the rest see none.
    fn draw_failure_count(planned: u32, rng: &mut StdRng) -> u32 {
        if planned == 0 {
            return 0;
        }
        let roll: f64 = rng.random();
        if roll < 1.0 / 3.0 {
            planned
        } else if roll < 2.0 / 3.0 {
            planned.div_ceil(2).max(1)
        } else {
            0
        }
    }

    fn seed_failures(&mut self, rng: &mut StdRng) {
        if self.ty.num_annual_fails == 0 {
            return;
        }
        for year in self.config.start_year..=self.config.end_year {
            let actual = Self::draw_failure_count(self.ty.num_annual_fails, rng);
            if actual == 0 {
                continue;
            }
            // Candidate hours exclude hour 0 so every failure has an
            // in-day predecessor for drop arithmetic.
            let timeline: Vec<HourStamp> = calendar::iter_hours_of_year(year)
                .filter(|s| s.hour >= 1)
                .collect();
            let count = (actual as usize).min(timeline.len());
            let mut picks: Vec<HourStamp> = rand::seq::index::sample(rng, timeline.len(), count)
                .iter()
                .map(|i| timeline[i])
                .collect();
            picks.sort_by_key(HourStamp::flat);
            for stamp in &picks {
                self.ops[stamp.flat()].status = Status::Failed;
            }
            for stamp in &picks {
                self.mark_downtime(*stamp);
            }
        }
    }

    /// Marks the downtime window after a failure, walking forward across
    /// day/month/year boundaries without overwriting `Failed` or `Absent`.
    fn mark_downtime(&mut self, failed_at: HourStamp) {
        let mut cursor = failed_at;
        for _ in 1..self.ty.downtime_per_fail {
            let Some(next) = cursor.next() else {
                return;
            };
            cursor = next;
            let cell = &mut self.ops[cursor.flat()];
            if !matches!(cell.status, Status::Failed | Status::Absent) {
                cell.status = Status::Downtime;
            }
        }
    }

    /// Seeds renewable sudden-output drops: per day, the candidate hours
    /// are those whose capacity fell relative to the previous hour.
    fn seed_output_drops(&mut self, rng: &mut StdRng) {
        let drops = self.ty.solar_sudden_drops as usize;
        if self.ty.kind != SourceKind::Renewable || drops == 0 {
            return;
        }
        for year in self.config.start_year..=self.config.end_year {
            for month in 1..=calendar::MONTHS {
                for day in 1..=calendar::days_in_month(month) {
                    let mut candidates = Vec::new();
                    for hour in 1..HOURS {
                        let here = HourStamp::new(year, month, day, hour).flat();
                        let before = HourStamp::new(year, month, day, hour - 1).flat();
                        if self.ops[here].status == Status::Off
                            && self.ops[here].capacity < self.ops[before].capacity
                        {
                            candidates.push(here);
                        }
                    }
                    if candidates.is_empty() {
                        continue;
                    }
                    let count = candidates.len().min(drops);
                    for i in rand::seq::index::sample(rng, candidates.len(), count) {
                        self.ops[candidates[i]].status = Status::Reduced;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("type", &self.ty.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceType;
    use rand::SeedableRng;

    fn gen_config(priority: u32) -> SourceConfig {
        SourceConfig {
            start_year: 1,
            end_year: 12,
            rating: 10.0,
            unit: RatingUnit::Mw,
            priority,
            spinning_reserve_pct: 0.0,
            min_loading_pct: 10.0,
            max_loading_pct: 100.0,
        }
    }

    #[test]
    fn new_rejects_inverted_year_window() {
        let mut cfg = gen_config(1);
        cfg.start_year = 6;
        cfg.end_year = 3;
        let result = Source::new("g", SourceType::gas_genset(), cfg);
        assert!(matches!(result, Err(SimError::Configuration { .. })));
    }

    #[test]
    fn new_rejects_negative_rating() {
        let mut cfg = gen_config(1);
        cfg.rating = -1.0;
        assert!(Source::new("g", SourceType::gas_genset(), cfg).is_err());
    }

    #[test]
    fn new_rejects_mw_unit_for_bess() {
        let mut cfg = gen_config(1);
        cfg.unit = RatingUnit::Mw;
        assert!(Source::new("b", SourceType::bess(), cfg).is_err());
    }

    #[test]
    fn capacity_fill_applies_max_loading_and_degradation() {
        let mut ty = SourceType::gas_genset();
        ty.annual_degradation_pct = 10.0;
        ty.num_annual_fails = 0;
        let mut cfg = gen_config(1);
        cfg.max_loading_pct = 80.0;
        let mut src = Source::new("g", ty, cfg).ok().unwrap();
        let project = ProjectContext::uniform(5.0);
        let mut rng = StdRng::seed_from_u64(7);
        src.seed(&project, &mut rng);

        let y1 = src.cell(HourStamp::new(1, 1, 1, 0)).capacity;
        let y3 = src.cell(HourStamp::new(3, 1, 1, 0)).capacity;
        assert!((y1 - 8.0).abs() < 1e-9);
        assert!((y3 - 8.0 * 0.9 * 0.9).abs() < 1e-9);
        // Monotone non-increasing across the horizon
        let mut last = f64::INFINITY;
        for year in 1..=12 {
            let c = src.cell(HourStamp::new(year, 1, 1, 0)).capacity;
            assert!(c <= last + 1e-12);
            last = c;
        }
    }

    #[test]
    fn absent_outside_commissioning_window() {
        let mut cfg = gen_config(1);
        cfg.start_year = 5;
        cfg.end_year = 9;
        let mut src = Source::new("g", SourceType::gas_genset(), cfg).ok().unwrap();
        let project = ProjectContext::uniform(5.0);
        let mut rng = StdRng::seed_from_u64(7);
        src.seed(&project, &mut rng);

        assert_eq!(src.cell(HourStamp::new(4, 12, 31, 23)).status, Status::Absent);
        assert_eq!(src.cell(HourStamp::new(10, 1, 1, 0)).status, Status::Absent);
        assert!(src.cell(HourStamp::new(5, 1, 1, 0)).status != Status::Absent);
        assert!(src.cell(HourStamp::new(5, 1, 1, 0)).capacity > 0.0);
    }

    #[test]
    fn renewable_capacity_tracks_solar_profile() {
        let mut ty = SourceType::solar_pv();
        ty.solar_sudden_drops = 0;
        let mut src = Source::new("s", ty, gen_config(1)).ok().unwrap();
        let project = ProjectContext::uniform(1.0)
            .with_solar_profile(|_, _, h| if h == 12 { 5.0 } else { 0.0 });
        let mut rng = StdRng::seed_from_u64(7);
        src.seed(&project, &mut rng);

        assert_eq!(src.cell(HourStamp::new(1, 6, 15, 12)).capacity, 10.0);
        assert_eq!(src.cell(HourStamp::new(1, 6, 15, 8)).capacity, 0.0);
    }

    #[test]
    fn failure_counts_match_drawn_plan() {
        let mut ty = SourceType::gas_genset();
        ty.num_annual_fails = 5;
        ty.downtime_per_fail = 3;
        let mut src = Source::new("g", ty, gen_config(1)).ok().unwrap();
        let project = ProjectContext::uniform(5.0);
        let mut rng = StdRng::seed_from_u64(42);
        src.seed(&project, &mut rng);

        for year in 1..=12 {
            let failed = calendar::iter_hours_of_year(year)
                .filter(|s| src.cell(*s).status == Status::Failed)
                .count();
            // Biased draw: plan, half of plan, or zero
            assert!(
                failed == 5 || failed == 3 || failed == 0,
                "year {year} drew {failed} failures"
            );
        }
    }

    #[test]
    fn downtime_follows_each_failure() {
        let mut ty = SourceType::gas_genset();
        ty.num_annual_fails = 2;
        ty.downtime_per_fail = 4;
        let mut src = Source::new("g", ty, gen_config(1)).ok().unwrap();
        let project = ProjectContext::uniform(5.0);
        let mut rng = StdRng::seed_from_u64(11);
        src.seed(&project, &mut rng);

        for stamp in calendar::iter_hours() {
            if src.cell(stamp).status != Status::Failed {
                continue;
            }
            let mut cursor = stamp;
            for _ in 1..4 {
                let Some(next) = cursor.next() else { break };
                cursor = next;
                let st = src.cell(cursor).status;
                assert!(
                    matches!(st, Status::Downtime | Status::Failed | Status::Absent),
                    "expected downtime after failure at {stamp:?}, got {st:?}"
                );
            }
        }
    }

    #[test]
    fn seeding_is_deterministic_for_equal_seed() {
        let build = || {
            let mut src =
                Source::new("g", SourceType::gas_genset(), gen_config(1)).ok().unwrap();
            let project = ProjectContext::uniform(5.0);
            let mut rng = StdRng::seed_from_u64(1234);
            src.seed(&project, &mut rng);
            src
        };
        let a = build();
        let b = build();
        for stamp in calendar::iter_hours() {
            assert_eq!(a.cell(stamp).status, b.cell(stamp).status);
            assert_eq!(a.cell(stamp).capacity, b.cell(stamp).capacity);
        }
    }

    #[test]
    fn output_drops_seeded_on_falling_capacity_hours() {
        let mut ty = SourceType::solar_pv();
        ty.solar_sudden_drops = 1;
        let mut src = Source::new("s", ty, gen_config(1)).ok().unwrap();
        // Triangle profile: capacity rises to noon and falls after
        let project = ProjectContext::uniform(1.0).with_solar_profile(|_, _, h| {
            let h = h as f64;
            (5.0 - (h - 12.0).abs()).max(0.0)
        });
        let mut rng = StdRng::seed_from_u64(3);
        src.seed(&project, &mut rng);

        let mut found = 0;
        for stamp in calendar::iter_hours_of_year(1) {
            if src.cell(stamp).status == Status::Reduced {
                found += 1;
                let before = stamp.prev().map(|p| src.cell(p).capacity).unwrap_or(0.0);
                assert!(src.cell(stamp).capacity < before);
            }
        }
        // One drop per day
        assert_eq!(found, 365);
    }
}
