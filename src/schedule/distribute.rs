use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::calendar::{is_adjacent_day, MonthRange};
use crate::eligibility::evaluator::eligible_candidates;
use crate::eligibility::rules::slot_is_staffed;
use crate::eligibility::DayState;
use crate::roster::{Doctor, DoctorId, GeneratedAssignment, ShiftRecord, Unavailability};
use crate::schedule::DistributionPlan;
use crate::taxonomy::ShiftType;

/// Counters scoped to a single pass.
#[derive(Debug, Default)]
struct PassState {
    day: DayState,
    totals: BTreeMap<DoctorId, u32>,
    last_assigned: BTreeMap<DoctorId, NaiveDate>,
}

impl PassState {
    fn total(&self, doctor_id: DoctorId) -> u32 {
        self.totals.get(&doctor_id).copied().unwrap_or(0)
    }

    fn worked_adjacent(&self, doctor_id: DoctorId, date: NaiveDate) -> bool {
        self.last_assigned
            .get(&doctor_id)
            .map(|last| is_adjacent_day(*last, date))
            .unwrap_or(false)
    }

    fn record(&mut self, doctor_id: DoctorId, date: NaiveDate) {
        self.day.place(doctor_id);
        *self.totals.entry(doctor_id).or_insert(0) += 1;
        self.last_assigned.insert(doctor_id, date);
    }
}

/// Fills every (date, shift type) slot in one greedy pass.
///
/// Dates are walked in the given order and shift types in the given order.
/// Candidates are ranked by how many slots they already hold in this pass,
/// with ties broken by a shuffle seeded from `seed`, the date and the shift
/// type position. A candidate who worked the previous or next calendar day is
/// passed over when anyone else is available. Slots nobody can take come back
/// with `doctor_id: None`.
pub fn distribute(
    dates: &[NaiveDate],
    doctors: &[Doctor],
    shift_types: &[ShiftType],
    unavailability: &Unavailability,
    seed: u64,
) -> Vec<GeneratedAssignment> {
    let mut assignments = Vec::with_capacity(dates.len() * shift_types.len());
    if dates.is_empty() || doctors.is_empty() {
        return assignments;
    }

    let mut state = PassState::default();
    for &date in dates {
        state.day.clear();
        for (index, &shift_type) in shift_types.iter().enumerate() {
            let doctor_id = if slot_is_staffed(shift_type, date) {
                pick_candidate(&state, doctors, shift_type, date, index, unavailability, seed)
            } else {
                None
            };

            match doctor_id {
                Some(id) => state.record(id, date),
                None if slot_is_staffed(shift_type, date) => {
                    debug!(%date, shift = shift_type.as_slug(), "no eligible doctor, slot left open");
                }
                None => {}
            }

            assignments.push(GeneratedAssignment {
                date,
                shift_type,
                doctor_id,
            });
        }
    }

    assignments
}

fn pick_candidate(
    state: &PassState,
    doctors: &[Doctor],
    shift_type: ShiftType,
    date: NaiveDate,
    index: usize,
    unavailability: &Unavailability,
    seed: u64,
) -> Option<DoctorId> {
    let mut pool: Vec<DoctorId> =
        eligible_candidates(doctors, shift_type, date, &state.day, unavailability)
            .into_iter()
            .map(|doctor| doctor.id)
            .collect();
    if pool.is_empty() {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(slot_seed(seed, date, index));
    pool.shuffle(&mut rng);
    // stable sort keeps the shuffled order within equal totals
    pool.sort_by_key(|id| state.total(*id));

    pool.iter()
        .copied()
        .find(|id| !state.worked_adjacent(*id, date))
        .or_else(|| pool.first().copied())
}

fn slot_seed(seed: u64, date: NaiveDate, index: usize) -> u64 {
    let ordinal = date.num_days_from_ce() as u64;
    seed ^ ordinal.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64 + 1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
}

/// Everything needed to distribute one month.
#[derive(Debug, Clone)]
pub struct MonthRequest<'a> {
    pub month: MonthRange,
    pub doctors: &'a [Doctor],
    pub shift_types: &'a [ShiftType],
    pub unavailability: &'a Unavailability,
    /// Records already stored for the month.
    pub existing: &'a [ShiftRecord],
    pub block_after_night: bool,
    pub seed: u64,
}

/// Distributes a month. With `block_after_night`, doctors already recorded on
/// a night duty are kept off every other slot that date.
pub fn plan_month(request: &MonthRequest<'_>) -> DistributionPlan {
    let mut unavailability = request.unavailability.clone();
    if request.block_after_night {
        let in_month: Vec<ShiftRecord> = request
            .existing
            .iter()
            .filter(|r| request.month.contains(r.date))
            .cloned()
            .collect();
        let blocked = unavailability.block_recorded(&in_month, ShiftType::Night);
        debug!(month = %request.month, blocked, "night duties folded into unavailability");
    }

    let dates = request.month.dates();
    let assignments = distribute(
        &dates,
        request.doctors,
        request.shift_types,
        &unavailability,
        request.seed,
    );
    let plan = DistributionPlan {
        seed: request.seed,
        assignments,
    };
    info!(
        month = %request.month,
        seed = plan.seed,
        filled = plan.filled(),
        unfilled = plan.unfilled(),
        "distribution pass complete"
    );
    plan
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::calendar::parse_month;
    use crate::taxonomy::is_senior_only;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("date")
    }

    fn general(count: i64) -> Vec<Doctor> {
        (1..=count)
            .map(|id| Doctor::new(id, &format!("Doctor {id}")))
            .collect()
    }

    fn totals_of(assignments: &[GeneratedAssignment]) -> BTreeMap<DoctorId, usize> {
        let mut totals = BTreeMap::new();
        for id in assignments.iter().filter_map(|a| a.doctor_id) {
            *totals.entry(id).or_insert(0) += 1;
        }
        totals
    }

    fn assert_plan_invariants(
        assignments: &[GeneratedAssignment],
        doctors: &[Doctor],
        unavailability: &Unavailability,
    ) {
        let by_id: BTreeMap<DoctorId, &Doctor> = doctors.iter().map(|d| (d.id, d)).collect();
        let mut per_day: BTreeMap<NaiveDate, BTreeSet<DoctorId>> = BTreeMap::new();
        for a in assignments {
            if !a.shift_type.is_staffed_on(a.date) {
                assert_eq!(a.doctor_id, None, "weekday slot filled: {a:?}");
            }
            let Some(id) = a.doctor_id else {
                continue;
            };
            assert!(
                per_day.entry(a.date).or_default().insert(id),
                "doctor {id} double booked on {}",
                a.date
            );
            let doctor = by_id[&id];
            assert!(!doctor.disabled);
            assert_eq!(doctor.oa, is_senior_only(a.shift_type));
            assert!(!doctor.unavailable_shift_types.contains(&a.shift_type));
            assert!(!unavailability.is_unavailable(id, a.date));
        }
    }

    #[test]
    fn empty_inputs_produce_empty_plan() {
        let none = Unavailability::new();
        assert!(distribute(&[], &general(3), &ShiftType::AUTO_DISTRIBUTE, &none, 1).is_empty());
        assert!(distribute(&[d(2)], &[], &ShiftType::AUTO_DISTRIBUTE, &none, 1).is_empty());
    }

    #[test]
    fn three_doctors_two_slots_two_days() {
        // Saturday and Sunday so both general types are staffed.
        let doctors = general(3);
        let dates = [d(7), d(8)];
        let types = [ShiftType::Late, ShiftType::Ward];
        for seed in 0..16 {
            let plan = distribute(&dates, &doctors, &types, &Unavailability::new(), seed);
            assert_eq!(plan.len(), 4);
            assert!(plan.iter().all(|a| a.doctor_id.is_some()));
            let totals = totals_of(&plan);
            let max = totals.values().max().copied().unwrap_or(0);
            let min = doctors
                .iter()
                .map(|d| totals.get(&d.id).copied().unwrap_or(0))
                .min()
                .unwrap_or(0);
            assert!(max - min <= 1, "seed {seed}: {totals:?}");
            assert_plan_invariants(&plan, &doctors, &Unavailability::new());
        }
    }

    #[test]
    fn unavailable_sole_doctor_leaves_slot_open() {
        let doctors = general(1);
        let mut unavailability = Unavailability::new();
        unavailability.mark(1, d(3));
        let plan = distribute(&[d(3)], &doctors, &[ShiftType::Late], &unavailability, 9);
        assert_eq!(
            plan,
            vec![GeneratedAssignment {
                date: d(3),
                shift_type: ShiftType::Late,
                doctor_id: None,
            }]
        );
    }

    #[test]
    fn senior_doctor_stays_in_senior_slot() {
        let mut doctors = general(3);
        doctors.push(Doctor::new(10, "Senior").with_oa(true));
        let dates = parse_month("2026-03").expect("month").dates();
        let types = [ShiftType::Senior, ShiftType::Late, ShiftType::Ward];
        let plan = distribute(&dates, &doctors, &types, &Unavailability::new(), 3);
        for a in &plan {
            match a.shift_type {
                ShiftType::Senior => assert_eq!(a.doctor_id, Some(10)),
                _ => assert_ne!(a.doctor_id, Some(10)),
            }
        }
        assert_plan_invariants(&plan, &doctors, &Unavailability::new());
    }

    #[test]
    fn weekend_only_slots_are_null_on_weekdays() {
        let dates = parse_month("2026-03").expect("month").dates();
        let plan = distribute(
            &dates,
            &general(4),
            &ShiftType::AUTO_DISTRIBUTE,
            &Unavailability::new(),
            11,
        );
        assert_eq!(plan.len(), 62);
        for a in plan.iter().filter(|a| a.shift_type == ShiftType::Ward) {
            assert_eq!(a.doctor_id.is_some(), crate::calendar::is_weekend(a.date));
        }
    }

    #[test]
    fn totals_stay_within_one_without_constraints() {
        let dates = parse_month("2026-03").expect("month").dates();
        for size in [2, 3, 5, 7] {
            let doctors = general(size);
            for seed in 0..8 {
                let plan = distribute(
                    &dates,
                    &doctors,
                    &ShiftType::AUTO_DISTRIBUTE,
                    &Unavailability::new(),
                    seed,
                );
                let totals = totals_of(&plan);
                let counts: Vec<usize> = doctors
                    .iter()
                    .map(|d| totals.get(&d.id).copied().unwrap_or(0))
                    .collect();
                let max = counts.iter().max().copied().unwrap_or(0);
                let min = counts.iter().min().copied().unwrap_or(0);
                assert!(max - min <= 1, "size {size} seed {seed}: {counts:?}");
            }
        }
    }

    #[test]
    fn hard_constraints_hold_for_mixed_roster() {
        let doctors = vec![
            Doctor::new(1, "Ada"),
            Doctor::new(2, "Bo").excluding(ShiftType::Ward),
            Doctor::new(3, "Cy").with_disabled(true),
            Doctor::new(4, "Di"),
            Doctor::new(5, "Ed").with_oa(true),
            Doctor::new(6, "Fay").excluding(ShiftType::Late),
        ];
        let mut unavailability = Unavailability::new();
        for day in [1, 2, 3, 14, 15, 28] {
            unavailability.mark(1, d(day));
            unavailability.mark(4, d(day + 1));
        }
        let dates = parse_month("2026-03").expect("month").dates();
        let types = [ShiftType::Late, ShiftType::Ward, ShiftType::Senior];
        for seed in 0..20 {
            let plan = distribute(&dates, &doctors, &types, &unavailability, seed);
            assert_eq!(plan.len(), dates.len() * types.len());
            assert_plan_invariants(&plan, &doctors, &unavailability);
            assert!(plan.iter().all(|a| a.doctor_id != Some(3)));
        }
    }

    #[test]
    fn two_doctors_alternate_days() {
        let doctors = general(2);
        let dates: Vec<NaiveDate> = (2..=9).map(d).collect();
        let plan = distribute(&dates, &doctors, &[ShiftType::Late], &Unavailability::new(), 5);
        for pair in plan.windows(2) {
            assert_ne!(pair[0].doctor_id, pair[1].doctor_id);
        }
    }

    #[test]
    fn consecutive_days_are_relaxed_when_nobody_else_fits() {
        let plan = distribute(
            &[d(2), d(3), d(4)],
            &general(1),
            &[ShiftType::Late],
            &Unavailability::new(),
            0,
        );
        assert!(plan.iter().all(|a| a.doctor_id == Some(1)));
    }

    #[test]
    fn same_seed_reproduces_plan() {
        let dates = parse_month("2026-04").expect("month").dates();
        let doctors = general(6);
        let a = distribute(&dates, &doctors, &ShiftType::AUTO_DISTRIBUTE, &Unavailability::new(), 42);
        let b = distribute(&dates, &doctors, &ShiftType::AUTO_DISTRIBUTE, &Unavailability::new(), 42);
        assert_eq!(a, b);
    }

    #[test]
    fn plan_month_keeps_night_doctors_off_day_slots() {
        let doctors = general(3);
        let existing = vec![
            ShiftRecord::new(d(7), ShiftType::Night, vec![1]),
            ShiftRecord::new(d(8), ShiftType::Night, vec![2]),
        ];
        let month = parse_month("2026-03").expect("month");
        let none = Unavailability::new();
        for seed in 0..10 {
            let plan = plan_month(&MonthRequest {
                month,
                doctors: &doctors,
                shift_types: &ShiftType::AUTO_DISTRIBUTE,
                unavailability: &none,
                existing: &existing,
                block_after_night: true,
                seed,
            });
            assert_eq!(plan.seed, seed);
            for a in &plan.assignments {
                if a.date == d(7) {
                    assert_ne!(a.doctor_id, Some(1));
                }
                if a.date == d(8) {
                    assert_ne!(a.doctor_id, Some(2));
                }
            }
        }
    }
}
