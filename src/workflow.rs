use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::calendar::MonthRange;
use crate::config::Config;
use crate::eligibility::evaluator::evaluate_doctor;
use crate::eligibility::{DayState, EligibilityCheck};
use crate::roster::{Doctor, DoctorId, ShiftRecord};
use crate::schedule::conflicts::detect_conflicts;
use crate::schedule::distribute::{plan_month, MonthRequest};
use crate::schedule::summary::{doctor_shift_counts, unassigned_days, DoctorShiftCount};
use crate::schedule::{clear_batch, DistributionPlan, ShiftConflict};
use crate::store::RosterStore;
use crate::taxonomy::ShiftType;

/// The configured seed, or a fresh random one.
pub fn resolve_seed(configured: Option<u64>) -> u64 {
    configured.unwrap_or_else(rand::random)
}

pub fn month_records(store: &RosterStore, month: MonthRange) -> Result<Vec<ShiftRecord>> {
    store.shifts_in_range(month.first(), month.last())
}

/// Runs a distribution pass for `month` and, unless `dry_run`, writes the
/// full plan back including emptied slots.
pub fn distribute_month(
    store: &RosterStore,
    config: &Config,
    month: MonthRange,
    seed: Option<u64>,
    dry_run: bool,
) -> Result<DistributionPlan> {
    let doctors = store.list_doctors()?;
    let unavailability = store.unavailability()?;
    let existing = month_records(store, month)?;
    let shift_types = config.auto_shift_types()?;

    let plan = plan_month(&MonthRequest {
        month,
        doctors: &doctors,
        shift_types: &shift_types,
        unavailability: &unavailability,
        existing: &existing,
        block_after_night: config.schedule.block_after_night,
        seed: resolve_seed(seed.or(config.schedule.seed)),
    });

    if dry_run {
        info!(%month, "dry run, plan not saved");
    } else {
        store.upsert_shifts(&plan.to_batch())?;
    }
    Ok(plan)
}

pub fn month_conflicts(store: &RosterStore, month: MonthRange) -> Result<Vec<ShiftConflict>> {
    let doctors = store.list_doctors()?;
    let unavailability = store.unavailability()?;
    let records = month_records(store, month)?;
    Ok(detect_conflicts(&records, &doctors, &unavailability))
}

/// Empties every assigned slot in `month`. Returns how many were cleared.
pub fn clear_month(store: &RosterStore, month: MonthRange) -> Result<usize> {
    let batch = clear_batch(&month_records(store, month)?);
    if batch.is_empty() {
        return Ok(0);
    }
    let cleared = store.upsert_shifts(&batch)?;
    info!(%month, cleared, "month cleared");
    Ok(cleared)
}

pub fn month_counts(store: &RosterStore, month: MonthRange) -> Result<Vec<DoctorShiftCount>> {
    let doctors = store.list_doctors()?;
    let records = month_records(store, month)?;
    Ok(doctor_shift_counts(&doctors, &records, month))
}

pub fn month_unassigned(store: &RosterStore, month: MonthRange) -> Result<Vec<NaiveDate>> {
    Ok(unassigned_days(&month_records(store, month)?, month))
}

/// Stores a manual assignment, replacing whoever held the slot.
pub fn assign(
    store: &RosterStore,
    date: NaiveDate,
    shift_type: ShiftType,
    doctor_ids: Vec<DoctorId>,
) -> Result<ShiftRecord> {
    let record = ShiftRecord::new(date, shift_type, doctor_ids);
    store.upsert_shifts(std::slice::from_ref(&record))?;
    Ok(record)
}

/// Explains whether `doctor` could take a slot given what is already stored
/// for that date.
pub fn check_doctor(
    store: &RosterStore,
    doctor: &Doctor,
    shift_type: ShiftType,
    date: NaiveDate,
) -> Result<EligibilityCheck> {
    let unavailability = store.unavailability()?;
    let mut day = DayState::new();
    for record in store
        .shifts_in_range(date, date)?
        .iter()
        .filter(|r| r.shift_type != shift_type)
    {
        for doctor_id in &record.doctor_ids {
            day.place(*doctor_id);
        }
    }
    Ok(evaluate_doctor(doctor, shift_type, date, &day, &unavailability))
}
