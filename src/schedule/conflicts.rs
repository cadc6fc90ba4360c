use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::eligibility::rules::{excludes_shift_type, is_unavailable_on};
use crate::roster::{Doctor, DoctorId, ShiftRecord, Unavailability};
use crate::schedule::{ConflictKind, ShiftConflict};
use crate::taxonomy::ShiftType;

/// Reasons each doctor recorded on `shift` is in conflict.
///
/// `day_records` are the records stored for the same date, `shift` may be
/// among them. Only date unavailability, standing shift-type exclusions and
/// the night overlap rule are checked here. Disabled status and the senior
/// role split are enforced when assignments are generated and are not
/// re-derived for recorded data, so a manual assignment of a disabled or
/// senior doctor is reported as clean.
pub fn shift_conflicts(
    shift: &ShiftRecord,
    day_records: &[ShiftRecord],
    doctors: &[Doctor],
    unavailability: &Unavailability,
) -> BTreeMap<DoctorId, Vec<ConflictKind>> {
    let mut out = BTreeMap::new();
    for &doctor_id in &shift.doctor_ids {
        let mut kinds = Vec::new();
        if is_unavailable_on(doctor_id, shift.date, unavailability) {
            kinds.push(ConflictKind::UnavailableDate);
        }
        // unknown ids (removed doctors) carry no standing exclusions
        if let Some(doctor) = doctors.iter().find(|d| d.id == doctor_id) {
            if excludes_shift_type(doctor, shift.shift_type) {
                kinds.push(ConflictKind::ExcludedShiftType);
            }
        }
        if shift.shift_type == ShiftType::Night
            && holds_night_overlap(doctor_id, shift.date, day_records)
        {
            kinds.push(ConflictKind::NightOverlap);
        }
        if !kinds.is_empty() {
            out.insert(doctor_id, kinds);
        }
    }
    out
}

/// Doctors on `shift` that violate a rule.
pub fn conflicting_doctors(
    shift: &ShiftRecord,
    day_records: &[ShiftRecord],
    doctors: &[Doctor],
    unavailability: &Unavailability,
) -> BTreeSet<DoctorId> {
    shift_conflicts(shift, day_records, doctors, unavailability)
        .into_keys()
        .collect()
}

fn holds_night_overlap(doctor_id: DoctorId, date: NaiveDate, day_records: &[ShiftRecord]) -> bool {
    day_records.iter().any(|record| {
        record.date == date
            && ShiftType::NIGHT_OVERLAPS.contains(&record.shift_type)
            && record.holds(doctor_id)
    })
}

/// Every conflicting (date, shift type, doctor) among `records`, in date
/// order.
pub fn detect_conflicts(
    records: &[ShiftRecord],
    doctors: &[Doctor],
    unavailability: &Unavailability,
) -> Vec<ShiftConflict> {
    let mut by_date: BTreeMap<NaiveDate, Vec<ShiftRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().push(record.clone());
    }

    let mut conflicts = Vec::new();
    for (_, mut day_records) in by_date {
        day_records.sort_by_key(|r| r.shift_type);
        for record in &day_records {
            for (doctor_id, kinds) in shift_conflicts(record, &day_records, doctors, unavailability)
            {
                conflicts.push(ShiftConflict {
                    date: record.date,
                    shift_type: record.shift_type,
                    doctor_id,
                    kinds,
                });
            }
        }
    }
    conflicts
}
