use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::MonthRange;
use crate::roster::{Doctor, DoctorId, ShiftRecord};
use crate::taxonomy::ShiftType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorShiftCount {
    pub doctor_id: DoctorId,
    pub name: String,
    pub counts: BTreeMap<ShiftType, usize>,
    pub total: usize,
}

/// Shift types that appear in workload counts.
pub fn counted_shift_types() -> Vec<ShiftType> {
    ShiftType::ALL
        .into_iter()
        .filter(|t| t.acronym().is_some())
        .collect()
}

/// Per-doctor workload for `month`, busiest first. Disabled doctors are left
/// out.
pub fn doctor_shift_counts(
    doctors: &[Doctor],
    records: &[ShiftRecord],
    month: MonthRange,
) -> Vec<DoctorShiftCount> {
    let counted = counted_shift_types();
    let mut out: Vec<DoctorShiftCount> = doctors
        .iter()
        .filter(|doctor| !doctor.disabled)
        .map(|doctor| {
            let mut counts: BTreeMap<ShiftType, usize> =
                counted.iter().map(|t| (*t, 0)).collect();
            for record in records
                .iter()
                .filter(|r| month.contains(r.date) && r.holds(doctor.id))
            {
                if let Some(count) = counts.get_mut(&record.shift_type) {
                    *count += 1;
                }
            }
            let total = counts.values().sum();
            DoctorShiftCount {
                doctor_id: doctor.id,
                name: doctor.name.clone(),
                counts,
                total,
            }
        })
        .collect();

    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Dates in `month` where a slot that is staffed that day has nobody on it.
pub fn unassigned_days(records: &[ShiftRecord], month: MonthRange) -> Vec<NaiveDate> {
    month
        .dates()
        .into_iter()
        .filter(|date| {
            ShiftType::ALL
                .into_iter()
                .filter(|t| t.is_staffed_on(*date))
                .any(|t| {
                    !records
                        .iter()
                        .any(|r| r.date == *date && r.shift_type == t && !r.is_open())
                })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthRow {
    pub date: NaiveDate,
    pub names: BTreeMap<ShiftType, Vec<String>>,
}

/// One row per day of `month` with the names on each slot.
pub fn month_table(month: MonthRange, records: &[ShiftRecord], doctors: &[Doctor]) -> Vec<MonthRow> {
    let names_by_id: BTreeMap<DoctorId, &str> =
        doctors.iter().map(|d| (d.id, d.name.as_str())).collect();

    month
        .dates()
        .into_iter()
        .map(|date| {
            let names = records
                .iter()
                .filter(|r| r.date == date && !r.is_open())
                .map(|r| {
                    let names = r
                        .doctor_ids
                        .iter()
                        .map(|id| match names_by_id.get(id) {
                            Some(name) => (*name).to_string(),
                            None => format!("Doctor #{id}"),
                        })
                        .collect();
                    (r.shift_type, names)
                })
                .collect();
            MonthRow { date, names }
        })
        .collect()
}
