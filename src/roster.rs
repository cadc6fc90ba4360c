use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::parse_date;
use crate::error::ScheduleError;
use crate::taxonomy::ShiftType;

pub type DoctorId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    /// Senior doctors take the senior slot and nothing else.
    #[serde(default)]
    pub oa: bool,
    #[serde(default)]
    pub unavailable_shift_types: BTreeSet<ShiftType>,
}

impl Doctor {
    pub fn new(id: DoctorId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: None,
            disabled: false,
            oa: false,
            unavailable_shift_types: BTreeSet::new(),
        }
    }

    pub fn with_oa(mut self, oa: bool) -> Self {
        self.oa = oa;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn excluding(mut self, shift_type: ShiftType) -> Self {
        self.unavailable_shift_types.insert(shift_type);
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.id <= 0 {
            return Err(ScheduleError::MissingField {
                id: self.id,
                field: "id",
            });
        }
        if self.name.trim().is_empty() {
            return Err(ScheduleError::MissingField {
                id: self.id,
                field: "name",
            });
        }
        Ok(())
    }
}

pub fn validate_roster(doctors: &[Doctor]) -> Result<(), ScheduleError> {
    doctors.iter().try_for_each(Doctor::validate)
}

/// One persisted slot, unique per (date, shift type).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftRecord {
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    #[serde(default)]
    pub doctor_ids: Vec<DoctorId>,
}

impl ShiftRecord {
    pub fn new(date: NaiveDate, shift_type: ShiftType, doctor_ids: Vec<DoctorId>) -> Self {
        Self {
            date,
            shift_type,
            doctor_ids: normalize_doctor_ids(&doctor_ids),
        }
    }

    pub fn cleared(date: NaiveDate, shift_type: ShiftType) -> Self {
        Self {
            date,
            shift_type,
            doctor_ids: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.doctor_ids.is_empty()
    }

    pub fn holds(&self, doctor_id: DoctorId) -> bool {
        self.doctor_ids.contains(&doctor_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedAssignment {
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub doctor_id: Option<DoctorId>,
}

/// Drops duplicate ids, keeping the first occurrence.
pub fn normalize_doctor_ids(ids: &[DoctorId]) -> Vec<DoctorId> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Per-doctor dates on which the doctor cannot work any shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unavailability {
    by_doctor: BTreeMap<DoctorId, BTreeSet<NaiveDate>>,
}

impl Unavailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the snapshot from ISO date strings, failing on the first
    /// malformed entry.
    pub fn from_iso<S: AsRef<str>>(
        raw: &BTreeMap<DoctorId, Vec<S>>,
    ) -> Result<Self, ScheduleError> {
        let mut out = Self::new();
        for (doctor_id, dates) in raw {
            for date in dates {
                out.mark(*doctor_id, parse_date(date.as_ref())?);
            }
        }
        Ok(out)
    }

    pub fn mark(&mut self, doctor_id: DoctorId, date: NaiveDate) {
        self.by_doctor.entry(doctor_id).or_default().insert(date);
    }

    pub fn is_unavailable(&self, doctor_id: DoctorId, date: NaiveDate) -> bool {
        self.by_doctor
            .get(&doctor_id)
            .map(|dates| dates.contains(&date))
            .unwrap_or(false)
    }

    /// Marks every doctor recorded on a `blocking` shift as unavailable on
    /// that record's date. Returns how many (doctor, date) pairs were added.
    pub fn block_recorded(&mut self, records: &[ShiftRecord], blocking: ShiftType) -> usize {
        let mut added = 0;
        for record in records.iter().filter(|r| r.shift_type == blocking) {
            for doctor_id in &record.doctor_ids {
                if self
                    .by_doctor
                    .entry(*doctor_id)
                    .or_default()
                    .insert(record.date)
                {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.by_doctor.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
