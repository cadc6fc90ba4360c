pub mod conflicts;
pub mod distribute;
pub mod summary;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::roster::{DoctorId, GeneratedAssignment, ShiftRecord};
use crate::taxonomy::ShiftType;

/// Output of one distribution pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionPlan {
    pub seed: u64,
    pub assignments: Vec<GeneratedAssignment>,
}

impl DistributionPlan {
    pub fn filled(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.doctor_id.is_some())
            .count()
    }

    pub fn unfilled(&self) -> usize {
        self.assignments.len() - self.filled()
    }

    pub fn totals(&self) -> BTreeMap<DoctorId, usize> {
        let mut totals = BTreeMap::new();
        for doctor_id in self.assignments.iter().filter_map(|a| a.doctor_id) {
            *totals.entry(doctor_id).or_insert(0) += 1;
        }
        totals
    }

    /// Upsert records for the whole plan. Unfilled entries become empty
    /// records so stale assignments in those slots are overwritten.
    pub fn to_batch(&self) -> Vec<ShiftRecord> {
        self.assignments
            .iter()
            .map(|a| ShiftRecord::new(a.date, a.shift_type, a.doctor_id.into_iter().collect()))
            .collect()
    }
}

/// Records that empty every assigned slot among `records`.
pub fn clear_batch(records: &[ShiftRecord]) -> Vec<ShiftRecord> {
    records
        .iter()
        .filter(|r| !r.is_open())
        .map(|r| ShiftRecord::cleared(r.date, r.shift_type))
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    UnavailableDate,
    ExcludedShiftType,
    NightOverlap,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::UnavailableDate => "unavailable on this date",
            Self::ExcludedShiftType => "does not work this shift type",
            Self::NightOverlap => "also on a day shift",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftConflict {
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub doctor_id: DoctorId,
    pub kinds: Vec<ConflictKind>,
}
