pub mod evaluator;
pub mod rules;

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::roster::DoctorId;
use crate::taxonomy::ShiftType;

/// Doctors already placed on the date being filled, across all shift types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayState {
    placed: BTreeSet<DoctorId>,
}

impl DayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&mut self, doctor_id: DoctorId) {
        self.placed.insert(doctor_id);
    }

    pub fn contains(&self, doctor_id: DoctorId) -> bool {
        self.placed.contains(&doctor_id)
    }

    pub fn clear(&mut self) {
        self.placed.clear();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    WeekendOnly,
    Disabled,
    RoleMismatch,
    ExcludedShiftType,
    AlreadyOnDuty,
    Unavailable,
}

impl Display for Ineligibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::WeekendOnly => "slot is only staffed on weekends",
            Self::Disabled => "doctor is disabled",
            Self::RoleMismatch => "doctor role does not match the slot",
            Self::ExcludedShiftType => "doctor never works this shift type",
            Self::AlreadyOnDuty => "doctor already holds a shift that day",
            Self::Unavailable => "doctor is unavailable that day",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibilityCheck {
    pub doctor_id: DoctorId,
    pub shift_type: ShiftType,
    pub date: NaiveDate,
    pub eligible: bool,
    pub reasons: Vec<Ineligibility>,
}
