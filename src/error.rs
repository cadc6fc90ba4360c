use thiserror::Error;

use crate::roster::DoctorId;
use crate::taxonomy::ShiftTypeParseError;

/// Input contract violations. Scheduling outcomes such as unfilled slots are
/// never reported through this type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid month `{0}`, expected YYYY-MM")]
    InvalidMonth(String),
    #[error(transparent)]
    UnknownShiftType(#[from] ShiftTypeParseError),
    #[error("doctor record {id} is missing required field `{field}`")]
    MissingField { id: DoctorId, field: &'static str },
}
