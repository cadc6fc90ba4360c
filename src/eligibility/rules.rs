//! Rule predicates shared by the distribution pass and the conflict detector.

use chrono::NaiveDate;

use crate::roster::{Doctor, DoctorId, Unavailability};
use crate::taxonomy::{is_senior_only, ShiftType};

/// The slot exists on `date`. Weekend-only types are not generated on weekdays.
pub fn slot_is_staffed(shift_type: ShiftType, date: NaiveDate) -> bool {
    shift_type.is_staffed_on(date)
}

/// Senior doctors belong to the senior slot exclusively.
pub fn role_matches(doctor: &Doctor, shift_type: ShiftType) -> bool {
    doctor.oa == is_senior_only(shift_type)
}

pub fn excludes_shift_type(doctor: &Doctor, shift_type: ShiftType) -> bool {
    doctor.unavailable_shift_types.contains(&shift_type)
}

pub fn is_unavailable_on(
    doctor_id: DoctorId,
    date: NaiveDate,
    unavailability: &Unavailability,
) -> bool {
    unavailability.is_unavailable(doctor_id, date)
}
