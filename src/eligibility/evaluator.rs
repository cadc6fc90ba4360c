use chrono::NaiveDate;

use crate::eligibility::rules::{
    excludes_shift_type, is_unavailable_on, role_matches, slot_is_staffed,
};
use crate::eligibility::{DayState, EligibilityCheck, Ineligibility};
use crate::roster::{Doctor, Unavailability};
use crate::taxonomy::ShiftType;

pub fn is_eligible(
    doctor: &Doctor,
    shift_type: ShiftType,
    date: NaiveDate,
    day: &DayState,
    unavailability: &Unavailability,
) -> bool {
    slot_is_staffed(shift_type, date)
        && !doctor.disabled
        && role_matches(doctor, shift_type)
        && !excludes_shift_type(doctor, shift_type)
        && !day.contains(doctor.id)
        && !is_unavailable_on(doctor.id, date, unavailability)
}

/// Same rules as [`is_eligible`], but collects every failing rule.
pub fn evaluate_doctor(
    doctor: &Doctor,
    shift_type: ShiftType,
    date: NaiveDate,
    day: &DayState,
    unavailability: &Unavailability,
) -> EligibilityCheck {
    let mut reasons = Vec::new();
    if !slot_is_staffed(shift_type, date) {
        reasons.push(Ineligibility::WeekendOnly);
    }
    if doctor.disabled {
        reasons.push(Ineligibility::Disabled);
    }
    if !role_matches(doctor, shift_type) {
        reasons.push(Ineligibility::RoleMismatch);
    }
    if excludes_shift_type(doctor, shift_type) {
        reasons.push(Ineligibility::ExcludedShiftType);
    }
    if day.contains(doctor.id) {
        reasons.push(Ineligibility::AlreadyOnDuty);
    }
    if is_unavailable_on(doctor.id, date, unavailability) {
        reasons.push(Ineligibility::Unavailable);
    }

    EligibilityCheck {
        doctor_id: doctor.id,
        shift_type,
        date,
        eligible: reasons.is_empty(),
        reasons,
    }
}

/// Doctors that may fill the slot, in roster order. Empty when the slot is
/// not staffed on `date`.
pub fn eligible_candidates<'a>(
    doctors: &'a [Doctor],
    shift_type: ShiftType,
    date: NaiveDate,
    day: &DayState,
    unavailability: &Unavailability,
) -> Vec<&'a Doctor> {
    if !slot_is_staffed(shift_type, date) {
        return Vec::new();
    }
    doctors
        .iter()
        .filter(|doctor| is_eligible(doctor, shift_type, date, day, unavailability))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).expect("date")
    }

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("date")
    }

    #[test]
    fn general_doctor_is_eligible_for_open_slot() {
        let doctor = Doctor::new(1, "Ada");
        assert!(is_eligible(
            &doctor,
            ShiftType::Late,
            tuesday(),
            &DayState::new(),
            &Unavailability::new()
        ));
    }

    #[test]
    fn weekend_gate_rejects_everyone_on_weekdays() {
        let doctors = vec![Doctor::new(1, "Ada"), Doctor::new(2, "Bo")];
        let pool = eligible_candidates(
            &doctors,
            ShiftType::Ward,
            tuesday(),
            &DayState::new(),
            &Unavailability::new(),
        );
        assert!(pool.is_empty());
        let pool = eligible_candidates(
            &doctors,
            ShiftType::Ward,
            saturday(),
            &DayState::new(),
            &Unavailability::new(),
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn same_day_placement_blocks_other_types() {
        let doctor = Doctor::new(1, "Ada");
        let mut day = DayState::new();
        day.place(1);
        assert!(!is_eligible(
            &doctor,
            ShiftType::Ward,
            saturday(),
            &day,
            &Unavailability::new()
        ));
    }

    #[test]
    fn evaluate_collects_every_failed_rule() {
        let doctor = Doctor::new(5, "Eli")
            .with_disabled(true)
            .excluding(ShiftType::Ward);
        let mut unavailability = Unavailability::new();
        unavailability.mark(5, tuesday());
        let check = evaluate_doctor(
            &doctor,
            ShiftType::Ward,
            tuesday(),
            &DayState::new(),
            &unavailability,
        );
        assert!(!check.eligible);
        assert_eq!(
            check.reasons,
            vec![
                Ineligibility::WeekendOnly,
                Ineligibility::Disabled,
                Ineligibility::ExcludedShiftType,
                Ineligibility::Unavailable,
            ]
        );
    }

    #[test]
    fn senior_doctor_only_fits_senior_slot() {
        let senior = Doctor::new(9, "Oda").with_oa(true);
        let day = DayState::new();
        let none = Unavailability::new();
        assert!(is_eligible(&senior, ShiftType::Senior, tuesday(), &day, &none));
        assert!(!is_eligible(&senior, ShiftType::Late, tuesday(), &day, &none));
        let check = evaluate_doctor(&senior, ShiftType::Late, tuesday(), &day, &none);
        assert_eq!(check.reasons, vec![Ineligibility::RoleMismatch]);
    }
}
