pub mod csv;
pub mod json;
pub mod table;

use crate::roster::{Doctor, DoctorId};

/// Display name for `id`, falling back to a placeholder for removed doctors.
pub fn doctor_name(doctors: &[Doctor], id: DoctorId) -> String {
    doctors
        .iter()
        .find(|d| d.id == id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| format!("Doctor #{id}"))
}

pub fn slot_holder(doctors: &[Doctor], id: Option<DoctorId>) -> String {
    match id {
        Some(id) => doctor_name(doctors, id),
        None => "-".to_string(),
    }
}
