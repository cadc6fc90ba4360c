use anyhow::Result;

use crate::calendar::format_date;
use crate::output::doctor_name;
use crate::roster::{Doctor, DoctorId, ShiftRecord};
use crate::schedule::summary::{counted_shift_types, DoctorShiftCount, MonthRow};
use crate::schedule::{DistributionPlan, ShiftConflict};
use crate::taxonomy::ShiftType;

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn plan_to_csv(plan: &DistributionPlan, doctors: &[Doctor]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["date", "shift_type", "doctor_id", "doctor"])?;
    for a in &plan.assignments {
        writer.write_record([
            format_date(a.date),
            a.shift_type.as_slug().to_string(),
            a.doctor_id.map(|id| id.to_string()).unwrap_or_default(),
            a.doctor_id
                .map(|id| doctor_name(doctors, id))
                .unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

pub fn conflicts_to_csv(conflicts: &[ShiftConflict], doctors: &[Doctor]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["date", "shift_type", "doctor_id", "doctor", "reasons"])?;
    for c in conflicts {
        let reasons: Vec<String> = c.kinds.iter().map(|k| k.to_string()).collect();
        writer.write_record([
            format_date(c.date),
            c.shift_type.as_slug().to_string(),
            c.doctor_id.to_string(),
            doctor_name(doctors, c.doctor_id),
            reasons.join("; "),
        ])?;
    }
    finish(writer)
}

pub fn counts_to_csv(counts: &[DoctorShiftCount]) -> Result<String> {
    let counted = counted_shift_types();
    let mut writer = csv::Writer::from_writer(vec![]);
    let mut header = vec!["doctor_id".to_string(), "doctor".to_string()];
    header.extend(counted.iter().filter_map(|t| t.acronym()).map(str::to_string));
    header.push("total".to_string());
    writer.write_record(&header)?;
    for c in counts {
        let mut row = vec![c.doctor_id.to_string(), c.name.clone()];
        row.extend(
            counted
                .iter()
                .map(|t| c.counts.get(t).copied().unwrap_or(0).to_string()),
        );
        row.push(c.total.to_string());
        writer.write_record(&row)?;
    }
    finish(writer)
}

/// Day-per-row month sheet with one column per shift type.
pub fn month_table_to_csv(rows: &[MonthRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    let mut header = vec!["Date".to_string(), "Weekday".to_string()];
    header.extend(ShiftType::ALL.iter().map(|t| t.label().to_string()));
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![format_date(row.date), row.date.format("%a").to_string()];
        record.extend(ShiftType::ALL.iter().map(|t| {
            row.names
                .get(t)
                .map(|names| names.join(", "))
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }
    finish(writer)
}

/// One doctor's duties, oldest first.
pub fn doctor_shifts_to_csv(records: &[ShiftRecord], doctor_id: DoctorId) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["Date", "Shift"])?;
    let mut held: Vec<&ShiftRecord> = records.iter().filter(|r| r.holds(doctor_id)).collect();
    held.sort_by_key(|r| (r.date, r.shift_type));
    for r in held {
        writer.write_record([
            r.date.format("%b %-d, %Y").to_string(),
            r.shift_type.label().to_string(),
        ])?;
    }
    finish(writer)
}
