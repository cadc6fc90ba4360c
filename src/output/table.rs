use chrono::NaiveDate;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::calendar::format_date;
use crate::eligibility::EligibilityCheck;
use crate::output::{doctor_name, slot_holder};
use crate::roster::Doctor;
use crate::schedule::summary::{counted_shift_types, DoctorShiftCount};
use crate::schedule::{DistributionPlan, ShiftConflict};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_plan_table(plan: &DistributionPlan, doctors: &[Doctor]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Date", "Day", "Shift", "Doctor"]);
    for a in &plan.assignments {
        let holder = if a.doctor_id.is_some() {
            Cell::new(slot_holder(doctors, a.doctor_id))
        } else {
            Cell::new("UNFILLED").fg(Color::Red)
        };
        table.add_row(Row::from(vec![
            Cell::new(format_date(a.date)),
            Cell::new(a.date.format("%a")),
            Cell::new(a.shift_type.label()),
            holder,
        ]));
    }
    table.to_string()
}

pub fn render_conflicts_table(conflicts: &[ShiftConflict], doctors: &[Doctor]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Date", "Shift", "Doctor", "Reasons"]);
    for c in conflicts {
        let reasons: Vec<String> = c.kinds.iter().map(|k| k.to_string()).collect();
        table.add_row(vec![
            format_date(c.date),
            c.shift_type.label().to_string(),
            doctor_name(doctors, c.doctor_id),
            reasons.join("\n"),
        ]);
    }
    table.to_string()
}

pub fn render_counts_table(counts: &[DoctorShiftCount]) -> String {
    let counted = counted_shift_types();
    let mut table = new_table();
    let mut header = vec!["Doctor".to_string()];
    header.extend(counted.iter().filter_map(|t| t.acronym()).map(str::to_string));
    header.push("Total".to_string());
    table.set_header(header);
    for c in counts {
        let mut row = vec![c.name.clone()];
        row.extend(
            counted
                .iter()
                .map(|t| c.counts.get(t).copied().unwrap_or(0).to_string()),
        );
        row.push(c.total.to_string());
        table.add_row(row);
    }
    table.to_string()
}

pub fn render_doctors_table(doctors: &[Doctor]) -> String {
    let mut table = new_table();
    table.set_header(vec!["ID", "Name", "Role", "Status", "Excluded Shifts"]);
    for d in doctors {
        let status = if d.disabled {
            Cell::new("disabled").fg(Color::Red)
        } else {
            Cell::new("active").fg(Color::Green)
        };
        let excluded: Vec<&str> = d
            .unavailable_shift_types
            .iter()
            .map(|t| t.label())
            .collect();
        table.add_row(Row::from(vec![
            Cell::new(d.id),
            Cell::new(&d.name),
            Cell::new(if d.oa { "OA" } else { "general" }),
            status,
            Cell::new(if excluded.is_empty() {
                "-".to_string()
            } else {
                excluded.join(", ")
            }),
        ]));
    }
    table.to_string()
}

pub fn render_unassigned_table(dates: &[NaiveDate]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Date", "Day"]);
    for date in dates {
        table.add_row(vec![format_date(*date), date.format("%A").to_string()]);
    }
    table.to_string()
}

pub fn render_check_table(check: &EligibilityCheck, doctors: &[Doctor]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Doctor", "Shift", "Date", "Eligible", "Reasons"]);
    let verdict = if check.eligible {
        Cell::new("YES").fg(Color::Green)
    } else {
        Cell::new("NO").fg(Color::Red)
    };
    let reasons: Vec<String> = check.reasons.iter().map(|r| r.to_string()).collect();
    table.add_row(Row::from(vec![
        Cell::new(doctor_name(doctors, check.doctor_id)),
        Cell::new(check.shift_type.label()),
        Cell::new(format_date(check.date)),
        verdict,
        Cell::new(reasons.join("\n")),
    ]));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::GeneratedAssignment;
    use crate::taxonomy::ShiftType;

    #[test]
    fn plan_table_marks_unfilled_slots() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).expect("date");
        let plan = DistributionPlan {
            seed: 0,
            assignments: vec![
                GeneratedAssignment {
                    date,
                    shift_type: ShiftType::Late,
                    doctor_id: Some(1),
                },
                GeneratedAssignment {
                    date,
                    shift_type: ShiftType::Ward,
                    doctor_id: None,
                },
            ],
        };
        let rendered = render_plan_table(&plan, &[Doctor::new(1, "Ada")]);
        assert!(rendered.contains("Ada"));
        assert!(rendered.contains("UNFILLED"));
        assert!(rendered.contains("Stationsdienst"));
    }

    #[test]
    fn doctors_table_shows_role_and_exclusions() {
        let doctors = vec![
            Doctor::new(1, "Ada").excluding(ShiftType::Night),
            Doctor::new(2, "Oda").with_oa(true).with_disabled(true),
        ];
        let rendered = render_doctors_table(&doctors);
        assert!(rendered.contains("Nachtdienst"));
        assert!(rendered.contains("disabled"));
        assert!(rendered.contains("general"));
    }
}
