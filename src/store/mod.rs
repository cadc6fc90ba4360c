pub mod migrations;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::info;

use crate::calendar::{format_date, parse_date};
use crate::error::ScheduleError;
use crate::roster::{
    normalize_doctor_ids, validate_roster, Doctor, DoctorId, ShiftRecord, Unavailability,
};
use crate::store::migrations::BASE_MIGRATION;
use crate::taxonomy::{parse_shift_types, ShiftType};

pub struct RosterStore {
    conn: Connection,
}

impl RosterStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating db directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening roster db: {}", path.display()))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    pub fn insert_doctor(&self, doctor: &Doctor) -> Result<()> {
        doctor.validate()?;
        self.conn.execute(
            r#"
INSERT INTO doctors(id, name, color, disabled, oa, unavailable_shift_types)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
            params![
                doctor.id,
                doctor.name.trim(),
                doctor.color,
                doctor.disabled,
                doctor.oa,
                serde_json::to_string(&doctor.unavailable_shift_types)?
            ],
        )?;
        Ok(())
    }

    pub fn next_doctor_id(&self) -> Result<DoctorId> {
        let max_id: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM doctors", [], |row| {
                row.get(0)
            })?;
        Ok(max_id + 1)
    }

    /// Fails on the first stored doctor that is incomplete or excludes an
    /// unknown shift type.
    pub fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT id, name, color, disabled, oa, unavailable_shift_types
FROM doctors
ORDER BY name ASC, id ASC
"#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut doctors = Vec::with_capacity(rows.len());
        for (id, name, color, disabled, oa, excluded_raw) in rows {
            doctors.push(Doctor {
                id,
                name,
                color,
                disabled,
                oa,
                unavailable_shift_types: parse_excluded_types(id, &excluded_raw)?,
            });
        }
        validate_roster(&doctors)?;
        Ok(doctors)
    }

    /// Returns false when no doctor has `id`.
    pub fn set_doctor_disabled(&self, id: DoctorId, disabled: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE doctors SET disabled = ?2 WHERE id = ?1",
            params![id, disabled],
        )?;
        Ok(changed > 0)
    }

    /// Returns false when the date was already recorded.
    pub fn add_unavailable_date(&self, doctor_id: DoctorId, date: NaiveDate) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO unavailable_dates(doctor_id, date) VALUES (?1, ?2)",
            params![doctor_id, format_date(date)],
        )?;
        Ok(inserted > 0)
    }

    pub fn remove_unavailable_date(&self, doctor_id: DoctorId, date: NaiveDate) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM unavailable_dates WHERE doctor_id = ?1 AND date = ?2",
            params![doctor_id, format_date(date)],
        )?;
        Ok(removed > 0)
    }

    /// Fails on the first stored date that is not `YYYY-MM-DD`.
    pub fn unavailability(&self) -> Result<Unavailability> {
        let mut stmt = self
            .conn
            .prepare("SELECT doctor_id, date FROM unavailable_dates ORDER BY doctor_id, date")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut raw: BTreeMap<DoctorId, Vec<String>> = BTreeMap::new();
        for (doctor_id, date) in rows {
            raw.entry(doctor_id).or_default().push(date);
        }
        Ok(Unavailability::from_iso(&raw)?)
    }

    /// Records with `from <= date <= to`, ordered by date. A row with a
    /// malformed date or an unknown shift type fails the whole read.
    pub fn shifts_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ShiftRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT date, shift_type, doctor_ids
FROM shifts
WHERE date >= ?1 AND date <= ?2
ORDER BY date ASC, id ASC
"#,
        )?;
        let rows = stmt
            .query_map(params![format_date(from), format_date(to)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (date_raw, type_raw, ids_raw) in rows {
            let date = parse_date(&date_raw)?;
            let shift_type = type_raw
                .parse::<ShiftType>()
                .map_err(ScheduleError::from)
                .with_context(|| format!("bad shift row for {date}"))?;
            let doctor_ids: Vec<DoctorId> = serde_json::from_str(&ids_raw)
                .with_context(|| format!("bad doctor_ids for {date} {type_raw}"))?;
            records.push(ShiftRecord::new(date, shift_type, doctor_ids));
        }
        Ok(records)
    }

    /// Writes the whole batch in one transaction. Existing rows for the same
    /// (date, shift type) are overwritten.
    pub fn upsert_shifts(&self, batch: &[ShiftRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                r#"
INSERT INTO shifts(date, shift_type, doctor_ids, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(date, shift_type) DO UPDATE SET
    doctor_ids = excluded.doctor_ids,
    updated_at = excluded.updated_at
"#,
            )?;
            for record in batch {
                stmt.execute(params![
                    format_date(record.date),
                    record.shift_type.as_slug(),
                    serde_json::to_string(&normalize_doctor_ids(&record.doctor_ids))?,
                    now
                ])?;
            }
        }
        tx.commit()?;
        info!(records = batch.len(), "upserted shifts");
        Ok(batch.len())
    }
}

fn parse_excluded_types(doctor_id: DoctorId, raw: &str) -> Result<BTreeSet<ShiftType>> {
    let slugs: Vec<String> = serde_json::from_str(raw)
        .with_context(|| format!("bad shift type exclusions for doctor {doctor_id}"))?;
    let parsed = parse_shift_types(slugs.as_slice())
        .map_err(ScheduleError::from)
        .with_context(|| format!("bad shift type exclusions for doctor {doctor_id}"))?;
    Ok(parsed.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::clear_batch;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("date")
    }

    #[test]
    fn doctors_round_trip_with_exclusions() {
        let store = RosterStore::open_in_memory().expect("store");
        store
            .insert_doctor(&Doctor::new(2, "Bo").excluding(ShiftType::Night))
            .expect("insert");
        store
            .insert_doctor(&Doctor::new(1, "Ada").with_oa(true).with_color("#ff0000"))
            .expect("insert");
        assert!(store.insert_doctor(&Doctor::new(3, "")).is_err());

        let doctors = store.list_doctors().expect("list");
        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[0].name, "Ada");
        assert!(doctors[0].oa);
        assert_eq!(doctors[0].color.as_deref(), Some("#ff0000"));
        assert!(doctors[1].unavailable_shift_types.contains(&ShiftType::Night));
        assert_eq!(store.next_doctor_id().expect("next id"), 3);

        assert!(store.set_doctor_disabled(2, true).expect("disable"));
        assert!(!store.set_doctor_disabled(99, true).expect("disable"));
        assert!(store.list_doctors().expect("list")[1].disabled);
    }

    #[test]
    fn unavailable_dates_are_unique() {
        let store = RosterStore::open_in_memory().expect("store");
        assert!(store.add_unavailable_date(1, d(4)).expect("add"));
        assert!(!store.add_unavailable_date(1, d(4)).expect("add again"));
        store.add_unavailable_date(2, d(5)).expect("add");
        let unavailability = store.unavailability().expect("load");
        assert_eq!(unavailability.len(), 2);
        assert!(unavailability.is_unavailable(1, d(4)));

        assert!(store.remove_unavailable_date(1, d(4)).expect("remove"));
        assert!(!store.unavailability().expect("load").is_unavailable(1, d(4)));
    }

    #[test]
    fn upsert_overwrites_by_date_and_type() {
        let store = RosterStore::open_in_memory().expect("store");
        store
            .upsert_shifts(&[
                ShiftRecord::new(d(7), ShiftType::Late, vec![1]),
                ShiftRecord::new(d(7), ShiftType::Ward, vec![2]),
            ])
            .expect("first write");
        store
            .upsert_shifts(&[ShiftRecord {
                date: d(7),
                shift_type: ShiftType::Late,
                doctor_ids: vec![3, 3, 4],
            }])
            .expect("overwrite");

        let records = store.shifts_in_range(d(1), d(31)).expect("read");
        assert_eq!(records.len(), 2);
        let late = records
            .iter()
            .find(|r| r.shift_type == ShiftType::Late)
            .expect("late record");
        assert_eq!(late.doctor_ids, vec![3, 4]);
    }

    #[test]
    fn range_read_is_inclusive() {
        let store = RosterStore::open_in_memory().expect("store");
        store
            .upsert_shifts(&[
                ShiftRecord::new(d(1), ShiftType::Senior, vec![9]),
                ShiftRecord::new(d(10), ShiftType::Senior, vec![9]),
                ShiftRecord::new(d(11), ShiftType::Senior, vec![9]),
            ])
            .expect("write");
        let records = store.shifts_in_range(d(1), d(10)).expect("read");
        assert_eq!(
            records.iter().map(|r| r.date).collect::<Vec<_>>(),
            vec![d(1), d(10)]
        );
    }

    #[test]
    fn clearing_twice_leaves_the_same_state() {
        let store = RosterStore::open_in_memory().expect("store");
        store
            .upsert_shifts(&[
                ShiftRecord::new(d(7), ShiftType::Night, vec![1]),
                ShiftRecord::new(d(8), ShiftType::Ward, vec![2]),
            ])
            .expect("write");

        let records = store.shifts_in_range(d(1), d(31)).expect("read");
        store.upsert_shifts(&clear_batch(&records)).expect("clear");
        let once = store.shifts_in_range(d(1), d(31)).expect("read");
        assert!(once.iter().all(ShiftRecord::is_open));

        let batch = clear_batch(&once);
        assert!(batch.is_empty());
        store.upsert_shifts(&batch).expect("clear again");
        assert_eq!(store.shifts_in_range(d(1), d(31)).expect("read"), once);
    }

    #[test]
    fn malformed_unavailable_date_fails_the_load() {
        let store = RosterStore::open_in_memory().expect("store");
        store.add_unavailable_date(1, d(2)).expect("add");
        store
            .conn
            .execute(
                "INSERT INTO unavailable_dates(doctor_id, date) VALUES (1, '02.03.2026')",
                [],
            )
            .expect("raw insert");
        let err = store.unavailability().expect_err("bad date");
        assert_eq!(
            err.downcast_ref::<ScheduleError>(),
            Some(&ScheduleError::InvalidDate("02.03.2026".to_string()))
        );
    }

    #[test]
    fn unknown_excluded_type_fails_the_roster() {
        let store = RosterStore::open_in_memory().expect("store");
        store.insert_doctor(&Doctor::new(1, "Ada")).expect("insert");
        store
            .conn
            .execute(
                "UPDATE doctors SET unavailable_shift_types = '[\"nightshift\"]' WHERE id = 1",
                [],
            )
            .expect("raw update");
        let err = store.list_doctors().expect_err("unknown type");
        assert!(matches!(
            err.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::UnknownShiftType(_))
        ));
    }

    #[test]
    fn incomplete_stored_doctor_fails_the_roster() {
        let store = RosterStore::open_in_memory().expect("store");
        store
            .conn
            .execute("INSERT INTO doctors(id, name) VALUES (4, '  ')", [])
            .expect("raw insert");
        let err = store.list_doctors().expect_err("blank name");
        assert_eq!(
            err.downcast_ref::<ScheduleError>(),
            Some(&ScheduleError::MissingField { id: 4, field: "name" })
        );
    }

    #[test]
    fn unknown_stored_shift_type_fails_the_range_read() {
        let store = RosterStore::open_in_memory().expect("store");
        store
            .conn
            .execute(
                "INSERT INTO shifts(date, shift_type, doctor_ids, updated_at) \
                 VALUES ('2026-03-07', 'brunch', '[1]', '2026-03-01T00:00:00Z')",
                [],
            )
            .expect("raw insert");
        let err = store.shifts_in_range(d(1), d(31)).expect_err("unknown type");
        assert!(matches!(
            err.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::UnknownShiftType(_))
        ));
    }
}
