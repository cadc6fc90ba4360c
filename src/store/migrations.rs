pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    color TEXT,
    disabled INTEGER NOT NULL DEFAULT 0,
    oa INTEGER NOT NULL DEFAULT 0,
    unavailable_shift_types TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS unavailable_dates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doctor_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    UNIQUE(doctor_id, date)
);
CREATE INDEX IF NOT EXISTS idx_unavailable_date
    ON unavailable_dates(date);

CREATE TABLE IF NOT EXISTS shifts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    shift_type TEXT NOT NULL,
    doctor_ids TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL,
    UNIQUE(date, shift_type)
);
"#;
