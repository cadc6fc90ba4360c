use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::is_weekend;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShiftType {
    #[serde(rename = "night")]
    Night,
    #[serde(rename = "20shift")]
    Late,
    #[serde(rename = "17shift")]
    Ward,
    #[serde(rename = "oa")]
    Senior,
}

/// Static properties of a shift type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftDef {
    pub label: &'static str,
    pub acronym: Option<&'static str>,
    pub weekend_only: bool,
    pub senior_only: bool,
}

const NIGHT: ShiftDef = ShiftDef {
    label: "Nachtdienst",
    acronym: Some("ND"),
    weekend_only: true,
    senior_only: false,
};

const LATE: ShiftDef = ShiftDef {
    label: "Spätdienst",
    acronym: Some("LD"),
    weekend_only: false,
    senior_only: false,
};

const WARD: ShiftDef = ShiftDef {
    label: "Stationsdienst",
    acronym: Some("KD"),
    weekend_only: true,
    senior_only: false,
};

const SENIOR: ShiftDef = ShiftDef {
    label: "OA",
    acronym: None,
    weekend_only: false,
    senior_only: true,
};

impl ShiftType {
    pub const ALL: [ShiftType; 4] = [
        ShiftType::Night,
        ShiftType::Late,
        ShiftType::Ward,
        ShiftType::Senior,
    ];

    /// Types the distribution pass fills, in fill order.
    pub const AUTO_DISTRIBUTE: [ShiftType; 2] = [ShiftType::Late, ShiftType::Ward];

    /// Types that may not be held on the same date as a night duty.
    pub const NIGHT_OVERLAPS: [ShiftType; 2] = [ShiftType::Late, ShiftType::Ward];

    pub fn def(self) -> &'static ShiftDef {
        match self {
            Self::Night => &NIGHT,
            Self::Late => &LATE,
            Self::Ward => &WARD,
            Self::Senior => &SENIOR,
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Night => "night",
            Self::Late => "20shift",
            Self::Ward => "17shift",
            Self::Senior => "oa",
        }
    }

    pub fn label(self) -> &'static str {
        self.def().label
    }

    pub fn acronym(self) -> Option<&'static str> {
        self.def().acronym
    }

    /// Whether the slot is staffed on `date` at all.
    pub fn is_staffed_on(self, date: NaiveDate) -> bool {
        !is_weekend_only(self) || is_weekend(date)
    }
}

pub fn is_weekend_only(shift_type: ShiftType) -> bool {
    shift_type.def().weekend_only
}

pub fn is_senior_only(shift_type: ShiftType) -> bool {
    shift_type.def().senior_only
}

impl Display for ShiftType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown shift type: {0}")]
pub struct ShiftTypeParseError(pub String);

impl FromStr for ShiftType {
    type Err = ShiftTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "night" | "nd" | "nachtdienst" => Ok(Self::Night),
            "20shift" | "late" | "ld" | "spätdienst" => Ok(Self::Late),
            "17shift" | "ward" | "kd" | "stationsdienst" => Ok(Self::Ward),
            "oa" | "senior" => Ok(Self::Senior),
            _ => Err(ShiftTypeParseError(s.to_string())),
        }
    }
}

pub fn parse_shift_types<S: AsRef<str>>(raw: &[S]) -> Result<Vec<ShiftType>, ShiftTypeParseError> {
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let parsed = ShiftType::from_str(entry.as_ref())?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_match_taxonomy() {
        assert!(is_weekend_only(ShiftType::Night));
        assert!(is_weekend_only(ShiftType::Ward));
        assert!(!is_weekend_only(ShiftType::Late));
        assert!(!is_weekend_only(ShiftType::Senior));
        assert!(is_senior_only(ShiftType::Senior));
        assert!(ShiftType::ALL
            .iter()
            .filter(|t| **t != ShiftType::Senior)
            .all(|t| !is_senior_only(*t)));
    }

    #[test]
    fn parses_wire_names_and_aliases() {
        assert_eq!("20shift".parse::<ShiftType>(), Ok(ShiftType::Late));
        assert_eq!(" KD ".parse::<ShiftType>(), Ok(ShiftType::Ward));
        assert_eq!("OA".parse::<ShiftType>(), Ok(ShiftType::Senior));
        assert!("morning".parse::<ShiftType>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ShiftType::Ward).expect("serialize");
        assert_eq!(json, "\"17shift\"");
        let back: ShiftType = serde_json::from_str("\"night\"").expect("deserialize");
        assert_eq!(back, ShiftType::Night);
        assert!(serde_json::from_str::<ShiftType>("\"9shift\"").is_err());
    }

    #[test]
    fn weekend_only_types_are_not_staffed_on_weekdays() {
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");
        let saturday = NaiveDate::from_ymd_opt(2026, 3, 7).expect("date");
        assert!(!ShiftType::Ward.is_staffed_on(monday));
        assert!(ShiftType::Ward.is_staffed_on(saturday));
        assert!(ShiftType::Late.is_staffed_on(monday));
    }

    #[test]
    fn parse_list_dedupes_in_order() {
        let parsed = parse_shift_types(&["17shift", "20shift", "kd"]).expect("parse");
        assert_eq!(parsed, vec![ShiftType::Ward, ShiftType::Late]);
    }
}
