use anyhow::Result;
use serde::Serialize;

use crate::calendar::MonthRange;

/// Month-scoped payload for CLI JSON output.
#[derive(Debug, Serialize)]
pub struct MonthReport<'a, T: Serialize + ?Sized> {
    pub month: String,
    pub data: &'a T,
}

impl<'a, T: Serialize + ?Sized> MonthReport<'a, T> {
    pub fn new(month: MonthRange, data: &'a T) -> Self {
        Self {
            month: month.to_string(),
            data,
        }
    }
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
