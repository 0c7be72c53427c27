use crate::bluemoon::almanac::Almanac;
use crate::bluemoon::dataset::Dataset;
use crate::bluemoon::day::{Day, key_for, parse_key};
use crate::error::BluemoonError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const SOURCE_NAME: &str = "worklog";

/// Manually kept worklog: a date range, the usual working days and hours,
/// and per-date exceptions. Other keys such as `comments` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WorklogSpec {
    pub first_day: String,
    pub last_day: String,
    pub working_days: String,
    pub working_hours: Number,
    #[serde(default)]
    pub exceptions: BTreeMap<String, Value>,
}

fn exception_hours(key: &str, raw: &Value) -> Result<i64, BluemoonError> {
    let invalid = || BluemoonError::MalformedRecord(format!("worklog exception {key}: {raw}"));
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

impl WorklogSpec {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let spec = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse worklog {}", path.display()))?;
        Ok(spec)
    }

    /// Exceptions keyed by canonical day key.
    fn normalized_exceptions(&self) -> Result<BTreeMap<String, i64>, BluemoonError> {
        self.exceptions
            .iter()
            .map(|(key, value)| -> Result<(String, i64), BluemoonError> {
                Ok((key_for(parse_key(key)?), exception_hours(key, value)?))
            })
            .collect()
    }

    pub fn build_dataset(&self, today: NaiveDate, almanac: &dyn Almanac) -> Result<Dataset> {
        let first = parse_key(&self.first_day)?;
        let last = parse_key(&self.last_day)?;
        let exceptions = self.normalized_exceptions()?;

        let mut ds = Dataset::new(today);
        for date in first.iter_days().take_while(|d| *d <= last) {
            let mut day = Day::new(date, almanac);
            let worktime = match exceptions.get(day.key()) {
                Some(hours) => Value::from(*hours),
                None if self.working_days.contains(day.weekday_char()) => {
                    Value::Number(self.working_hours.clone())
                }
                None => Value::from(0),
            };
            day.set_value(SOURCE_NAME, worktime);
            ds.add(day, true);
        }
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluemoon::almanac::MeanAlmanac;
    use serde_json::json;

    fn spec(raw: Value) -> WorklogSpec {
        serde_json::from_value(raw).expect("worklog spec")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 1).expect("date")
    }

    #[test]
    fn range_is_inclusive_and_follows_working_days() {
        let ds = spec(json!({
            "first_day": "2020-11-30",
            "last_day": "2020-12-6",
            "working_days": "MTWRF",
            "working_hours": 8,
            "exceptions": {"2020-12-4": 0, "2020-12-02": "4"}
        }))
        .build_dataset(today(), &MeanAlmanac)
        .expect("dataset");

        let hours: Vec<Value> = ds
            .days()
            .values()
            .map(|d| d.get(SOURCE_NAME).cloned().unwrap_or(Value::Null))
            .collect();
        assert_eq!(
            hours,
            vec![json!(8), json!(8), json!(4), json!(8), json!(0), json!(0), json!(0)]
        );
    }

    #[test]
    fn fractional_working_hours_are_kept() {
        let ds = spec(json!({
            "first_day": "2020-12-03",
            "last_day": "2020-12-03",
            "working_days": "R",
            "working_hours": 7.5
        }))
        .build_dataset(today(), &MeanAlmanac)
        .expect("dataset");
        assert_eq!(
            ds.get("2020-12-03").and_then(|d| d.get(SOURCE_NAME)),
            Some(&json!(7.5))
        );
    }

    #[test]
    fn empty_range_yields_no_days() {
        let ds = spec(json!({
            "first_day": "2020-12-10",
            "last_day": "2020-12-01",
            "working_days": "MTWRF",
            "working_hours": 8
        }))
        .build_dataset(today(), &MeanAlmanac)
        .expect("dataset");
        assert!(ds.is_empty());
    }

    #[test]
    fn bad_exception_values_are_rejected() {
        let err = spec(json!({
            "first_day": "2020-12-01",
            "last_day": "2020-12-02",
            "working_days": "MTWRF",
            "working_hours": 8,
            "exceptions": {"2020-12-01": "half"}
        }))
        .build_dataset(today(), &MeanAlmanac)
        .expect_err("malformed");
        assert!(err.to_string().contains("worklog exception 2020-12-01"));
    }
}
