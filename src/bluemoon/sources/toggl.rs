use crate::bluemoon::almanac::Almanac;
use crate::bluemoon::analysis::{AnalysisResult, AnalysisValue, DatasetAnalysis};
use crate::bluemoon::config::TogglConfig;
use crate::bluemoon::day::Day;
use crate::bluemoon::sources::aggregate::CsvRow;
use crate::error::BluemoonError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SOURCE_NAME: &str = "*toggl";

pub const FIELDS: &[&str] = &[
    "Project",
    "Task",
    "Description",
    "Start time",
    "Duration",
    "Tags",
];

const TEXT_FIELDS: &[&str] = &["Project", "Task", "Tags", "Description"];

/// `H:MM[:SS]` to whole minutes; seconds are dropped.
pub fn parse_duration_minutes(raw: &str) -> Option<i64> {
    let mut parts = raw.trim().split(':');
    let hours = parts.next()?.trim().parse::<i64>().ok()?;
    let minutes = parts.next()?.trim().parse::<i64>().ok()?;
    Some(hours * 60 + minutes)
}

pub fn build_day(row: &CsvRow, almanac: &dyn Almanac) -> Result<Day, BluemoonError> {
    let start = row.get("Start date").ok_or_else(|| {
        BluemoonError::MalformedRecord("toggl row without `Start date`".to_string())
    })?;
    let mut day = Day::parse(start, almanac)?;

    let texts = TEXT_FIELDS
        .iter()
        .filter_map(|field| row.get(*field))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let mut record = Map::new();
    record.insert("Texts".to_string(), Value::from(texts));
    for field in FIELDS {
        let value = row
            .get(*field)
            .map(|v| Value::from(v.as_str()))
            .unwrap_or(Value::Null);
        record.insert((*field).to_string(), value);
    }
    day.add_record(SOURCE_NAME, Value::Object(record));
    Ok(day)
}

/// Per-day entry count, tracked minutes and overwork level.
#[derive(Debug, Clone, Copy)]
pub struct TogglAccumulator {
    overwork_minutes: f64,
    heavy_overwork_minutes: f64,
}

impl TogglAccumulator {
    pub fn new(cfg: &TogglConfig) -> Self {
        Self {
            overwork_minutes: cfg.overwork_hours * 60.0,
            heavy_overwork_minutes: cfg.heavy_overwork_hours * 60.0,
        }
    }

    fn overwork_level(&self, minutes: i64) -> i64 {
        let minutes = minutes as f64;
        if minutes <= self.overwork_minutes {
            0
        } else if minutes <= self.heavy_overwork_minutes {
            1
        } else {
            2
        }
    }
}

impl DatasetAnalysis for TogglAccumulator {
    fn compute(&self, days: &BTreeMap<String, Day>) -> AnalysisResult {
        days.iter()
            .map(|(key, day)| {
                let records = day.records(SOURCE_NAME);
                let duration: i64 = records
                    .iter()
                    .filter_map(|r| r.get("Duration").and_then(Value::as_str))
                    .filter_map(parse_duration_minutes)
                    .sum();

                let mut summary = BTreeMap::new();
                summary.insert("ct".to_string(), Value::from(records.len()));
                summary.insert("duration".to_string(), Value::from(duration));
                summary.insert(
                    "overwork".to_string(),
                    Value::from(self.overwork_level(duration)),
                );
                (key.clone(), AnalysisValue::Nested(summary))
            })
            .collect()
    }
}
