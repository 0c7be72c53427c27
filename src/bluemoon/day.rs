use crate::bluemoon::almanac::Almanac;
use crate::error::BluemoonError;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const KEY_FORMAT: &str = "%Y-%m-%d";

/// Persisted shape of a single day inside the store document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedDay {
    pub data: BTreeMap<String, Value>,
    pub cumulative: BTreeMap<String, Vec<Value>>,
}

/// One calendar date's merged state.
///
/// `data` holds latest-value-wins fields, `cumulative` holds the raw records
/// each source appended for the date. The key is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Day {
    date: NaiveDate,
    key: String,
    data: BTreeMap<String, Value>,
    cumulative: BTreeMap<String, Vec<Value>>,
}

pub fn key_for(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

/// Parse `YYYY-M-D`, with or without zero padding.
pub fn parse_key(raw: &str) -> Result<NaiveDate, BluemoonError> {
    let invalid = || BluemoonError::InvalidDate(raw.to_string());
    let mut pieces = raw.trim().split('-');
    let (Some(y), Some(m), Some(d), None) =
        (pieces.next(), pieces.next(), pieces.next(), pieces.next())
    else {
        return Err(invalid());
    };
    let year = y.trim().parse::<i32>().map_err(|_| invalid())?;
    let month = m.trim().parse::<u32>().map_err(|_| invalid())?;
    let day = d.trim().parse::<u32>().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn whitelisted<T: Clone>(
    fields: &BTreeMap<String, T>,
    whitelist: Option<&BTreeSet<String>>,
) -> BTreeMap<String, T> {
    match whitelist {
        Some(allowed) if !allowed.is_empty() => fields
            .iter()
            .filter(|(k, _)| allowed.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => fields.clone(),
    }
}

impl Day {
    /// Fresh day seeded with its calendar facts.
    pub fn new(date: NaiveDate, almanac: &dyn Almanac) -> Self {
        let weekday = date.weekday();
        let mut data = BTreeMap::new();
        data.insert("moon".to_string(), Value::from(almanac.moon_distance(date)));
        data.insert("weekday_str".to_string(), Value::from(weekday_name(weekday)));
        data.insert(
            "weekday_num".to_string(),
            Value::from(weekday.num_days_from_monday()),
        );
        data.insert("season".to_string(), Value::from(almanac.season_distance(date)));

        Self {
            date,
            key: key_for(date),
            data,
            cumulative: BTreeMap::new(),
        }
    }

    pub fn parse(raw: &str, almanac: &dyn Almanac) -> Result<Self, BluemoonError> {
        Ok(Self::new(parse_key(raw)?, almanac))
    }

    /// Rebuild a day from storage; fields are taken verbatim.
    pub fn from_parts(
        date: NaiveDate,
        data: BTreeMap<String, Value>,
        cumulative: BTreeMap<String, Vec<Value>>,
    ) -> Self {
        Self {
            date,
            key: key_for(date),
            data,
            cumulative,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn cumulative(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.cumulative
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn records(&self, field: &str) -> &[Value] {
        self.cumulative.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `M T W R F S S`, Thursday being `R`.
    pub fn weekday_char(&self) -> char {
        match self.date.weekday() {
            Weekday::Thu => 'R',
            other => weekday_name(other).chars().next().unwrap_or('?'),
        }
    }

    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(field.into(), value.into());
    }

    pub fn add_record(&mut self, field: impl Into<String>, record: Value) {
        self.cumulative.entry(field.into()).or_default().push(record);
    }

    pub fn drop_field(&mut self, field: &str) {
        self.data.remove(field);
    }

    /// Merge `other` into this day and report whether any value changed.
    ///
    /// With `overwrite_fields` each cumulative sequence in `other` replaces
    /// ours wholesale; without it the sequences are appended and never count
    /// as a change. Scalar fields always overwrite.
    pub fn update(&mut self, other: Day, overwrite_fields: bool) -> bool {
        debug_assert_eq!(self.key, other.key, "merging different calendar days");
        let mut changed = false;

        for (field, records) in other.cumulative {
            if overwrite_fields {
                if self.cumulative.get(&field) != Some(&records) {
                    changed = true;
                }
                self.cumulative.insert(field, records);
            } else {
                self.cumulative.entry(field).or_default().extend(records);
            }
        }

        for (field, value) in other.data {
            if self.data.get(&field) != Some(&value) {
                changed = true;
            }
            self.data.insert(field, value);
        }

        changed
    }

    /// Persistable `{data, cumulative}`; an absent or empty whitelist keeps
    /// every field.
    pub fn serialize(&self, whitelist: Option<&BTreeSet<String>>) -> SerializedDay {
        SerializedDay {
            data: whitelisted(&self.data, whitelist),
            cumulative: whitelisted(&self.cumulative, whitelist),
        }
    }

    /// Flat row used by tabular projections.
    pub fn as_row(&self) -> BTreeMap<String, Value> {
        let mut row = self.data.clone();
        row.insert("day_str".to_string(), Value::from(self.key.clone()));
        row
    }
}
