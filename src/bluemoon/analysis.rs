use crate::bluemoon::day::{Day, key_for};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

pub const AVAILABILITY: &str = "availability";
pub const DAYS_BEFORE: &str = "days_before";

const NEIGHBOUR_WEIGHT: f64 = 1.0 / 3.0;

/// Per-day output of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisValue {
    Scalar(Value),
    /// Materialized as one `name_subfield` field per entry.
    Nested(BTreeMap<String, Value>),
}

pub type AnalysisResult = BTreeMap<String, AnalysisValue>;

/// A derived per-day value computed over the whole day collection.
pub trait DatasetAnalysis {
    fn compute(&self, days: &BTreeMap<String, Day>) -> AnalysisResult;
}

pub fn compound_field_name(field: &str, subfield: &str) -> String {
    format!("{field}_{subfield}")
}

/// Presence score: 1 for the day itself plus a third for every calendar
/// neighbour that is also present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Availability;

impl DatasetAnalysis for Availability {
    fn compute(&self, days: &BTreeMap<String, Day>) -> AnalysisResult {
        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        for (key, day) in days {
            *scores.entry(key.clone()).or_default() += 1.0;

            let neighbours = [day.date().succ_opt(), day.date().pred_opt()];
            for neighbour in neighbours.into_iter().flatten() {
                let neighbour_key = key_for(neighbour);
                if days.contains_key(&neighbour_key) {
                    *scores.entry(neighbour_key).or_default() += NEIGHBOUR_WEIGHT;
                }
            }
        }

        scores
            .into_iter()
            .map(|(key, score)| (key, AnalysisValue::Scalar(Value::from(score))))
            .collect()
    }
}

/// Signed day distance from the reference date; future days are negative.
#[derive(Debug, Clone, Copy)]
pub struct DaysBefore {
    pub today: NaiveDate,
}

impl DatasetAnalysis for DaysBefore {
    fn compute(&self, days: &BTreeMap<String, Day>) -> AnalysisResult {
        days.iter()
            .map(|(key, day)| {
                let delta = self.today.signed_duration_since(day.date()).num_days();
                (key.clone(), AnalysisValue::Scalar(Value::from(delta)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluemoon::almanac::MeanAlmanac;

    fn days(keys: &[&str]) -> BTreeMap<String, Day> {
        keys.iter()
            .map(|k| {
                let d = Day::parse(k, &MeanAlmanac).expect("valid day");
                (d.key().to_string(), d)
            })
            .collect()
    }

    fn scalar(result: &AnalysisResult, key: &str) -> f64 {
        match result.get(key) {
            Some(AnalysisValue::Scalar(v)) => v.as_f64().expect("number"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn availability_credits_adjacent_days() {
        let all = days(&["2020-12-03", "2020-12-04", "2020-12-05", "2020-12-09"]);
        let result = Availability.compute(&all);

        assert!((scalar(&result, "2020-12-04") - 5.0 / 3.0).abs() < 1e-9);
        assert!((scalar(&result, "2020-12-03") - 4.0 / 3.0).abs() < 1e-9);
        assert!((scalar(&result, "2020-12-05") - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(scalar(&result, "2020-12-09"), 1.0);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn availability_crosses_month_and_year_boundaries() {
        let all = days(&["2020-12-31", "2021-01-01"]);
        let result = Availability.compute(&all);
        assert!((scalar(&result, "2020-12-31") - 4.0 / 3.0).abs() < 1e-9);
        assert!((scalar(&result, "2021-01-01") - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn days_before_is_signed() {
        let all = days(&["2020-12-01", "2020-12-10", "2020-12-12"]);
        let today = NaiveDate::from_ymd_opt(2020, 12, 10).expect("date");
        let result = DaysBefore { today }.compute(&all);

        assert_eq!(scalar(&result, "2020-12-01"), 9.0);
        assert_eq!(scalar(&result, "2020-12-10"), 0.0);
        assert_eq!(scalar(&result, "2020-12-12"), -2.0);
    }

    #[test]
    fn compound_names_join_with_underscore() {
        assert_eq!(compound_field_name("*toggl", "ct"), "*toggl_ct");
    }
}
