use crate::bluemoon::almanac::Almanac;
use crate::bluemoon::day::Day;
use crate::bluemoon::sources::aggregate::CsvRow;
use crate::error::BluemoonError;
use serde_json::{Number, Value};

pub const SOURCE_NAME: &str = "*oura";

pub const FIELDS: &[&str] = &[
    "Sleep Score",
    "Total Sleep Score",
    "REM Sleep Score",
    "Deep Sleep Score",
    "Sleep Efficiency Score",
    "Restfulness Score",
    "Sleep Latency Score",
    "Sleep Timing Score",
    "Total Bedtime",
    "Total Sleep Time",
    "Awake Time",
    "REM Sleep Time",
    "Light Sleep Time",
    "Deep Sleep Time",
    "Restless Sleep",
    "Sleep Efficiency",
    "Sleep Latency",
    "Sleep Timing",
    "Bedtime Start",
    "Bedtime End",
    "Average Resting Heart Rate",
    "Lowest Resting Heart Rate",
    "Average HRV",
    "Temperature Deviation (°C)",
    "Respiratory Rate",
    "Activity Score",
    "Stay Active Score",
    "Move Every Hour Score",
    "Meet Daily Targets Score",
    "Training Frequency Score",
    "Training Volume Score",
    "Recovery Time Score",
    "Activity Burn",
    "Total Burn",
    "Target Calories",
    "Steps",
    "Daily Movement",
    "Inactive Time",
    "Rest Time",
    "Low Activity Time",
    "Medium Activity Time",
    "High Activity Time",
    "Non-wear Time",
    "Average MET",
    "Long Periods of Inactivity",
    "Readiness Score",
    "Previous Night Score",
    "Sleep Balance Score",
    "Previous Day Activity Score",
    "Activity Balance Score",
    "Temperature Score",
    "Resting Heart Rate Score",
    "HRV Balance Score",
    "Recovery Index Score",
];

fn cell_value(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    match raw.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => Value::Number(number),
        None => Value::from(raw),
    }
}

/// One scalar field `*oura_<column>` per known, non-empty column.
pub fn build_day(row: &CsvRow, almanac: &dyn Almanac) -> Result<Day, BluemoonError> {
    let date = row
        .get("date")
        .ok_or_else(|| BluemoonError::MalformedRecord("oura row without `date`".to_string()))?;
    let mut day = Day::parse(date, almanac)?;
    for field in FIELDS {
        if let Some(raw) = row.get(*field) {
            day.set_value(format!("{SOURCE_NAME}_{field}"), cell_value(raw));
        }
    }
    Ok(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluemoon::almanac::MeanAlmanac;
    use serde_json::json;

    #[test]
    fn known_columns_become_prefixed_scalars() {
        let row: CsvRow = [
            ("date", "2020-12-04"),
            ("Sleep Score", "81"),
            ("Average HRV", "42.5"),
            ("Bedtime Start", "2020-12-03T23:41:00+02:00"),
            ("Unknown Column", "7"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let day = build_day(&row, &MeanAlmanac).expect("day");

        assert_eq!(day.get("*oura_Sleep Score"), Some(&json!(81)));
        assert_eq!(day.get("*oura_Average HRV"), Some(&json!(42.5)));
        assert_eq!(
            day.get("*oura_Bedtime Start"),
            Some(&json!("2020-12-03T23:41:00+02:00"))
        );
        assert!(day.get("*oura_Unknown Column").is_none());
        assert!(day.cumulative().is_empty());
    }

    #[test]
    fn non_finite_numbers_stay_strings() {
        assert_eq!(cell_value("NaN"), json!("NaN"));
        assert_eq!(cell_value("-3"), json!(-3));
    }
}
