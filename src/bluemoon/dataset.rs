use crate::bluemoon::analysis::{
    AVAILABILITY, AnalysisResult, AnalysisValue, Availability, DAYS_BEFORE, DatasetAnalysis,
    DaysBefore, compound_field_name,
};
use crate::bluemoon::day::Day;
use crate::error::BluemoonError;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type Row = BTreeMap<String, Value>;

/// Days keyed by date plus the analyses materialized while `ready`.
pub struct Dataset {
    today: NaiveDate,
    days: BTreeMap<String, Day>,
    analyses: Vec<(String, Box<dyn DatasetAnalysis>)>,
    ready: bool,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("today", &self.today)
            .field("days", &self.days.len())
            .field("analyses", &self.analysis_names())
            .field("ready", &self.ready)
            .finish()
    }
}

impl Dataset {
    pub fn new(today: NaiveDate) -> Self {
        let mut dataset = Self {
            today,
            days: BTreeMap::new(),
            analyses: Vec::new(),
            ready: false,
        };
        dataset.add_dataset_analysis(AVAILABILITY, Some(Box::new(Availability)));
        dataset.add_dataset_analysis(DAYS_BEFORE, Some(Box::new(DaysBefore { today })));
        dataset
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn days(&self) -> &BTreeMap<String, Day> {
        &self.days
    }

    pub fn get(&self, key: &str) -> Option<&Day> {
        self.days.get(key)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn analysis_names(&self) -> Vec<&str> {
        self.analyses.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Insert `day`, or merge it into the existing day with the same key.
    pub fn add(&mut self, day: Day, overwrite_fields: bool) {
        match self.days.get_mut(day.key()) {
            Some(existing) => {
                existing.update(day, overwrite_fields);
            }
            None => {
                self.days.insert(day.key().to_string(), day);
            }
        }
    }

    /// Register or replace an analysis. `None` leaves any existing
    /// registration in place.
    pub fn add_dataset_analysis(
        &mut self,
        name: impl Into<String>,
        analysis: Option<Box<dyn DatasetAnalysis>>,
    ) {
        let Some(analysis) = analysis else {
            return;
        };
        let name = name.into();
        match self.analyses.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = analysis,
            None => self.analyses.push((name, analysis)),
        }
    }

    /// Materialize per-day values. Days without an entry are left alone.
    pub fn create_field(&mut self, name: &str, values_by_day: &AnalysisResult) {
        for (key, day) in &mut self.days {
            match values_by_day.get(key) {
                Some(AnalysisValue::Nested(subfields)) => {
                    for (subfield, value) in subfields {
                        day.set_value(compound_field_name(name, subfield), value.clone());
                    }
                }
                Some(AnalysisValue::Scalar(value)) => day.set_value(name, value.clone()),
                None => {}
            }
        }
    }

    pub fn drop_field(&mut self, name: &str) {
        for day in self.days.values_mut() {
            day.drop_field(name);
        }
    }

    /// Toggle materialization of every registered analysis.
    ///
    /// All analyses see the same snapshot of days: results are computed
    /// first and only then written back in registration order. Turning
    /// readiness off drops each analysis by its registered name only, so
    /// `name_subfield` fields written by nested analyses stay behind.
    pub fn set_ready(&mut self, value: bool) {
        if value {
            let results: Vec<(String, AnalysisResult)> = self
                .analyses
                .iter()
                .map(|(name, analysis)| (name.clone(), analysis.compute(&self.days)))
                .collect();
            for (name, values_by_day) in &results {
                self.create_field(name, values_by_day);
            }
            self.ready = true;
        } else {
            self.ready = false;
            let names: Vec<String> = self.analyses.iter().map(|(name, _)| name.clone()).collect();
            for name in &names {
                self.drop_field(name);
            }
        }
    }

    /// Merge `incoming` with overwrite semantics and return the affected
    /// keys: changed existing days first, then newly inserted ones.
    pub fn update(&mut self, incoming: Dataset) -> Vec<String> {
        let mut changed = Vec::new();
        let mut inserted = Vec::new();
        for (key, day) in incoming.days {
            match self.days.get_mut(&key) {
                Some(existing) => {
                    if existing.update(day, true) {
                        changed.push(key);
                    }
                }
                None => {
                    self.days.insert(key.clone(), day);
                    inserted.push(key);
                }
            }
        }
        changed.extend(inserted);
        changed
    }

    pub fn count_cumulative_entries(&self, field: &str) -> usize {
        self.days.values().map(|day| day.records(field).len()).sum()
    }

    /// Tabular projection, one row per day in key order.
    pub fn as_rows(&self) -> Result<Vec<Row>, BluemoonError> {
        if !self.ready {
            return Err(BluemoonError::NotReady);
        }
        Ok(self.days.values().map(Day::as_row).collect())
    }
}
