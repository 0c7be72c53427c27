//! Source adapters: turn raw input into a transient [`Dataset`] of fresh
//! days, plus at most one accumulator analysis named after the source.

pub mod aggregate;
pub mod oura;
pub mod toggl;
pub mod worklog;

use crate::bluemoon::almanac::Almanac;
use crate::bluemoon::analysis::DatasetAnalysis;
use crate::bluemoon::config::TogglConfig;
use crate::bluemoon::dataset::Dataset;
use crate::bluemoon::day::Day;
use crate::bluemoon::sources::aggregate::CsvRow;
use crate::bluemoon::warn::{self, WarnEvent};
use crate::error::{BluemoonError, BluemoonErrorCode};
use anyhow::Result;
use chrono::NaiveDate;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Eventlog,
    Worklog,
    Datalog,
    Report,
    Fitbit,
    Oura,
    Toggl,
    Exist,
    Lastfm,
}

/// What an adapter needs besides its raw input.
pub struct BuildContext<'a> {
    pub today: NaiveDate,
    pub almanac: &'a dyn Almanac,
    pub toggl: &'a TogglConfig,
}

impl DataSource {
    pub const ALL: [DataSource; 9] = [
        Self::Eventlog,
        Self::Worklog,
        Self::Datalog,
        Self::Report,
        Self::Fitbit,
        Self::Oura,
        Self::Toggl,
        Self::Exist,
        Self::Lastfm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eventlog => "eventlog",
            Self::Worklog => worklog::SOURCE_NAME,
            Self::Datalog => "datalog",
            Self::Report => "report",
            Self::Fitbit => "*fitbit",
            Self::Oura => oura::SOURCE_NAME,
            Self::Toggl => toggl::SOURCE_NAME,
            Self::Exist => "*exist",
            Self::Lastfm => "*last.fm",
        }
    }

    /// External sources are prefixed with `*`.
    pub fn is_external(self) -> bool {
        self.as_str().starts_with('*')
    }

    pub fn is_supported(self) -> bool {
        matches!(self, Self::Worklog | Self::Toggl | Self::Oura)
    }

    /// Dataset-wide accumulator registered under the source's name.
    pub fn accumulator(self, ctx: &BuildContext<'_>) -> Option<Box<dyn DatasetAnalysis>> {
        match self {
            Self::Toggl => Some(Box::new(toggl::TogglAccumulator::new(ctx.toggl))),
            _ => None,
        }
    }

    pub fn build_dataset(self, data: &str, ctx: &BuildContext<'_>) -> Result<Dataset> {
        let mut ds = match self {
            Self::Worklog => {
                worklog::WorklogSpec::from_path(Path::new(data))?.build_dataset(ctx.today, ctx.almanac)?
            }
            Self::Toggl => rows_dataset(self, data, ctx, toggl::build_day)?,
            Self::Oura => rows_dataset(self, data, ctx, oura::build_day)?,
            _ => {
                return Err(
                    BluemoonError::UnknownSource(format!("{self} has no importer yet")).into(),
                );
            }
        };
        ds.add_dataset_analysis(self.as_str(), self.accumulator(ctx));
        Ok(ds)
    }

    pub fn help(self) -> String {
        let intro = |optional: bool, flag: &str| {
            format!(
                "{} data from --{flag}.",
                if optional { "Accepts" } else { "Requires" }
            )
        };
        match self {
            Self::Eventlog => format!("{}\n{}\n", intro(false, "data"), intro(true, "meta")),
            Self::Worklog => format!(
                "{}\n{}",
                intro(false, "data"),
                r#"All data is specified manually in a JSON file. Every day between first_day and
last_day (inclusive) gets working_hours when its weekday letter (MTWRFSS, Thursday
is R) is in working_days, otherwise 0. Exceptions override single dates.

  --data worklog.json
    {
      "comments": "last-minute project push",
      "first_day": "2020-11-30",
      "last_day": "2020-12-23",
      "working_days": "MTWRF",
      "working_hours": 8,
      "exceptions": {"2020-12-4": 0, "2020-12-17": 0}
    }
"#
            ),
            Self::Toggl => format!(
                "{}\nCSV export(s) from Toggl; a glob such as 'exports/toggl*.csv' is accepted.\nColumns used: Start date, {}.\n",
                intro(false, "data"),
                toggl::FIELDS.join(", ")
            ),
            Self::Oura => format!(
                "{}\nCSV export(s) from Oura keyed by the `date` column; a glob is accepted.\n",
                intro(false, "data")
            ),
            _ => "No importer yet.\n".to_string(),
        }
    }

    pub fn all_help() -> String {
        let rule = "-".repeat(80);
        Self::ALL
            .iter()
            .map(|source| format!("{rule}\n{source}\n{rule}\n{}", source.help()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn rows_dataset(
    source: DataSource,
    pattern: &str,
    ctx: &BuildContext<'_>,
    build_day: fn(&CsvRow, &dyn Almanac) -> Result<Day, BluemoonError>,
) -> Result<Dataset> {
    let mut ds = Dataset::new(ctx.today);
    for (index, row) in aggregate::aggregate_rows(pattern, source.as_str())?
        .iter()
        .enumerate()
    {
        match build_day(row, ctx.almanac) {
            Ok(day) => ds.add(day, false),
            Err(err) => warn::emit(WarnEvent {
                code: BluemoonErrorCode::E004SourceInvalid.as_str(),
                stage: "build-dataset",
                action: "skip-row",
                source: source.as_str(),
                reason: &format!("row {index}"),
                err: &err.to_string(),
                ..WarnEvent::default()
            }),
        }
    }
    Ok(ds)
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = BluemoonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|source| {
                let name = source.as_str();
                name == wanted || name.trim_start_matches('*') == wanted
            })
            .ok_or_else(|| BluemoonError::UnknownSource(wanted.to_string()))
    }
}
