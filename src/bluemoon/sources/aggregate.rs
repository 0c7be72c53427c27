use crate::bluemoon::warn::{self, WarnEvent};
use crate::error::BluemoonErrorCode;
use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One CSV row keyed by header. Empty cells are omitted.
pub type CsvRow = BTreeMap<String, String>;

pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("invalid data pattern {pattern}"))? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(anyhow!("no data files match {pattern}"));
    }
    Ok(files)
}

pub fn read_csv_rows(path: &Path) -> Result<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", path.display()))?;
        let row: CsvRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Concatenate the rows of every file matching `pattern`, in path order.
/// Unreadable files are reported and skipped.
pub fn aggregate_rows(pattern: &str, source: &str) -> Result<Vec<CsvRow>> {
    let mut rows = Vec::new();
    for file in expand_pattern(pattern)? {
        match read_csv_rows(&file) {
            Ok(mut file_rows) => rows.append(&mut file_rows),
            Err(err) => warn::emit(WarnEvent {
                code: BluemoonErrorCode::E004SourceInvalid.as_str(),
                stage: "aggregate",
                action: "skip-file",
                source,
                reason: &file.display().to_string(),
                err: &format!("{err:#}"),
                ..WarnEvent::default()
            }),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn rows_from_matching_files_are_concatenated_in_order() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("b.csv"), "date,Steps\n2020-12-05,900\n").expect("write b");
        fs::write(
            tmp.path().join("a.csv"),
            "date,Steps\n2020-12-03,100\n2020-12-04,\n",
        )
        .expect("write a");
        fs::write(tmp.path().join("notes.txt"), "ignored").expect("write txt");

        let pattern = tmp.path().join("*.csv").to_string_lossy().to_string();
        let rows = aggregate_rows(&pattern, "*oura").expect("rows");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("date").map(String::as_str), Some("2020-12-03"));
        assert!(!rows[1].contains_key("Steps"));
        assert_eq!(rows[2].get("Steps").map(String::as_str), Some("900"));
    }

    #[test]
    fn quoted_cells_keep_commas() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("t.csv");
        fs::write(&path, "Project,Description\n\"Moon, Inc\",\"write, test\"\n").expect("write");
        let rows = read_csv_rows(&path).expect("rows");
        assert_eq!(rows[0].get("Project").map(String::as_str), Some("Moon, Inc"));
    }

    #[test]
    fn unmatched_pattern_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let pattern = tmp.path().join("toggl*.csv").to_string_lossy().to_string();
        let err = aggregate_rows(&pattern, "*toggl").expect_err("no files");
        assert!(err.to_string().contains("no data files match"));
    }
}
