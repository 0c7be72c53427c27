use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::bluemoon::dataset::Row;
use crate::bluemoon::store::AllData;
use crate::commands::{CommandReport, StoreContext};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub store: Option<PathBuf>,
    pub out: PathBuf,
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// `day_str` first, then every other column in name order.
fn columns(rows: &[Row]) -> Vec<String> {
    let rest: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .filter(|key| *key != "day_str")
        .collect();
    std::iter::once("day_str")
        .chain(rest)
        .map(ToOwned::to_owned)
        .collect()
}

fn write_rows(out: &Path, rows: &[Row]) -> Result<usize> {
    let header = columns(rows);
    let mut writer =
        csv::Writer::from_path(out).with_context(|| format!("failed to create {}", out.display()))?;
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(header.iter().map(|column| cell(row.get(column))))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", out.display()))?;
    Ok(header.len())
}

pub fn run(opts: &ExportOptions) -> Result<CommandReport> {
    let ctx = StoreContext::resolve(opts.store.clone())?;
    let mut report = CommandReport::new("export");

    if !ctx.store_path.exists() {
        report.issue(format!("store {} does not exist", ctx.store_path.display()));
        return Ok(report);
    }
    let mut all_data = AllData::load(&ctx.store_path, ctx.today)?;
    all_data.dataset.set_ready(true);
    report.detail(format!("ready={}", all_data.dataset.ready()));
    let rows = all_data.dataset.as_rows()?;
    let n_columns = write_rows(&opts.out, &rows)?;

    report.detail(format!("out={}", opts.out.display()));
    report.detail(format!("rows={}", rows.len()));
    report.detail(format!("columns={n_columns}"));
    Ok(report)
}
