use anyhow::Result;
use std::path::PathBuf;

use crate::bluemoon::store::AllData;
use crate::commands::{CommandReport, StoreContext};

#[derive(Debug, Clone)]
pub struct ChangelogOptions {
    pub store: Option<PathBuf>,
    pub limit: usize,
}

pub fn run(opts: &ChangelogOptions) -> Result<CommandReport> {
    let ctx = StoreContext::resolve(opts.store.clone())?;
    let mut report = CommandReport::new("changelog");

    if !ctx.store_path.exists() {
        report.issue(format!("store {} does not exist", ctx.store_path.display()));
        return Ok(report);
    }
    let all_data = AllData::load(&ctx.store_path, ctx.today)?;
    let entries = all_data.changelog();
    let skip = entries.len().saturating_sub(opts.limit);

    for entry in &entries[skip..] {
        report.detail(format!(
            "{} days={} {}",
            entry.day,
            entry.days_affected.len(),
            entry.description
        ));
    }
    if entries.is_empty() {
        report.detail("changelog is empty");
    }
    Ok(report)
}
