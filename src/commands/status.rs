use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::bluemoon::store::AllData;
use crate::commands::{CommandReport, StoreContext};

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub store: Option<PathBuf>,
}

pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let ctx = StoreContext::resolve(opts.store.clone())?;
    let mut report = CommandReport::new("status");
    report.detail(format!("store={}", ctx.store_path.display()));

    if !ctx.store_path.exists() {
        report.issue("store does not exist yet; run `bluemoon add` first");
        return Ok(report);
    }
    let all_data = AllData::load(&ctx.store_path, ctx.today)?;
    let days = all_data.dataset.days();

    report.detail(format!("days={}", days.len()));
    if let (Some(first), Some(last)) = (days.keys().next(), days.keys().next_back()) {
        report.detail(format!("first_day={first}"));
        report.detail(format!("last_day={last}"));
    }
    report.detail(format!("changelog_entries={}", all_data.changelog().len()));
    report.detail(format!("experiments={}", all_data.experiments().len()));
    let meta_keys: Vec<&str> = all_data.meta().extra.keys().map(String::as_str).collect();
    if !meta_keys.is_empty() {
        report.detail(format!("meta_keys={}", meta_keys.join(",")));
    }
    let whitelist: Vec<&str> = all_data.serialize_fields().iter().map(String::as_str).collect();
    report.detail(format!("serialize_fields={}", whitelist.join(",")));
    if all_data.dataset.is_empty() {
        report.detail("store has no days yet");
    }

    // Latest scalar value of every whitelisted field.
    if let Some(last) = days.keys().next_back().and_then(|key| all_data.dataset.get(key)) {
        for field in &whitelist {
            if let Some(value) = last.get(field) {
                report.detail(format!("latest.{field}={value}"));
            }
        }
    }

    let scalar_fields: BTreeSet<&str> = days
        .values()
        .flat_map(|day| day.data().keys().map(String::as_str))
        .collect();
    report.detail(format!("data_fields={}", scalar_fields.len()));

    let fields: BTreeSet<&str> = days
        .values()
        .flat_map(|day| day.cumulative().keys().map(String::as_str))
        .collect();
    for field in fields {
        report.detail(format!(
            "cumulative.{field}={}",
            all_data.dataset.count_cumulative_entries(field)
        ));
    }

    Ok(report)
}
