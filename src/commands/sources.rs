use anyhow::Result;

use crate::bluemoon::sources::DataSource;
use crate::commands::CommandReport;

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("sources");
    for source in DataSource::ALL {
        let state = if source.is_supported() { "importer" } else { "planned" };
        let origin = if source.is_external() { "external" } else { "internal" };
        report.detail(format!("{source} ({state}, {origin})"));
    }
    report.detail(DataSource::all_help());
    Ok(report)
}
