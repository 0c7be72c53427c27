use anyhow::Result;

use crate::bluemoon::config::load_config;
use crate::bluemoon::paths::resolve_paths;
use crate::commands::CommandReport;
use crate::error::BluemoonErrorCode;

include!(concat!(env!("OUT_DIR"), "/bluemoon_env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("env");

    report.detail(format!("build={}", env!("BUILD_UUID")));
    report.detail(format!("bluemoon_home={}", paths.bluemoon_home.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("config_file={}", paths.config_file.display()));

    match load_config(&paths) {
        Ok(cfg) => {
            report.detail(format!("store.path={}", cfg.store_path(&paths).display()));
            report.detail(format!("store.indent={}", cfg.store.indent));
            report.detail(format!("store.lock={}", cfg.store.lock));
            report.detail(format!("clock.timezone={}", cfg.clock.timezone));
            if let Ok(clock) = cfg.clock() {
                report.detail(format!("clock={} today={}", clock.label(), clock.today()));
            }
            report.detail(format!("toggl.overwork_hours={}", cfg.toggl.overwork_hours));
            report.detail(format!(
                "toggl.heavy_overwork_hours={}",
                cfg.toggl.heavy_overwork_hours
            ));
        }
        Err(err) => report.issue(format!(
            "{}: {err:#}",
            BluemoonErrorCode::E003ConfigInvalid.as_str()
        )),
    }

    for var in GENERATED_BLUEMOON_ENV_ALLOWLIST {
        let state = if std::env::var_os(var).is_some() { "set" } else { "unset" };
        report.detail(format!("env.{var}={state}"));
    }
    Ok(report)
}
