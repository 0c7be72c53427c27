use anyhow::Result;
use std::path::PathBuf;

use crate::bluemoon::almanac::MeanAlmanac;
use crate::bluemoon::audit;
use crate::bluemoon::lock::StoreLock;
use crate::bluemoon::sources::{BuildContext, DataSource};
use crate::bluemoon::store::AllData;
use crate::bluemoon::warn::{self, WarnEvent};
use crate::commands::{CommandReport, StoreContext};
use crate::error::{BluemoonError, BluemoonErrorCode};

#[derive(Debug, Clone)]
pub struct AddOptions {
    pub store: Option<PathBuf>,
    pub source: DataSource,
    pub data: String,
    /// `None` keeps the merge out of the changelog.
    pub description: Option<String>,
}

pub fn run(opts: &AddOptions) -> Result<CommandReport> {
    let ctx = StoreContext::resolve(opts.store.clone())?;
    let mut report = CommandReport::new("add");
    let store = ctx.store_path.display().to_string();
    report.detail(format!("store={store}"));
    report.detail(format!("source={}", opts.source));

    let _lock = if ctx.cfg.store.lock {
        match StoreLock::acquire(&ctx.store_path) {
            Ok(lock) => {
                report.detail(format!("lock={}", lock.path().display()));
                Some(lock)
            }
            Err(err)
                if matches!(
                    err.downcast_ref::<BluemoonError>(),
                    Some(BluemoonError::StoreLocked(_))
                ) =>
            {
                report.issue(format!(
                    "{}: {err}",
                    BluemoonErrorCode::E001StoreLocked.as_str()
                ));
                return Ok(report);
            }
            Err(err) => return Err(err),
        }
    } else {
        None
    };

    let mut all_data = AllData::build(&ctx.store_path, ctx.today)?;

    let build_ctx = BuildContext {
        today: ctx.today,
        almanac: &MeanAlmanac,
        toggl: &ctx.cfg.toggl,
    };
    let mut incoming = opts.source.build_dataset(&opts.data, &build_ctx)?;
    incoming.set_ready(true);
    report.detail(format!("today={}", incoming.today()));
    report.detail(format!("incoming_days={}", incoming.len()));

    let n_updates = all_data.update(incoming, opts.description.as_deref());

    all_data.set_serializable_field(opts.source.as_str());
    all_data.save(&ctx.store_path, ctx.cfg.store.indent)?;

    let message = format!("source={} affected={n_updates} store={store}", opts.source);
    if let Err(err) = audit::append_event(&ctx.paths, "add", "ok", &message) {
        warn::emit(WarnEvent {
            stage: "audit",
            action: "skip-audit-event",
            store: &store,
            source: opts.source.as_str(),
            err: &format!("{err:#}"),
            ..WarnEvent::default()
        });
    }

    report.detail(format!("changelog_entries={}", all_data.changelog().len()));
    report.detail(format!("Registered {n_updates} updates"));
    Ok(report)
}
