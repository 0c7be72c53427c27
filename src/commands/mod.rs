pub mod add;
pub mod changelog;
pub mod env;
pub mod export;
pub mod sources;
pub mod status;

use crate::bluemoon::config::{BluemoonConfig, load_config};
use crate::bluemoon::paths::{BluemoonPaths, resolve_paths};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Paths, config, store location and reference date shared by commands.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub paths: BluemoonPaths,
    pub cfg: BluemoonConfig,
    pub store_path: PathBuf,
    pub today: NaiveDate,
}

impl StoreContext {
    pub fn resolve(store: Option<PathBuf>) -> Result<Self> {
        let paths = resolve_paths()?;
        let cfg = load_config(&paths)?;
        let store_path = store.unwrap_or_else(|| cfg.store_path(&paths));
        let today = cfg.clock()?.today();
        Ok(Self {
            paths,
            cfg,
            store_path,
            today,
        })
    }
}
