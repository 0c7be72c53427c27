use crate::bluemoon::paths::BluemoonPaths;
use crate::bluemoon::util::Clock;
use crate::error::BluemoonError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_indent")]
    pub indent: usize,
    #[serde(default = "default_lock")]
    pub lock: bool,
}

fn default_indent() -> usize {
    4
}

fn default_lock() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            indent: default_indent(),
            lock: default_lock(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub timezone: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TogglConfig {
    pub overwork_hours: f64,
    pub heavy_overwork_hours: f64,
}

impl Default for TogglConfig {
    fn default() -> Self {
        Self {
            overwork_hours: 11.0,
            heavy_overwork_hours: 14.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BluemoonConfig {
    pub store: StoreConfig,
    pub clock: ClockConfig,
    pub toggl: TogglConfig,
}

impl BluemoonConfig {
    pub fn clock(&self) -> Result<Clock> {
        Clock::parse(&self.clock.timezone).ok_or_else(|| {
            BluemoonError::InvalidConfig(format!("unknown timezone `{}`", self.clock.timezone))
                .into()
        })
    }

    pub fn store_path(&self, paths: &BluemoonPaths) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| paths.default_store.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialBluemoonConfig {
    store: Option<StoreConfig>,
    clock: Option<ClockConfig>,
    toggl: Option<TogglConfig>,
}

fn env_or_f64(var: &str, fallback: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<f64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_path(var: &str, fallback: Option<PathBuf>) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => fallback,
    }
}

fn validate(cfg: &BluemoonConfig) -> Result<()> {
    if cfg.store.indent > 8 {
        return Err(anyhow!("invalid store indent: require 0 <= indent <= 8"));
    }
    let overwork = cfg.toggl.overwork_hours;
    let heavy = cfg.toggl.heavy_overwork_hours;
    if !(overwork > 0.0 && heavy > 0.0) {
        return Err(anyhow!("invalid toggl thresholds: hours must be > 0"));
    }
    if overwork >= heavy {
        return Err(anyhow!(
            "invalid toggl thresholds: require overwork_hours < heavy_overwork_hours"
        ));
    }
    cfg.clock()?;
    Ok(())
}

fn merge_file_config(base: &mut BluemoonConfig, raw: &str) -> Result<()> {
    let parsed: PartialBluemoonConfig = toml::from_str(raw)?;
    if let Some(store) = parsed.store {
        base.store = store;
    }
    if let Some(clock) = parsed.clock {
        base.clock = clock;
    }
    if let Some(toggl) = parsed.toggl {
        base.toggl = toggl;
    }
    Ok(())
}

pub fn load_config(paths: &BluemoonPaths) -> Result<BluemoonConfig> {
    let mut cfg = BluemoonConfig::default();
    if paths.config_file.exists() {
        let raw = fs::read_to_string(&paths.config_file)?;
        merge_file_config(&mut cfg, &raw).map_err(|err| {
            BluemoonError::InvalidConfig(format!("{}: {err}", paths.config_file.display()))
        })?;
    }

    cfg.store.path = env_or_path("BLUEMOON_STORE_PATH", cfg.store.path);
    cfg.store.indent = env_or_usize("BLUEMOON_STORE_INDENT", cfg.store.indent);
    cfg.store.lock = env_or_bool("BLUEMOON_STORE_LOCK", cfg.store.lock);
    cfg.clock.timezone = env_or_string("BLUEMOON_TIMEZONE", &cfg.clock.timezone);
    cfg.toggl.overwork_hours =
        env_or_f64("BLUEMOON_TOGGL_OVERWORK_HOURS", cfg.toggl.overwork_hours);
    cfg.toggl.heavy_overwork_hours = env_or_f64(
        "BLUEMOON_TOGGL_HEAVY_OVERWORK_HOURS",
        cfg.toggl.heavy_overwork_hours,
    );

    validate(&cfg)?;
    Ok(cfg)
}
