use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BluemoonPaths {
    pub bluemoon_home: PathBuf,
    pub default_store: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

pub(crate) fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<BluemoonPaths> {
    let home = required_home_dir()?;
    let bluemoon_home = env_or_default_path("BLUEMOON_HOME", home.join(".bluemoon"));

    let default_store = bluemoon_home.join("bluemoon.json");
    let logs_dir = env_or_default_path("BLUEMOON_LOGS_DIR", bluemoon_home.join("logs"));
    let config_file = env_or_default_path(
        "BLUEMOON_CONFIG_PATH",
        bluemoon_home.join("bluemoon.toml"),
    );

    Ok(BluemoonPaths {
        bluemoon_home,
        default_store,
        logs_dir,
        config_file,
    })
}
