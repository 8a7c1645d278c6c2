use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const HOME_ENV: &str = "LEDGERQ_HOME";

/// `$LEDGERQ_HOME`, else `~/.ledgerq`.
pub fn ledgerq_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".ledgerq"))
}

pub fn ensure_ledgerq_home() -> Result<PathBuf> {
    let dir = ledgerq_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ledgerq_home()?.join("config.toml"))
}
