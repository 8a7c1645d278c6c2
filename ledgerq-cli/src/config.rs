use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use ledgerq_fetch::{DEFAULT_CHUNK_DAYS, DEFAULT_PAGE_SIZE, FetchOptions};
use ledgerq_ops::MutationOptions;

use crate::state::{config_path, ensure_ledgerq_home};

pub const TOKEN_ENV: &str = "LEDGERQ_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub fetch: FetchSection,
    pub mutation: MutationSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    /// Bearer token; `LEDGERQ_TOKEN` wins when set
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub page_size: usize,
    pub chunk_days: u32,
    pub delay_ms: u64,
    pub max_pages: Option<usize>,
    pub max_records: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationSection {
    pub delay_ms: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_days: DEFAULT_CHUNK_DAYS,
            delay_ms: 200,
            max_pages: None,
            max_records: None,
        }
    }
}

impl Default for MutationSection {
    fn default() -> Self {
        Self { delay_ms: 200 }
    }
}

impl Config {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.fetch.page_size,
            chunk_days: self.fetch.chunk_days,
            delay: Duration::from_millis(self.fetch.delay_ms),
            max_pages: self.fetch.max_pages,
            max_records: self.fetch.max_records,
        }
    }

    pub fn mutation_options(&self) -> MutationOptions {
        MutationOptions {
            delay: Duration::from_millis(self.mutation.delay_ms),
        }
    }

    /// Token from the environment, else from the file.
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api.token.clone())
    }
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    ensure_ledgerq_home()?;
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
