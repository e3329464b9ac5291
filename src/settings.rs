use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::extract::QuantityScope;

pub const DEFAULT_BASE_URL: &str =
    "https://www.manualslib.com/manual/3741293/Original-Prusa-Core-One.html";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
const CONFIG_NAME: &str = "manual_bom";
const ENV_PREFIX: &str = "BOM";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub first_page: u32,
    pub last_page: u32,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub delay_ms: u64,
    pub detail_path: PathBuf,
    pub bom_path: PathBuf,
    #[serde(default)]
    pub quantity_scope: QuantityScope,
}

impl Settings {
    /// Defaults, then `manual_bom.toml` (or `path`), then `BOM_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(CONFIG_NAME).required(false),
        };
        let settings = defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize::<Settings>()
            .context("Invalid settings")?;
        Ok(settings)
    }

    pub fn page_count(&self) -> u32 {
        self.last_page.saturating_add(1).saturating_sub(self.first_page)
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(Config::builder()
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("first_page", 1_i64)?
        .set_default("last_page", 216_i64)?
        .set_default("user_agent", DEFAULT_USER_AGENT)?
        .set_default("timeout_secs", 10_i64)?
        .set_default("delay_ms", 300_i64)?
        .set_default("detail_path", "prusa_hardware_raw.txt")?
        .set_default("bom_path", "prusa_hardware_bom.csv")?
        .set_default("quantity_scope", "sentence")?)
}
