use anyhow::{Context, Result, bail};
use atril_core::LoanPolicy;
use atril_sync::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::ensure_atril_home;

pub const API_KEY_ENV: &str = "ATRIL_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub loans: LoansSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON file under the atril home.
    #[default]
    Local,
    /// PostgREST / Supabase project.
    Remote,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: Backend,
    /// Project URL for the remote backend, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Overridden by `ATRIL_API_KEY`.
    pub api_key: Option<String>,
    /// Local store file (default: `~/.atril/store.json`).
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub refresh_interval_secs: u64,
    pub history_clear_timeout_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 10,
            history_clear_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoansSection {
    pub home_location: String,
    pub storage_location: String,
    pub timezone: String,
}

impl Default for LoansSection {
    fn default() -> Self {
        let policy = LoanPolicy::default();
        Self {
            home_location: policy.home_location,
            storage_location: policy.storage_location,
            timezone: "America/Santiago".to_string(),
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            policy: LoanPolicy {
                home_location: self.loans.home_location.clone(),
                storage_location: self.loans.storage_location.clone(),
            },
            timezone: self.loans.timezone.clone(),
            history_clear_timeout: Duration::from_secs(self.sync.history_clear_timeout_secs),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.sync.refresh_interval_secs.max(1))
    }

    /// Remote URL and key, with the environment taking precedence for the key.
    pub fn remote_credentials(&self) -> Result<(String, String)> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        let Some(key) = resolve_api_key(self.store.api_key.as_deref(), env_key.as_deref()) else {
            bail!("remote store needs an api key: set {API_KEY_ENV} or store.api_key");
        };
        if self.store.url.trim().is_empty() {
            bail!("remote store needs store.url in {}", config_path()?.display());
        }
        Ok((self.store.url.clone(), key))
    }
}

fn resolve_api_key(configured: Option<&str>, env: Option<&str>) -> Option<String> {
    env.into_iter()
        .chain(configured)
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_atril_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
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
