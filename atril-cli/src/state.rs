use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$ATRIL_HOME`, or `~/.atril`.
pub fn atril_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ATRIL_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".atril"))
}

pub fn ensure_atril_home() -> Result<PathBuf> {
    let dir = atril_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Default location of the offline store.
pub fn store_path() -> Result<PathBuf> {
    Ok(ensure_atril_home()?.join("store.json"))
}
