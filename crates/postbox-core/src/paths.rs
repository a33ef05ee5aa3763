use anyhow::{Result, anyhow};
use std::path::PathBuf;

const POSTBOX_DIR: &str = ".postbox";
const DB_FILE: &str = "postbox.db";

/// Environment variable to override the Postbox directory.
const POSTBOX_DIR_ENV: &str = "POSTBOX_DIR";

/// Resolve the Postbox data directory.
/// Priority: POSTBOX_DIR env var > ~/.postbox/
pub fn resolve_postbox_dir() -> Result<PathBuf> {
    resolve_dir_from(std::env::var(POSTBOX_DIR_ENV).ok(), dirs::home_dir())
}

fn resolve_dir_from(env_dir: Option<String>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = env_dir
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    home.map(|h| h.join(POSTBOX_DIR))
        .ok_or_else(|| anyhow!("Failed to determine home directory"))
}

/// Ensure the Postbox directory exists and return its path.
pub fn ensure_postbox_dir() -> Result<PathBuf> {
    let dir = resolve_postbox_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Ensure the database directory exists and return the database path:
/// ~/.postbox/postbox.db
pub fn ensure_database_path() -> Result<PathBuf> {
    Ok(ensure_postbox_dir()?.join(DB_FILE))
}
