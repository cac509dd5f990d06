//! Persistence helpers for learner state
//!
//! State files are written to a sibling temp file, synced, then renamed over
//! the target, so a crash mid-write leaves the previous file intact. Loads
//! never fail: a missing or unreadable file yields the default value.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value` as pretty JSON and atomically replace `path`
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_vec_pretty(value).context("Failed to serialize state")?;
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&json).context("Failed to write state")?;
        file.sync_all().context("Failed to sync state")?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move state into {}", path.display()))?;

    debug!(path = %path.display(), bytes = json.len(), "💾 State saved");
    Ok(())
}

/// Load JSON state, degrading to `T::default()` on any failure
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "📂 No previous state found, starting fresh");
            return T::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read state, using defaults");
            return T::default();
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(value) => {
            info!(path = %path.display(), "📂 State restored");
            value
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt state file, using defaults");
            T::default()
        }
    }
}
