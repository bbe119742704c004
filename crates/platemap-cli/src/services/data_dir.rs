// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution and config loading.

use std::path::{Path, PathBuf};

use platemap_core::PlatemapConfig;
use platemap_core::error::Result;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.json";

/// Return the application data directory.
pub fn data_dir() -> PathBuf {
    resolve_data_dir(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn resolve_data_dir(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    let base = xdg
        .or_else(|| home.map(|h| h.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("platemap")
}

/// Load the engine config.
///
/// An explicit path must exist and parse. Otherwise `config.json` in
/// `data_dir` is used when present and readable, and defaults when not.
pub fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<PlatemapConfig> {
    if let Some(path) = explicit {
        let data = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&data)?);
    }

    let path = data_dir.join(CONFIG_FILE);
    let Ok(data) = std::fs::read_to_string(&path) else {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(PlatemapConfig::default());
    };
    match serde_json::from_str(&data) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
            Ok(PlatemapConfig::default())
        }
    }
}

/// Write `config` as `config.json` inside `data_dir`, creating the directory.
pub fn persist_config(data_dir: &Path, config: &PlatemapConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(CONFIG_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let dir = resolve_data_dir(Some("/xdg".into()), Some("/home/cook".into()));
        assert_eq!(dir, PathBuf::from("/xdg/platemap"));
        let dir = resolve_data_dir(None, Some("/home/cook".into()));
        assert_eq!(dir, PathBuf::from("/home/cook/.local/share/platemap"));
    }

    #[test]
    fn missing_config_gives_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = load_config(None, tmp.path()).expect("load");
        assert_eq!(config, PlatemapConfig::default());
    }

    #[test]
    fn persisted_config_is_loaded_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("platemap");
        let config = PlatemapConfig {
            max_strips: 3,
            snap_threshold: 0.5,
            ..PlatemapConfig::default()
        };
        persist_config(&dir, &config).expect("persist");
        assert_eq!(load_config(None, &dir).expect("load"), config);
    }

    #[test]
    fn malformed_data_dir_config_falls_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join(CONFIG_FILE), "{ not json").expect("write");
        let config = load_config(None, tmp.path()).expect("load");
        assert_eq!(config, PlatemapConfig::default());
    }

    #[test]
    fn explicit_config_must_exist() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = tmp.path().join("nope.json");
        assert!(load_config(Some(&missing), tmp.path()).is_err());
    }
}
