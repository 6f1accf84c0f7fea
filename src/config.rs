use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";

/// Process-level knobs. Read once at startup from `<data_dir>/config.json`;
/// any missing key falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub sync_interval_secs: u64,
    pub sync_deadline_secs: u64,
    pub notify_debounce_ms: u64,
    pub remote_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            sync_interval_secs: 10,
            sync_deadline_secs: 5,
            notify_debounce_ms: 2000,
            remote_sync: true,
        }
    }
}

impl Config {
    /// Load `config.json` from `data_dir`. An absent or unreadable file yields
    /// the defaults. The result is always rooted at `data_dir`.
    pub fn load(data_dir: &Path) -> Config {
        let path = data_dir.join(CONFIG_FILE);
        let parsed = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| match serde_json::from_str::<Config>(&s) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "ignoring malformed config: {}", e);
                    None
                }
            });
        Config {
            data_dir: data_dir.to_path_buf(),
            ..parsed.unwrap_or_default()
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn sync_deadline(&self) -> Duration {
        Duration::from_secs(self.sync_deadline_secs.max(1))
    }

    pub fn notify_debounce(&self) -> Duration {
        Duration::from_millis(self.notify_debounce_ms)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("storage.db")
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabgroups")
}
