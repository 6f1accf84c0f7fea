use serde::{Deserialize, Serialize};

/// User preferences, persisted with the envelope and synced across devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub heuristics_enabled: bool,
    pub debug_logging: bool,
    pub open_groups_in_new_window: bool,
    /// Opaque to this crate; forwarded verbatim with `REFRESH_GROUPS`.
    pub heuristics_config: serde_json::Value,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            heuristics_enabled: true,
            debug_logging: false,
            open_groups_in_new_window: true,
            heuristics_config: serde_json::Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub heuristics_enabled: Option<bool>,
    #[serde(default)]
    pub debug_logging: Option<bool>,
    #[serde(default)]
    pub open_groups_in_new_window: Option<bool>,
    #[serde(default)]
    pub heuristics_config: Option<serde_json::Value>,
}

impl Settings {
    pub fn apply(mut self, patch: SettingsPatch) -> Self {
        if let Some(v) = patch.heuristics_enabled {
            self.heuristics_enabled = v;
        }
        if let Some(v) = patch.debug_logging {
            self.debug_logging = v;
        }
        if let Some(v) = patch.open_groups_in_new_window {
            self.open_groups_in_new_window = v;
        }
        if let Some(v) = patch.heuristics_config {
            self.heuristics_config = v;
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tutorial {
    pub progress: u32,
    pub completed: bool,
}

impl Tutorial {
    /// Progress only moves forward; completion is sticky.
    pub fn advance(mut self, progress: u32, completed: bool) -> Self {
        self.progress = self.progress.max(progress);
        self.completed |= completed;
        self
    }
}

/// Router-owned view of the heuristics process. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicsStatus {
    pub connected: bool,
    pub message: Option<String>,
    pub last_notification: Option<String>,
    pub interaction_requested: bool,
}
