use super::migrations;
use crate::error::{Error, Result};
use crate::settings::{Settings, Tutorial};
use crate::tab_groups::{TabGroup, CURRENT_GROUP_ID};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CURRENT_VERSION: u32 = 3;

/// Everything that survives a restart. Live tabs are rebuilt from the browser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub tab_groups: Vec<TabGroup>,
    pub suggestions: Vec<TabGroup>,
    pub settings: Settings,
    pub tutorial: Tutorial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistMeta {
    pub version: u32,
    pub rehydrated: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeOut<'a> {
    tab_groups: String,
    suggestions: &'a [TabGroup],
    settings: &'a Settings,
    tutorial: &'a Tutorial,
    #[serde(rename = "_persist")]
    persist: PersistMeta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeIn {
    #[serde(default)]
    tab_groups: Vec<TabGroup>,
    #[serde(default)]
    suggestions: Vec<TabGroup>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    tutorial: Tutorial,
}

/// JSON, lz4 block with a size prefix, base64.
pub fn compress_groups(groups: &[TabGroup]) -> Result<String> {
    let json = serde_json::to_vec(groups)?;
    Ok(STANDARD.encode(lz4_flex::compress_prepend_size(&json)))
}

pub fn decompress_groups(packed: &str) -> Result<Value> {
    let bytes = STANDARD.decode(packed)?;
    let json = lz4_flex::decompress_size_prepended(&bytes)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Serialize the `persist:root` value. The `current` group is written as an
/// empty shell; its tabs are live state.
pub fn encode(state: &PersistedState) -> Result<String> {
    let groups: Vec<TabGroup> = state
        .tab_groups
        .iter()
        .map(|g| {
            if g.id == CURRENT_GROUP_ID {
                TabGroup {
                    tabs: Vec::new(),
                    ..g.clone()
                }
            } else {
                g.clone()
            }
        })
        .collect();

    let out = EnvelopeOut {
        tab_groups: compress_groups(&groups)?,
        suggestions: &state.suggestions,
        settings: &state.settings,
        tutorial: &state.tutorial,
        persist: PersistMeta {
            version: CURRENT_VERSION,
            rehydrated: true,
        },
    };
    Ok(serde_json::to_string(&out)?)
}

/// Parse a `persist:root` value of any known version into current-shape state.
pub fn decode(raw: &str) -> Result<PersistedState> {
    let mut root: Value = serde_json::from_str(raw)?;
    let obj = root
        .as_object_mut()
        .ok_or_else(|| Error::Codec("envelope is not an object".into()))?;

    let version = obj
        .get("_persist")
        .and_then(|p| p.get("version"))
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(1);

    // older envelopes may carry the groups uncompressed
    if let Some(Value::String(packed)) = obj.get("tabGroups") {
        let groups = decompress_groups(packed)?;
        obj.insert("tabGroups".into(), groups);
    }

    migrations::migrate(&mut root, version);

    let env: EnvelopeIn = serde_json::from_value(root)?;
    Ok(PersistedState {
        tab_groups: env.tab_groups,
        suggestions: env.suggestions,
        settings: env.settings,
        tutorial: env.tutorial,
    })
}
