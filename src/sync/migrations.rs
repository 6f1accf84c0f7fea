//! Schema upgrades on the raw envelope, applied before typed decoding.

use super::envelope::CURRENT_VERSION;
use crate::settings::{Settings, Tutorial};
use serde_json::{Map, Value};

type Migration = fn(&mut Map<String, Value>);

// index i upgrades version i+1 to i+2
const MIGRATIONS: &[Migration] = &[v1_to_v2, v2_to_v3];

pub fn migrate(root: &mut Value, from: u32) {
    let Some(obj) = root.as_object_mut() else {
        return;
    };
    let mut version = from.max(1);
    while version < CURRENT_VERSION {
        let Some(step) = MIGRATIONS.get(version as usize - 1) else {
            break;
        };
        tracing::info!(from = version, to = version + 1, "migrating persisted state");
        step(obj);
        version += 1;
    }
    obj.insert(
        "_persist".into(),
        serde_json::json!({ "version": version, "rehydrated": true }),
    );
}

fn backfill_group_flags(groups: Option<&mut Value>) {
    let Some(Value::Array(groups)) = groups else {
        return;
    };
    for group in groups.iter_mut().filter_map(Value::as_object_mut) {
        let is_current = group.get("id").and_then(Value::as_str) == Some("current");
        group
            .entry("readOnly")
            .or_insert(Value::Bool(is_current));
        group.entry("collapsed").or_insert(Value::Bool(false));
    }
}

fn v1_to_v2(root: &mut Map<String, Value>) {
    backfill_group_flags(root.get_mut("tabGroups"));
    backfill_group_flags(root.get_mut("suggestions"));
}

fn v2_to_v3(root: &mut Map<String, Value>) {
    let settings = serde_json::to_value(Settings::default()).unwrap_or(Value::Null);
    let tutorial = serde_json::to_value(Tutorial::default()).unwrap_or(Value::Null);
    match root.get_mut("settings") {
        Some(Value::Object(existing)) => {
            if let Value::Object(defaults) = settings {
                for (k, v) in defaults {
                    existing.entry(k).or_insert(v);
                }
            }
        }
        _ => {
            root.insert("settings".into(), settings);
        }
    }
    root.entry("tutorial").or_insert(tutorial);
}
