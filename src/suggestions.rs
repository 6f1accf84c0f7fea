use crate::tab_groups::TabGroup;
use crate::tabs::Tab;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A grouping proposed by the heuristics process, as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

/// Read-only suggestion groups, replaced wholesale on every `UPDATE_GROUPS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionsState {
    pub groups: Vec<TabGroup>,
}

impl SuggestionsState {
    pub fn group(&self, id: &str) -> Option<&TabGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn update_suggested_groups(self, incoming: Vec<SuggestedGroup>) -> Self {
        let groups = incoming
            .into_iter()
            .map(|s| {
                let id = s.id.unwrap_or_else(|| stable_group_id(&s.tabs));
                TabGroup {
                    name: s.name.unwrap_or_else(|| id.clone()),
                    id,
                    tabs: s.tabs,
                    read_only: true,
                    collapsed: false,
                }
            })
            .collect();
        SuggestionsState { groups }
    }

    /// Drop one tab by hash; a group left empty goes with it.
    pub fn remove_suggested_tab(mut self, group_id: &str, tab_hash: &str) -> Self {
        if let Some(g) = self.groups.iter_mut().find(|g| g.id == group_id) {
            g.tabs.retain(|t| t.hash.as_deref() != Some(tab_hash));
        }
        self.groups.retain(|g| g.id != group_id || !g.tabs.is_empty());
        self
    }

    pub fn remove_suggested_group(mut self, group_id: &str) -> Self {
        self.groups.retain(|g| g.id != group_id);
        self
    }

    pub fn clear(self) -> Self {
        SuggestionsState::default()
    }
}

fn stable_group_id(tabs: &[Tab]) -> String {
    let mut hasher = Md5::new();
    for hash in tabs.iter().filter_map(|t| t.hash.as_deref()) {
        hasher.update(hash.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
