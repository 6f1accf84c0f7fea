use serde::{Deserialize, Serialize};

/// Browser-assigned tab id. Transient and may be reused by the browser.
pub type TabId = i64;

/// A live tab as mirrored from the browser, and the snapshot form stored
/// inside groups. Every field is optional because tab events arrive with
/// partial data (a freshly created tab often has neither title nor url yet).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor_tab_id: Option<TabId>,
}

/// Titles of extension/browser pages that never enter the recently-closed list.
pub const PRIVILEGED_TITLES: &[&str] = &["New Tab", "Tab Groups"];

pub const STATUS_COMPLETE: &str = "complete";

impl Tab {
    pub fn new(id: TabId, url: &str, title: &str) -> Self {
        Tab {
            id: Some(id),
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            ..Tab::default()
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.title
            .as_deref()
            .map(|t| PRIVILEGED_TITLES.contains(&t))
            .unwrap_or(false)
    }

    /// Copy of this tab carrying a fresh UI-tracking uuid, decorrelated from
    /// whatever rendering key the original had.
    pub fn snapshot(&self) -> Tab {
        Tab {
            uuid: Some(uuid::Uuid::new_v4().to_string()),
            ..self.clone()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some(STATUS_COMPLETE)
    }

    pub fn redacted(&self) -> RedactedTab {
        RedactedTab::from(self)
    }
}

/// Field delta delivered with a browser `onUpdated` event. `None` means the
/// field did not change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
}

impl TabChange {
    /// Touches a property the heuristics process cares about.
    pub fn is_relevant(&self) -> bool {
        self.pinned.is_some()
            || self.title.is_some()
            || self.fav_icon_url.is_some()
            || self.url.is_some()
    }

    pub fn touches_identity(&self) -> bool {
        self.url.is_some() || self.title.is_some()
    }

    pub fn merge_into(&self, tab: &mut Tab) {
        if let Some(ref url) = self.url {
            tab.url = Some(url.clone());
        }
        if let Some(ref title) = self.title {
            tab.title = Some(title.clone());
        }
        if let Some(ref fav) = self.fav_icon_url {
            tab.fav_icon_url = Some(fav.clone());
        }
        if let Some(pinned) = self.pinned {
            tab.pinned = Some(pinned);
        }
        if let Some(ref status) = self.status {
            tab.status = Some(status.clone());
        }
        if let Some(index) = self.index {
            tab.index = Some(index);
        }
        if let Some(window_id) = self.window_id {
            tab.window_id = Some(window_id);
        }
    }
}

/// Allowlisted projection of a tab sent to the heuristics process. Favicons,
/// uuids and display aliases never leave the extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedTab {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor_tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl From<&Tab> for RedactedTab {
    fn from(t: &Tab) -> Self {
        RedactedTab {
            id: t.id,
            index: t.index,
            last_accessed: t.last_accessed,
            opener_tab_id: t.opener_tab_id,
            pinned: t.pinned,
            session_id: t.session_id.clone(),
            successor_tab_id: t.successor_tab_id,
            title: t.title.clone(),
            url: t.url.clone(),
            window_id: t.window_id,
            normalized_title: t.normalized_title.clone(),
            hash: t.hash.clone(),
            origin: t.origin.clone(),
            base_url: t.base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_drops_bulk_fields() {
        let mut tab = Tab::new(3, "https://a.com/x", "A");
        tab.fav_icon_url = Some("data:image/png;base64,AAAA".into());
        tab.uuid = Some("u-1".into());
        tab.display_title = Some("alias".into());

        let v = serde_json::to_value(tab.redacted()).unwrap();
        let obj = v.as_object().unwrap();
        assert!(obj.get("favIconUrl").is_none());
        assert!(obj.get("uuid").is_none());
        assert!(obj.get("displayTitle").is_none());
        assert_eq!(obj["id"], 3);
        assert_eq!(obj["url"], "https://a.com/x");
    }

    #[test]
    fn change_relevance() {
        let status_only = TabChange {
            status: Some("loading".into()),
            ..TabChange::default()
        };
        assert!(!status_only.is_relevant());
        assert!(!status_only.touches_identity());

        let fav = TabChange {
            fav_icon_url: Some("f.ico".into()),
            ..TabChange::default()
        };
        assert!(fav.is_relevant());
        assert!(!fav.touches_identity());
    }

    #[test]
    fn snapshot_gets_fresh_uuid() {
        let mut tab = Tab::new(1, "https://a.com", "A");
        tab.uuid = Some("old".into());
        let snap = tab.snapshot();
        assert_ne!(snap.uuid, tab.uuid);
        assert_eq!(snap.url, tab.url);
    }

    #[test]
    fn privileged_titles() {
        assert!(Tab::new(1, "chrome://newtab", "New Tab").is_privileged());
        assert!(!Tab::new(1, "https://a.com", "A").is_privileged());
        assert!(!Tab::default().is_privileged());
    }
}
