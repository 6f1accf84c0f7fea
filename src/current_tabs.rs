use crate::identity::augment_tab;
use crate::native::{Heuristics, OutboundMessage};
use crate::tabs::{RedactedTab, Tab, TabChange, TabId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const RECENT_TABS_LIMIT: usize = 5;

/// Browser tab lifecycle events, in the order the browser happened to
/// deliver them. Nothing here assumes a `Create` precedes its `Activate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum TabEvent {
    Create(Tab),
    Update {
        id: TabId,
        change: TabChange,
        #[serde(default)]
        tab: Option<Tab>,
    },
    Activate {
        id: TabId,
        #[serde(default)]
        previous_id: Option<TabId>,
        #[serde(default)]
        window_id: Option<i64>,
    },
    Remove {
        id: TabId,
    },
    Replace(Vec<Tab>),
    UpdateStaleTabs(Vec<String>),
    CollapseCurrent,
    CollapseRecent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTabsState {
    pub tabs: Vec<Tab>,
    pub tab_hashes: Vec<Option<String>>,
    pub active_tab: Option<TabId>,
    pub previous_tab_id: Option<TabId>,
    pub recent_tabs: VecDeque<Tab>,
    pub stale_tabs: BTreeSet<String>,
    pub collapsed: bool,
    pub recent_collapsed: bool,
}

impl CurrentTabsState {
    pub fn apply(mut self, event: TabEvent) -> Self {
        match event {
            TabEvent::Create(tab) => {
                let tab = augment_tab(tab);
                self.tab_hashes.push(tab.hash.clone());
                self.tabs.push(tab);
            }
            TabEvent::Update { id, change, .. } => {
                if let Some(ix) = self.position(id) {
                    let mut tab = std::mem::take(&mut self.tabs[ix]);
                    change.merge_into(&mut tab);
                    if change.touches_identity() {
                        tab = augment_tab(tab);
                        self.tab_hashes[ix] = tab.hash.clone();
                    }
                    self.tabs[ix] = tab;
                }
            }
            TabEvent::Activate {
                id, previous_id, ..
            } => {
                self.active_tab = Some(id);
                self.previous_tab_id = previous_id;
            }
            TabEvent::Remove { id } => {
                if let Some(ix) = self.position(id) {
                    let tab = self.tabs.remove(ix);
                    self.tab_hashes.remove(ix);
                    if !tab.is_privileged() {
                        self.recent_tabs.push_front(tab);
                        self.recent_tabs.truncate(RECENT_TABS_LIMIT);
                    }
                }
            }
            TabEvent::Replace(tabs) => {
                self.tabs = tabs.into_iter().map(augment_tab).collect();
                self.tab_hashes = self.tabs.iter().map(|t| t.hash.clone()).collect();
            }
            TabEvent::UpdateStaleTabs(hashes) => {
                self.stale_tabs = hashes.into_iter().collect();
            }
            TabEvent::CollapseCurrent => self.collapsed = !self.collapsed,
            TabEvent::CollapseRecent => self.recent_collapsed = !self.recent_collapsed,
        }
        self
    }

    fn position(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == Some(id))
    }

    pub fn find(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == Some(id))
    }

    pub fn is_open(&self, hash: &str) -> bool {
        self.tab_hashes.iter().any(|h| h.as_deref() == Some(hash))
    }

    pub fn open_ids_for(&self, hashes: &BTreeSet<&str>) -> Vec<TabId> {
        self.tabs
            .iter()
            .filter(|t| t.hash.as_deref().map(|h| hashes.contains(h)).unwrap_or(false))
            .filter_map(|t| t.id)
            .collect()
    }
}

/// Per-tab-id debounce for outbound `UPDATE` notifications. A slot is created
/// on the first relevant update for a tab id and kept for the session; tab ids
/// are a small working set so the map stays small.
#[derive(Clone)]
pub struct UpdateNotifier {
    delay: Duration,
    slots: Arc<Mutex<HashMap<TabId, u64>>>,
}

impl UpdateNotifier {
    pub fn new(delay: Duration) -> Self {
        UpdateNotifier {
            delay,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule a notification for `id`. A later call for the same id before
    /// the delay elapses supersedes this one.
    pub fn schedule(&self, id: TabId, tab: RedactedTab, heuristics: &Heuristics) {
        let generation = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(id).or_insert(0);
            *slot += 1;
            *slot
        };

        let msg = OutboundMessage::Update { tab };
        let heuristics = heuristics.clone();
        let slots = Arc::clone(&self.slots);
        let delay = self.delay;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let latest = slots.lock().get(&id).copied();
                    if latest == Some(generation) {
                        heuristics.notify(msg);
                    }
                });
            }
            Err(_) => {
                tracing::debug!(tab_id = id, "no runtime for debounce, sending now");
                heuristics.notify(msg);
            }
        }
    }

    pub fn tracked(&self) -> usize {
        self.slots.lock().len()
    }
}

/// The current-tabs slice plus its side effects toward the heuristics process.
pub struct CurrentTabsStore {
    state: CurrentTabsState,
    notifier: UpdateNotifier,
}

impl CurrentTabsStore {
    pub fn new(notify_delay: Duration) -> Self {
        CurrentTabsStore {
            state: CurrentTabsState::default(),
            notifier: UpdateNotifier::new(notify_delay),
        }
    }

    pub fn state(&self) -> &CurrentTabsState {
        &self.state
    }

    pub fn notifier(&self) -> &UpdateNotifier {
        &self.notifier
    }

    pub fn handle(&mut self, event: TabEvent, heuristics: &Heuristics) {
        let outbound = match &event {
            TabEvent::Update { id, change, tab } if change.is_relevant() => {
                Some((*id, change.clone(), tab.clone()))
            }
            _ => None,
        };
        let immediate = match &event {
            TabEvent::Activate {
                id,
                previous_id,
                window_id,
            } => Some(OutboundMessage::Activate {
                id: *id,
                previous_tab_id: *previous_id,
                window_id: *window_id,
            }),
            TabEvent::Remove { id } => Some(OutboundMessage::Remove { id: *id }),
            _ => None,
        };

        let state = std::mem::take(&mut self.state);
        self.state = state.apply(event);

        if let Some(msg) = immediate {
            heuristics.notify(msg);
        }

        if let Some((id, change, snapshot)) = outbound {
            let merged = self.state.find(id).cloned();
            let status_complete = match snapshot.as_ref() {
                Some(s) if s.status.is_some() => s.is_complete(),
                _ => merged.as_ref().map(Tab::is_complete).unwrap_or(false)
                    || change.status.as_deref() == Some(crate::tabs::STATUS_COMPLETE),
            };
            if !status_complete {
                return;
            }
            let tab = match merged {
                Some(t) => t,
                None => match snapshot {
                    Some(s) => augment_tab(s),
                    None => return,
                },
            };
            self.notifier.schedule(id, tab.redacted(), heuristics);
        }
    }
}
