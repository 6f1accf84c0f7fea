use crate::browser::{self, BrowserApi, CreateTab};
use crate::current_tabs::{CurrentTabsStore, TabEvent};
use crate::drag_drop::{self, DropPlan, DropResult, LiveList};
use crate::native::{
    DiscardReason, Heuristics, InboundMessage, NativePort, OutboundMessage, PortEvent,
    RedactedGroup,
};
use crate::settings::{HeuristicsStatus, Settings, SettingsPatch, Tutorial};
use crate::suggestions::SuggestionsState;
use crate::sync::envelope::PersistedState;
use crate::tab_groups::{
    GroupAction, MoveCurrentTabArgs, TabGroupsState, UpdateGroupArgs, CURRENT_GROUP_ID,
};
use crate::tabs::{Tab, TabId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Everything the UI can ask for, plus browser tab events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum Action {
    Tabs(TabEvent),
    Groups(GroupAction),
    Drag(DropResult),
    AcceptSuggestedGroup {
        group_id: String,
    },
    DiscardSuggestedGroup {
        group_id: String,
        #[serde(default)]
        reason: Option<DiscardReason>,
        #[serde(default)]
        rating: Option<u8>,
    },
    DiscardSuggestedTab {
        group_id: String,
        tab_hash: String,
    },
    OpenTabGroup {
        group_id: String,
        #[serde(default)]
        new_window: Option<bool>,
    },
    CloseTabGroup {
        group_id: String,
    },
    OpenCurrentTab {
        tab_id: TabId,
    },
    CloseCurrentTab {
        tab_id: TabId,
    },
    RefreshGroups,
    PauseHeuristics,
    ResumeHeuristics,
    UpdateSettings(SettingsPatch),
    UpdateTutorial {
        progress: u32,
        #[serde(default)]
        completed: bool,
    },
}

impl Action {
    /// Whether handling this action can change a persisted slice. Tab events
    /// only touch live state.
    pub fn touches_persisted(&self) -> bool {
        !matches!(
            self,
            Action::Tabs(_)
                | Action::OpenTabGroup { .. }
                | Action::CloseTabGroup { .. }
                | Action::OpenCurrentTab { .. }
                | Action::CloseCurrentTab { .. }
                | Action::RefreshGroups
                | Action::PauseHeuristics
                | Action::ResumeHeuristics
        )
    }
}

/// Owns every slice and applies actions to them one at a time.
pub struct Router {
    current: CurrentTabsStore,
    groups: TabGroupsState,
    suggestions: SuggestionsState,
    settings: Settings,
    tutorial: Tutorial,
    status: HeuristicsStatus,
    heuristics: Heuristics,
    browser: Arc<dyn BrowserApi>,
}

impl Router {
    pub fn new(browser: Arc<dyn BrowserApi>, notify_delay: Duration) -> Self {
        Router {
            current: CurrentTabsStore::new(notify_delay),
            groups: TabGroupsState::default(),
            suggestions: SuggestionsState::default(),
            settings: Settings::default(),
            tutorial: Tutorial::default(),
            status: HeuristicsStatus::default(),
            heuristics: Heuristics::Disconnected,
            browser,
        }
    }

    pub fn current(&self) -> &CurrentTabsStore {
        &self.current
    }

    pub fn groups(&self) -> &TabGroupsState {
        &self.groups
    }

    pub fn suggestions(&self) -> &SuggestionsState {
        &self.suggestions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tutorial(&self) -> &Tutorial {
        &self.tutorial
    }

    pub fn status(&self) -> &HeuristicsStatus {
        &self.status
    }

    pub fn heuristics(&self) -> &Heuristics {
        &self.heuristics
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            tab_groups: self.groups.groups.clone(),
            suggestions: self.suggestions.groups.clone(),
            settings: self.settings.clone(),
            tutorial: self.tutorial.clone(),
        }
    }

    /// Replace the durable slices, keeping the live tabs mirrored.
    pub fn restore(&mut self, state: PersistedState) {
        self.groups = TabGroupsState::from_groups(state.tab_groups)
            .mirror_current(&self.current.state().tabs);
        self.suggestions = SuggestionsState {
            groups: state.suggestions,
        };
        self.settings = state.settings;
        self.tutorial = state.tutorial;
    }

    /// Seed live tabs from the browser.
    pub async fn load_tabs(&mut self) {
        match self.browser.query_tabs().await {
            Ok(tabs) => self.apply_tab_event(TabEvent::Replace(tabs)),
            Err(e) => tracing::warn!("initial tab query failed: {}", e),
        }
    }

    pub fn connect(&mut self, port: NativePort) {
        tracing::info!("heuristics connected");
        self.heuristics = Heuristics::Connected(port);
        self.status.connected = true;
        if !self.settings.heuristics_enabled {
            self.heuristics.notify(OutboundMessage::Pause);
        }
    }

    pub async fn handle(&mut self, action: Action) {
        match action {
            Action::Tabs(event) => self.apply_tab_event(event),
            Action::Groups(op) => self.update_groups(|g| g.apply(op)),
            Action::Drag(drop) => self.process_drag_event(drop),
            Action::AcceptSuggestedGroup { group_id } => self.accept_suggested_group(&group_id),
            Action::DiscardSuggestedGroup {
                group_id,
                reason,
                rating,
            } => self.discard_suggested_group(&group_id, reason, rating),
            Action::DiscardSuggestedTab { group_id, tab_hash } => {
                self.discard_suggested_tab(&group_id, &tab_hash)
            }
            Action::OpenTabGroup {
                group_id,
                new_window,
            } => {
                let Some(group) = self.groups.group(&group_id) else {
                    return;
                };
                let new_window = new_window.unwrap_or(self.settings.open_groups_in_new_window);
                browser::open_tab_group(&*self.browser, group, self.current.state(), new_window)
                    .await;
            }
            Action::CloseTabGroup { group_id } => {
                let Some(group) = self.groups.group(&group_id) else {
                    return;
                };
                browser::close_tab_group(&*self.browser, group, self.current.state()).await;
            }
            Action::OpenCurrentTab { tab_id } => {
                browser::open_current_tab(&*self.browser, tab_id).await
            }
            Action::CloseCurrentTab { tab_id } => {
                browser::close_current_tab(&*self.browser, tab_id).await
            }
            Action::RefreshGroups => self.heuristics.notify(OutboundMessage::RefreshGroups {
                config: self.settings.heuristics_config.clone(),
            }),
            Action::PauseHeuristics => self.heuristics.notify(OutboundMessage::Pause),
            Action::ResumeHeuristics => self.heuristics.notify(OutboundMessage::Resume),
            Action::UpdateSettings(patch) => {
                let was_enabled = self.settings.heuristics_enabled;
                self.settings = std::mem::take(&mut self.settings).apply(patch);
                match (was_enabled, self.settings.heuristics_enabled) {
                    (true, false) => self.heuristics.notify(OutboundMessage::Pause),
                    (false, true) => self.heuristics.notify(OutboundMessage::Resume),
                    _ => {}
                }
            }
            Action::UpdateTutorial {
                progress,
                completed,
            } => {
                self.tutorial = std::mem::take(&mut self.tutorial).advance(progress, completed);
            }
        }
    }

    pub async fn handle_port(&mut self, event: PortEvent) {
        match event {
            PortEvent::Message(msg) => self.handle_native(msg).await,
            PortEvent::Disconnected => self.disconnect(),
        }
    }

    fn disconnect(&mut self) {
        tracing::info!("heuristics disconnected, clearing suggestions");
        self.heuristics = Heuristics::Disconnected;
        self.status.connected = false;
        self.suggestions = std::mem::take(&mut self.suggestions).clear();
    }

    async fn handle_native(&mut self, msg: InboundMessage) {
        match msg {
            InboundMessage::UpdateGroups(groups) => {
                tracing::debug!(count = groups.len(), "received suggested groups");
                self.suggestions =
                    std::mem::take(&mut self.suggestions).update_suggested_groups(groups);
            }
            InboundMessage::StaleTabs(hashes) => {
                self.apply_tab_event(TabEvent::UpdateStaleTabs(hashes))
            }
            InboundMessage::NewTab { url } => {
                let req = CreateTab {
                    url,
                    active: true,
                    ..CreateTab::default()
                };
                if let Err(e) = self.browser.create_tab(req).await {
                    tracing::warn!("heuristics asked for a tab that failed to open: {}", e);
                }
            }
            InboundMessage::Notify { message } => {
                tracing::info!(%message, "heuristics notification");
                self.status.last_notification = Some(message);
            }
            InboundMessage::QueryTabs => {
                let current_tabs = self.current.state().tabs.iter().map(Tab::redacted).collect();
                self.heuristics.notify(OutboundMessage::InitTabs { current_tabs });
            }
            InboundMessage::QueryGroups => {
                let tab_groups = self
                    .groups
                    .groups
                    .iter()
                    .filter(|g| g.id != CURRENT_GROUP_ID)
                    .map(RedactedGroup::from)
                    .collect();
                self.heuristics.notify(OutboundMessage::InitGroups { tab_groups });
            }
            InboundMessage::HeuristicsStatus { message } => {
                tracing::debug!(%message, "heuristics status");
                self.status.message = Some(message);
            }
            InboundMessage::RequestInteraction => {
                self.status.interaction_requested = true;
            }
        }
    }

    fn apply_tab_event(&mut self, event: TabEvent) {
        self.current.handle(event, &self.heuristics);
        let tabs = &self.current.state().tabs;
        self.groups = std::mem::take(&mut self.groups).mirror_current(tabs);
    }

    fn update_groups(&mut self, f: impl FnOnce(TabGroupsState) -> TabGroupsState) {
        self.groups = f(std::mem::take(&mut self.groups));
    }

    fn update_suggestions(&mut self, f: impl FnOnce(SuggestionsState) -> SuggestionsState) {
        self.suggestions = f(std::mem::take(&mut self.suggestions));
    }

    pub fn process_drag_event(&mut self, drop: DropResult) {
        match drag_drop::plan(&drop, &self.groups) {
            DropPlan::Abort => {}
            DropPlan::Reorder(args) => self.update_groups(|g| g.reorder_tab(args)),
            DropPlan::Move(args) => self.update_groups(|g| g.move_tab(args)),
            DropPlan::FromLive {
                list,
                index,
                target_group_id,
                target_tab_index,
            } => {
                let state = self.current.state();
                let tab = match list {
                    LiveList::Current => state.tabs.get(index),
                    LiveList::Recent => state.recent_tabs.get(index),
                };
                let Some(current_tab) = tab.cloned() else {
                    return;
                };
                self.update_groups(|g| {
                    g.move_current_tab(MoveCurrentTabArgs {
                        target_group_id,
                        target_tab_index,
                        current_tab,
                    })
                });
            }
            DropPlan::FromSuggestion {
                group_id,
                index,
                target_group_id,
                target_tab_index,
            } => {
                let Some(tab) = self
                    .suggestions
                    .group(&group_id)
                    .and_then(|g| g.tabs.get(index))
                    .cloned()
                else {
                    return;
                };
                let Some(tab_hash) = tab.hash.clone() else {
                    return;
                };
                if !self.groups.accepts(&tab, &target_group_id) {
                    tracing::debug!(group = %target_group_id, "suggested tab not accepted");
                    return;
                }
                self.update_suggestions(|s| s.remove_suggested_tab(&group_id, &tab_hash));
                let target_group = target_group_id.clone();
                self.update_groups(|g| {
                    g.move_current_tab(MoveCurrentTabArgs {
                        target_group_id,
                        target_tab_index,
                        current_tab: tab,
                    })
                });
                self.heuristics.notify(OutboundMessage::AcceptTab {
                    group_hash: group_id,
                    tab_hash,
                    target_group,
                });
            }
        }
    }

    fn accept_suggested_group(&mut self, group_id: &str) {
        let Some(suggestion) = self.suggestions.group(group_id).cloned() else {
            return;
        };
        let tabs = suggestion.tabs.iter().map(Tab::snapshot).collect();
        self.update_groups(|g| {
            g.update_group(UpdateGroupArgs {
                name: Some(suggestion.name),
                tabs: Some(tabs),
                ..UpdateGroupArgs::default()
            })
        });
        self.update_suggestions(|s| s.remove_suggested_group(group_id));
        self.heuristics.notify(OutboundMessage::AcceptGroup {
            group_hash: group_id.to_string(),
        });
    }

    fn discard_suggested_group(
        &mut self,
        group_id: &str,
        reason: Option<DiscardReason>,
        rating: Option<u8>,
    ) {
        if self.suggestions.group(group_id).is_none() {
            return;
        }
        self.update_suggestions(|s| s.remove_suggested_group(group_id));
        self.heuristics.notify(OutboundMessage::DiscardGroup {
            group_hash: group_id.to_string(),
            reason,
            rating: rating.filter(|r| (1..=5).contains(r)),
        });
    }

    fn discard_suggested_tab(&mut self, group_id: &str, tab_hash: &str) {
        if !self
            .suggestions
            .group(group_id)
            .map(|g| g.contains_hash(tab_hash))
            .unwrap_or(false)
        {
            return;
        }
        self.update_suggestions(|s| s.remove_suggested_tab(group_id, tab_hash));
        self.heuristics.notify(OutboundMessage::DiscardTab {
            group_hash: group_id.to_string(),
            tab_hash: tab_hash.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{Call, FakeBrowser};
    use crate::drag_drop::DraggableLocation;
    use crate::identity::augment_tab;
    use crate::suggestions::SuggestedGroup;
    use crate::tab_groups::{MoveTabArgs, RemoveTabArgs, NEW_GROUP_ID};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn tab(id: TabId) -> Tab {
        augment_tab(Tab::new(
            id,
            &format!("https://site{}.com/page", id),
            &format!("Site {}", id),
        ))
    }

    fn router_with(browser: Arc<FakeBrowser>) -> (Router, UnboundedReceiver<OutboundMessage>) {
        let mut router = Router::new(browser, Duration::from_millis(2000));
        let (port, rx) = NativePort::channel();
        router.connect(port);
        (router, rx)
    }

    fn router() -> (Router, UnboundedReceiver<OutboundMessage>) {
        router_with(Arc::new(FakeBrowser::default()))
    }

    fn drop(src: &str, si: usize, dst: &str, di: usize) -> Action {
        Action::Drag(DropResult {
            draggable_id: "d".into(),
            source: DraggableLocation {
                droppable_id: src.into(),
                index: si,
            },
            destination: Some(DraggableLocation {
                droppable_id: dst.into(),
                index: di,
            }),
        })
    }

    fn drain(rx: &mut UnboundedReceiver<OutboundMessage>) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(m) = rx.try_recv() {
            out.push(m);
        }
        out
    }

    async fn with_live_tabs(router: &mut Router, ids: &[TabId]) {
        for id in ids {
            router.handle(Action::Tabs(TabEvent::Create(tab(*id)))).await;
        }
    }

    fn ids(router: &Router, group: &str) -> Vec<TabId> {
        router
            .groups()
            .group(group)
            .unwrap()
            .tabs
            .iter()
            .filter_map(|t| t.id)
            .collect()
    }

    #[tokio::test]
    async fn current_group_mirrors_live_tabs() {
        let (mut r, _rx) = router();
        with_live_tabs(&mut r, &[0, 1, 2]).await;
        assert_eq!(ids(&r, CURRENT_GROUP_ID), vec![0, 1, 2]);
        r.handle(Action::Tabs(TabEvent::Remove { id: 1 })).await;
        assert_eq!(ids(&r, CURRENT_GROUP_ID), vec![0, 2]);
    }

    #[tokio::test]
    async fn drag_from_current_into_new_group() {
        let (mut r, _rx) = router();
        with_live_tabs(&mut r, &[0, 1, 2]).await;
        r.handle(drop(CURRENT_GROUP_ID, 0, NEW_GROUP_ID, 0)).await;

        assert_eq!(ids(&r, CURRENT_GROUP_ID), vec![0, 1, 2]);
        let created = r.groups().groups.last().unwrap().id.clone();
        assert_eq!(ids(&r, &created), vec![0]);

        // same index in the same list changes nothing
        let before = r.groups().clone();
        r.handle(drop(&created, 0, &created, 0)).await;
        assert_eq!(r.groups(), &before);

        // removing the sentinel is refused
        r.handle(Action::Groups(GroupAction::RemoveGroup {
            group_id: CURRENT_GROUP_ID.into(),
        }))
        .await;
        assert_eq!(r.groups(), &before);

        // a tab already in the group is not added twice
        r.handle(drop(CURRENT_GROUP_ID, 0, &created, 1)).await;
        assert_eq!(ids(&r, &created), vec![0]);

        // emptying the group keeps it around
        r.handle(Action::Groups(GroupAction::RemoveTab(RemoveTabArgs {
            source_group_id: created.clone(),
            source_tab_index: 0,
        })))
        .await;
        assert!(r.groups().group(&created).unwrap().tabs.is_empty());
    }

    #[tokio::test]
    async fn drag_from_recent() {
        let (mut r, _rx) = router();
        with_live_tabs(&mut r, &[0, 1]).await;
        r.handle(Action::Tabs(TabEvent::Remove { id: 1 })).await;
        r.handle(drop("recent", 0, NEW_GROUP_ID, 0)).await;
        let created = r.groups().groups.last().unwrap().id.clone();
        assert_eq!(ids(&r, &created), vec![1]);
    }

    #[tokio::test]
    async fn drop_onto_current_is_ignored() {
        let (mut r, _rx) = router();
        with_live_tabs(&mut r, &[0]).await;
        r.handle(drop(CURRENT_GROUP_ID, 0, NEW_GROUP_ID, 0)).await;
        let created = r.groups().groups.last().unwrap().id.clone();
        let before = r.groups().clone();
        r.handle(drop(&created, 0, CURRENT_GROUP_ID, 0)).await;
        assert_eq!(r.groups(), &before);
    }

    #[tokio::test]
    async fn group_actions_leave_current_group_alone() {
        let (mut r, _rx) = router();
        with_live_tabs(&mut r, &[0, 1]).await;
        r.handle(Action::Groups(GroupAction::UpdateGroup(UpdateGroupArgs {
            tabs: Some(vec![tab(9)]),
            ..UpdateGroupArgs::default()
        })))
        .await;
        let user = r.groups().groups.last().unwrap().id.clone();

        r.handle(Action::Groups(GroupAction::UpdateGroup(UpdateGroupArgs {
            source_group_id: Some(CURRENT_GROUP_ID.into()),
            read_only: Some(false),
            ..UpdateGroupArgs::default()
        })))
        .await;
        r.handle(Action::Groups(GroupAction::RemoveTab(RemoveTabArgs {
            source_group_id: CURRENT_GROUP_ID.into(),
            source_tab_index: 0,
        })))
        .await;
        r.handle(Action::Groups(GroupAction::MoveTab(MoveTabArgs {
            source_group_id: user.clone(),
            source_tab_index: 0,
            target_group_id: CURRENT_GROUP_ID.into(),
            target_tab_index: 0,
        })))
        .await;

        assert!(r.groups().group(CURRENT_GROUP_ID).unwrap().read_only);
        assert_eq!(ids(&r, CURRENT_GROUP_ID), vec![0, 1]);
        assert_eq!(ids(&r, &user), vec![9]);
    }

    #[tokio::test]
    async fn rejected_suggestion_drag_keeps_suggestion() {
        let (mut r, mut rx) = router();
        r.handle(Action::Groups(GroupAction::UpdateGroup(UpdateGroupArgs {
            tabs: Some(vec![tab(5)]),
            ..UpdateGroupArgs::default()
        })))
        .await;
        let target = r.groups().groups.last().unwrap().id.clone();
        r.handle_port(PortEvent::Message(InboundMessage::UpdateGroups(vec![suggested(
            "s1",
            vec![tab(5)],
        )])))
        .await;

        // already in the target
        r.handle(drop("suggest-s1", 0, &target, 0)).await;
        // unknown target
        r.handle(drop("suggest-s1", 0, "gone", 0)).await;

        assert_eq!(r.suggestions().group("s1").unwrap().tabs.len(), 1);
        assert_eq!(ids(&r, &target), vec![5]);
        assert!(drain(&mut rx).is_empty());
    }

    fn suggested(id: &str, tabs: Vec<Tab>) -> SuggestedGroup {
        SuggestedGroup {
            id: Some(id.into()),
            name: Some(format!("Suggested {}", id)),
            tabs,
        }
    }

    #[tokio::test]
    async fn accept_suggested_group() {
        let (mut r, mut rx) = router();
        r.handle_port(PortEvent::Message(InboundMessage::UpdateGroups(vec![suggested(
            "s1",
            vec![tab(5), tab(6)],
        )])))
        .await;
        assert!(r.suggestions().group("s1").unwrap().read_only);

        r.handle(Action::AcceptSuggestedGroup {
            group_id: "s1".into(),
        })
        .await;
        assert!(r.suggestions().groups.is_empty());
        let accepted = r.groups().groups.last().unwrap();
        assert_eq!(accepted.name, "Suggested s1");
        assert!(!accepted.read_only);
        assert_eq!(accepted.tabs.len(), 2);
        assert_eq!(
            drain(&mut rx),
            vec![OutboundMessage::AcceptGroup {
                group_hash: "s1".into()
            }]
        );
    }

    #[tokio::test]
    async fn drag_from_suggestion_accepts_tab() {
        let (mut r, mut rx) = router();
        r.handle_port(PortEvent::Message(InboundMessage::UpdateGroups(vec![suggested(
            "s1",
            vec![tab(5)],
        )])))
        .await;
        r.handle(Action::Groups(GroupAction::UpdateGroup(UpdateGroupArgs {
            source_group_id: Some("g1".into()),
            ..UpdateGroupArgs::default()
        })))
        .await;
        let target = r.groups().groups.last().unwrap().id.clone();
        let hash = tab(5).hash.unwrap();

        r.handle(drop("suggest-s1", 0, &target, 0)).await;
        assert_eq!(ids(&r, &target), vec![5]);
        // the emptied suggestion is pruned
        assert!(r.suggestions().group("s1").is_none());
        assert_eq!(
            drain(&mut rx),
            vec![OutboundMessage::AcceptTab {
                group_hash: "s1".into(),
                tab_hash: hash,
                target_group: target,
            }]
        );
    }

    #[tokio::test]
    async fn discard_flows() {
        let (mut r, mut rx) = router();
        r.handle_port(PortEvent::Message(InboundMessage::UpdateGroups(vec![
            suggested("s1", vec![tab(1), tab(2)]),
            suggested("s2", vec![tab(3)]),
        ])))
        .await;
        let h1 = tab(1).hash.unwrap();

        r.handle(Action::DiscardSuggestedTab {
            group_id: "s1".into(),
            tab_hash: h1.clone(),
        })
        .await;
        assert_eq!(r.suggestions().group("s1").unwrap().tabs.len(), 1);

        r.handle(Action::DiscardSuggestedGroup {
            group_id: "s2".into(),
            reason: Some(DiscardReason::Wrong),
            rating: Some(9),
        })
        .await;
        assert!(r.suggestions().group("s2").is_none());

        // unknown ids send nothing
        r.handle(Action::DiscardSuggestedGroup {
            group_id: "nope".into(),
            reason: None,
            rating: None,
        })
        .await;

        assert_eq!(
            drain(&mut rx),
            vec![
                OutboundMessage::DiscardTab {
                    group_hash: "s1".into(),
                    tab_hash: h1,
                },
                OutboundMessage::DiscardGroup {
                    group_hash: "s2".into(),
                    reason: Some(DiscardReason::Wrong),
                    rating: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn queries_and_status_messages() {
        let (mut r, mut rx) = router();
        with_live_tabs(&mut r, &[0]).await;
        drain(&mut rx);

        r.handle_port(PortEvent::Message(InboundMessage::QueryTabs)).await;
        r.handle_port(PortEvent::Message(InboundMessage::QueryGroups)).await;
        let sent = drain(&mut rx);
        match &sent[0] {
            OutboundMessage::InitTabs { current_tabs } => assert_eq!(current_tabs.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        match &sent[1] {
            OutboundMessage::InitGroups { tab_groups } => assert!(tab_groups.is_empty()),
            other => panic!("unexpected {:?}", other),
        }

        r.handle_port(PortEvent::Message(InboundMessage::Notify {
            message: "ready".into(),
        }))
        .await;
        r.handle_port(PortEvent::Message(InboundMessage::HeuristicsStatus {
            message: "indexing".into(),
        }))
        .await;
        r.handle_port(PortEvent::Message(InboundMessage::RequestInteraction)).await;
        assert_eq!(r.status().last_notification.as_deref(), Some("ready"));
        assert_eq!(r.status().message.as_deref(), Some("indexing"));
        assert!(r.status().interaction_requested);

        r.handle_port(PortEvent::Message(InboundMessage::StaleTabs(vec!["h".into()]))).await;
        assert!(r.current().state().stale_tabs.contains("h"));
    }

    #[tokio::test]
    async fn disconnect_clears_suggestions() {
        let (mut r, _rx) = router();
        r.handle_port(PortEvent::Message(InboundMessage::UpdateGroups(vec![suggested(
            "s1",
            vec![tab(1)],
        )])))
        .await;
        r.handle_port(PortEvent::Disconnected).await;
        assert!(!r.heuristics().is_connected());
        assert!(!r.status().connected);
        assert!(r.suggestions().groups.is_empty());
    }

    #[tokio::test]
    async fn new_tab_request_opens_tab() {
        let browser = Arc::new(FakeBrowser::default());
        let (mut r, _rx) = router_with(browser.clone());
        r.handle_port(PortEvent::Message(InboundMessage::NewTab {
            url: "https://docs.rs".into(),
        }))
        .await;
        assert_eq!(
            browser.calls(),
            vec![Call::Create(CreateTab {
                url: "https://docs.rs".into(),
                window_id: None,
                pinned: false,
                active: true,
            })]
        );
    }

    #[tokio::test]
    async fn open_group_uses_window_setting() {
        let browser = Arc::new(FakeBrowser::default());
        let (mut r, _rx) = router_with(browser.clone());
        r.handle(Action::Groups(GroupAction::UpdateGroup(UpdateGroupArgs {
            tabs: Some(vec![tab(7)]),
            ..UpdateGroupArgs::default()
        })))
        .await;
        let id = r.groups().groups.last().unwrap().id.clone();
        r.handle(Action::UpdateSettings(SettingsPatch {
            open_groups_in_new_window: Some(false),
            ..SettingsPatch::default()
        }))
        .await;
        r.handle(Action::OpenTabGroup {
            group_id: id,
            new_window: None,
        })
        .await;
        assert!(!browser.calls().contains(&Call::CreateWindow));
        assert_eq!(browser.created_urls(), vec!["https://site7.com/page".to_string()]);
    }

    #[tokio::test]
    async fn heuristics_toggles_and_refresh() {
        let (mut r, mut rx) = router();
        r.handle(Action::UpdateSettings(SettingsPatch {
            heuristics_enabled: Some(false),
            heuristics_config: Some(serde_json::json!({"minGroupSize": 3})),
            ..SettingsPatch::default()
        }))
        .await;
        r.handle(Action::RefreshGroups).await;
        r.handle(Action::ResumeHeuristics).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                OutboundMessage::Pause,
                OutboundMessage::RefreshGroups {
                    config: serde_json::json!({"minGroupSize": 3}),
                },
                OutboundMessage::Resume,
            ]
        );
    }

    #[tokio::test]
    async fn snapshot_restore() {
        let (mut r, _rx) = router();
        with_live_tabs(&mut r, &[0, 1]).await;
        r.handle(Action::UpdateTutorial {
            progress: 2,
            completed: false,
        })
        .await;
        r.handle(drop(CURRENT_GROUP_ID, 1, NEW_GROUP_ID, 0)).await;
        let snap = r.snapshot();

        let (mut other, _rx2) = router();
        with_live_tabs(&mut other, &[9]).await;
        other.restore(snap.clone());
        assert_eq!(other.tutorial().progress, 2);
        assert_eq!(other.groups().groups.len(), 2);
        // live tabs stay local
        assert_eq!(ids(&other, CURRENT_GROUP_ID), vec![9]);
    }

    #[test]
    fn actions_decode_from_ui_json() {
        let a: Action = serde_json::from_str(
            r#"{"type":"DiscardSuggestedGroup","payload":{"groupId":"s1","reason":"NOT_USEFUL","rating":4}}"#,
        )
        .unwrap();
        assert_eq!(
            a,
            Action::DiscardSuggestedGroup {
                group_id: "s1".into(),
                reason: Some(DiscardReason::NotUseful),
                rating: Some(4),
            }
        );
        let a: Action = serde_json::from_str(r#"{"type":"RefreshGroups"}"#).unwrap();
        assert_eq!(a, Action::RefreshGroups);
        assert!(!a.touches_persisted());
    }
}
