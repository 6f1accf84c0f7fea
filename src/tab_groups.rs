use crate::tabs::Tab;
use serde::{Deserialize, Serialize};

pub const CURRENT_GROUP_ID: &str = "current";
pub const RECENT_GROUP_ID: &str = "recent";
pub const NEW_GROUP_ID: &str = "newGroup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub collapsed: bool,
}

impl TabGroup {
    /// Fresh user group: generated id, timestamp name, nothing else set.
    pub fn new() -> Self {
        TabGroup {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: chrono::Utc::now().to_rfc3339(),
            tabs: Vec::new(),
            read_only: false,
            collapsed: false,
        }
    }

    pub fn current() -> Self {
        TabGroup {
            id: CURRENT_GROUP_ID.to_string(),
            name: "Current Tabs".to_string(),
            tabs: Vec::new(),
            read_only: true,
            collapsed: false,
        }
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.tabs.iter().any(|t| t.hash.as_deref() == Some(hash))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupArgs {
    #[serde(default)]
    pub source_group_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tabs: Option<Vec<Tab>>,
    #[serde(default)]
    pub read_only: Option<bool>,
    #[serde(default)]
    pub collapsed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTabArgs {
    pub source_group_id: String,
    pub source_tab_index: usize,
    pub target_group_id: String,
    pub target_tab_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderTabArgs {
    pub source_group_id: String,
    pub source_tab_index: usize,
    pub target_tab_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTabArgs {
    pub source_group_id: String,
    pub source_tab_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTabArgs {
    pub source_group_id: String,
    pub source_tab_index: usize,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCurrentTabArgs {
    pub target_group_id: String,
    pub target_tab_index: usize,
    pub current_tab: Tab,
}

/// Every operation the tab-group slice accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum GroupAction {
    UpdateGroup(UpdateGroupArgs),
    RemoveGroup { group_id: String },
    CollapseGroup { group_id: String },
    MoveTab(MoveTabArgs),
    ReorderTab(ReorderTabArgs),
    RemoveTab(RemoveTabArgs),
    EditTab(EditTabArgs),
    MoveCurrentTab(MoveCurrentTabArgs),
}

/// User-curated groups. The `current` sentinel is always present and first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabGroupsState {
    pub groups: Vec<TabGroup>,
}

impl Default for TabGroupsState {
    fn default() -> Self {
        TabGroupsState {
            groups: vec![TabGroup::current()],
        }
    }
}

impl TabGroupsState {
    pub fn from_groups(groups: Vec<TabGroup>) -> Self {
        let mut state = TabGroupsState { groups };
        state.ensure_current();
        state
    }

    pub fn ensure_current(&mut self) {
        if self.group(CURRENT_GROUP_ID).is_none() {
            self.groups.insert(0, TabGroup::current());
        }
    }

    pub fn group(&self, id: &str) -> Option<&TabGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_mut(&mut self, id: &str) -> Option<&mut TabGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    pub fn apply(self, action: GroupAction) -> Self {
        match action {
            GroupAction::UpdateGroup(args) => self.update_group(args),
            GroupAction::RemoveGroup { group_id } => self.remove_group(&group_id),
            GroupAction::CollapseGroup { group_id } => self.collapse_group(&group_id),
            GroupAction::MoveTab(args) => self.move_tab(args),
            GroupAction::ReorderTab(args) => self.reorder_tab(args),
            GroupAction::RemoveTab(args) => self.remove_tab(args),
            GroupAction::EditTab(args) => self.edit_tab(args),
            GroupAction::MoveCurrentTab(args) => self.move_current_tab(args),
        }
    }

    /// Upsert. Provided fields overwrite; `tabs` replaces the whole list.
    /// On `current` only `name` and `collapsed` are taken.
    pub fn update_group(mut self, mut args: UpdateGroupArgs) -> Self {
        if args.source_group_id.as_deref() == Some(CURRENT_GROUP_ID) {
            args.tabs = None;
            args.read_only = None;
        }

        let existing = args
            .source_group_id
            .as_deref()
            .and_then(|id| self.groups.iter().position(|g| g.id == id));

        let (mut group, slot) = match existing {
            Some(ix) => (self.groups[ix].clone(), Some(ix)),
            None => (TabGroup::new(), None),
        };
        if let Some(name) = args.name {
            group.name = name;
        }
        if let Some(tabs) = args.tabs {
            group.tabs = tabs;
        }
        if let Some(read_only) = args.read_only {
            group.read_only = read_only;
        }
        if let Some(collapsed) = args.collapsed {
            group.collapsed = collapsed;
        }

        match slot {
            Some(ix) => self.groups[ix] = group,
            None => self.groups.push(group),
        }
        self
    }

    pub fn remove_group(mut self, group_id: &str) -> Self {
        if group_id == CURRENT_GROUP_ID {
            tracing::debug!("refusing to remove the current tabs group");
            return self;
        }
        self.groups.retain(|g| g.id != group_id);
        self
    }

    pub fn collapse_group(mut self, group_id: &str) -> Self {
        if let Some(g) = self.group_mut(group_id) {
            g.collapsed = !g.collapsed;
        }
        self
    }

    /// Drag a tab from one group into another (or into a new group). The
    /// `current` group is never stripped of the dragged tab.
    pub fn move_tab(mut self, args: MoveTabArgs) -> Self {
        let Some(tab) = self
            .group(&args.source_group_id)
            .and_then(|g| g.tabs.get(args.source_tab_index))
            .map(Tab::snapshot)
        else {
            return self;
        };
        if !self.can_inject(&tab, &args.target_group_id) {
            return self;
        }

        if args.source_group_id != CURRENT_GROUP_ID {
            if let Some(g) = self.group_mut(&args.source_group_id) {
                g.tabs.remove(args.source_tab_index);
            }
        }
        self.inject(tab, &args.target_group_id, args.target_tab_index)
    }

    pub fn reorder_tab(mut self, args: ReorderTabArgs) -> Self {
        if args.source_tab_index == args.target_tab_index
            || args.source_group_id == CURRENT_GROUP_ID
        {
            return self;
        }
        if let Some(g) = self.group_mut(&args.source_group_id) {
            if args.source_tab_index < g.tabs.len() {
                let tab = g.tabs.remove(args.source_tab_index);
                let at = args.target_tab_index.min(g.tabs.len());
                g.tabs.insert(at, tab);
            }
        }
        self
    }

    /// Positional removal. An emptied group stays.
    pub fn remove_tab(mut self, args: RemoveTabArgs) -> Self {
        if args.source_group_id == CURRENT_GROUP_ID {
            return self;
        }
        if let Some(g) = self.group_mut(&args.source_group_id) {
            if args.source_tab_index < g.tabs.len() {
                g.tabs.remove(args.source_tab_index);
            }
        }
        self
    }

    /// Display alias only; the hash keeps matching the real title.
    pub fn edit_tab(mut self, args: EditTabArgs) -> Self {
        if args.source_group_id == CURRENT_GROUP_ID {
            return self;
        }
        if let Some(tab) = self
            .group_mut(&args.source_group_id)
            .and_then(|g| g.tabs.get_mut(args.source_tab_index))
        {
            tab.display_title = Some(args.title);
        }
        self
    }

    /// Inject a tab taken from a list this store does not own (live or
    /// recently closed tabs, suggestions).
    pub fn move_current_tab(self, args: MoveCurrentTabArgs) -> Self {
        let tab = args.current_tab.snapshot();
        if !self.can_inject(&tab, &args.target_group_id) {
            return self;
        }
        self.inject(tab, &args.target_group_id, args.target_tab_index)
    }

    /// Replace the sentinel's tabs with the live list.
    pub fn mirror_current(mut self, tabs: &[Tab]) -> Self {
        self.ensure_current();
        if let Some(g) = self.group_mut(CURRENT_GROUP_ID) {
            g.tabs = tabs.to_vec();
        }
        self
    }

    /// Whether `tab` would land in `target_group_id`: hashed, target known
    /// and writable, and not already holding the same hash.
    pub fn accepts(&self, tab: &Tab, target_group_id: &str) -> bool {
        if !self.can_inject(tab, target_group_id) {
            return false;
        }
        match (tab.hash.as_deref(), self.group(target_group_id)) {
            (Some(hash), Some(g)) => !g.contains_hash(hash),
            _ => true,
        }
    }

    fn can_inject(&self, tab: &Tab, target_group_id: &str) -> bool {
        if tab.hash.is_none() {
            tracing::debug!("tab without hash cannot be grouped yet");
            return false;
        }
        if target_group_id == NEW_GROUP_ID {
            return true;
        }
        match self.group(target_group_id) {
            Some(g) if g.read_only => {
                tracing::debug!(group = target_group_id, "read-only group takes no tabs");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn inject(mut self, tab: Tab, target_group_id: &str, target_tab_index: usize) -> Self {
        if target_group_id == NEW_GROUP_ID {
            let mut group = TabGroup::new();
            group.tabs.push(tab);
            self.groups.push(group);
            return self;
        }
        let Some(hash) = tab.hash.clone() else {
            return self;
        };
        if let Some(g) = self.group_mut(target_group_id) {
            if g.contains_hash(&hash) {
                return self;
            }
            let at = target_tab_index.min(g.tabs.len());
            g.tabs.insert(at, tab);
        }
        self
    }
}
