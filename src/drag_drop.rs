//! Classification of a finished drag into a store operation.

use crate::tab_groups::{
    MoveTabArgs, ReorderTabArgs, TabGroupsState, CURRENT_GROUP_ID, RECENT_GROUP_ID,
};
use serde::{Deserialize, Serialize};

pub const SUGGEST_PREFIX: &str = "suggest-";
pub const ADDITIONAL_PREFIX: &str = "additional-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraggableLocation {
    pub droppable_id: String,
    pub index: usize,
}

/// What the UI reports when the user lets go of a dragged tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropResult {
    #[serde(default)]
    pub draggable_id: String,
    pub source: DraggableLocation,
    #[serde(default)]
    pub destination: Option<DraggableLocation>,
}

/// Where a live tab is taken from when the source is not a stored group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveList {
    Current,
    Recent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPlan {
    Abort,
    Reorder(ReorderTabArgs),
    FromLive {
        list: LiveList,
        index: usize,
        target_group_id: String,
        target_tab_index: usize,
    },
    FromSuggestion {
        group_id: String,
        index: usize,
        target_group_id: String,
        target_tab_index: usize,
    },
    Move(MoveTabArgs),
}

pub fn suggestion_group_id(droppable_id: &str) -> Option<&str> {
    droppable_id
        .strip_prefix(SUGGEST_PREFIX)
        .or_else(|| droppable_id.strip_prefix(ADDITIONAL_PREFIX))
}

fn is_read_only_target(droppable_id: &str, groups: &TabGroupsState) -> bool {
    droppable_id == CURRENT_GROUP_ID
        || droppable_id == RECENT_GROUP_ID
        || suggestion_group_id(droppable_id).is_some()
        || groups.group(droppable_id).map(|g| g.read_only).unwrap_or(false)
}

pub fn plan(drop: &DropResult, groups: &TabGroupsState) -> DropPlan {
    let Some(dest) = drop.destination.as_ref() else {
        return DropPlan::Abort;
    };
    let source = &drop.source;

    if source.droppable_id == dest.droppable_id {
        if source.index == dest.index || is_read_only_target(&dest.droppable_id, groups) {
            return DropPlan::Abort;
        }
        return DropPlan::Reorder(ReorderTabArgs {
            source_group_id: source.droppable_id.clone(),
            source_tab_index: source.index,
            target_tab_index: dest.index,
        });
    }

    if is_read_only_target(&dest.droppable_id, groups) {
        tracing::debug!(droppable = %dest.droppable_id, "drop onto read-only list ignored");
        return DropPlan::Abort;
    }

    let target_group_id = dest.droppable_id.clone();
    let target_tab_index = dest.index;

    let live = match source.droppable_id.as_str() {
        CURRENT_GROUP_ID => Some(LiveList::Current),
        RECENT_GROUP_ID => Some(LiveList::Recent),
        _ => None,
    };
    if let Some(list) = live {
        return DropPlan::FromLive {
            list,
            index: source.index,
            target_group_id,
            target_tab_index,
        };
    }

    if let Some(group_id) = suggestion_group_id(&source.droppable_id) {
        return DropPlan::FromSuggestion {
            group_id: group_id.to_string(),
            index: source.index,
            target_group_id,
            target_tab_index,
        };
    }

    DropPlan::Move(MoveTabArgs {
        source_group_id: source.droppable_id.clone(),
        source_tab_index: source.index,
        target_group_id,
        target_tab_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab_groups::{TabGroup, NEW_GROUP_ID};

    fn drop(src: &str, si: usize, dst: Option<(&str, usize)>) -> DropResult {
        DropResult {
            draggable_id: "x".into(),
            source: DraggableLocation {
                droppable_id: src.into(),
                index: si,
            },
            destination: dst.map(|(d, i)| DraggableLocation {
                droppable_id: d.into(),
                index: i,
            }),
        }
    }

    fn groups() -> TabGroupsState {
        TabGroupsState::from_groups(vec![TabGroup {
            id: "g1".into(),
            ..TabGroup::new()
        }])
    }

    #[test]
    fn aborts() {
        let g = groups();
        assert_eq!(plan(&drop("g1", 0, None), &g), DropPlan::Abort);
        assert_eq!(plan(&drop("g1", 2, Some(("g1", 2))), &g), DropPlan::Abort);
        assert_eq!(plan(&drop("g1", 0, Some(("current", 0))), &g), DropPlan::Abort);
        assert_eq!(plan(&drop("g1", 0, Some(("recent", 0))), &g), DropPlan::Abort);
        assert_eq!(plan(&drop("g1", 0, Some(("suggest-s1", 0))), &g), DropPlan::Abort);
        // reordering the live list is not a thing
        assert_eq!(plan(&drop("current", 0, Some(("current", 2))), &g), DropPlan::Abort);
    }

    #[test]
    fn same_list_reorders() {
        match plan(&drop("g1", 0, Some(("g1", 3))), &groups()) {
            DropPlan::Reorder(args) => {
                assert_eq!(args.source_tab_index, 0);
                assert_eq!(args.target_tab_index, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sources_are_classified() {
        let g = groups();
        assert!(matches!(
            plan(&drop("recent", 1, Some(("g1", 0))), &g),
            DropPlan::FromLive { list: LiveList::Recent, index: 1, .. }
        ));
        assert!(matches!(
            plan(&drop("current", 0, Some((NEW_GROUP_ID, 0))), &g),
            DropPlan::FromLive { list: LiveList::Current, .. }
        ));
        match plan(&drop("additional-s9", 2, Some(("g1", 1))), &g) {
            DropPlan::FromSuggestion { group_id, index, target_group_id, target_tab_index } => {
                assert_eq!(group_id, "s9");
                assert_eq!(index, 2);
                assert_eq!(target_group_id, "g1");
                assert_eq!(target_tab_index, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            plan(&drop("g2", 0, Some(("g1", 0))), &g),
            DropPlan::Move(_)
        ));
    }

    #[test]
    fn decodes_ui_payload() {
        let d: DropResult = serde_json::from_str(
            r#"{"draggableId":"t","source":{"droppableId":"current","index":0},"destination":null}"#,
        )
        .unwrap();
        assert!(d.destination.is_none());
    }
}
