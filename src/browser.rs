use crate::current_tabs::CurrentTabsState;
use crate::error::Result;
use crate::tab_groups::TabGroup;
use crate::tabs::{Tab, TabId};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTab {
    pub url: String,
    pub window_id: Option<i64>,
    pub pinned: bool,
    pub active: bool,
}

/// The browser's tabs/windows API, as far as this crate needs it.
#[async_trait]
pub trait BrowserApi: Send + Sync {
    async fn query_tabs(&self) -> Result<Vec<Tab>>;
    async fn create_tab(&self, req: CreateTab) -> Result<Tab>;
    async fn remove_tab(&self, id: TabId) -> Result<()>;
    async fn activate_tab(&self, id: TabId) -> Result<()>;
    /// Returns the new window's id.
    async fn create_window(&self) -> Result<i64>;
}

/// Open every tab of `group` that is not already open. Each tab is created
/// independently; one failure does not stop the others. Returns how many
/// tabs were created.
pub async fn open_tab_group<B>(
    browser: &B,
    group: &TabGroup,
    current: &CurrentTabsState,
    new_window: bool,
) -> usize
where
    B: BrowserApi + ?Sized,
{
    let pending: Vec<&Tab> = group
        .tabs
        .iter()
        .filter(|t| t.url.is_some())
        .filter(|t| !t.hash.as_deref().map(|h| current.is_open(h)).unwrap_or(false))
        .collect();
    if pending.is_empty() {
        tracing::debug!(group = %group.id, "all tabs already open");
        return 0;
    }

    let window_id = if new_window {
        match browser.create_window().await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(group = %group.id, "create window failed, using current: {}", e);
                None
            }
        }
    } else {
        None
    };

    let requests = pending.into_iter().filter_map(|t| {
        let url = t.url.clone()?;
        Some(browser.create_tab(CreateTab {
            url,
            window_id,
            pinned: t.pinned.unwrap_or(false),
            active: false,
        }))
    });

    let mut opened = 0;
    for result in join_all(requests).await {
        match result {
            Ok(_) => opened += 1,
            Err(e) => tracing::warn!(group = %group.id, "failed to open tab: {}", e),
        }
    }
    tracing::info!(group = %group.id, opened, "opened tab group");
    opened
}

/// Close every live tab whose hash belongs to `group`.
pub async fn close_tab_group<B>(browser: &B, group: &TabGroup, current: &CurrentTabsState) -> usize
where
    B: BrowserApi + ?Sized,
{
    let hashes: BTreeSet<&str> = group.tabs.iter().filter_map(|t| t.hash.as_deref()).collect();
    let ids = current.open_ids_for(&hashes);

    let mut closed = 0;
    for (id, result) in ids
        .iter()
        .zip(join_all(ids.iter().map(|id| browser.remove_tab(*id))).await)
    {
        match result {
            Ok(()) => closed += 1,
            Err(e) => tracing::warn!(tab_id = id, "failed to close tab: {}", e),
        }
    }
    closed
}

pub async fn open_current_tab<B>(browser: &B, id: TabId)
where
    B: BrowserApi + ?Sized,
{
    if let Err(e) = browser.activate_tab(id).await {
        tracing::warn!(tab_id = id, "failed to activate tab: {}", e);
    }
}

pub async fn close_current_tab<B>(browser: &B, id: TabId)
where
    B: BrowserApi + ?Sized,
{
    if let Err(e) = browser.remove_tab(id).await {
        tracing::warn!(tab_id = id, "failed to close tab: {}", e);
    }
}
