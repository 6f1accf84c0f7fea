use crate::error::{Error, Result};
use crate::suggestions::SuggestedGroup;
use crate::tab_groups::TabGroup;
use crate::tabs::{RedactedTab, TabId};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// native messaging caps host → extension frames at 1 MiB
const MAX_MSG_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscardReason {
    Other,
    Wrong,
    NotUseful,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedGroup {
    pub id: String,
    pub name: String,
    pub tabs: Vec<RedactedTab>,
}

impl From<&TabGroup> for RedactedGroup {
    fn from(g: &TabGroup) -> Self {
        RedactedGroup {
            id: g.id.clone(),
            name: g.name.clone(),
            tabs: g.tabs.iter().map(RedactedTab::from).collect(),
        }
    }
}

/// Extension → heuristics process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    InitTabs {
        current_tabs: Vec<RedactedTab>,
    },
    InitGroups {
        tab_groups: Vec<RedactedGroup>,
    },
    Update {
        tab: RedactedTab,
    },
    Activate {
        id: TabId,
        previous_tab_id: Option<TabId>,
        window_id: Option<i64>,
    },
    Remove {
        id: TabId,
    },
    AcceptGroup {
        group_hash: String,
    },
    AcceptTab {
        group_hash: String,
        tab_hash: String,
        target_group: String,
    },
    DiscardGroup {
        group_hash: String,
        reason: Option<DiscardReason>,
        rating: Option<u8>,
    },
    DiscardTab {
        group_hash: String,
        tab_hash: String,
    },
    RefreshGroups {
        config: serde_json::Value,
    },
    Pause,
    Resume,
}

/// Heuristics process → extension.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    UpdateGroups(Vec<SuggestedGroup>),
    StaleTabs(Vec<String>),
    NewTab { url: String },
    Notify { message: String },
    QueryTabs,
    QueryGroups,
    HeuristicsStatus { message: String },
    RequestInteraction,
}

#[derive(Deserialize)]
struct RawMessage {
    action: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct UrlPayload {
    url: String,
}

#[derive(Deserialize)]
struct MessagePayload {
    #[serde(default)]
    message: String,
}

impl InboundMessage {
    /// Decode one JSON message. Unknown actions decode to `Ok(None)` so a newer
    /// heuristics process does not break an older extension.
    pub fn from_json(bytes: &[u8]) -> Result<Option<InboundMessage>> {
        let raw: RawMessage = serde_json::from_slice(bytes)?;
        let msg = match raw.action.as_str() {
            "UPDATE_GROUPS" => InboundMessage::UpdateGroups(serde_json::from_value(raw.payload)?),
            "STALE_TABS" => InboundMessage::StaleTabs(serde_json::from_value(raw.payload)?),
            "NEW_TAB" => {
                let p: UrlPayload = serde_json::from_value(raw.payload)?;
                InboundMessage::NewTab { url: p.url }
            }
            "NOTIFY" => {
                let p: MessagePayload = serde_json::from_value(raw.payload)?;
                InboundMessage::Notify { message: p.message }
            }
            "HEURISTICS_STATUS" => {
                let p: MessagePayload = serde_json::from_value(raw.payload)?;
                InboundMessage::HeuristicsStatus { message: p.message }
            }
            "QUERY_TABS" => InboundMessage::QueryTabs,
            "QUERY_GROUPS" => InboundMessage::QueryGroups,
            "REQUEST_INTERACTION" => InboundMessage::RequestInteraction,
            other => {
                tracing::warn!(action = other, "unknown native message");
                return Ok(None);
            }
        };
        Ok(Some(msg))
    }
}

/// Encode an outbound message to JSON bytes.
pub fn encode(msg: &OutboundMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(msg)?)
}

/// Write one native-messaging frame: little-endian u32 length, then JSON.
pub async fn send_message<W>(stream: &mut W, msg: &OutboundMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let data = encode(msg)?;
    let len = u32::try_from(data.len())
        .map_err(|_| Error::Codec("message too large".into()))?
        .to_le_bytes();
    stream.write_all(&len).await?;
    stream.write_all(&data).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one frame. `Ok(None)` on a clean end of stream.
pub async fn recv_frame<R>(stream: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MSG_LEN {
        return Err(Error::Codec(format!("frame of {} bytes exceeds limit", len)));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(Some(buf))
}
