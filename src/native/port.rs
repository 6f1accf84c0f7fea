use super::protocol::{self, InboundMessage, OutboundMessage};
use crate::error::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sending half of the native-messaging channel.
#[derive(Clone, Debug)]
pub struct NativePort {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl NativePort {
    /// In-process port; the receiver sees every posted message. Used by the
    /// host pump below and by tests.
    pub fn channel() -> (NativePort, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (NativePort { tx }, rx)
    }

    pub fn post(&self, msg: OutboundMessage) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::PortClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The heuristics process may or may not be running. Components that emit
/// notifications receive this capability instead of reaching for a global.
#[derive(Clone, Debug, Default)]
pub enum Heuristics {
    Connected(NativePort),
    #[default]
    Disconnected,
}

impl Heuristics {
    pub fn is_connected(&self) -> bool {
        match self {
            Heuristics::Connected(port) => !port.is_closed(),
            Heuristics::Disconnected => false,
        }
    }

    /// Fire-and-forget. A closed port is logged, never retried.
    pub fn notify(&self, msg: OutboundMessage) {
        match self {
            Heuristics::Connected(port) => {
                if let Err(e) = port.post(msg) {
                    tracing::warn!("heuristics notification dropped: {}", e);
                }
            }
            Heuristics::Disconnected => {
                tracing::trace!("heuristics disconnected, not sending {:?}", msg);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortEvent {
    Message(InboundMessage),
    Disconnected,
}

/// Wire a native host's stdio to the extension. Outbound messages posted on the
/// returned port are framed onto `writer`; frames read from `reader` are
/// decoded and forwarded to `events`. When the reader hits end of stream or a
/// fatal error a final `PortEvent::Disconnected` is sent.
pub fn spawn_native_host<R, W>(
    mut reader: R,
    mut writer: W,
    events: mpsc::UnboundedSender<PortEvent>,
) -> (NativePort, JoinHandle<()>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (port, mut rx) = NativePort::channel();

    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = protocol::send_message(&mut writer, &msg).await {
                tracing::warn!("native port write failed: {}", e);
                break;
            }
        }
    });

    let read_task = tokio::spawn(async move {
        loop {
            match protocol::recv_frame(&mut reader).await {
                Ok(Some(frame)) => match InboundMessage::from_json(&frame) {
                    Ok(Some(msg)) => {
                        if events.send(PortEvent::Message(msg)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("bad native frame: {}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("native port read failed: {}", e);
                    break;
                }
            }
        }
        tracing::info!("native port disconnected");
        let _ = events.send(PortEvent::Disconnected);
    });

    (port, write_task, read_task)
}
