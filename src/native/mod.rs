//! Channel to the external heuristics process.

pub mod port;
pub mod protocol;

pub use port::{spawn_native_host, Heuristics, NativePort, PortEvent};
pub use protocol::{DiscardReason, InboundMessage, OutboundMessage, RedactedGroup};
