// Event channel abstraction between the sync core and the transport.

pub mod channel;
pub mod local;

pub use channel::{EventChannel, Subscription};
pub use local::{local_channel, LocalChannel, OutboundCall, ServerEnd};
