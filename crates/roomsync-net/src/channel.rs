//! Abstract bidirectional event channel.
//!
//! The sync core only needs three capabilities from the transport: a push
//! subscription for new messages, a fire-and-forget send and a
//! request/response backfill call. Requests are futures so callers can
//! layer timeouts and cancellation on top.

use futures::future::BoxFuture;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use roomsync_shared::constants::EVENT_NEW_MESSAGE;
use roomsync_shared::{CreateMessageData, Message, OldMessagesRequest, Page, TransportError};

/// Transport seam used by the client session.
pub trait EventChannel: Send + Sync {
    /// Start receiving `messages:new_message` pushes.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    fn subscribe_new_messages(&self) -> Subscription;

    /// Emit a user-authored message. No response is expected.
    fn emit_new_message(
        &self,
        message: CreateMessageData,
    ) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Request one page of history.
    fn get_old_messages(
        &self,
        request: OldMessagesRequest,
    ) -> BoxFuture<'static, Result<Page, TransportError>>;
}

/// A live subscription to pushed messages.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Message>,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<Message>) -> Self {
        debug!(event = EVENT_NEW_MESSAGE, "Subscribed");
        Self { rx }
    }

    /// Wait for the next pushed message.
    ///
    /// Returns `None` once the channel is closed. A lagging receiver skips
    /// the overwritten messages and keeps going.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscription lagged, pushed messages were dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(event = EVENT_NEW_MESSAGE, "Unsubscribed");
    }
}
