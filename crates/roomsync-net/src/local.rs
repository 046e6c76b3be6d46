//! In-process event channel.
//!
//! [`local_channel`] returns a client-side [`LocalChannel`] and the matching
//! [`ServerEnd`]. A socket transport drives the server end: it forwards each
//! [`OutboundCall`] over the wire, completes backfill replies through the
//! oneshot sender, and feeds decoded pushes back with [`ServerEnd::push`].
//! Tests use the server end directly to script the remote side.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use roomsync_shared::{
    ClientCall, CreateMessageData, Message, OldMessagesRequest, Page, ProtocolError, ServerEvent,
    TransportError,
};

use crate::channel::{EventChannel, Subscription};

/// Calls travelling from the client to the server end.
#[derive(Debug)]
pub enum OutboundCall {
    /// `messages:new_message`, no reply.
    NewMessage(CreateMessageData),
    /// `messages:get_old_messages`. Reply with the page or an error reason.
    GetOldMessages {
        request: OldMessagesRequest,
        reply: oneshot::Sender<Result<Page, String>>,
    },
}

impl OutboundCall {
    /// Wire form of this call, for transports that encode frames.
    pub fn to_client_call(&self) -> ClientCall {
        match self {
            Self::NewMessage(data) => ClientCall::NewMessage(data.clone()),
            Self::GetOldMessages { request, .. } => ClientCall::GetOldMessages(request.clone()),
        }
    }
}

/// Create a connected client/server channel pair.
///
/// # Arguments
///
/// * `call_buffer` - Capacity of the outbound call queue
/// * `push_buffer` - Capacity of the push broadcast per subscriber
pub fn local_channel(call_buffer: usize, push_buffer: usize) -> (LocalChannel, ServerEnd) {
    let (call_tx, call_rx) = mpsc::channel(call_buffer.max(1));
    let (push_tx, _) = broadcast::channel(push_buffer.max(1));

    (
        LocalChannel {
            call_tx,
            push_tx: push_tx.clone(),
        },
        ServerEnd { call_rx, push_tx },
    )
}

/// Client half of an in-process channel.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    call_tx: mpsc::Sender<OutboundCall>,
    push_tx: broadcast::Sender<Message>,
}

impl EventChannel for LocalChannel {
    fn subscribe_new_messages(&self) -> Subscription {
        Subscription::new(self.push_tx.subscribe())
    }

    fn emit_new_message(
        &self,
        message: CreateMessageData,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let call_tx = self.call_tx.clone();
        async move {
            call_tx
                .send(OutboundCall::NewMessage(message))
                .await
                .map_err(|_| TransportError::Closed)
        }
        .boxed()
    }

    fn get_old_messages(
        &self,
        request: OldMessagesRequest,
    ) -> BoxFuture<'static, Result<Page, TransportError>> {
        let call_tx = self.call_tx.clone();
        async move {
            let (reply, reply_rx) = oneshot::channel();
            call_tx
                .send(OutboundCall::GetOldMessages { request, reply })
                .await
                .map_err(|_| TransportError::Closed)?;

            match reply_rx.await {
                Ok(Ok(page)) => Ok(page),
                Ok(Err(reason)) => Err(TransportError::Remote(reason)),
                Err(_) => Err(TransportError::Dropped),
            }
        }
        .boxed()
    }
}

/// Server half of an in-process channel.
#[derive(Debug)]
pub struct ServerEnd {
    call_rx: mpsc::Receiver<OutboundCall>,
    push_tx: broadcast::Sender<Message>,
}

impl ServerEnd {
    /// Wait for the next call from the client. `None` once every client
    /// handle is dropped.
    pub async fn next_call(&mut self) -> Option<OutboundCall> {
        self.call_rx.recv().await
    }

    /// Take a queued call without waiting.
    pub fn try_next_call(&mut self) -> Option<OutboundCall> {
        self.call_rx.try_recv().ok()
    }

    /// Push a message to every current subscriber. Returns how many
    /// subscribers it reached.
    pub fn push(&self, message: Message) -> usize {
        match self.push_tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("Pushed message has no subscribers");
                0
            }
        }
    }

    /// Decode an inbound `(event, payload)` frame and push it.
    pub fn push_frame(&self, event: &str, payload: Value) -> Result<usize, ProtocolError> {
        match ServerEvent::decode(event, payload)? {
            Some(ServerEvent::NewMessage(message)) => Ok(self.push(message)),
            None => {
                debug!(event, "Ignoring unhandled event");
                Ok(0)
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.push_tx.receiver_count()
    }
}
