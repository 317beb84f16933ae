//! Fire-and-forget transport between contexts.
//!
//! Each context owns one [`Inbox`] and hands out cloneable [`Endpoint`]s to
//! whoever needs to reach it.  Two delivery modes exist:
//!
//! * **Broadcast** — [`Endpoint::broadcast`] never waits.  A full or closed
//!   inbox means the message is lost; the sender gets a
//!   [`SyncError::MessageDelivery`] to log and carries on.
//! * **Request** — [`Endpoint::request`] attaches a `oneshot` reply handle
//!   and awaits it under a timeout.  The caller's task suspends; its event
//!   loop keeps running other tasks.
//!
//! Delivery from one sender to one inbox is FIFO.  Nothing is ordered across
//! senders and nothing is replayed.
//!
//! Envelopes cross a channel as their JSON text, the same frames a browser
//! port would carry.  The [`Inbox`] decodes them; a frame that does not
//! decode is logged and skipped, and a request carried by one is answered
//! with a delivery failure.
//!
//! ```text
//!  UI surface ──request──▶ coordinator ──request──▶ playback context
//!      ▲                       │  ▲                       │
//!      └──────broadcast────────┘  └───────broadcast───────┘
//! ```

pub mod reply;

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::SyncError;
use crate::message::Envelope;

pub use reply::IntentResponse;

// ---------------------------------------------------------------------------
// Delivery / Inbox
// ---------------------------------------------------------------------------

/// One decoded item from a context's inbox.
#[derive(Debug)]
pub enum Delivery {
    Broadcast(Envelope),
    Request {
        envelope: Envelope,
        reply: oneshot::Sender<IntentResponse>,
    },
}

impl Delivery {
    pub fn envelope(&self) -> &Envelope {
        match self {
            Delivery::Broadcast(envelope) | Delivery::Request { envelope, .. } => envelope,
        }
    }
}

/// What travels through the channel: one encoded envelope, plus the reply
/// handle when it is a request.
#[derive(Debug)]
struct Frame {
    text: String,
    reply: Option<oneshot::Sender<IntentResponse>>,
}

/// Receiving half owned by a context's event loop.
#[derive(Debug)]
pub struct Inbox {
    name: &'static str,
    rx: mpsc::Receiver<Frame>,
}

impl Inbox {
    /// Next decodable delivery, or `None` once every endpoint is gone.
    ///
    /// Cancel safe: once a frame is taken it is decoded (and, if broken,
    /// answered) without awaiting.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            let frame = self.rx.recv().await?;
            match Envelope::from_json(&frame.text) {
                Ok(envelope) => {
                    return Some(match frame.reply {
                        Some(reply) => Delivery::Request { envelope, reply },
                        None => Delivery::Broadcast(envelope),
                    })
                }
                Err(e) => {
                    log::warn!("bus: {} skipped an undecodable frame: {e}", self.name);
                    if let Some(reply) = frame.reply {
                        let error = SyncError::MessageDelivery(format!("{}: {e}", self.name));
                        answer(reply, IntentResponse::failed(&error));
                    }
                }
            }
        }
    }
}

/// Answer a request; a requester that already gave up is only logged.
pub fn answer(reply: oneshot::Sender<IntentResponse>, response: IntentResponse) {
    if reply.send(response).is_err() {
        log::debug!("bus: requester went away before the reply");
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Sending handle to one context.
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: &'static str,
    tx: mpsc::Sender<Frame>,
}

/// Create an inbox for the context called `name`.
pub fn channel(name: &'static str, capacity: usize) -> (Endpoint, Inbox) {
    let (tx, rx) = mpsc::channel(capacity);
    (Endpoint { name, tx }, Inbox { name, rx })
}

impl Endpoint {
    fn encode(&self, envelope: &Envelope) -> Result<String, SyncError> {
        envelope.to_json().map_err(|e| {
            SyncError::MessageDelivery(format!("{} to {}: {e}", envelope.kind(), self.name))
        })
    }

    /// Deliver without waiting.
    pub fn broadcast(&self, envelope: Envelope) -> Result<(), SyncError> {
        let text = self.encode(&envelope)?;
        self.tx
            .try_send(Frame { text, reply: None })
            .map_err(|e| {
                let why = match e {
                    mpsc::error::TrySendError::Full(_) => "inbox full",
                    mpsc::error::TrySendError::Closed(_) => "not listening",
                };
                SyncError::MessageDelivery(format!("{} to {}: {why}", envelope.kind(), self.name))
            })
    }

    /// Deliver and await the reply for at most `timeout`.
    pub async fn request(
        &self,
        envelope: Envelope,
        timeout: Duration,
    ) -> Result<IntentResponse, SyncError> {
        let kind = envelope.kind();
        let (reply_tx, reply_rx) = oneshot::channel();
        let frame = Frame {
            text: self.encode(&envelope)?,
            reply: Some(reply_tx),
        };

        let exchange = async {
            self.tx.send(frame).await.map_err(|_| {
                SyncError::MessageDelivery(format!("{kind} to {}: not listening", self.name))
            })?;
            reply_rx.await.map_err(|_| {
                SyncError::MessageDelivery(format!("{kind} to {}: dropped the request", self.name))
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::MessageDelivery(format!(
                "{kind} to {}: no answer within {} ms",
                self.name,
                timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn env(message: Message) -> Envelope {
        Envelope {
            message,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_inbox_in_order() {
        let (ep, mut inbox) = channel("ui", 4);
        ep.broadcast(env(Message::ControlPause)).unwrap();
        ep.broadcast(env(Message::ControlResume)).unwrap();

        let first = inbox.recv().await.unwrap();
        let second = inbox.recv().await.unwrap();
        assert_eq!(first.envelope().message, Message::ControlPause);
        assert_eq!(second.envelope().message, Message::ControlResume);
    }

    #[tokio::test]
    async fn broadcast_to_closed_inbox_is_delivery_failure() {
        let (ep, inbox) = channel("ui", 4);
        drop(inbox);
        let err = ep.broadcast(env(Message::ControlStop)).unwrap_err();
        assert!(matches!(err, SyncError::MessageDelivery(_)));
        assert!(err.to_string().contains("not listening"));
    }

    #[tokio::test]
    async fn broadcast_to_full_inbox_does_not_block() {
        let (ep, _inbox) = channel("ui", 1);
        ep.broadcast(env(Message::ControlPause)).unwrap();
        assert!(ep.broadcast(env(Message::ControlPause)).is_err());
    }

    #[tokio::test]
    async fn request_gets_reply() {
        let (ep, mut inbox) = channel("engine", 4);
        tokio::spawn(async move {
            if let Some(Delivery::Request { reply, .. }) = inbox.recv().await {
                answer(reply, IntentResponse::ok().with_duration(1_000));
            }
        });

        let resp = ep
            .request(env(Message::EnginePlay), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.duration_ms, Some(1_000));
    }

    #[tokio::test]
    async fn request_to_dead_context_fails() {
        let (ep, inbox) = channel("engine", 4);
        drop(inbox);
        let err = ep
            .request(env(Message::EnginePlay), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MessageDelivery(_)));
    }

    #[tokio::test]
    async fn broadcast_crosses_as_json_text() {
        let (ep, mut inbox) = channel("engine", 4);
        ep.broadcast(env(Message::EngineLoad {
            audio: vec![0, 1, 254, 255],
        }))
        .unwrap();

        let frame = inbox.rx.recv().await.unwrap();
        assert!(frame.reply.is_none());
        let value: serde_json::Value = serde_json::from_str(&frame.text).unwrap();
        assert_eq!(value["kind"], "engine-load");
        assert_eq!(value["payload"]["audio"], "AAH+/w==");
    }

    #[tokio::test]
    async fn undecodable_broadcast_is_skipped() {
        let (ep, mut inbox) = channel("ui", 4);
        ep.tx
            .try_send(Frame {
                text: r#"{"kind":"playback-started","payload":{},"timestamp":1}"#.into(),
                reply: None,
            })
            .unwrap();
        ep.broadcast(env(Message::ControlStop)).unwrap();

        let next = inbox.recv().await.unwrap();
        assert_eq!(next.envelope().message, Message::ControlStop);
    }

    #[tokio::test]
    async fn undecodable_request_is_answered_with_delivery_failure() {
        let (ep, mut inbox) = channel("coordinator", 4);
        let (reply, answered) = oneshot::channel();
        ep.tx
            .try_send(Frame {
                text: "{not json".into(),
                reply: Some(reply),
            })
            .unwrap();
        drop(ep);

        assert!(inbox.recv().await.is_none());
        let resp = answered.await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.code.as_deref(), Some("message-delivery-failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn request_times_out_when_never_answered() {
        let (ep, _inbox) = channel("engine", 4);
        let err = ep
            .request(env(Message::EnginePlay), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500 ms"));
    }
}
