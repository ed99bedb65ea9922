use std::collections::HashMap;

use cartpilot_contracts::Message;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;
use uuid::Uuid;

/// Outbound requests waiting for a page acknowledgement, keyed by
/// correlation id. Each entry completes at most once.
#[derive(Default)]
pub struct PendingRequests {
    pending: Mutex<HashMap<String, oneshot::Sender<Message>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a correlation id and the receiver its acknowledgement
    /// will be delivered on.
    pub async fn register(&self) -> (String, oneshot::Receiver<Message>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);
        (id, rx)
    }

    /// Deliver `message` to the request it acknowledges. Returns `false`
    /// when it carries no id or nobody is waiting for it.
    pub async fn complete(&self, message: &Message) -> bool {
        let Some(id) = message.correlation_id() else {
            return false;
        };
        let Some(tx) = self.pending.lock().await.remove(id) else {
            debug!(correlation_id = %id, "No pending request for acknowledgement");
            return false;
        };
        tx.send(message.clone()).is_ok()
    }

    /// Forget a request, e.g. after it timed out.
    pub async fn cancel(&self, id: &str) -> bool {
        self.pending.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartpilot_contracts::{ClearPersistMessage, InitMessage};

    fn ack(id: &str) -> Message {
        Message::Init(InitMessage::default()).with_correlation_id(id)
    }

    #[tokio::test]
    async fn test_complete_delivers_once() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register().await;

        assert!(pending.complete(&ack(&id)).await);
        assert!(!pending.complete(&ack(&id)).await);
        assert_eq!(rx.await.unwrap(), ack(&id));
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_or_missing_id_is_ignored() {
        let pending = PendingRequests::new();
        let (_id, _rx) = pending.register().await;

        assert!(!pending.complete(&ack("someone-else")).await);
        assert!(
            !pending
                .complete(&Message::ClearPersist(ClearPersistMessage::default()))
                .await
        );
        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_drops_sender() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register().await;

        assert!(pending.cancel(&id).await);
        assert!(rx.await.is_err());
        assert!(!pending.complete(&ack(&id)).await);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let pending = PendingRequests::new();
        let (a, _ra) = pending.register().await;
        let (b, _rb) = pending.register().await;
        assert_ne!(a, b);
    }
}
