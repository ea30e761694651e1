//! Auth state change channel

use crate::types::AuthEvent;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Fan-out of auth events to every subscriber
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    /// Create new bus with channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all current subscribers; returns how many received it
    pub fn publish(&self, event: AuthEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("Auth event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Receiving end of an auth event subscription
///
/// Dropping it, or calling [`AuthSubscription::unsubscribe`], ends the
/// subscription.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Next event, or `None` once the provider is gone
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Auth subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BearerToken, Session, User};

    fn session() -> Session {
        Session::new(
            User {
                id: "u1".into(),
                email: Some("a@b.c".into()),
            },
            BearerToken::new("tok"),
        )
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = AuthEventBus::default();
        let mut sub = bus.subscribe();

        assert_eq!(bus.publish(AuthEvent::SignedIn(session())), 1);
        match sub.recv().await {
            Some(AuthEvent::SignedIn(s)) => assert_eq!(s.user.id, "u1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsubscribe_drops_receiver() {
        let bus = AuthEventBus::default();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(AuthEvent::SignedOut), 0);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let bus = AuthEventBus::default();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}
