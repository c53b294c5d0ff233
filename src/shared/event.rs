/**
 * Session Event System
 *
 * This module defines the signals the session gateway broadcasts to the rest
 * of the application: the start and end of a session refresh (for loading
 * indicators) and authentication-state changes (for redirecting to a login
 * view).
 *
 * Events travel over a `tokio::sync::broadcast` channel: any number of
 * listeners, fire-and-forget, no backpressure. A listener that falls behind
 * loses the oldest events instead of slowing the sender down.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Signal broadcast by the session gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session refresh has been issued
    RefreshStarted,
    /// The in-flight session refresh has settled (successfully or not)
    RefreshEnded,
    /// The authentication state changed
    AuthChanged {
        /// Whether the session is now authenticated
        is_authenticated: bool,
        /// When the change was observed
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Create an authentication-change event stamped with the current time
    pub fn auth_changed(is_authenticated: bool) -> Self {
        Self::AuthChanged {
            is_authenticated,
            timestamp: Utc::now(),
        }
    }

    /// The carried authentication state, for `AuthChanged` events
    pub fn is_authenticated(&self) -> Option<bool> {
        match self {
            Self::AuthChanged {
                is_authenticated, ..
            } => Some(*is_authenticated),
            _ => None,
        }
    }
}

/// Sending half of the session event channel
pub type SessionEventBroadcast = broadcast::Sender<SessionEvent>;

/// Broadcast a session event to all current subscribers
///
/// # Returns
///
/// Number of subscribers that received the event (0 if there are none)
pub fn broadcast_event(broadcast_tx: &SessionEventBroadcast, event: SessionEvent) -> usize {
    match broadcast_tx.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!("[Events] Event broadcast to {} subscribers", subscriber_count);
            subscriber_count
        }
        Err(e) => {
            tracing::trace!("[Events] No subscribers to receive event: {:?}", e.0);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_changed() {
        let event = SessionEvent::auth_changed(false);
        assert_eq!(event.is_authenticated(), Some(false));
        assert_eq!(SessionEvent::RefreshStarted.is_authenticated(), None);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(SessionEvent::auth_changed(true)).unwrap();
        assert_eq!(json["type"], "auth_changed");
        assert_eq!(json["is_authenticated"], true);
        assert!(json["timestamp"].as_str().is_some());

        let json = serde_json::to_value(SessionEvent::RefreshStarted).unwrap();
        assert_eq!(json["type"], "refresh_started");
    }

    #[test]
    fn test_event_deserialization() {
        let event: SessionEvent = serde_json::from_str(
            r#"{"type":"auth_changed","is_authenticated":false,"timestamp":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(event.is_authenticated(), Some(false));
    }

    #[test]
    fn test_broadcast_event_no_subscribers() {
        let (tx, _) = broadcast::channel::<SessionEvent>(16);
        assert_eq!(broadcast_event(&tx, SessionEvent::RefreshEnded), 0);
    }

    #[tokio::test]
    async fn test_broadcast_multiple_subscribers() {
        let (tx, _) = broadcast::channel::<SessionEvent>(16);
        let mut sub1 = tx.subscribe();
        let mut sub2 = tx.subscribe();

        let count = broadcast_event(&tx, SessionEvent::RefreshStarted);
        assert_eq!(count, 2);
        assert_eq!(sub1.recv().await.unwrap(), SessionEvent::RefreshStarted);
        assert_eq!(sub2.recv().await.unwrap(), SessionEvent::RefreshStarted);
    }
}
