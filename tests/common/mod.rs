//! Common test utilities and helpers
//!
//! Shared by the integration test crates:
//! - wiremock backends for the identity and documents services
//! - gateway construction against a mock backend
//! - session event collection

#![allow(dead_code)]

pub mod mock_server;

pub use mock_server::*;

use docportal::shared::SessionEvent;
use tokio::sync::broadcast;

/// Everything currently buffered on an event receiver
pub fn drain_events(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Event names without payload, for order assertions
pub fn event_kinds(events: &[SessionEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            SessionEvent::RefreshStarted => "refresh_started",
            SessionEvent::RefreshEnded => "refresh_ended",
            SessionEvent::AuthChanged {
                is_authenticated: true,
                ..
            } => "auth:true",
            SessionEvent::AuthChanged {
                is_authenticated: false,
                ..
            } => "auth:false",
        })
        .collect()
}
