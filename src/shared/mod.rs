//! Shared Module
//!
//! Types that cross module boundaries: configuration, the gateway error type,
//! session events, and the wire types of the identity and documents APIs.

/// Gateway configuration
pub mod config;

/// Gateway error type
pub mod error;

/// Session events broadcast by the gateway
pub mod event;

/// Identity API wire types
pub mod identity;

/// Documents API wire types
pub mod documents;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, GatewayConfig, GatewayConfigBuilder};
pub use error::GatewayError;
pub use event::SessionEvent;
