//! docportal - Document Portal Client Library
//!
//! Client side of a document-management system: REST clients for the
//! identity and documents services, and the session-aware gateway they all
//! dispatch through.
//!
//! # Module Structure
//!
//! - **`shared`** - configuration, errors, session events, wire types
//! - **`client`** - transport, gateway, REST clients, session state holder
//!
//! # Sessions
//!
//! The backend keeps the session in HTTP-only cookies. When a request comes
//! back 401 the gateway refreshes the session once, however many requests
//! failed at the same time, and replays them. If the refresh fails every
//! affected caller gets the refresh error and the gateway broadcasts
//! `SessionEvent::AuthChanged { is_authenticated: false }`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use docportal::client::{DocumentClient, IdentityClient, ReqwestTransport, SessionGateway};
//! use docportal::shared::documents::DocumentListQuery;
//! use docportal::shared::GatewayConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let gateway = SessionGateway::new(ReqwestTransport::new(config.clone())?, config);
//!
//! IdentityClient::new(gateway.clone())
//!     .login("ana@example.com", "correct horse")
//!     .await?;
//! let page = DocumentClient::new(gateway)
//!     .list(&DocumentListQuery::default())
//!     .await?;
//! println!("{} documents", page.total);
//! # Ok(())
//! # }
//! ```

/// Shared types and configuration
pub mod shared;

/// Backend clients and the session gateway
pub mod client;
