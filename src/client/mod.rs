//! Client Module
//!
//! Everything that talks to the backend: the transport, the session gateway
//! every request goes through, the identity and document REST clients built
//! on top of it, and the session state holder that follows the gateway's
//! events.
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── transport.rs - Transport trait, ApiRequest/ApiResponse, reqwest impl
//! ├── gateway.rs   - Session refresh protocol
//! ├── identity.rs  - /api/v1/identity client
//! ├── documents.rs - /api/v1/documents client
//! ├── session.rs   - Session state holder
//! └── error.rs     - REST client errors
//! ```

pub mod documents;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use documents::DocumentClient;
pub use error::ClientError;
pub use gateway::{RefreshState, SessionGateway, WeakSessionGateway};
pub use identity::IdentityClient;
pub use session::{AuthState, SessionStore};
pub use transport::{ApiRequest, ApiResponse, RequestBody, ReqwestTransport, Transport};
