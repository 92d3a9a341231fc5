//! HTTP and WebSocket front end for the relay.

pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use router::create_router;
pub use server::RelayServer;
