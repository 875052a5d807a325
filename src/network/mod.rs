//! Network Layer
//!
//! JSON-over-WebSocket boundary: decodes frames, calls the grid service
//! and maps outcomes to error codes with HTTP-equivalent statuses.

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, ServerError, ErrorCode};
pub use server::{GridServer, ServerConfig, GridServerError, ClientContext, handle_client_message};
