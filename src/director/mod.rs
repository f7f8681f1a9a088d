//! Scene director integration module
//!
//! Handles the streaming WebSocket session, the HTTP health check, and the
//! wire format of director panels.

pub mod mock;
pub mod rest;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use mock::MockDirectorServer;
pub use rest::DirectorRestClient;
pub use types::*;
pub use websocket::DirectorWebSocket;
