//! Interactive session management module
//!
//! This module provides the core components for managing scene sessions:
//! the streaming-session state machine, the scene it builds, command routing,
//! and event processing for the interactive terminal.

pub mod action_channel;
pub mod command_router;
pub mod controller;
pub mod scene;
pub mod session_manager;

pub use action_channel::{ActionChannel, SessionEvent, StatusInfo};
pub use command_router::{CommandRouter, InteractiveCommand};
pub use controller::{SceneUpdate, SessionController, SessionId, SessionState};
pub use scene::SceneState;
pub use session_manager::{RunState, SessionConfig, SessionManager, SessionStats};
