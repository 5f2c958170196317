//! Per-session conversation state for ragchat.
//!
//! # Main types
//!
//! - [`ConversationHistory`]: Append-only log of conversation turns.
//! - [`SessionState`]: Active index plus history for one session.
//! - [`SessionRegistry`]: Session-keyed map of independently locked states.

/// Conversation history.
pub mod history;
/// Session state.
pub mod session;
/// Session registry.
pub mod store;

pub use history::{render_transcript, ConversationHistory};
pub use session::{SessionState, SessionStatus};
pub use store::{SessionHandle, SessionRegistry};
