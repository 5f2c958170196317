//! Core types and error definitions for ragchat.
//!
//! This crate provides the types shared by every ragchat crate: the error
//! taxonomy of the retrieval pipeline and the conversation turn model.
//!
//! # Main types
//!
//! - [`RagError`]: Unified error enum for ingestion, retrieval and generation.
//! - [`RagResult`]: Convenience alias for `Result<T, RagError>`.
//! - [`Role`]: Author of a conversation turn (user or assistant).
//! - [`ConversationTurn`]: A single entry in a session's conversation history.

/// Error types.
pub mod error;
/// Conversation turn types.
pub mod message;

pub use error::{RagError, RagResult};
pub use message::{ConversationTurn, Role};
