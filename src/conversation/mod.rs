//! Conversations: wire data model, REST store, and the optimistic
//! transcript arena.

pub mod store;
pub mod transcript;
pub mod types;

pub use store::ConversationStore;
pub use transcript::{Transcript, TranscriptEntry};
pub use types::{
    Conversation, ExecutionStep, Message, MessageMetadata, Role, StreamingRequest, ToolUse,
};
