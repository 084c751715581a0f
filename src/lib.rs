//! Ceilidh: streaming chat session core for an LLM-orchestration
//! admin console.
//!
//! Most of the console is thin CRUD over the admin REST backend and
//! lives entirely in the GUI layer. This crate owns the one interactive
//! piece with real protocol handling: the streaming conversation
//! session.
//!
//! # Architecture
//!
//! Independent leaf clients feed one core state machine:
//! - **ApiClient**: shared `reqwest` client for the admin backend
//! - **ConnectionRegistry**: flattens upstream LLM connections into one
//!   selectable model list
//! - **ConversationStore**: conversation CRUD and canonical history
//! - **ConfigSync**: dynamic streaming-timeout budget with a safe
//!   fallback
//! - **VoiceBridge**: injected platform speech capture/playback
//! - **ChatSession**: optimistic transcript, incremental frame decoding
//!   under a cooperative cancellation budget, reconciliation, playback
//!
//! The embedding GUI consumes [`SessionEvent`]s from an unbounded
//! channel and re-renders from the session's transcript; it never
//! touches the wire protocol.

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod registry;
pub mod session;
pub mod stream;
pub mod voice;

pub use api::ApiClient;
pub use config::{ConfigSync, DEFAULT_REQUEST_TIMEOUT_MS};
pub use conversation::store::ConversationStore;
pub use conversation::transcript::{Transcript, TranscriptEntry};
pub use conversation::types::{Conversation, Message, MessageMetadata, Role, StreamingRequest};
pub use error::{ConsoleError, Result};
pub use registry::{Connection, ConnectionRegistry, ModelChoice};
pub use session::{AbortCause, CancelToken, ChatSession, SessionEvent, SessionState, TurnOutcome};
pub use stream::{FrameDecoder, StreamEvent, Utf8StreamDecoder};
pub use voice::{
    CaptureEvent, ListenState, SpeechEngine, Voice, VoiceBridge, VoiceCapability,
};
