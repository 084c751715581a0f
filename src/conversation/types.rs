//! Wire data model for conversations and messages.
//!
//! These are the backend's shapes; the client never invents fields the
//! backend does not own. Timestamps are UTC. Optimistic (locally
//! synthesized) messages reuse [`Message`] with a temporary id — the
//! transcript layer tracks which entries are local.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user input.
    User,
    /// Model output.
    Assistant,
    /// Orchestrator-injected system content.
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A persisted chat session grouping ordered messages.
///
/// `updated_at` and `message_count` are owned by the backend and only
/// change client-side when the conversation is reloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Backend-assigned identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Selector id of the model this conversation targets.
    pub model_id: String,
    /// Orchestrator routing profile name.
    pub routing_profile: String,
    /// Creation time (backend-assigned).
    pub created_at: DateTime<Utc>,
    /// Last update time (backend-owned).
    pub updated_at: DateTime<Utc>,
    /// Number of persisted messages (backend-owned).
    #[serde(default)]
    pub message_count: u64,
}

/// One message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Backend id, or a temporary `local-…` id for optimistic entries.
    pub id: String,
    /// Who authored the message.
    pub role: Role,
    /// Full text content.
    pub content: String,
    /// Execution metadata recorded by the orchestrator (assistant
    /// messages only; absent until reconciliation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    /// Creation time; insertion order for optimistic entries.
    pub created_at: DateTime<Utc>,
}

/// Backend-recorded execution metadata attached to assistant messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Tool invocations made while producing the message.
    #[serde(default)]
    pub tools_used: Vec<ToolUse>,
    /// Orchestrator execution trace.
    #[serde(default)]
    pub execution_steps: Vec<ExecutionStep>,
    /// Model that actually produced the output.
    #[serde(default)]
    pub model: Option<String>,
    /// Token count for the exchange.
    #[serde(default)]
    pub tokens: Option<u64>,
}

/// A tool invocation recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Tool name.
    pub name: String,
    /// Input the tool received.
    pub input: serde_json::Value,
    /// Output the tool returned.
    pub output: serde_json::Value,
    /// Wall-clock duration of the invocation.
    #[serde(default)]
    pub duration_ms: u64,
}

/// One step of the orchestrator's execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Step description.
    pub step: String,
    /// When the step ran.
    pub timestamp: DateTime<Utc>,
    /// Step status (backend vocabulary, e.g. `"completed"`).
    pub status: String,
}

/// The outgoing body for `POST /chat/send/stream`.
///
/// Ephemeral: lives only for the duration of the in-flight call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingRequest {
    /// Target conversation; `None` lets the backend create one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// The user's message text.
    pub message: String,
    /// Selector id of the model to use.
    pub model_id: String,
    /// Upstream connection, when the selector id is composite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Orchestrator routing profile name.
    pub routing_profile: String,
    /// Whether the orchestrator may consult conversation memory.
    pub use_memory: bool,
    /// Whether the orchestrator may invoke tools.
    pub use_tools: bool,
}

impl StreamingRequest {
    /// Create a request with memory and tools enabled.
    pub fn new(
        message: impl Into<String>,
        model_id: impl Into<String>,
        routing_profile: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: None,
            message: message.into(),
            model_id: model_id.into(),
            connection_id: None,
            routing_profile: routing_profile.into(),
            use_memory: true,
            use_tools: true,
        }
    }

    /// Target an existing conversation.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Pin the upstream connection.
    pub fn with_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    /// Toggle conversation memory.
    pub fn with_memory(mut self, use_memory: bool) -> Self {
        self.use_memory = use_memory;
        self
    }

    /// Toggle tool use.
    pub fn with_tools(mut self, use_tools: bool) -> Self {
        self.use_tools = use_tools;
        self
    }
}
