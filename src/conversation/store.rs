//! Conversation CRUD over the admin REST backend.
//!
//! The store keeps a cached conversation list that is only replaced on
//! a successful fetch — a failed refresh leaves the previous in-memory
//! state untouched, so the UI never loses its list to a network blip.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{ConsoleError, Result};
use super::types::{Conversation, Message};

#[derive(Debug, Deserialize)]
struct ConversationListResponse {
    conversations: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
struct CreateConversationResponse {
    #[serde(default)]
    success: bool,
    conversation: Conversation,
}

#[derive(Debug, Deserialize)]
struct ConversationDetailResponse {
    conversation: Conversation,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    title: &'a str,
    model_id: &'a str,
    routing_profile: &'a str,
}

/// Client for conversation sessions and their persisted history.
#[derive(Debug)]
pub struct ConversationStore {
    api: ApiClient,
    conversations: Vec<Conversation>,
}

impl ConversationStore {
    /// Create a store with an empty cache.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            conversations: Vec::new(),
        }
    }

    /// The cached conversation list (last successful fetch).
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Fetch the conversation list. The cache is replaced only on
    /// success.
    pub async fn refresh(&mut self) -> Result<&[Conversation]> {
        let response: ConversationListResponse = self.api.get_json("/conversations").await?;
        self.conversations = response.conversations;
        tracing::debug!(count = self.conversations.len(), "conversation list refreshed");
        Ok(&self.conversations)
    }

    /// Create a conversation. The backend assigns id and timestamps.
    pub async fn create(
        &mut self,
        title: &str,
        model_id: &str,
        routing_profile: &str,
    ) -> Result<Conversation> {
        let body = CreateConversationRequest {
            title,
            model_id,
            routing_profile,
        };
        let response: CreateConversationResponse =
            self.api.post_json("/conversations", &body).await?;
        if !response.success {
            return Err(ConsoleError::Store(
                "backend rejected conversation create".into(),
            ));
        }
        self.conversations.insert(0, response.conversation.clone());
        Ok(response.conversation)
    }

    /// Load the canonical, ordered message history of a conversation.
    pub async fn load_messages(&self, id: &str) -> Result<(Conversation, Vec<Message>)> {
        let response: ConversationDetailResponse =
            self.api.get_json(&format!("/conversations/{id}")).await?;
        Ok((response.conversation, response.messages))
    }

    /// Delete a conversation. Removed from the cache on success only.
    /// If the deleted conversation is currently selected, the caller
    /// must clear selection and transcript.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.api.delete(&format!("/conversations/{id}")).await?;
        self.conversations.retain(|c| c.id != id);
        Ok(())
    }

    /// The most recently updated conversation in the cache. Used to
    /// select a conversation the backend just created server-side.
    pub fn most_recent(&self) -> Option<&Conversation> {
        self.conversations.iter().max_by_key(|c| c.updated_at)
    }
}
