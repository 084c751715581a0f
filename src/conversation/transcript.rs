//! Optimistic transcript arena for the selected conversation.
//!
//! Entries live in an id-keyed map plus an ordered id list. Optimistic
//! entries carry temporary ids and are append-only until the exchange
//! reaches a terminal state; reconciliation replaces the whole arena
//! with the backend's canonical list rather than mutating positionally.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::types::{Message, Role};

/// A message plus the client-side delivery flags layered over it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    /// The message itself.
    pub message: Message,
    /// Locally synthesized (temporary id), not yet backend-confirmed.
    pub local: bool,
    /// The exchange that produced this entry failed in transit.
    pub failed: bool,
}

/// Id-keyed transcript of the selected conversation.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: HashMap<String, TranscriptEntry>,
    order: Vec<String>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visible entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the transcript has no entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Append a locally synthesized entry and return its temporary id.
    pub fn push_local(&mut self, role: Role, content: impl Into<String>) -> String {
        let id = format!("local-{role}-{}", Uuid::new_v4());
        let entry = TranscriptEntry {
            message: Message {
                id: id.clone(),
                role,
                content: content.into(),
                metadata: None,
                created_at: Utc::now(),
            },
            local: true,
            failed: false,
        };
        self.entries.insert(id.clone(), entry);
        self.order.push(id.clone());
        id
    }

    /// Append a fragment to an entry's content. Returns whether the id
    /// was present.
    pub fn append_content(&mut self, id: &str, fragment: &str) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.message.content.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// Flag an entry as failed in transit. The content stays visible.
    pub fn mark_failed(&mut self, id: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.failed = true;
        }
    }

    /// Current content of an entry.
    pub fn content_of(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|e| e.message.content.as_str())
    }

    /// Whether an entry with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Replace the whole arena with the backend's canonical list.
    /// Temporary ids disappear here, never one by one.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.entries.clear();
        self.order.clear();
        for message in messages {
            let id = message.id.clone();
            self.entries.insert(
                id.clone(),
                TranscriptEntry {
                    message,
                    local: false,
                    failed: false,
                },
            );
            self.order.push(id);
        }
    }

    /// Drop everything (conversation deselected or deleted).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Entries in conversation order.
    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Total character count of all visible content. Used to check that
    /// a terminal state never shrinks what the user already saw.
    pub fn visible_content_len(&self) -> usize {
        self.entries().map(|e| e.message.content.chars().count()).sum()
    }
}
