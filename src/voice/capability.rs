//! Injected platform speech capability.
//!
//! Speech-to-text and text-to-speech belong to the host platform, not
//! to this crate. The console receives a [`VoiceCapability`] at
//! construction and must handle the `Unavailable` variant — nothing in
//! the session assumes speech exists.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// A synthesis voice reported by the platform engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Engine-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// BCP 47 language tag.
    pub language: String,
}

/// Events reported by an active capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A rolling interim hypothesis. Each one replaces the previous;
    /// platform recognizers report the grown hypothesis, not deltas.
    Interim(String),
    /// Capture ended (silence detected, or stop was requested).
    Ended,
    /// Capture failed.
    Failed(String),
}

/// Platform speech engine: synthesis playback plus non-continuous
/// capture.
///
/// Implementations wrap whatever the host platform provides; the
/// desktop host bridges its native speech services through this trait.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Voices known so far. May grow as the platform reports
    /// availability; an empty list means none have been reported yet.
    fn voices(&self) -> Vec<Voice>;

    /// Begin speaking `text` with `voice` (engine default when `None`).
    /// Any previous utterance has already been cancelled by the caller.
    async fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<()>;

    /// Stop the current utterance, if any.
    async fn cancel_speech(&self);

    /// Start a non-continuous capture session. Events arrive on the
    /// returned channel until `Ended` or `Failed`.
    async fn start_capture(&self) -> Result<mpsc::Receiver<CaptureEvent>>;

    /// Ask the platform to stop capturing; the active session then
    /// reports `Ended` with whatever was heard.
    async fn stop_capture(&self);
}

/// Whether platform speech is present.
#[derive(Clone)]
pub enum VoiceCapability {
    /// A speech engine is wired in.
    Available(Arc<dyn SpeechEngine>),
    /// No speech on this platform; every voice operation is a no-op.
    Unavailable,
}

impl VoiceCapability {
    /// The engine, when speech is available.
    pub fn engine(&self) -> Option<&Arc<dyn SpeechEngine>> {
        match self {
            Self::Available(engine) => Some(engine),
            Self::Unavailable => None,
        }
    }
}

impl std::fmt::Debug for VoiceCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => write!(f, "VoiceCapability::Available"),
            Self::Unavailable => write!(f, "VoiceCapability::Unavailable"),
        }
    }
}
