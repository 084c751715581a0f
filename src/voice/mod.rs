//! Speech capture and playback bridge.
//!
//! Wraps the injected [`VoiceCapability`] with the console's rules: at
//! most one utterance plays at a time (cancel-then-speak), capture is a
//! strict `Idle → Listening → Idle` machine, and every failure degrades
//! to a logged no-op — speech never takes the chat session down.

mod capability;

pub use capability::{CaptureEvent, SpeechEngine, Voice, VoiceCapability};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Capture state: `Idle → Listening → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenState {
    /// Not capturing.
    #[default]
    Idle,
    /// A capture session is active.
    Listening,
}

/// Shared capture state. The generation counter ties each capture task
/// to the session that spawned it, so a stale task cannot clobber the
/// state of a newer one.
#[derive(Debug, Default)]
struct ListenShared {
    state: ListenState,
    generation: u64,
}

fn lock(shared: &Mutex<ListenShared>) -> MutexGuard<'_, ListenShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Voice playback and capture for the chat session.
pub struct VoiceBridge {
    capability: VoiceCapability,
    selected_voice: Option<Voice>,
    listen: Arc<Mutex<ListenShared>>,
}

impl std::fmt::Debug for VoiceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceBridge")
            .field("capability", &self.capability)
            .field("selected_voice", &self.selected_voice)
            .field("listen_state", &self.listen_state())
            .finish()
    }
}

impl VoiceBridge {
    /// Create a bridge over the injected capability.
    pub fn new(capability: VoiceCapability) -> Self {
        Self {
            capability,
            selected_voice: None,
            listen: Arc::new(Mutex::new(ListenShared::default())),
        }
    }

    /// Convenience constructor for hosts without speech.
    pub fn unavailable() -> Self {
        Self::new(VoiceCapability::Unavailable)
    }

    /// Whether platform speech is present.
    pub fn available(&self) -> bool {
        self.capability.engine().is_some()
    }

    /// Current capture state.
    pub fn listen_state(&self) -> ListenState {
        lock(&self.listen).state
    }

    /// The currently selected voice.
    pub fn selected_voice(&self) -> Option<&Voice> {
        self.selected_voice.as_ref()
    }

    /// Select a voice by id. Returns whether the id was known.
    pub fn select_voice(&mut self, id: &str) -> bool {
        let Some(engine) = self.capability.engine() else {
            return false;
        };
        match engine.voices().into_iter().find(|v| v.id == id) {
            Some(voice) => {
                self.selected_voice = Some(voice);
                true
            }
            None => false,
        }
    }

    /// Voices known so far. Lazily populated by the engine; the first
    /// reported voice becomes the default selection if none is set.
    pub fn list_voices(&mut self) -> Vec<Voice> {
        let Some(engine) = self.capability.engine() else {
            return Vec::new();
        };
        let voices = engine.voices();
        if self.selected_voice.is_none()
            && let Some(first) = voices.first()
        {
            self.selected_voice = Some(first.clone());
        }
        voices
    }

    /// Speak `text`, cancelling any current utterance first so at most
    /// one plays at a time. No-op on empty text or when synthesis is
    /// unavailable; synthesis failures are logged, never returned.
    pub async fn speak(&self, text: &str) {
        let Some(engine) = self.capability.engine() else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        engine.cancel_speech().await;
        if let Err(err) = engine.speak(text, self.selected_voice.as_ref()).await {
            tracing::warn!("speech playback failed: {err}");
        }
    }

    /// Start a non-continuous capture session. Interim results replace
    /// a rolling transcript; on capture end the trimmed transcript, if
    /// non-empty, is handed to `on_final` exactly once. Capture
    /// failures are logged and end the session without the callback.
    ///
    /// Only starts from `Idle`; a second start while listening is a
    /// logged no-op.
    pub async fn start_listening<F>(&self, on_final: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let Some(engine) = self.capability.engine() else {
            tracing::warn!("speech capture unavailable");
            return;
        };

        let generation = {
            let mut shared = lock(&self.listen);
            if shared.state == ListenState::Listening {
                tracing::debug!("already listening, ignoring start");
                return;
            }
            shared.state = ListenState::Listening;
            shared.generation += 1;
            shared.generation
        };

        let rx = match engine.start_capture().await {
            Ok(rx) => rx,
            Err(err) => {
                tracing::warn!("speech capture failed to start: {err}");
                let mut shared = lock(&self.listen);
                if shared.generation == generation {
                    shared.state = ListenState::Idle;
                }
                return;
            }
        };

        let listen = Arc::clone(&self.listen);
        tokio::spawn(drive_capture(rx, listen, generation, on_final));
    }

    /// Force an immediate `Idle` transition and ask the engine to stop.
    /// The engine's end event still delivers the final transcript, and
    /// the callback can never run twice.
    pub async fn stop_listening(&self) {
        let Some(engine) = self.capability.engine() else {
            return;
        };
        {
            let mut shared = lock(&self.listen);
            if shared.state == ListenState::Idle {
                return;
            }
            shared.state = ListenState::Idle;
        }
        engine.stop_capture().await;
    }
}

/// Consume capture events until the session ends, then deliver the
/// final transcript at most once.
async fn drive_capture<F>(
    mut rx: mpsc::Receiver<CaptureEvent>,
    listen: Arc<Mutex<ListenShared>>,
    generation: u64,
    on_final: F,
) where
    F: FnOnce(String) + Send + 'static,
{
    let mut rolling = String::new();
    let mut on_final = Some(on_final);

    while let Some(event) = rx.recv().await {
        match event {
            CaptureEvent::Interim(text) => rolling = text,
            CaptureEvent::Failed(detail) => {
                tracing::warn!("speech capture failed: {detail}");
                let mut shared = lock(&listen);
                if shared.generation == generation {
                    shared.state = ListenState::Idle;
                }
                return;
            }
            CaptureEvent::Ended => break,
        }
    }

    {
        let mut shared = lock(&listen);
        if shared.generation == generation {
            shared.state = ListenState::Idle;
        }
    }

    let transcript = rolling.trim().to_owned();
    if transcript.is_empty() {
        return;
    }
    if let Some(callback) = on_final.take() {
        callback(transcript);
    }
}
