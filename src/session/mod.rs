//! The streaming conversation session.
//!
//! [`ChatSession`] drives one chat exchange end to end: optimistic
//! transcript append, the chunked `POST /chat/send/stream` request, the
//! incremental frame decode loop raced against the timeout budget,
//! terminal-state handling, reconciliation with the backend's persisted
//! record, and speech playback.
//!
//! The session is the only mutator of the transcript while an exchange
//! is in flight; the `Idle` gate rejects overlapping sends, so token
//! updates and reconciliation can never interleave for one
//! conversation.

mod cancel;
mod state;

pub use cancel::CancelToken;
pub use state::{AbortCause, SessionState, TurnOutcome};

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::api::{ApiClient, status_error};
use crate::config::ConfigSync;
use crate::conversation::store::ConversationStore;
use crate::conversation::transcript::Transcript;
use crate::conversation::types::{Role, StreamingRequest};
use crate::error::{ConsoleError, Result};
use crate::stream::{FrameDecoder, StreamEvent};
use crate::voice::VoiceBridge;

/// Lightweight events emitted to the embedding UI.
///
/// Kept small so the decode loop can emit per frame without blocking;
/// the UI re-renders from the session's transcript on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session state machine moved.
    StateChanged(SessionState),
    /// The transcript gained, replaced, or re-flagged entries.
    TranscriptChanged,
    /// A token fragment was appended to the optimistic assistant entry.
    AssistantDelta {
        /// Transcript id of the entry that grew.
        message_id: String,
        /// The appended fragment.
        text: String,
    },
    /// A user-facing banner message (timeout, transport, reconciliation
    /// notices).
    Notice {
        /// Display text.
        text: String,
    },
}

/// How one exchange ended, before reconciliation runs.
#[derive(Debug)]
enum ExchangeEnd {
    /// End-of-stream reached. `explicit_done` records whether an
    /// `event: done` frame was seen before the connection closed —
    /// a close without one is still success.
    Done { frames: usize, explicit_done: bool },
    /// The cancellation token fired.
    Aborted(AbortCause),
    /// Transport failure before or during the stream.
    Failed { detail: String, bytes_seen: bool },
}

/// The streaming conversation session.
pub struct ChatSession {
    api: ApiClient,
    store: ConversationStore,
    config: ConfigSync,
    voice: VoiceBridge,
    transcript: Transcript,
    conversation_id: Option<String>,
    state: SessionState,
    cancel: CancelToken,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ChatSession {
    /// Create a session over the given backend and speech capability.
    /// Returns the session and the event stream for the embedding UI.
    pub fn new(
        api: ApiClient,
        voice: VoiceBridge,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            store: ConversationStore::new(api.clone()),
            config: ConfigSync::new(api.clone()),
            api,
            voice,
            transcript: Transcript::new(),
            conversation_id: None,
            state: SessionState::Idle,
            cancel: CancelToken::new(),
            events,
        };
        (session, rx)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The visible transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The selected conversation, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// The conversation store (list cache, create).
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Mutable access to the store for list management.
    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    /// The voice bridge.
    pub fn voice(&self) -> &VoiceBridge {
        &self.voice
    }

    /// Mutable access to the voice bridge (voice selection).
    pub fn voice_mut(&mut self) -> &mut VoiceBridge {
        &mut self.voice
    }

    /// A handle the cancel affordance can fire at any time. Firing it
    /// while no exchange is in flight has no effect — the token is
    /// re-armed when the next exchange starts.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation of the in-flight exchange.
    pub fn request_cancel(&self) {
        if self.cancel.fire(AbortCause::User) {
            tracing::debug!("user cancel requested");
        }
    }

    /// Select a conversation and load its canonical history.
    pub async fn open_conversation(&mut self, id: &str) -> Result<()> {
        let (conversation, messages) = self.store.load_messages(id).await?;
        self.conversation_id = Some(conversation.id);
        self.transcript.replace_all(messages);
        self.emit(SessionEvent::TranscriptChanged);
        Ok(())
    }

    /// Clear the selection and transcript.
    pub fn clear_selection(&mut self) {
        self.conversation_id = None;
        self.transcript.clear();
        self.emit(SessionEvent::TranscriptChanged);
    }

    /// Delete a conversation; clears selection and transcript when the
    /// deleted conversation is the selected one.
    pub async fn delete_conversation(&mut self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        if self.conversation_id.as_deref() == Some(id) {
            self.clear_selection();
        }
        Ok(())
    }

    /// Run one streaming exchange.
    ///
    /// `Err` is returned only for local validation failures (empty
    /// message, no model, busy session) — rejected before any I/O.
    /// Every I/O failure becomes a notice event and a [`TurnOutcome`].
    pub async fn send(&mut self, request: StreamingRequest) -> Result<TurnOutcome> {
        if !self.state.is_idle() {
            return Err(ConsoleError::Validation(
                "a streaming exchange is already in flight".into(),
            ));
        }
        if request.message.trim().is_empty() {
            return Err(ConsoleError::Validation("message is empty".into()));
        }
        if request.model_id.trim().is_empty() {
            return Err(ConsoleError::Validation("no model selected".into()));
        }

        // Optimistic entries: visible immediately, reconciled later.
        let _user_id = self
            .transcript
            .push_local(Role::User, request.message.clone());
        let assistant_id = self.transcript.push_local(Role::Assistant, "");
        self.emit(SessionEvent::TranscriptChanged);

        self.cancel.reset();
        let cancel = self.cancel.clone();
        self.set_state(SessionState::Sending);
        let budget_ms = self.config.request_timeout_ms().await;
        let started = Instant::now();
        tracing::info!(model = %request.model_id, budget_ms, "chat exchange dispatched");

        let end = self
            .run_exchange(&request, &assistant_id, budget_ms, &cancel)
            .await;
        let elapsed = started.elapsed();

        match end {
            ExchangeEnd::Done {
                frames,
                explicit_done,
            } => {
                self.set_state(SessionState::Done);
                tracing::info!(
                    frames,
                    explicit_done,
                    elapsed_s = elapsed.as_secs_f64(),
                    "stream finished"
                );
                // Capture before reconciliation replaces the temp entry.
                let final_text = self
                    .transcript
                    .content_of(&assistant_id)
                    .unwrap_or_default()
                    .to_owned();
                self.reconcile().await;
                self.voice.speak(&final_text).await;
                self.set_state(SessionState::Idle);
                Ok(TurnOutcome::Completed)
            }
            ExchangeEnd::Aborted(cause) => {
                self.set_state(SessionState::Aborted(cause));
                tracing::warn!(%cause, elapsed_s = elapsed.as_secs_f64(), "stream aborted");
                match cause {
                    AbortCause::Timeout => {
                        let seconds = budget_ms as f64 / 1000.0;
                        self.emit(SessionEvent::Notice {
                            text: format!("streaming timed out after {seconds} seconds"),
                        });
                    }
                    AbortCause::User => {
                        self.emit(SessionEvent::Notice {
                            text: "streaming cancelled".into(),
                        });
                    }
                }
                self.reconcile().await;
                self.set_state(SessionState::Idle);
                Ok(TurnOutcome::Aborted(cause))
            }
            ExchangeEnd::Failed { detail, bytes_seen } => {
                self.set_state(SessionState::Errored);
                tracing::warn!(
                    bytes_seen,
                    elapsed_s = elapsed.as_secs_f64(),
                    "stream failed: {detail}"
                );
                // Whatever already streamed in stays visible, flagged.
                self.transcript.mark_failed(&assistant_id);
                self.emit(SessionEvent::TranscriptChanged);
                self.emit(SessionEvent::Notice {
                    text: detail.clone(),
                });
                self.set_state(SessionState::Idle);
                Ok(TurnOutcome::Failed { detail })
            }
        }
    }

    /// Dispatch the request and consume the response body, racing the
    /// timeout timer against the read loop.
    async fn run_exchange(
        &mut self,
        request: &StreamingRequest,
        assistant_id: &str,
        budget_ms: u64,
        cancel: &CancelToken,
    ) -> ExchangeEnd {
        // The timer is armed at dispatch: it covers waiting for the
        // response head as well as the read loop.
        let deadline = tokio::time::sleep(Duration::from_millis(budget_ms));
        tokio::pin!(deadline);

        let dispatched = tokio::select! {
            cause = cancel.fired() => return ExchangeEnd::Aborted(cause),
            () = &mut deadline => {
                cancel.fire(AbortCause::Timeout);
                return ExchangeEnd::Aborted(AbortCause::Timeout);
            }
            result = self
                .api
                .http()
                .post(self.api.url("/chat/send/stream"))
                .json(request)
                .send() => result,
        };

        let response = match dispatched {
            Ok(response) => response,
            Err(err) => {
                return ExchangeEnd::Failed {
                    detail: format!("chat request failed: {err}"),
                    bytes_seen: false,
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return ExchangeEnd::Failed {
                detail: status_error(status, &body).to_string(),
                bytes_seen: false,
            };
        }

        self.set_state(SessionState::Streaming);

        let mut body = Box::pin(response.bytes_stream());
        // Fresh decode buffers per exchange: frame boundaries never
        // span two sends.
        let mut decoder = FrameDecoder::new();
        let mut frames: usize = 0;
        let mut bytes_seen = false;
        let mut explicit_done = false;

        loop {
            // Checked before every await on the next chunk.
            if let Some(cause) = cancel.cause() {
                return ExchangeEnd::Aborted(cause);
            }

            let next: Option<std::result::Result<Bytes, reqwest::Error>> = tokio::select! {
                cause = cancel.fired() => return ExchangeEnd::Aborted(cause),
                () = &mut deadline => {
                    cancel.fire(AbortCause::Timeout);
                    return ExchangeEnd::Aborted(AbortCause::Timeout);
                }
                next = body.next() => next,
            };

            let events = match next {
                Some(Ok(chunk)) => {
                    bytes_seen |= !chunk.is_empty();
                    decoder.push(&chunk)
                }
                Some(Err(err)) => {
                    vec![StreamEvent::Error {
                        detail: format!("stream dropped: {err}"),
                    }]
                }
                None => {
                    // End of stream: flush the unterminated tail, then
                    // finish. A close without an explicit done frame is
                    // still completion.
                    let mut events = Vec::new();
                    if let Some(event) = decoder.finish() {
                        events.push(event);
                    }
                    match self.apply_events(events, assistant_id, cancel, &mut frames) {
                        Applied::Continue => {}
                        Applied::Aborted(cause) => return ExchangeEnd::Aborted(cause),
                        Applied::Failed(detail) => {
                            return ExchangeEnd::Failed { detail, bytes_seen };
                        }
                        Applied::DoneSeen => explicit_done = true,
                    }
                    return ExchangeEnd::Done {
                        frames,
                        explicit_done,
                    };
                }
            };

            match self.apply_events(events, assistant_id, cancel, &mut frames) {
                Applied::Continue => {}
                Applied::Aborted(cause) => return ExchangeEnd::Aborted(cause),
                Applied::Failed(detail) => return ExchangeEnd::Failed { detail, bytes_seen },
                Applied::DoneSeen => {
                    // Keep draining bytes already on the wire; the loop
                    // ends when end-of-stream is also observed.
                    explicit_done = true;
                }
            }
        }
    }

    /// Apply decoded frames in stream order. The cancellation token is
    /// re-checked per frame: once fired, buffered frames are dropped.
    fn apply_events(
        &mut self,
        events: Vec<StreamEvent>,
        assistant_id: &str,
        cancel: &CancelToken,
        frames: &mut usize,
    ) -> Applied {
        let mut done_seen = false;
        for event in events {
            if let Some(cause) = cancel.cause() {
                return Applied::Aborted(cause);
            }
            match event {
                StreamEvent::Token { text } => {
                    *frames += 1;
                    self.transcript.append_content(assistant_id, &text);
                    self.emit(SessionEvent::AssistantDelta {
                        message_id: assistant_id.to_owned(),
                        text,
                    });
                }
                StreamEvent::Done => done_seen = true,
                StreamEvent::Error { detail } => return Applied::Failed(detail),
            }
        }
        if done_seen {
            Applied::DoneSeen
        } else {
            Applied::Continue
        }
    }

    /// Replace the optimistic transcript with the backend's canonical
    /// record. When no conversation existed yet, the backend created
    /// one server-side: reload the list, select the newest entry, then
    /// fetch its history. Reconciliation failures are notices — the
    /// optimistic transcript is never destructively cleared.
    async fn reconcile(&mut self) {
        let conversation_id = match &self.conversation_id {
            Some(id) => id.clone(),
            None => match self.store.refresh().await {
                Ok(_) => match self.store.most_recent() {
                    Some(conversation) => {
                        let id = conversation.id.clone();
                        self.conversation_id = Some(id.clone());
                        id
                    }
                    None => {
                        tracing::warn!("no conversations after reload, keeping optimistic transcript");
                        return;
                    }
                },
                Err(err) => {
                    self.emit(SessionEvent::Notice {
                        text: format!("could not reload conversations: {err}"),
                    });
                    return;
                }
            },
        };

        match self.store.load_messages(&conversation_id).await {
            Ok((_conversation, messages)) => {
                self.transcript.replace_all(messages);
                self.emit(SessionEvent::TranscriptChanged);
            }
            Err(err) => {
                self.emit(SessionEvent::Notice {
                    text: format!("could not reload conversation: {err}"),
                });
            }
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver just means nobody is rendering.
        let _ = self.events.send(event);
    }
}

/// Outcome of applying one batch of decoded frames.
enum Applied {
    Continue,
    DoneSeen,
    Aborted(AbortCause),
    Failed(String),
}
