//! Voice ↔ Session Integration Tests
//!
//! Scenario C end to end: a scripted platform engine produces interim
//! transcripts, capture ends, and the final transcript drives exactly
//! one streaming send. Also verifies that the assistant's final text is
//! spoken on completion and that nothing is spoken after an abort.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use ceilidh::error::Result;
use ceilidh::{
    ApiClient, CaptureEvent, ChatSession, SpeechEngine, StreamingRequest, TurnOutcome, Voice,
    VoiceBridge, VoiceCapability,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Platform engine stand-in: replays a capture script and records what
/// gets spoken.
struct ScriptedEngine {
    capture_script: Vec<CaptureEvent>,
    spoken: Mutex<Vec<String>>,
    cancels: AtomicUsize,
}

impl ScriptedEngine {
    fn new(capture_script: Vec<CaptureEvent>) -> Self {
        Self {
            capture_script,
            spoken: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
        }
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            id: "v1".into(),
            name: "Mara".into(),
            language: "en-GB".into(),
        }]
    }

    async fn speak(&self, text: &str, _voice: Option<&Voice>) -> Result<()> {
        let mut spoken = self.spoken.lock().unwrap_or_else(PoisonError::into_inner);
        spoken.push(text.to_owned());
        Ok(())
    }

    async fn cancel_speech(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    async fn start_capture(&self) -> Result<mpsc::Receiver<CaptureEvent>> {
        let (tx, rx) = mpsc::channel(8);
        let script = self.capture_script.clone();
        tokio::spawn(async move {
            for event in script {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn stop_capture(&self) {}
}

fn conversation_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": "New conversation",
        "model_id": "m1",
        "routing_profile": "default",
        "created_at": "2026-03-01T12:00:00Z",
        "updated_at": "2026-03-01T12:00:05Z",
        "message_count": 2
    })
}

async fn mount_chat_backend(server: &MockServer, expected_message: &str, reply_body: &str) {
    Mock::given(method("GET"))
        .and(path("/config/timeout"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"frontend_timeout_ms": 120_000})),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/send/stream"))
        .and(body_partial_json(json!({"message": expected_message})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(reply_body.to_owned(), "text/plain"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [conversation_json("c1")]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation": conversation_json("c1"),
            "messages": [
                {
                    "id": "m1",
                    "role": "user",
                    "content": expected_message,
                    "created_at": "2026-03-01T12:00:01Z"
                },
                {
                    "id": "m2",
                    "role": "assistant",
                    "content": "Hi there",
                    "created_at": "2026-03-01T12:00:04Z"
                }
            ]
        })))
        .mount(server)
        .await;
}

// ────────────────────────────────────────────────────────────────────────────
// Scenario C: capture end drives exactly one send
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn final_transcript_drives_exactly_one_send() {
    let server = MockServer::start().await;
    mount_chat_backend(&server, "Hello world", "data: Hi\ndata:  there\nevent: done\n").await;

    let engine = Arc::new(ScriptedEngine::new(vec![
        CaptureEvent::Interim("Hel".into()),
        CaptureEvent::Interim("Hello wor".into()),
        CaptureEvent::Interim("Hello world".into()),
        CaptureEvent::Ended,
    ]));
    let bridge = VoiceBridge::new(VoiceCapability::Available(engine.clone()));

    // The GUI wires the final transcript into a send; a channel stands
    // in for that wiring here.
    let (final_tx, mut final_rx) = mpsc::channel::<String>(1);
    bridge
        .start_listening(move |transcript| {
            let _ = final_tx.try_send(transcript);
        })
        .await;

    let transcript = final_rx.recv().await;
    assert_eq!(transcript.as_deref(), Some("Hello world"));

    // The callback was FnOnce and its sender is gone: no second fire.
    assert!(final_rx.recv().await.is_none());

    let (mut session, _rx) = ChatSession::new(ApiClient::new(server.uri()), bridge);
    let outcome = session
        .send(StreamingRequest::new("Hello world", "m1", "default"))
        .await;
    assert!(matches!(outcome, Ok(TurnOutcome::Completed)));

    // `.expect(1)` on the chat mock verifies exactly one POST on drop.
}

// ────────────────────────────────────────────────────────────────────────────
// Playback on completion
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn final_assistant_text_is_spoken_on_done() {
    let server = MockServer::start().await;
    mount_chat_backend(&server, "Hello", "data: Hi\ndata:  there\nevent: done\n").await;

    let engine = Arc::new(ScriptedEngine::new(Vec::new()));
    let bridge = VoiceBridge::new(VoiceCapability::Available(engine.clone()));

    let (mut session, _rx) = ChatSession::new(ApiClient::new(server.uri()), bridge);
    let outcome = session
        .send(StreamingRequest::new("Hello", "m1", "default"))
        .await;

    assert!(matches!(outcome, Ok(TurnOutcome::Completed)));
    assert_eq!(engine.spoken(), vec!["Hi there".to_owned()]);
    assert_eq!(engine.cancels.load(Ordering::SeqCst), 1, "cancel-then-speak");
}

#[tokio::test]
async fn nothing_is_spoken_after_timeout_abort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/timeout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"frontend_timeout_ms": 50})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/send/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_raw("data: too late\nevent: done\n", "text/plain"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"conversations": []})))
        .mount(&server)
        .await;

    let engine = Arc::new(ScriptedEngine::new(Vec::new()));
    let bridge = VoiceBridge::new(VoiceCapability::Available(engine.clone()));

    let (mut session, _rx) = ChatSession::new(ApiClient::new(server.uri()), bridge);
    let outcome = session
        .send(StreamingRequest::new("Hello", "m1", "default"))
        .await;

    assert!(matches!(outcome, Ok(TurnOutcome::Aborted(_))));
    assert!(engine.spoken().is_empty(), "playback only runs on Done");
}
