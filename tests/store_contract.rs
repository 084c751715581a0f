//! Backend Contract Tests: conversations, model listing, config
//!
//! Verifies the REST shapes consumed from the admin backend and the
//! failure semantics around them: caches are only replaced on success,
//! per-connection listing failures degrade to partial results, and the
//! timeout config falls back to its constant.

use ceilidh::{
    ApiClient, Connection, ConnectionRegistry, ConfigSync, ConversationStore,
    DEFAULT_REQUEST_TIMEOUT_MS, Role,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn conversation_json(id: &str, updated_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Pipeline triage",
        "model_id": "m1",
        "routing_profile": "default",
        "created_at": "2026-03-01T09:00:00Z",
        "updated_at": updated_at,
        "message_count": 4
    })
}

// ────────────────────────────────────────────────────────────────────────────
// ConversationStore
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_replaces_cache_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                conversation_json("c1", "2026-03-01T10:00:00Z"),
                conversation_json("c2", "2026-03-01T11:00:00Z"),
            ]
        })))
        .mount(&server)
        .await;

    let mut store = ConversationStore::new(ApiClient::new(server.uri()));
    let result = store.refresh().await;
    assert!(result.is_ok());
    assert_eq!(store.conversations().len(), 2);
    assert_eq!(store.most_recent().map(|c| c.id.as_str()), Some("c2"));
}

#[tokio::test]
async fn refresh_failure_leaves_previous_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [conversation_json("c1", "2026-03-01T10:00:00Z")]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&server)
        .await;

    let mut store = ConversationStore::new(ApiClient::new(server.uri()));
    let first = store.refresh().await;
    assert!(first.is_ok());

    let second = store.refresh().await;
    assert!(second.is_err());
    assert_eq!(store.conversations().len(), 1, "failed refresh must not clear");
}

#[tokio::test]
async fn create_posts_fields_and_caches_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .and(body_partial_json(json!({
            "title": "Certificates",
            "model_id": "m1",
            "routing_profile": "fast"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "conversation": conversation_json("c9", "2026-03-01T12:00:00Z")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = ConversationStore::new(ApiClient::new(server.uri()));
    let created = store.create("Certificates", "m1", "fast").await;
    match created {
        Ok(conversation) => assert_eq!(conversation.id, "c9"),
        Err(_) => unreachable!("create succeeded"),
    }
    assert_eq!(store.conversations().len(), 1);
}

#[tokio::test]
async fn create_rejected_by_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "conversation": conversation_json("c0", "2026-03-01T12:00:00Z")
        })))
        .mount(&server)
        .await;

    let mut store = ConversationStore::new(ApiClient::new(server.uri()));
    let created = store.create("t", "m1", "default").await;
    assert!(created.is_err());
    assert!(store.conversations().is_empty());
}

#[tokio::test]
async fn load_messages_parses_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation": conversation_json("c1", "2026-03-01T10:00:00Z"),
            "messages": [
                {
                    "id": "m1",
                    "role": "user",
                    "content": "Which agents are degraded?",
                    "created_at": "2026-03-01T09:59:00Z"
                },
                {
                    "id": "m2",
                    "role": "assistant",
                    "content": "Two agents report failures.",
                    "metadata": {
                        "tools_used": [
                            {"name": "agent_status", "input": {}, "output": {"degraded": 2}, "duration_ms": 118}
                        ],
                        "execution_steps": [
                            {"step": "route", "timestamp": "2026-03-01T09:59:01Z", "status": "completed"}
                        ],
                        "model": "sonnet-medium",
                        "tokens": 412
                    },
                    "created_at": "2026-03-01T09:59:03Z"
                }
            ]
        })))
        .mount(&server)
        .await;

    let store = ConversationStore::new(ApiClient::new(server.uri()));
    let loaded = store.load_messages("c1").await;
    match loaded {
        Ok((conversation, messages)) => {
            assert_eq!(conversation.id, "c1");
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].role, Role::Assistant);
            let metadata = messages[1].metadata.clone().unwrap_or_default();
            assert_eq!(metadata.tools_used.len(), 1);
            assert_eq!(metadata.tools_used[0].name, "agent_status");
            assert_eq!(metadata.tokens, Some(412));
        }
        Err(_) => unreachable!("detail parsed"),
    }
}

#[tokio::test]
async fn delete_removes_from_cache_on_success_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                conversation_json("c1", "2026-03-01T10:00:00Z"),
                conversation_json("c2", "2026-03-01T11:00:00Z"),
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/conversations/c1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/conversations/c2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "locked"})))
        .mount(&server)
        .await;

    let mut store = ConversationStore::new(ApiClient::new(server.uri()));
    let refreshed = store.refresh().await;
    assert!(refreshed.is_ok());

    let deleted = store.delete("c1").await;
    assert!(deleted.is_ok());
    assert_eq!(store.conversations().len(), 1);

    let failed = store.delete("c2").await;
    assert!(failed.is_err());
    assert_eq!(store.conversations().len(), 1, "failed delete keeps the entry");
}

// ────────────────────────────────────────────────────────────────────────────
// ConnectionRegistry (Scenario D)
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_connection_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/conn-a/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "models": [{"id": "a", "name": "Model A"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connections/conn-b/models"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"message": "upstream down"})))
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        ApiClient::new(server.uri()),
        vec![
            Connection {
                id: "conn-a".into(),
                name: "Primary".into(),
            },
            Connection {
                id: "conn-b".into(),
                name: "Secondary".into(),
            },
        ],
    );

    let models = registry.list_models().await;
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "conn-a:a", "composite id with several connections");
    assert_eq!(models[0].connection_id, "conn-a");
    assert_eq!(models[0].model_id, "a");
}

#[tokio::test]
async fn single_connection_uses_bare_model_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/conn-a/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "models": [
                {"id": "sonnet-medium", "name": "Sonnet Medium"},
                {"id": "haiku-light", "name": "Haiku Light"}
            ]
        })))
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        ApiClient::new(server.uri()),
        vec![Connection {
            id: "conn-a".into(),
            name: "Primary".into(),
        }],
    );

    let models = registry.list_models().await;
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "sonnet-medium");

    let default = ConnectionRegistry::default_model(&models, None);
    assert_eq!(default.map(|m| m.id.as_str()), Some("sonnet-medium"));
}

#[tokio::test]
async fn failure_envelope_counts_as_a_failed_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/conn-a/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "models": []
        })))
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        ApiClient::new(server.uri()),
        vec![Connection {
            id: "conn-a".into(),
            name: "Primary".into(),
        }],
    );

    let models = registry.list_models().await;
    assert!(models.is_empty(), "empty aggregate, surfaced by the caller");
}

// ────────────────────────────────────────────────────────────────────────────
// ConfigSync
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn timeout_config_is_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/timeout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "frontend_timeout_ms": 45_000
        })))
        .mount(&server)
        .await;

    let config = ConfigSync::new(ApiClient::new(server.uri()));
    assert_eq!(config.request_timeout_ms().await, 45_000);
}

#[tokio::test]
async fn timeout_config_falls_back_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/timeout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let config = ConfigSync::new(ApiClient::new(server.uri()));
    assert_eq!(config.request_timeout_ms().await, DEFAULT_REQUEST_TIMEOUT_MS);
}

#[tokio::test]
async fn timeout_config_falls_back_on_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/timeout"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "text/plain"))
        .mount(&server)
        .await;

    let config = ConfigSync::new(ApiClient::new(server.uri()));
    assert_eq!(config.request_timeout_ms().await, DEFAULT_REQUEST_TIMEOUT_MS);
}

#[tokio::test]
async fn timeout_config_falls_back_when_unreachable() {
    let config = ConfigSync::new(ApiClient::new("http://127.0.0.1:9"));
    assert_eq!(config.request_timeout_ms().await, DEFAULT_REQUEST_TIMEOUT_MS);
}
