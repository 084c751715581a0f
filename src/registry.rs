//! Model/connection listing for the chat model selector.
//!
//! The console may be wired to several upstream LLM connections; the
//! selector wants one flat list. Catalogs are fetched concurrently per
//! connection and merged in configuration order — a connection that
//! fails to answer is logged and skipped, because partial results are
//! still a usable selector.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{ConsoleError, Result};

/// An upstream LLM connection configured in the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One selectable model resolved from an upstream connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    /// Selector id: `"connection_id:model_id"` when several connections
    /// exist, the bare model id otherwise.
    pub id: String,
    /// Display name for the selector.
    pub display_name: String,
    /// The connection this model came from.
    pub connection_id: String,
    /// The model id as the upstream connection knows it.
    pub model_id: String,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    name: String,
}

/// Read-only aggregation of upstream model catalogs.
#[derive(Debug)]
pub struct ConnectionRegistry {
    api: ApiClient,
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    /// Create a registry over the configured connections.
    pub fn new(api: ApiClient, connections: Vec<Connection>) -> Self {
        Self { api, connections }
    }

    /// The configured connections.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Resolve the flat selectable model list across all connections.
    ///
    /// Per-connection failures are logged and skipped. An empty result
    /// means no connection answered with models — the caller surfaces
    /// that as a "no models" condition; it is not an error here.
    pub async fn list_models(&self) -> Vec<ModelChoice> {
        let composite = self.connections.len() > 1;
        let fetches = self
            .connections
            .iter()
            .map(|connection| self.connection_models(connection, composite));
        let merged: Vec<ModelChoice> = futures_util::future::join_all(fetches)
            .await
            .into_iter()
            .flatten()
            .collect();

        if merged.is_empty() {
            tracing::warn!("no models available from any connection");
        }
        merged
    }

    /// Default-model policy: the caller-preferred id when it is present
    /// in the list, otherwise the first model of the first connection
    /// that returned any.
    pub fn default_model<'a>(
        models: &'a [ModelChoice],
        preferred: Option<&str>,
    ) -> Option<&'a ModelChoice> {
        if let Some(id) = preferred
            && let Some(found) = models.iter().find(|m| m.id == id)
        {
            return Some(found);
        }
        models.first()
    }

    async fn connection_models(&self, connection: &Connection, composite: bool) -> Vec<ModelChoice> {
        match self.fetch_models(connection).await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| {
                    let id = if composite {
                        format!("{}:{}", connection.id, entry.id)
                    } else {
                        entry.id.clone()
                    };
                    ModelChoice {
                        id,
                        display_name: entry.name,
                        connection_id: connection.id.clone(),
                        model_id: entry.id,
                    }
                })
                .collect(),
            Err(err) => {
                tracing::warn!(
                    connection = %connection.id,
                    "model listing failed, skipping connection: {err}"
                );
                Vec::new()
            }
        }
    }

    async fn fetch_models(&self, connection: &Connection) -> Result<Vec<ModelEntry>> {
        let response: ModelListResponse = self
            .api
            .get_json(&format!("/connections/{}/models", connection.id))
            .await?;
        if !response.success {
            return Err(ConsoleError::Request(format!(
                "connection {} reported a listing failure",
                connection.id
            )));
        }
        Ok(response.models)
    }
}
