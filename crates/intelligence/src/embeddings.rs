//! Text embedding client used by semantic ranking.

use crate::llm::api_base_url;
use anyhow::{Context, Result};
use async_trait::async_trait;
use repolens_remote::{RemoteClient, RemoteError};
use repolens_state::ApiSettings;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const EMBEDDINGS_SERVICE: &str = "Embeddings";

/// Turns text into a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RemoteError>;
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/embeddings` client.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: RemoteClient,
    url: Url,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: RemoteClient, base_url: &str, api_key: String, model: String) -> Result<Self> {
        let url = api_base_url(base_url)?
            .join("embeddings")
            .context("building embeddings url")?;
        Ok(Self {
            client,
            url,
            api_key: api_key.trim().to_string(),
            model,
        })
    }

    /// `None` when no embeddings key is configured; semantic ranking is then skipped.
    pub fn from_settings(client: RemoteClient, settings: &ApiSettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };
        Self::new(client, &settings.base_url, api_key, settings.model.clone()).map(Some)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RemoteError> {
        let body = EmbeddingBody {
            model: &self.model,
            input: text,
        };
        let response: EmbeddingResponse = self
            .client
            .send_json(EMBEDDINGS_SERVICE, "embedding", true, |http| {
                http.post(self.url.clone())
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RemoteError::Decode {
                service: EMBEDDINGS_SERVICE.to_string(),
                message: "response carried no embedding".to_string(),
            })
    }
}
