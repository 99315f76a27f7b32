use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

const API_VERSION: u32 = 6;

#[derive(Clone)]
pub struct AnkiConnectClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnkiConnectClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// AnkiConnect API version; fails when Anki is not running
    pub async fn version(&self) -> Result<u32> {
        self.invoke("version", json!({})).await?.into_result()
    }

    pub async fn deck_names(&self) -> Result<Vec<String>> {
        self.invoke("deckNames", json!({})).await?.into_result()
    }

    /// Note type names
    pub async fn model_names(&self) -> Result<Vec<String>> {
        self.invoke("modelNames", json!({})).await?.into_result()
    }

    /// Field names of one note type, in card order
    pub async fn model_field_names(&self, model: &str) -> Result<Vec<String>> {
        self.invoke("modelFieldNames", json!({ "modelName": model }))
            .await?
            .into_result()
    }

    /// Add a note and return its id
    pub async fn add_note(
        &self,
        deck: &str,
        model: &str,
        fields: &BTreeMap<String, String>,
        tags: &[String],
    ) -> Result<u64> {
        let params = json!({
            "note": {
                "deckName": deck,
                "modelName": model,
                "fields": fields,
                "tags": tags,
            }
        });

        self.invoke("addNote", params)
            .await?
            .into_result()
            .with_context(|| format!("Failed to add note to deck '{deck}'"))
    }

    async fn invoke<T>(&self, action: &str, params: serde_json::Value) -> Result<AnkiResponse<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = AnkiRequest {
            action,
            version: API_VERSION,
            params,
        };
        tracing::debug!(action, url = %self.base_url, "AnkiConnect request");

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to AnkiConnect")?;

        response
            .json::<AnkiResponse<T>>()
            .await
            .context("Failed to parse AnkiConnect response")
    }
}

#[derive(Serialize)]
struct AnkiRequest<'a> {
    action: &'a str,
    version: u32,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct AnkiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

impl<T> AnkiResponse<T> {
    fn into_result(self) -> Result<T> {
        if let Some(error) = self.error {
            anyhow::bail!("AnkiConnect error: {error}");
        }

        self.result.context("AnkiConnect returned null result")
    }
}
