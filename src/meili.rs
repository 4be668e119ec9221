//! Thin Meilisearch gateway.
//!
//! The engine owns persistence, ranking, and highlight marking; this module
//! only ensures the index exists, submits document batches, and runs
//! highlighted queries. Submission is a network call, so it gets bounded
//! retry with exponential backoff; a query against a missing index is the
//! distinct, reportable "run indexing first" condition rather than a crash.

use serde::Deserialize;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::models::{DocumentRecord, SearchHit};

#[derive(Debug)]
pub enum GatewayError {
    /// The target index does not exist yet; indexing has to run first.
    IndexNotFound(String),
    /// The engine answered with a non-success status.
    Engine { status: u16, message: String },
    /// The engine could not be reached at all.
    Transport(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::IndexNotFound(index) => {
                write!(f, "Index '{}' does not exist. Please run 'index' first.", index)
            }
            GatewayError::Engine { status, message } => {
                write!(f, "search engine error {}: {}", status, message)
            }
            GatewayError::Transport(e) => write!(f, "search engine unreachable: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}

pub struct SearchEngine {
    client: reqwest::Client,
    base_url: String,
    index: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl SearchEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            api_key: config.resolved_api_key(),
            max_retries: config.max_retries,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }

    /// Fetch-or-create, idempotent. The primary key is the record `id`.
    pub async fn ensure_index(&self) -> Result<(), GatewayError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/indexes/{}", self.index))
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }
        if resp.status().as_u16() != 404 {
            return Err(engine_error(resp).await);
        }

        let body = serde_json::json!({ "uid": self.index, "primaryKey": "id" });
        let resp = self
            .request(reqwest::Method::POST, "/indexes")
            .json(&body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(engine_error(resp).await)
        }
    }

    /// Batch upsert. The engine's own atomicity applies; this layer only
    /// retries transient failures (5xx, 429, network) with backoff.
    pub async fn add_documents(&self, records: &[DocumentRecord]) -> Result<(), GatewayError> {
        let path = format!("/indexes/{}/documents", self.index);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .request(reqwest::Method::POST, &path)
                .json(records)
                .send()
                .await;

            match resp {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(engine_error(resp).await);
                        continue;
                    }
                    return Err(engine_error(resp).await);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or(GatewayError::Transport(
            "document submission failed after retries".to_string(),
        )))
    }

    /// Highlighted query. Matched spans in `content` come back wrapped in the
    /// given pre/post tag pair under each hit's `_formatted` variant.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        pre_tag: &str,
        post_tag: &str,
    ) -> Result<Vec<SearchHit>, GatewayError> {
        let body = serde_json::json!({
            "q": query,
            "limit": limit,
            "attributesToHighlight": ["content"],
            "highlightPreTag": pre_tag,
            "highlightPostTag": post_tag,
        });

        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/indexes/{}/search", self.index),
            )
            .json(&body)
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Err(GatewayError::IndexNotFound(self.index.clone()));
        }
        if !resp.status().is_success() {
            return Err(engine_error(resp).await);
        }

        let parsed: SearchResponse = resp.json().await?;
        Ok(parsed
            .hits
            .into_iter()
            .map(|h| SearchHit {
                id: h.id,
                path: h.path,
                filename: h.filename,
                content: h.content,
                highlighted: h.formatted.and_then(|f| f.content),
            })
            .collect())
    }
}

async fn engine_error(resp: reqwest::Response) -> GatewayError {
    let status = resp.status().as_u16();
    let message = match resp.json::<EngineMessage>().await {
        Ok(body) => body.message,
        Err(_) => "(no error body)".to_string(),
    };
    GatewayError::Engine { status, message }
}

#[derive(Deserialize)]
struct EngineMessage {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    id: String,
    path: String,
    filename: String,
    content: String,
    #[serde(rename = "_formatted")]
    formatted: Option<FormattedFields>,
}

#[derive(Deserialize)]
struct FormattedFields {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_not_found_names_the_index_and_the_remedy() {
        let msg = GatewayError::IndexNotFound("documents".to_string()).to_string();
        assert!(msg.contains("'documents'"));
        assert!(msg.contains("run 'index' first"));
    }

    #[test]
    fn hit_parsing_reads_formatted_content() {
        let json = r#"{
            "hits": [{
                "id": "ab12",
                "path": "/docs/a.docx",
                "filename": "a.docx",
                "content": "[段落1] Hello",
                "_formatted": { "content": "[段落1] <<<Hello>>>" }
            }]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.hits.len(), 1);
        assert_eq!(
            parsed.hits[0].formatted.as_ref().unwrap().content.as_deref(),
            Some("[段落1] <<<Hello>>>")
        );
    }

    #[test]
    fn hit_parsing_tolerates_missing_formatted() {
        let json = r#"{"hits": [{"id": "x", "path": "p", "filename": "f", "content": "c"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.hits[0].formatted.is_none());
    }
}
