//! HTTP client for `POST /query/`.

use std::time::Duration;

use manifest_core::QueryRequest;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

/// Shown when a JSON reply carries no `answer` field.
pub const NO_ANSWER: &str = "No answer found.";

/// A successful reply from the query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryReply {
    /// Raw image bytes (PNG).
    Image(Vec<u8>),
    Answer(String),
}

/// Client for a single query endpoint.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    url: String,
}

impl QueryClient {
    /// Build a client for `url`. `None` waits for the server indefinitely.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `question` and classify the reply by its content type.
    pub async fn query(&self, question: &str) -> Result<QueryReply, ClientError> {
        let body = QueryRequest {
            question: question.to_string(),
        };
        let resp = self.http.post(&self.url).json(&body).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            debug!(%status, url = %self.url, "query rejected");
            return Err(ClientError::Status(status));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes().await?;
        debug!(content_type = %content_type, bytes = bytes.len(), "query reply");

        if content_type.starts_with("image") {
            return Ok(QueryReply::Image(bytes.to_vec()));
        }

        let json: Value =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
        let answer = match json.get("answer") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => NO_ANSWER.to_string(),
            Some(other) => other.to_string(),
        };
        Ok(QueryReply::Answer(answer))
    }
}
