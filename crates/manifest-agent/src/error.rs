//! Error types for the delegated agent.

use reqwest::StatusCode;
use thiserror::Error;

/// Longest response body excerpt kept in an [`AgentError::HttpStatus`].
const SNIPPET_MAX_CHARS: usize = 300;

/// Errors from constructing or calling the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent configuration: {0}")]
    InvalidConfig(String),

    /// Connection failures and timeouts.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    #[error("failed to decode agent response: {0}")]
    Decode(String),

    #[error("agent returned no choices")]
    EmptyChoices,

    /// The model kept calling tools past the configured round limit.
    #[error("agent made {0} rounds of tool calls without answering")]
    ToolRounds(usize),
}

/// Collapse whitespace and truncate a response body for logs and errors.
pub fn make_snippet(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_MAX_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(SNIPPET_MAX_CHARS).collect();
    out.push_str("...");
    out
}
