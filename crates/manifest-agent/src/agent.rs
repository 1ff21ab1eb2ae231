use async_trait::async_trait;

use crate::error::AgentError;

/// Answers free-text questions about a dataset it was bound to at
/// construction time.
///
/// Implementations are shared across concurrent requests behind an `Arc`
/// and must not rely on per-call mutable state.
#[async_trait]
pub trait DatasetAgent: Send + Sync {
    /// Answer `question`, which is passed through exactly as the user typed it.
    async fn answer(&self, question: &str) -> Result<String, AgentError>;
}
