//! Delegated natural-language agent bound to the passenger dataset.
//!
//! The query service only sees the [`DatasetAgent`] trait; [`OpenAiAgent`]
//! is the production implementation backed by an OpenAI-compatible
//! chat-completions endpoint.

pub mod agent;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod tools;

pub use agent::DatasetAgent;
pub use error::AgentError;
pub use openai::OpenAiAgent;
pub use tools::{call_tool, run_query, tool_definition, DatasetQuery, ToolError};
