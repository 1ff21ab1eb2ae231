//! Application state shared across request handlers.

use std::sync::Arc;

use manifest_agent::DatasetAgent;
use manifest_core::Dataset;

/// Shared, read-only state.
///
/// Neither the dataset nor the agent is mutated after startup, so handlers
/// run concurrently without locks.
#[derive(Clone)]
pub struct AppState {
    /// Dataset loaded at startup.
    pub dataset: Arc<Dataset>,
    /// Agent bound to the same dataset.
    pub agent: Arc<dyn DatasetAgent>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>, agent: Arc<dyn DatasetAgent>) -> Self {
        Self { dataset, agent }
    }
}
