pub mod config;
pub mod dataset;
pub mod error;
pub mod intent;
pub mod types;

pub use config::ManifestConfig;
pub use dataset::{Dataset, DatasetError, DatasetSummary};
pub use error::{ManifestError, Result};
pub use intent::{Intent, VISUALIZATION_KEYWORDS};
pub use types::*;
