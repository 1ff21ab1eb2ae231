use thiserror::Error;

use crate::dataset::DatasetError;

/// Top-level error type for the manifest system.
///
/// Subsystem crates define their own error types; the ones that surface at
/// startup are folded into this enum so the binary can use `?` throughout.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Missing secret: environment variable {0} is not set")]
    MissingSecret(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ManifestError {
    fn from(err: toml::de::Error) -> Self {
        ManifestError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ManifestError {
    fn from(err: toml::ser::Error) -> Self {
        ManifestError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        ManifestError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ManifestError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_missing_secret_names_variable() {
        let err = ManifestError::MissingSecret("OPENAI_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "Missing secret: environment variable OPENAI_API_KEY is not set"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ManifestError = io_err.into();
        assert!(matches!(err, ManifestError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_dataset_error_conversion() {
        let err: ManifestError = DatasetError::MissingColumn("Age".to_string()).into();
        assert!(matches!(err, ManifestError::Dataset(_)));
        assert!(err.to_string().contains("Age"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: ManifestError = err.unwrap_err().into();
        assert!(matches!(err, ManifestError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: ManifestError = err.unwrap_err().into();
        assert!(matches!(err, ManifestError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
