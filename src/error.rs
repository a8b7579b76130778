//! Error types for Herder
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Herder
#[derive(Debug, Error)]
pub enum HerderError {
    /// Task not found in a project's task list
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Another owner already holds the task
    #[error("Task already claimed: {task_id} (owner: {owner})")]
    AlreadyClaimed { task_id: String, owner: String },

    /// The task source's backing index is out of sync and needs a resync
    #[error("Task index out of sync: {0}")]
    IndexOutOfSync(String),

    /// Generic task source failure
    #[error("Task source error: {0}")]
    Source(String),

    /// Structural configuration problem detected at load/reload time
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A reload changed a field that is fixed for the process lifetime
    #[error("Incompatible reload: {0}")]
    RuntimeCompat(String),

    /// No configuration has been loaded yet
    #[error("Configuration not loaded")]
    ConfigNotLoaded,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HerderError {
    /// True when the error means someone else is already working on the task.
    ///
    /// Callers should back off rather than retry immediately.
    pub fn is_claim_conflict(&self) -> bool {
        matches!(self, HerderError::AlreadyClaimed { .. })
    }

    /// True when the source's backing index needs a resync before retrying.
    pub fn is_out_of_sync(&self) -> bool {
        matches!(self, HerderError::IndexOutOfSync(_))
    }
}

/// Result type alias for Herder operations
pub type Result<T> = std::result::Result<T, HerderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_not_found_error() {
        let err = HerderError::TaskNotFound("cortex-001".to_string());
        assert_eq!(err.to_string(), "Task not found: cortex-001");
    }

    #[test]
    fn test_already_claimed_error() {
        let err = HerderError::AlreadyClaimed {
            task_id: "cortex-001".to_string(),
            owner: "agent-7".to_string(),
        };
        assert_eq!(err.to_string(), "Task already claimed: cortex-001 (owner: agent-7)");
        assert!(err.is_claim_conflict());
        assert!(!err.is_out_of_sync());
    }

    #[test]
    fn test_index_out_of_sync_error() {
        let err = HerderError::IndexOutOfSync("stale index".to_string());
        assert!(err.is_out_of_sync());
        assert!(!err.is_claim_conflict());
    }

    #[test]
    fn test_config_error() {
        let err = HerderError::Config("budgets must sum to 100".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: budgets must sum to 100");
    }

    #[test]
    fn test_runtime_compat_error() {
        let err = HerderError::RuntimeCompat("state-db changed".to_string());
        assert_eq!(err.to_string(), "Incompatible reload: state-db changed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HerderError = io_err.into();
        assert!(matches!(err, HerderError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: HerderError = json_err.into();
        assert!(matches!(err, HerderError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(HerderError::ConfigNotLoaded)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
