// Error types for the route engine
// The web layer maps these to status codes on its own; the engine only exposes kinds.

use std::sync::Arc;

use thiserror::Error;

// Clone so callers coalesced into one rebuild all receive its outcome
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Data integrity error: duplicate flight ids {duplicate_ids:?}")]
    DataIntegrity { duplicate_ids: Vec<String> },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Inventory read timed out after {0}ms")]
    InventoryTimeout(u64),
}

#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("JSON parse error: {0}")]
    Parse(#[source] Arc<serde_json::Error>),

    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for InventoryError {
    fn from(err: std::io::Error) -> Self {
        InventoryError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Parse(Arc::new(err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Closed set of error kinds handed to outer layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataIntegrity,
    ConstraintViolation,
    Inventory,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            EngineError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            EngineError::Inventory(_) | EngineError::InventoryTimeout(_) => ErrorKind::Inventory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = EngineError::DataIntegrity {
            duplicate_ids: vec!["F1".to_string()],
        };
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(err.to_string().contains("F1"));

        let err = EngineError::ConstraintViolation("max_hops must be at least 1".to_string());
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        let err: EngineError = InventoryError::Unavailable("down".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Inventory);
        assert_eq!(EngineError::InventoryTimeout(50).kind(), ErrorKind::Inventory);
    }

    #[test]
    fn test_inventory_errors_clone_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "inventory.json");
        let err: EngineError = InventoryError::from(io).into();
        let shared = err.clone();

        assert_eq!(err.to_string(), shared.to_string());
        assert!(matches!(shared, EngineError::Inventory(InventoryError::Io(_))));
        let source = std::error::Error::source(&shared).and_then(std::error::Error::source);
        assert!(source.is_some_and(|e| e.to_string() == "inventory.json"));
    }
}
