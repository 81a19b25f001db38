use thiserror::Error;

use super::types::EntityId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Entity type '{0}' is not registered")]
    UnknownEntityType(String),

    #[error("Entity '{entity_type}' with id {id} not found")]
    EntityNotFound { entity_type: String, id: EntityId },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
