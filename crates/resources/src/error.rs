//! Error types for the sample resources

use crate::unit::{Title, Unit};
use thiserror::Error;
use txlink_client::ClientError;

pub type Result<T> = std::result::Result<T, ResourceError>;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{unit} must be a {expected} to enter the {resource}")]
    WrongTitle {
        resource: &'static str,
        unit: Unit,
        expected: Title,
    },

    #[error("{resource} already holds a unit named {name}")]
    DuplicateUnit { resource: &'static str, name: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}
