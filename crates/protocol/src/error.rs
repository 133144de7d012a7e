//! Error types raised across the remote-call boundary

use crate::TransactionId;
use thiserror::Error;

/// Failure of the remote-call substrate itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Directory (naming service) lookup errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Malformed locator: {0}")]
    MalformedLocator(String),

    #[error("Nothing bound at {0}")]
    NotFound(String),

    #[error("Directory unreachable for {locator}: {source}")]
    Unreachable {
        locator: String,
        #[source]
        source: RemoteError,
    },
}

/// Errors reported by a transaction object
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction {0} already reached a terminal state")]
    AlreadyTerminal(TransactionId),

    #[error("Transaction {0} has not started")]
    NotStarted(TransactionId),

    /// A participant refused to prepare; surfaced unchanged by the coordinator
    #[error("Participant vote failed in transaction {transaction}: {reason}")]
    VoteFailed {
        transaction: TransactionId,
        reason: String,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors reported by a participant while being driven by the coordinator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParticipantError {
    #[error("Vote refused: {0}")]
    VoteRefused(String),

    #[error("Invalid participant state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
