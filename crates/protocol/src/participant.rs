//! Participant contract
//!
//! Every transactional resource exposes these four operations. They are
//! invoked by the coordinator, never by the client library.

use crate::{ParticipantError, Transaction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Two-phase-commit participant
#[async_trait]
pub trait Participant: Send + Sync {
    /// Bind the participant to the transaction currently driving it
    async fn active_transaction(
        &self,
        transaction: Arc<dyn Transaction>,
    ) -> Result<(), ParticipantError>;

    /// Vote phase (2PC phase 1)
    ///
    /// A participant that returns `Ok` must be able to commit or roll back
    /// later, even after a restart. Refusal is signalled by an error.
    async fn prepare(&self) -> Result<(), ParticipantError>;

    /// Make the prepared work durable (2PC phase 2)
    async fn commit(&self) -> Result<(), ParticipantError>;

    /// Discard the work of the current transaction
    async fn rollback(&self) -> Result<(), ParticipantError>;
}

/// Per-participant lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantState {
    /// Not bound to any transaction
    Idle,
    /// Bound through `active_transaction`
    Active,
    /// Voted yes in `prepare`
    Prepared,
    /// Terminal
    Committed,
    /// Terminal
    RolledBack,
}

impl ParticipantState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    /// Whether `next` is a legal successor of `self`
    ///
    /// A terminal participant may be bound to a new transaction, which
    /// restarts the cycle.
    pub fn can_transition_to(&self, next: ParticipantState) -> bool {
        use ParticipantState::*;
        match (self, next) {
            (Idle, Active) => true,
            (Active, Prepared) | (Active, RolledBack) => true,
            (Prepared, Committed) | (Prepared, RolledBack) => true,
            (Committed, Active) | (RolledBack, Active) => true,
            _ => false,
        }
    }
}
