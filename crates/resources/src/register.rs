//! Transactional unit register
//!
//! Units recorded during a transaction stay pending until the participant
//! commits, and are discarded on rollback. The participant phase follows
//! `ParticipantState`; an illegal transition is refused with `InvalidState`.

use crate::error::{ResourceError, Result};
use crate::unit::Unit;
use parking_lot::Mutex;
use txlink_protocol::{ParticipantError, ParticipantState, TransactionId};

struct RegisterState {
    phase: ParticipantState,
    transaction: Option<TransactionId>,
    enrolled: Vec<Unit>,
    pending: Vec<Unit>,
}

pub struct UnitRegister {
    resource: &'static str,
    capacity: Option<usize>,
    state: Mutex<RegisterState>,
}

impl UnitRegister {
    pub fn new(resource: &'static str, capacity: Option<usize>) -> Self {
        Self {
            resource,
            capacity,
            state: Mutex::new(RegisterState {
                phase: ParticipantState::Idle,
                transaction: None,
                enrolled: Vec::new(),
                pending: Vec::new(),
            }),
        }
    }

    /// Stage `unit` until the next commit
    pub fn record(&self, unit: Unit) -> Result<()> {
        let mut state = self.state.lock();
        let taken = state
            .enrolled
            .iter()
            .chain(state.pending.iter())
            .any(|u| u.name == unit.name);
        if taken {
            return Err(ResourceError::DuplicateUnit {
                resource: self.resource,
                name: unit.name,
            });
        }

        state.pending.push(unit);
        tracing::debug!("{} register updated ({} pending)", self.resource, state.pending.len());
        Ok(())
    }

    /// Committed units, in commit order
    pub fn enrolled(&self) -> Vec<Unit> {
        self.state.lock().enrolled.clone()
    }

    pub fn pending(&self) -> Vec<Unit> {
        self.state.lock().pending.clone()
    }

    pub fn phase(&self) -> ParticipantState {
        self.state.lock().phase
    }

    pub fn transaction(&self) -> Option<TransactionId> {
        self.state.lock().transaction
    }

    pub fn bind(&self, transaction: TransactionId) -> std::result::Result<(), ParticipantError> {
        let mut state = self.state.lock();
        if state.phase == ParticipantState::Active && state.transaction == Some(transaction) {
            return Ok(());
        }
        self.advance(&mut state, ParticipantState::Active)?;
        state.transaction = Some(transaction);
        tracing::info!("{} is now bound to transaction {}", self.resource, transaction);
        Ok(())
    }

    pub fn prepare(&self) -> std::result::Result<(), ParticipantError> {
        let mut state = self.state.lock();
        if let Some(capacity) = self.capacity {
            let wanted = state.enrolled.len() + state.pending.len();
            if wanted > capacity {
                return Err(ParticipantError::VoteRefused(format!(
                    "{} can hold {} units, {} requested",
                    self.resource, capacity, wanted
                )));
            }
        }

        self.advance(&mut state, ParticipantState::Prepared)?;
        tracing::info!("{} is now prepared by {}", self.resource, label(&state));
        Ok(())
    }

    pub fn commit(&self) -> std::result::Result<(), ParticipantError> {
        let mut state = self.state.lock();
        self.advance(&mut state, ParticipantState::Committed)?;

        let pending = std::mem::take(&mut state.pending);
        state.enrolled.extend(pending);
        tracing::info!("{} is now committed by {}", self.resource, label(&state));
        Ok(())
    }

    /// Discard pending units
    ///
    /// A participant rolled back before it was ever bound only drops its
    /// pending units and stays idle.
    pub fn rollback(&self) -> std::result::Result<(), ParticipantError> {
        let mut state = self.state.lock();
        if state.phase != ParticipantState::Idle {
            self.advance(&mut state, ParticipantState::RolledBack)?;
        }

        let dropped = std::mem::take(&mut state.pending).len();
        tracing::info!(
            "{} is now rolled back by {} ({} units dropped)",
            self.resource,
            label(&state),
            dropped
        );
        Ok(())
    }

    fn advance(
        &self,
        state: &mut RegisterState,
        next: ParticipantState,
    ) -> std::result::Result<(), ParticipantError> {
        if !state.phase.can_transition_to(next) {
            return Err(ParticipantError::InvalidState(format!(
                "{} can't go from {:?} to {:?}",
                self.resource, state.phase, next
            )));
        }
        state.phase = next;
        Ok(())
    }
}

fn label(state: &RegisterState) -> String {
    match state.transaction {
        Some(id) => format!("transaction {}", id),
        None => "an unbound transaction".to_string(),
    }
}
