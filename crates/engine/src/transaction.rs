//! Mock transaction and coordinator
//!
//! The coordinator records registrations in order. Commit runs a naive 2PC
//! over the recorded participants: bind, prepare all, then commit all, or roll
//! everyone back on the first refused vote.

use crate::Faults;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use txlink_protocol::{
    Coordinator, Participant, ParticipantError, RemoteError, Transaction, TransactionError,
    TransactionId,
};

/// Lifecycle of a mock transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Created but not begun
    Created,
    /// Begun and accepting participants
    Active,
    Committed,
    RolledBack,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

/// In-memory transaction
pub struct MockTransaction {
    id: TransactionId,
    status: Mutex<TransactionStatus>,
    coordinator: Arc<MockCoordinator>,
    faults: Arc<Faults>,
    rollback_calls: AtomicUsize,
    fail_rollback: Mutex<Option<RemoteError>>,
    self_ref: Weak<MockTransaction>,
}

impl MockTransaction {
    pub(crate) fn new(faults: Arc<Faults>) -> Arc<Self> {
        let id = TransactionId::new();
        Arc::new_cyclic(|self_ref| Self {
            id,
            status: Mutex::new(TransactionStatus::Created),
            coordinator: Arc::new(MockCoordinator::new(id, faults.clone())),
            faults,
            rollback_calls: AtomicUsize::new(0),
            fail_rollback: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    pub fn status(&self) -> TransactionStatus {
        *self.status.lock()
    }

    /// The coordinator of this transaction, with its recorded registrations
    pub fn mock_coordinator(&self) -> &Arc<MockCoordinator> {
        &self.coordinator
    }

    /// Number of `rollback` calls received, including failed ones
    pub fn rollback_calls(&self) -> usize {
        self.rollback_calls.load(Ordering::SeqCst)
    }

    /// Make every following `rollback` call fail with a transport error
    pub fn fail_rollback(&self, error: RemoteError) {
        *self.fail_rollback.lock() = Some(error);
    }

    /// Move the status directly, bypassing participants
    pub fn force_status(&self, status: TransactionStatus) {
        *self.status.lock() = status;
    }

    fn as_dyn(&self) -> Option<Arc<dyn Transaction>> {
        self.self_ref
            .upgrade()
            .map(|txn| txn as Arc<dyn Transaction>)
    }

    /// Transition out of `Active`, failing if another caller already finished
    fn finish(&self, to: TransactionStatus) -> Result<(), TransactionError> {
        let mut status = self.status.lock();
        match *status {
            TransactionStatus::Created => Err(TransactionError::NotStarted(self.id)),
            s if s.is_terminal() => Err(TransactionError::AlreadyTerminal(self.id)),
            _ => {
                *status = to;
                Ok(())
            }
        }
    }

    fn check_active(&self) -> Result<(), TransactionError> {
        match self.status() {
            TransactionStatus::Created => Err(TransactionError::NotStarted(self.id)),
            s if s.is_terminal() => Err(TransactionError::AlreadyTerminal(self.id)),
            _ => Ok(()),
        }
    }

    async fn rollback_participants(&self, participants: &[Arc<dyn Participant>]) {
        for participant in participants {
            if let Err(e) = participant.rollback().await {
                tracing::warn!("Participant rollback failed in {}: {}", self.id, e);
            }
        }
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    async fn has_started(&self) -> Result<bool, RemoteError> {
        self.faults.check()?;
        Ok(self.status() != TransactionStatus::Created)
    }

    async fn begin(&self) -> Result<(), TransactionError> {
        self.faults.check()?;
        let mut status = self.status.lock();
        match *status {
            TransactionStatus::Created => {
                *status = TransactionStatus::Active;
                Ok(())
            }
            TransactionStatus::Active => Ok(()),
            _ => Err(TransactionError::AlreadyTerminal(self.id)),
        }
    }

    async fn commit(&self) -> Result<(), TransactionError> {
        self.faults.check()?;
        self.check_active()?;

        let participants = self.coordinator.participants();
        let this = self.as_dyn().ok_or_else(|| {
            RemoteError::Transport(format!("transaction {} was dropped", self.id))
        })?;

        for participant in &participants {
            participant
                .active_transaction(this.clone())
                .await
                .map_err(|e| participant_to_txn(self.id, e))?;
        }

        for participant in &participants {
            if let Err(e) = participant.prepare().await {
                tracing::debug!("Participant refused to prepare {}: {}", self.id, e);
                self.rollback_participants(&participants).await;
                self.finish(TransactionStatus::RolledBack)?;
                return Err(TransactionError::VoteFailed {
                    transaction: self.id,
                    reason: e.to_string(),
                });
            }
        }

        self.finish(TransactionStatus::Committed)?;
        for participant in &participants {
            participant
                .commit()
                .await
                .map_err(|e| participant_to_txn(self.id, e))?;
        }

        Ok(())
    }

    async fn rollback(&self) -> Result<(), TransactionError> {
        self.rollback_calls.fetch_add(1, Ordering::SeqCst);
        self.faults.check()?;
        let injected = self.fail_rollback.lock().clone();
        if let Some(error) = injected {
            return Err(error.into());
        }

        self.finish(TransactionStatus::RolledBack)?;
        let participants = self.coordinator.participants();
        self.rollback_participants(&participants).await;
        Ok(())
    }

    async fn coordinator(&self) -> Result<Arc<dyn Coordinator>, RemoteError> {
        self.faults.check()?;
        let coordinator: Arc<dyn Coordinator> = self.coordinator.clone();
        Ok(coordinator)
    }
}

fn participant_to_txn(id: TransactionId, error: ParticipantError) -> TransactionError {
    match error {
        ParticipantError::Remote(e) => TransactionError::Remote(e),
        other => TransactionError::Remote(RemoteError::Transport(format!(
            "participant failure in {}: {}",
            id, other
        ))),
    }
}

/// Coordinator that records every registration
pub struct MockCoordinator {
    transaction_id: TransactionId,
    participants: Mutex<Vec<Arc<dyn Participant>>>,
    faults: Arc<Faults>,
    failing_registrations: AtomicUsize,
}

impl MockCoordinator {
    fn new(transaction_id: TransactionId, faults: Arc<Faults>) -> Self {
        Self {
            transaction_id,
            participants: Mutex::new(Vec::new()),
            faults,
            failing_registrations: AtomicUsize::new(0),
        }
    }

    /// Registered participants, in registration order
    pub fn participants(&self) -> Vec<Arc<dyn Participant>> {
        self.participants.lock().clone()
    }

    pub fn registration_count(&self) -> usize {
        self.participants.lock().len()
    }

    /// Whether `handle` is (pointer-)identical to a registered participant
    pub fn is_registered<T: ?Sized>(&self, handle: &Arc<T>) -> bool {
        self.position_of(handle).is_some()
    }

    /// Registration index of `handle`
    pub fn position_of<T: ?Sized>(&self, handle: &Arc<T>) -> Option<usize> {
        let target = Arc::as_ptr(handle) as *const ();
        self.participants
            .lock()
            .iter()
            .position(|p| Arc::as_ptr(p) as *const () == target)
    }

    /// Make the next `count` registrations fail with a transport error
    pub fn fail_next_registrations(&self, count: usize) {
        self.failing_registrations.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_registrations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Coordinator for MockCoordinator {
    async fn register_resource(
        &self,
        participant: Arc<dyn Participant>,
    ) -> Result<(), RemoteError> {
        self.faults.check()?;
        self.faults.registration_pause().await;

        if self.take_failure() {
            return Err(RemoteError::Transport(format!(
                "injected registration failure in {}",
                self.transaction_id
            )));
        }

        self.participants.lock().push(participant);
        Ok(())
    }
}
