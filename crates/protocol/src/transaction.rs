//! Transaction manager, factory, transaction and coordinator interfaces
//!
//! These are implemented by the remote transaction service. All calls may
//! block on the network; timeouts belong to the remote-call substrate.

use crate::{Participant, RemoteError, TransactionError, TransactionId};
use async_trait::async_trait;
use std::sync::Arc;

/// Entry point of the transaction service, bound in the directory
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn transaction_factory(&self) -> Result<Arc<dyn TransactionFactory>, RemoteError>;
}

/// Creates and enumerates transactions
#[async_trait]
pub trait TransactionFactory: Send + Sync {
    async fn create_transaction(&self) -> Result<Arc<dyn Transaction>, RemoteError>;

    /// Every transaction this factory knows about
    async fn transactions(&self) -> Result<Vec<Arc<dyn Transaction>>, RemoteError>;
}

/// A distributed transaction
#[async_trait]
pub trait Transaction: Send + Sync {
    fn id(&self) -> TransactionId;

    async fn has_started(&self) -> Result<bool, RemoteError>;

    async fn begin(&self) -> Result<(), TransactionError>;

    /// Run both phases over the enlisted participants
    async fn commit(&self) -> Result<(), TransactionError>;

    async fn rollback(&self) -> Result<(), TransactionError>;

    async fn coordinator(&self) -> Result<Arc<dyn Coordinator>, RemoteError>;
}

/// Drives prepare/commit/rollback across the enlisted participants
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn register_resource(&self, participant: Arc<dyn Participant>)
    -> Result<(), RemoteError>;
}
