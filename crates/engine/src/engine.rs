//! In-memory transaction service
//!
//! `MockEngine` plays both the transaction manager bound in the directory
//! and the transaction factory it hands out. Clones share state.

use crate::transaction::MockTransaction;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use txlink_protocol::{
    RemoteError, Transaction, TransactionFactory, TransactionId, TransactionManager,
};

/// Injected failures shared by the engine and everything it creates
#[derive(Default)]
pub(crate) struct Faults {
    offline: AtomicBool,
    registration_delay: Mutex<Option<Duration>>,
}

impl Faults {
    pub(crate) fn check(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::ConnectionRefused(
                "transaction service offline".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) async fn registration_pause(&self) {
        let delay = *self.registration_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

struct EngineInner {
    transactions: Mutex<Vec<Arc<MockTransaction>>>,
    faults: Arc<Faults>,
    factory_requests: AtomicUsize,
}

/// Mock transaction manager and factory
#[derive(Clone)]
pub struct MockEngine {
    inner: Arc<EngineInner>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                transactions: Mutex::new(Vec::new()),
                faults: Arc::new(Faults::default()),
                factory_requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Fail every remote call with `ConnectionRefused` while set
    pub fn set_offline(&self, offline: bool) {
        self.inner.faults.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every `register_resource` call, to widen race windows in tests
    pub fn set_registration_delay(&self, delay: Option<Duration>) {
        *self.inner.faults.registration_delay.lock() = delay;
    }

    /// Number of `transaction_factory` calls received
    pub fn factory_requests(&self) -> usize {
        self.inner.factory_requests.load(Ordering::SeqCst)
    }

    /// Every transaction created so far, in creation order
    pub fn all_transactions(&self) -> Vec<Arc<MockTransaction>> {
        self.inner.transactions.lock().clone()
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<Arc<MockTransaction>> {
        self.inner
            .transactions
            .lock()
            .iter()
            .find(|txn| &txn.id() == id)
            .cloned()
    }

    /// Create a transaction directly, without going through the trait
    pub fn create_mock_transaction(&self) -> Arc<MockTransaction> {
        let txn = MockTransaction::new(self.inner.faults.clone());
        self.inner.transactions.lock().push(txn.clone());
        tracing::debug!("Created mock transaction {}", txn.id());
        txn
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionManager for MockEngine {
    async fn transaction_factory(&self) -> Result<Arc<dyn TransactionFactory>, RemoteError> {
        self.inner.factory_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.faults.check()?;
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl TransactionFactory for MockEngine {
    async fn create_transaction(&self) -> Result<Arc<dyn Transaction>, RemoteError> {
        self.inner.faults.check()?;
        let txn: Arc<dyn Transaction> = self.create_mock_transaction();
        Ok(txn)
    }

    async fn transactions(&self) -> Result<Vec<Arc<dyn Transaction>>, RemoteError> {
        self.inner.faults.check()?;
        Ok(self
            .all_transactions()
            .into_iter()
            .map(|txn| txn as Arc<dyn Transaction>)
            .collect())
    }
}
