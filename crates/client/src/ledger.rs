//! Enlistment ledger
//!
//! Remembers which (resource, transaction) pairs have been handed to the
//! coordinator. Every pair owns a once-cell: the first caller runs
//! `register_resource` while concurrent callers for the same pair wait on it.
//! A failed registration leaves the cell empty, so the next caller retries.

use crate::error::{ClientError, Result};
use crate::registry::RegisteredResource;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use txlink_protocol::{ResourceIdentity, Transaction, TransactionId};

type EnlistmentKey = (ResourceIdentity, TransactionId);

/// Outcome of an enlistment request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enlistment {
    /// This call registered the resource with the coordinator
    Registered,
    /// The pair was already enlisted; nothing was sent
    AlreadyEnlisted,
}

/// Per-(resource, transaction) enlistment records
#[derive(Default)]
pub struct EnlistmentLedger {
    records: DashMap<EnlistmentKey, Arc<OnceCell<DateTime<Utc>>>>,
}

impl EnlistmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resource` with the coordinator of `transaction`, once
    pub async fn enlist(
        &self,
        resource: &RegisteredResource,
        transaction: &Arc<dyn Transaction>,
    ) -> Result<Enlistment> {
        let txn_id = transaction.id();
        let cell = self
            .records
            .entry((resource.identity.clone(), txn_id))
            .or_default()
            .clone();

        let performed = AtomicBool::new(false);
        cell.get_or_try_init(|| async {
            let coordinator = transaction.coordinator().await.map_err(|e| {
                ClientError::transport(
                    format!("resolving coordinator of transaction {}", txn_id),
                    e,
                )
            })?;

            coordinator
                .register_resource(resource.participant.clone())
                .await
                .map_err(|e| {
                    ClientError::transport(
                        format!(
                            "registering {} with transaction {}",
                            resource.identity, txn_id
                        ),
                        e,
                    )
                })?;

            performed.store(true, Ordering::SeqCst);
            Ok::<_, ClientError>(Utc::now())
        })
        .await?;

        if performed.load(Ordering::SeqCst) {
            tracing::debug!("Enlisted {} in transaction {}", resource.identity, txn_id);
            Ok(Enlistment::Registered)
        } else {
            Ok(Enlistment::AlreadyEnlisted)
        }
    }

    /// Whether the pair has been enlisted successfully
    pub fn is_enlisted(&self, identity: &ResourceIdentity, transaction: &TransactionId) -> bool {
        self.records
            .get(&(identity.clone(), *transaction))
            .is_some_and(|cell| cell.initialized())
    }

    /// When the pair was enlisted
    pub fn enlisted_at(
        &self,
        identity: &ResourceIdentity,
        transaction: &TransactionId,
    ) -> Option<DateTime<Utc>> {
        self.records
            .get(&(identity.clone(), *transaction))
            .and_then(|cell| cell.get().copied())
    }

    /// Forget the records of a finished transaction
    ///
    /// A cell another caller is still initializing is kept, so an in-flight
    /// enlistment can't be repeated by a later call. Returns the number of
    /// records dropped.
    pub fn release(&self, transaction: &TransactionId) -> usize {
        let before = self.records.len();
        self.records.retain(|(_, txn_id), cell| {
            txn_id != transaction || !(cell.initialized() || Arc::strong_count(cell) == 1)
        });
        let released = before.saturating_sub(self.records.len());
        if released > 0 {
            tracing::debug!("Released {} enlistments of {}", released, transaction);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
