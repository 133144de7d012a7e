//! Enlisting proxies
//!
//! An `EnlistingProxy<H>` wraps the backing handle of a registered resource.
//! Interface crates implement their resource trait for
//! `EnlistingProxy<dyn TheirTrait>` by routing each method through
//! [`EnlistingProxy::invoke`], which enlists the backing resource with the
//! transaction in scope before delegating:
//!
//! ```ignore
//! #[async_trait]
//! impl BattleField for EnlistingProxy<dyn BattleField> {
//!     async fn deploy(&self, unit: Unit) -> Result<Unit, ResourceError> {
//!         self.invoke(|field| field.deploy(unit)).await
//!     }
//! }
//! ```
//!
//! Which transaction is "in scope" is decided by the proxy's
//! [`TransactionResolver`]. Proxies handed out by the client use
//! [`ScopedTransaction`], driven by `TransactionClient::scope`.

use crate::config::EnlistmentPolicy;
use crate::error::ClientError;
use crate::ledger::{Enlistment, EnlistmentLedger};
use crate::registry::RegisteredResource;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use txlink_protocol::{Enlistable, Participant, ParticipantError, ResourceIdentity, Transaction};

tokio::task_local! {
    static CURRENT_TRANSACTION: Arc<dyn Transaction>;
}

/// Run `future` with `transaction` as the ambient transaction
pub async fn scope<F: Future>(transaction: Arc<dyn Transaction>, future: F) -> F::Output {
    CURRENT_TRANSACTION.scope(transaction, future).await
}

/// The ambient transaction of the current task, if any
pub fn current_transaction() -> Option<Arc<dyn Transaction>> {
    CURRENT_TRANSACTION.try_with(|txn| txn.clone()).ok()
}

/// Decides which transaction governs a proxied call
pub trait TransactionResolver: Send + Sync {
    fn current(&self) -> Option<Arc<dyn Transaction>>;
}

/// Resolves the transaction entered with [`scope`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopedTransaction;

impl TransactionResolver for ScopedTransaction {
    fn current(&self) -> Option<Arc<dyn Transaction>> {
        current_transaction()
    }
}

/// Always resolves the same transaction
#[derive(Clone)]
pub struct FixedTransaction(pub Arc<dyn Transaction>);

impl TransactionResolver for FixedTransaction {
    fn current(&self) -> Option<Arc<dyn Transaction>> {
        Some(self.0.clone())
    }
}

/// Never resolves a transaction; calls are forwarded without enlistment
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransaction;

impl TransactionResolver for NoTransaction {
    fn current(&self) -> Option<Arc<dyn Transaction>> {
        None
    }
}

/// Transparent wrapper that enlists its backing resource on use
pub struct EnlistingProxy<H: ?Sized> {
    backing: Arc<H>,
    resource: Arc<RegisteredResource>,
    ledger: Arc<EnlistmentLedger>,
    resolver: Arc<dyn TransactionResolver>,
    policy: EnlistmentPolicy,
}

impl<H: ?Sized> Clone for EnlistingProxy<H> {
    fn clone(&self) -> Self {
        Self {
            backing: self.backing.clone(),
            resource: self.resource.clone(),
            ledger: self.ledger.clone(),
            resolver: self.resolver.clone(),
            policy: self.policy,
        }
    }
}

impl<H: ?Sized + Send + Sync> EnlistingProxy<H> {
    pub fn new(
        backing: Arc<H>,
        resource: Arc<RegisteredResource>,
        ledger: Arc<EnlistmentLedger>,
        resolver: Arc<dyn TransactionResolver>,
        policy: EnlistmentPolicy,
    ) -> Self {
        Self {
            backing,
            resource,
            ledger,
            resolver,
            policy,
        }
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.resource.identity
    }

    pub fn policy(&self) -> EnlistmentPolicy {
        self.policy
    }

    /// The registry entry this proxy was created from
    pub fn registration(&self) -> &Arc<RegisteredResource> {
        &self.resource
    }

    /// The backing handle; calls made through it bypass enlistment
    pub fn backing(&self) -> &Arc<H> {
        &self.backing
    }

    /// A copy of this proxy using another resolver
    pub fn with_resolver(&self, resolver: Arc<dyn TransactionResolver>) -> Self {
        Self {
            resolver,
            ..self.clone()
        }
    }

    /// A copy of this proxy bound to `transaction` regardless of scope
    pub fn bind(&self, transaction: Arc<dyn Transaction>) -> Self {
        self.with_resolver(Arc::new(FixedTransaction(transaction)))
    }

    /// Enlist with the transaction in scope, as a forwarded call would
    ///
    /// Returns `None` when no enlistment was attempted, either because no
    /// transaction is in scope or because the policy is `Explicit`.
    pub async fn enlist_current(&self) -> Result<Option<Enlistment>, ClientError> {
        if self.policy == EnlistmentPolicy::Explicit {
            return Ok(None);
        }

        match self.resolver.current() {
            Some(transaction) => self
                .ledger
                .enlist(&self.resource, &transaction)
                .await
                .map(Some),
            None => {
                tracing::debug!(
                    "No transaction in scope for call on {}, forwarding without enlistment",
                    self.resource.identity
                );
                Ok(None)
            }
        }
    }

    /// Enlist if needed, then forward `call` to the backing handle
    ///
    /// The backing call's result, error included, is returned unchanged.
    pub async fn invoke<'a, F, Fut, T, E>(&'a self, call: F) -> Result<T, E>
    where
        F: FnOnce(&'a H) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ClientError>,
    {
        self.enlist_current().await?;
        call(&*self.backing).await
    }
}

impl<H: ?Sized + Send + Sync> Enlistable for EnlistingProxy<H> {
    fn identities(&self) -> &[ResourceIdentity] {
        std::slice::from_ref(&self.resource.identity)
    }
}

/// Coordinator callbacks go straight to the backing handle and never enlist
#[async_trait]
impl<H: ?Sized + Participant> Participant for EnlistingProxy<H> {
    async fn active_transaction(
        &self,
        transaction: Arc<dyn Transaction>,
    ) -> Result<(), ParticipantError> {
        self.backing.active_transaction(transaction).await
    }

    async fn prepare(&self) -> Result<(), ParticipantError> {
        self.backing.prepare().await
    }

    async fn commit(&self) -> Result<(), ParticipantError> {
        self.backing.commit().await
    }

    async fn rollback(&self) -> Result<(), ParticipantError> {
        self.backing.rollback().await
    }
}
