//! Transaction client facade
//!
//! Holds the single connection to the transaction manager, the resource
//! registry and the enlistment ledger. Registration returns enlisting
//! proxies; attachment hands backing handles to a transaction's coordinator.

use crate::config::ClientConfig;
use crate::error::{ClientError, CreatedTransaction, Result};
use crate::ledger::{Enlistment, EnlistmentLedger};
use crate::proxy::{self, EnlistingProxy, ScopedTransaction};
use crate::registry::ResourceRegistry;
use crate::shutdown::{ShutdownGuard, SweepReport};
use std::future::Future;
use std::sync::Arc;
use txlink_protocol::{
    Directory, Enlistable, Locator, ResourceIdentity, ResourceKind, Transaction,
    TransactionError, TransactionFactory, TransactionId, TransactionManager,
};

/// Client-side entry point for distributed transactions
pub struct TransactionClient {
    address: Locator,
    config: ClientConfig,
    directory: Arc<dyn Directory>,
    manager: Arc<dyn TransactionManager>,
    factory: Arc<dyn TransactionFactory>,
    registry: ResourceRegistry,
    ledger: Arc<EnlistmentLedger>,
    guard: ShutdownGuard,
}

impl TransactionClient {
    /// Connect to the transaction manager bound at `address`
    ///
    /// Resolves the manager through `directory`, fetches its factory and
    /// installs the shutdown guard. Use `TransactionApi::init` to share one
    /// client per process.
    pub async fn connect(
        directory: Arc<dyn Directory>,
        address: &str,
        config: ClientConfig,
    ) -> Result<Arc<Self>> {
        let failure = |reason: String| ClientError::ConnectionFailure {
            address: address.to_string(),
            reason,
        };

        let locator = Locator::parse(address).map_err(|e| failure(e.to_string()))?;
        let object = directory
            .lookup(&locator)
            .await
            .map_err(|e| failure(e.to_string()))?;

        let manager = object
            .implements(&ResourceIdentity::TRANSACTION_MANAGER)
            .then(|| object.downcast::<dyn TransactionManager>())
            .flatten()
            .ok_or_else(|| failure("bound object isn't a transaction manager".to_string()))?;

        let factory = manager
            .transaction_factory()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let ledger = Arc::new(EnlistmentLedger::new());
        let guard = ShutdownGuard::install(factory.clone(), ledger.clone(), &config);

        tracing::info!(
            "[{}] Connected to transaction manager at {}",
            config.client_name,
            locator
        );

        Ok(Arc::new(Self {
            address: locator,
            config,
            directory,
            manager,
            factory,
            registry: ResourceRegistry::new(),
            ledger,
            guard,
        }))
    }

    pub fn address(&self) -> &Locator {
        &self.address
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<dyn TransactionManager> {
        &self.manager
    }

    pub fn factory(&self) -> &Arc<dyn TransactionFactory> {
        &self.factory
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<EnlistmentLedger> {
        &self.ledger
    }

    /// Resolve `locator` as a `K` resource, register it and return its proxy
    pub async fn register_as_resource<K: ResourceKind>(
        &self,
        locator: &str,
    ) -> Result<EnlistingProxy<K::Handle>> {
        let identity = K::IDENTITY;
        let unreachable = |source| ClientError::ResourceUnreachable {
            identity: K::IDENTITY,
            locator: locator.to_string(),
            source,
        };

        let parsed = Locator::parse(locator).map_err(unreachable)?;
        let object = self.directory.lookup(&parsed).await.map_err(unreachable)?;

        let backing = object
            .resolve::<K>()
            .ok_or_else(|| ClientError::TypeMismatch {
                identity: identity.clone(),
                locator: locator.to_string(),
            })?;

        let resource = self
            .registry
            .register(identity, parsed, K::participant(backing.clone()))?;

        tracing::info!(
            "[{}] Registered {} at {}",
            self.config.client_name,
            resource.identity,
            resource.locator
        );

        Ok(EnlistingProxy::new(
            backing,
            resource,
            self.ledger.clone(),
            Arc::new(ScopedTransaction),
            self.config.enlistment,
        ))
    }

    /// Whether any identity declared by `resource` is registered
    pub fn is_registered_resource(&self, resource: &dyn Enlistable) -> bool {
        self.registry.is_registered(resource)
    }

    /// Registered identities, in registration order
    pub fn registered_identities(&self) -> Vec<ResourceIdentity> {
        self.registry.identities()
    }

    /// Ask the factory for a new transaction
    pub async fn create_transaction(&self) -> Result<Arc<dyn Transaction>> {
        let transaction = self
            .factory
            .create_transaction()
            .await
            .map_err(|e| ClientError::transport("creating a transaction", e))?;

        tracing::debug!(
            "[{}] Created transaction {}",
            self.config.client_name,
            transaction.id()
        );
        Ok(transaction)
    }

    /// Create a transaction and attach `resources` in order
    ///
    /// Stops at the first failed attachment. The transaction is not rolled
    /// back; it is returned inside `ClientError::PartialAttachment`.
    pub async fn create_transaction_with(
        &self,
        resources: &[&dyn Enlistable],
    ) -> Result<Arc<dyn Transaction>> {
        let transaction = self.create_transaction().await?;

        for (attached, resource) in resources.iter().enumerate() {
            if let Err(e) = self.attach_resource(&transaction, *resource).await {
                tracing::warn!(
                    "[{}] Transaction {} left with {} of {} resources attached: {}",
                    self.config.client_name,
                    transaction.id(),
                    attached,
                    resources.len(),
                    e
                );
                return Err(ClientError::PartialAttachment {
                    transaction: CreatedTransaction(transaction),
                    attached,
                    requested: resources.len(),
                    source: Box::new(e),
                });
            }
        }

        Ok(transaction)
    }

    /// Enlist a registered resource with `transaction`'s coordinator
    ///
    /// Fails with `UnregisteredResource` before any remote call if the
    /// resource isn't in the registry. Enlisting the same pair twice only
    /// contacts the coordinator once.
    pub async fn attach_resource(
        &self,
        transaction: &Arc<dyn Transaction>,
        resource: &dyn Enlistable,
    ) -> Result<Enlistment> {
        let entry = self
            .registry
            .lookup_backing(resource)
            .ok_or_else(|| ClientError::UnregisteredResource(resource.identities().to_vec()))?;

        self.ledger.enlist(&entry, transaction).await
    }

    /// Run `future` with `transaction` as the ambient transaction of proxies
    pub async fn scope<F: Future>(&self, transaction: &Arc<dyn Transaction>, future: F) -> F::Output {
        proxy::scope(transaction.clone(), future).await
    }

    /// Commit `transaction` and release its enlistment records
    ///
    /// Records are kept when the outcome is unknown (a remote failure), so a
    /// retry doesn't enlist the same resources again.
    pub async fn commit(
        &self,
        transaction: &Arc<dyn Transaction>,
    ) -> std::result::Result<(), TransactionError> {
        let outcome = transaction.commit().await;
        self.finish(transaction, &outcome);
        outcome
    }

    /// Roll back `transaction` and release its enlistment records
    pub async fn rollback(
        &self,
        transaction: &Arc<dyn Transaction>,
    ) -> std::result::Result<(), TransactionError> {
        let outcome = transaction.rollback().await;
        self.finish(transaction, &outcome);
        outcome
    }

    fn finish(
        &self,
        transaction: &Arc<dyn Transaction>,
        outcome: &std::result::Result<(), TransactionError>,
    ) {
        if !matches!(outcome, Err(TransactionError::Remote(_))) {
            self.ledger.release(&transaction.id());
        }
    }

    /// Forget enlistment records of a finished transaction
    pub fn release_transaction(&self, transaction: &TransactionId) -> usize {
        self.ledger.release(transaction)
    }

    /// Explicit teardown: run the shutdown sweep now
    ///
    /// Returns `None` if the sweep already ran.
    pub async fn shutdown(&self) -> Option<SweepReport> {
        tracing::info!("[{}] Shutting down", self.config.client_name);
        self.guard.sweep().await
    }

    pub fn has_shut_down(&self) -> bool {
        self.guard.has_run()
    }
}
