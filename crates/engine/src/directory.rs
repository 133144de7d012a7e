//! In-memory directory

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use txlink_protocol::{
    Directory, DirectoryError, Locator, RemoteError, RemoteObject, ResourceIdentity,
    TransactionManager,
};

/// Directory backed by a map from locator to bound object
#[derive(Default)]
pub struct MockDirectory {
    bindings: Mutex<HashMap<Locator, RemoteObject>>,
    unreachable: AtomicBool,
    lookups: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a typed handle under `locator`, declaring `interfaces`
    pub fn bind<T>(
        &self,
        locator: &str,
        interfaces: Vec<ResourceIdentity>,
        handle: Arc<T>,
    ) -> Result<Locator, DirectoryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let locator = Locator::parse(locator)?;
        let object = RemoteObject::new(locator.clone(), interfaces, handle);
        self.bindings.lock().insert(locator.clone(), object);
        Ok(locator)
    }

    /// Bind a transaction manager under `locator`
    pub fn bind_manager(
        &self,
        locator: &str,
        manager: Arc<dyn TransactionManager>,
    ) -> Result<Locator, DirectoryError> {
        self.bind(
            locator,
            vec![ResourceIdentity::TRANSACTION_MANAGER],
            manager,
        )
    }

    pub fn unbind(&self, locator: &Locator) -> bool {
        self.bindings.lock().remove(locator).is_some()
    }

    /// Fail every lookup with `Unreachable` while set
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of lookups received
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn lookup(&self, locator: &Locator) -> Result<RemoteObject, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unreachable {
                locator: locator.to_string(),
                source: RemoteError::ConnectionRefused(format!(
                    "{} refused the connection",
                    locator.host
                )),
            });
        }

        self.bindings
            .lock()
            .get(locator)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(locator.to_string()))
    }
}
