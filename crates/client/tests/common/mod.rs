//! Common test utilities for client integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use txlink_client::{ClientConfig, ClientError, EnlistingProxy, TransactionApi, TransactionClient};
use txlink_engine::{MockDirectory, MockEngine};
use txlink_protocol::{
    Participant, ParticipantError, ResourceIdentity, ResourceKind, Transaction,
};

pub const MANAGER: &str = "mem://cos:2809/TransactionManager";
pub const DEPOT: &str = "mem://depot:2809/Depot";
pub const ARMORY: &str = "mem://armory:2809/Armory";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A storage resource; `Depot` and `Armory` share its interface shape
#[async_trait]
pub trait Store: Participant {
    async fn put(&self, item: String) -> Result<usize, StoreError>;
    async fn take(&self, item: String) -> Result<String, StoreError>;
}

pub trait Depot: Store {}
pub trait Armory: Store {}

/// In-memory store that remembers its items and every phase it went through
#[derive(Default)]
pub struct MemoryStore {
    pub items: Mutex<Vec<String>>,
    pub phases: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    pub fn phases(&self) -> Vec<&'static str> {
        self.phases.lock().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, item: String) -> Result<usize, StoreError> {
        let mut items = self.items.lock();
        items.push(item);
        Ok(items.len())
    }

    async fn take(&self, item: String) -> Result<String, StoreError> {
        let mut items = self.items.lock();
        match items.iter().position(|i| *i == item) {
            Some(at) => Ok(items.remove(at)),
            None => Err(StoreError::OutOfStock(item)),
        }
    }
}

impl Depot for MemoryStore {}
impl Armory for MemoryStore {}

#[async_trait]
impl Participant for MemoryStore {
    async fn active_transaction(
        &self,
        _transaction: Arc<dyn Transaction>,
    ) -> Result<(), ParticipantError> {
        self.phases.lock().push("active");
        Ok(())
    }

    async fn prepare(&self) -> Result<(), ParticipantError> {
        self.phases.lock().push("prepare");
        Ok(())
    }

    async fn commit(&self) -> Result<(), ParticipantError> {
        self.phases.lock().push("commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ParticipantError> {
        self.phases.lock().push("rollback");
        Ok(())
    }
}

macro_rules! store_proxy {
    ($handle:ty) => {
        #[async_trait]
        impl Store for EnlistingProxy<$handle> {
            async fn put(&self, item: String) -> Result<usize, StoreError> {
                self.invoke(|store| store.put(item)).await
            }

            async fn take(&self, item: String) -> Result<String, StoreError> {
                self.invoke(|store| store.take(item)).await
            }
        }
    };
}

store_proxy!(dyn Depot);
store_proxy!(dyn Armory);

impl Depot for EnlistingProxy<dyn Depot> {}
impl Armory for EnlistingProxy<dyn Armory> {}

pub struct DepotKind;

impl ResourceKind for DepotKind {
    const IDENTITY: ResourceIdentity = ResourceIdentity::from_static("Depot");
    type Handle = dyn Depot;

    fn participant(handle: Arc<dyn Depot>) -> Arc<dyn Participant> {
        handle
    }
}

pub struct ArmoryKind;

impl ResourceKind for ArmoryKind {
    const IDENTITY: ResourceIdentity = ResourceIdentity::from_static("Armory");
    type Handle = dyn Armory;

    fn participant(handle: Arc<dyn Armory>) -> Arc<dyn Participant> {
        handle
    }
}

/// Mock service with a manager, a depot and an armory bound in its directory
pub struct TestContext {
    pub engine: MockEngine,
    pub directory: Arc<MockDirectory>,
    pub depot: Arc<MemoryStore>,
    pub armory: Arc<MemoryStore>,
}

impl TestContext {
    pub fn new() -> Self {
        let engine = MockEngine::new();
        let directory = Arc::new(MockDirectory::new());
        directory
            .bind_manager(MANAGER, Arc::new(engine.clone()))
            .unwrap();

        let depot = Arc::new(MemoryStore::default());
        let handle: Arc<dyn Depot> = depot.clone();
        directory
            .bind(DEPOT, vec![DepotKind::IDENTITY], handle)
            .unwrap();

        let armory = Arc::new(MemoryStore::default());
        let handle: Arc<dyn Armory> = armory.clone();
        directory
            .bind(ARMORY, vec![ArmoryKind::IDENTITY], handle)
            .unwrap();

        Self {
            engine,
            directory,
            depot,
            armory,
        }
    }

    pub fn config() -> ClientConfig {
        ClientConfig::new("integration").with_signal_handler(false)
    }

    pub fn api(&self) -> TransactionApi {
        TransactionApi::new(self.directory.clone(), Self::config())
    }

    pub async fn client(&self) -> Arc<TransactionClient> {
        TransactionClient::connect(self.directory.clone(), MANAGER, Self::config())
            .await
            .unwrap()
    }
}
