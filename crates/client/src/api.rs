//! Process-wide client initialization
//!
//! `TransactionApi` owns the one `TransactionClient` an application shares.
//! The first successful `init` connects; later calls return the same client.

use crate::client::TransactionClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::shutdown::SweepReport;
use std::sync::Arc;
use tokio::sync::OnceCell;
use txlink_protocol::{Directory, Locator};

/// Lazily connected, shared transaction client
pub struct TransactionApi {
    directory: Arc<dyn Directory>,
    config: ClientConfig,
    client: OnceCell<Arc<TransactionClient>>,
}

impl TransactionApi {
    pub fn new(directory: Arc<dyn Directory>, config: ClientConfig) -> Self {
        Self {
            directory,
            config,
            client: OnceCell::new(),
        }
    }

    /// Connect to `address` unless a client already exists
    ///
    /// Concurrent callers wait for the same connection attempt. A failed
    /// attempt leaves the api uninitialized so a later call can retry. Once
    /// connected, `address` is ignored.
    pub async fn init(&self, address: &str) -> Result<Arc<TransactionClient>> {
        let client = self
            .client
            .get_or_try_init(|| {
                TransactionClient::connect(self.directory.clone(), address, self.config.clone())
            })
            .await?;

        if !same_address(client.address(), address) {
            tracing::warn!(
                "[{}] Already connected to {}, ignoring {}",
                self.config.client_name,
                client.address(),
                address
            );
        }
        Ok(client.clone())
    }

    /// The client, if `init` has succeeded
    pub fn get(&self) -> Option<Arc<TransactionClient>> {
        self.client.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// Sweep and drop the client; the next `init` connects again
    pub async fn teardown(&mut self) -> Option<SweepReport> {
        let client = self.client.take()?;
        client.shutdown().await
    }
}

fn same_address(current: &Locator, requested: &str) -> bool {
    Locator::parse(requested).is_ok_and(|requested| requested == *current)
}
