//! Client library for enlisting resources in distributed transactions
//!
//! This crate provides:
//! - `TransactionApi`: one shared connection to the transaction manager
//! - `TransactionClient`: resource registration and transaction creation
//! - `EnlistingProxy`: resource handles that enlist themselves on use
//! - A shutdown sweep that rolls back transactions left unfinished
//!
//! ```ignore
//! let api = TransactionApi::new(directory, ClientConfig::new("army"));
//! let client = api.init("iiop://cos:2809/TransactionManager").await?;
//!
//! let field = client
//!     .register_as_resource::<BattleFieldKind>("iiop://army:2809/BattleField")
//!     .await?;
//!
//! let txn = client.create_transaction().await?;
//! txn.begin().await?;
//! client.scope(&txn, field.deploy(unit)).await?;
//! txn.commit().await?;
//! ```

mod api;
mod client;
mod config;
mod error;
mod ledger;
mod proxy;
mod registry;
mod shutdown;

#[cfg(test)]
mod test_support;

pub use api::TransactionApi;
pub use client::TransactionClient;
pub use config::{ClientConfig, EnlistmentPolicy};
pub use error::{ClientError, CreatedTransaction, Result};
pub use ledger::{Enlistment, EnlistmentLedger};
pub use proxy::{
    EnlistingProxy, FixedTransaction, NoTransaction, ScopedTransaction, TransactionResolver,
    current_transaction, scope,
};
pub use registry::{RegisteredResource, ResourceRegistry};
pub use shutdown::{ShutdownGuard, SweepReport};

pub use txlink_protocol as protocol;
