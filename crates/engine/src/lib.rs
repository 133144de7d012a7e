//! In-memory mock of the remote transaction service
//!
//! This crate provides in-memory implementations of the transaction manager,
//! factory, transactions, coordinators and directory, with hooks to inject
//! failures. It exists for tests and demos of the client library.

mod directory;
mod engine;
mod transaction;

pub(crate) use engine::Faults;

pub use directory::MockDirectory;
pub use engine::MockEngine;
pub use transaction::{MockCoordinator, MockTransaction, TransactionStatus};
