//! Interfaces of the remote transaction service
//!
//! This crate defines:
//! - The participant contract every transactional resource implements
//! - The transaction manager, factory, transaction and coordinator interfaces
//! - The directory used to resolve locators into remote objects
//! - Resource identities and transaction IDs
//!
//! Nothing here talks to a network. Implementations live with the remote
//! service (or in `txlink-engine` for tests).

mod directory;
mod error;
mod identity;
mod participant;
mod remote;
mod transaction;
mod transaction_id;

pub use directory::{Directory, Locator};
pub use error::{DirectoryError, ParticipantError, RemoteError, TransactionError};
pub use identity::{Enlistable, ResourceIdentity, ResourceKind};
pub use participant::{Participant, ParticipantState};
pub use remote::RemoteObject;
pub use transaction::{Coordinator, Transaction, TransactionFactory, TransactionManager};
pub use transaction_id::TransactionId;
