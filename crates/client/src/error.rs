//! Error types for the client

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use txlink_protocol::{DirectoryError, RemoteError, ResourceIdentity, Transaction};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transaction manager at {address} can't be reached: {reason}")]
    ConnectionFailure { address: String, reason: String },

    #[error("Remote resource {identity} at {locator} can't be reached: {source}")]
    ResourceUnreachable {
        identity: ResourceIdentity,
        locator: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Remote resource at {locator} doesn't implement {identity}")]
    TypeMismatch {
        identity: ResourceIdentity,
        locator: String,
    },

    #[error("Resource interface {0} is already registered")]
    RegistrationConflict(ResourceIdentity),

    #[error("Resource isn't registered (declares {0:?})")]
    UnregisteredResource(Vec<ResourceIdentity>),

    #[error("Remote call failed while {context}: {source}")]
    RemoteTransportFailure {
        context: String,
        #[source]
        source: RemoteError,
    },

    #[error(
        "Transaction {} created with {attached} of {requested} resources attached: {source}",
        .transaction.id()
    )]
    PartialAttachment {
        transaction: CreatedTransaction,
        attached: usize,
        requested: usize,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    pub(crate) fn transport(context: impl Into<String>, source: RemoteError) -> Self {
        Self::RemoteTransportFailure {
            context: context.into(),
            source,
        }
    }
}

/// Transaction left behind by a failed multi-step operation
#[derive(Clone)]
pub struct CreatedTransaction(pub Arc<dyn Transaction>);

impl CreatedTransaction {
    pub fn id(&self) -> txlink_protocol::TransactionId {
        self.0.id()
    }

    pub fn into_inner(self) -> Arc<dyn Transaction> {
        self.0
    }
}

impl fmt::Debug for CreatedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CreatedTransaction")
            .field(&self.0.id())
            .finish()
    }
}
