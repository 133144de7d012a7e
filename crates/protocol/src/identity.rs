//! Resource identities
//!
//! An identity is the tag a caller registers a remote resource under. Rust
//! code binds an identity to a trait object type through [`ResourceKind`], and
//! anything that can be handed to the client for attachment declares the
//! identities it answers to through [`Enlistable`].

use crate::Participant;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Stable interface tag, e.g. `"BattleField"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity(Cow<'static, str>);

impl ResourceIdentity {
    /// Identity under which transaction managers are bound in the directory
    pub const TRANSACTION_MANAGER: ResourceIdentity =
        ResourceIdentity::from_static("TransactionManager");

    /// Create an identity from a static name
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an identity from an owned name
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ResourceIdentity {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Binds a resource interface (a trait object type) to its identity
///
/// Implemented once per interface by the crate that defines the interface:
///
/// ```ignore
/// pub struct BattleFieldKind;
///
/// impl ResourceKind for BattleFieldKind {
///     const IDENTITY: ResourceIdentity = ResourceIdentity::from_static("BattleField");
///     type Handle = dyn BattleField;
///
///     fn participant(handle: Arc<dyn BattleField>) -> Arc<dyn Participant> {
///         handle
///     }
/// }
/// ```
pub trait ResourceKind: Send + Sync + 'static {
    /// Registry key for this interface
    const IDENTITY: ResourceIdentity;

    /// Typed handle the directory resolves to
    type Handle: ?Sized + Send + Sync + 'static;

    /// View the typed handle as a 2PC participant
    fn participant(handle: Arc<Self::Handle>) -> Arc<dyn Participant>;
}

/// Something that can be handed to the client for attachment
pub trait Enlistable: Send + Sync {
    /// Identities this object implements, in preference order
    fn identities(&self) -> &[ResourceIdentity];
}

impl<T: Enlistable + ?Sized> Enlistable for Arc<T> {
    fn identities(&self) -> &[ResourceIdentity] {
        (**self).identities()
    }
}

impl<T: Enlistable + ?Sized> Enlistable for &T {
    fn identities(&self) -> &[ResourceIdentity] {
        (**self).identities()
    }
}
