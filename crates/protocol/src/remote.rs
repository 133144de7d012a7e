//! Type-erased remote object returned by a directory lookup

use crate::{Locator, ResourceIdentity, ResourceKind};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A resolved remote object
///
/// Carries the identities the object declares and a typed handle that can be
/// recovered with [`RemoteObject::resolve`]. No runtime type discovery is
/// involved: a lookup only succeeds as a given interface if the object both
/// declares that identity and was bound with the matching handle type.
#[derive(Clone)]
pub struct RemoteObject {
    locator: Locator,
    interfaces: Vec<ResourceIdentity>,
    handle: Arc<dyn Any + Send + Sync>,
}

impl RemoteObject {
    /// Wrap a typed handle, e.g. an `Arc<dyn BattleField>`
    pub fn new<T>(locator: Locator, interfaces: Vec<ResourceIdentity>, handle: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            locator,
            interfaces,
            handle: Arc::new(handle),
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn interfaces(&self) -> &[ResourceIdentity] {
        &self.interfaces
    }

    pub fn implements(&self, identity: &ResourceIdentity) -> bool {
        self.interfaces.contains(identity)
    }

    /// Recover the handle as `Arc<T>` if it was bound with that type
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.handle.downcast_ref::<Arc<T>>().cloned()
    }

    /// Recover the handle for a resource kind
    ///
    /// Returns `None` unless the object declares `K::IDENTITY` and its handle
    /// has type `Arc<K::Handle>`.
    pub fn resolve<K: ResourceKind>(&self) -> Option<Arc<K::Handle>> {
        if !self.implements(&K::IDENTITY) {
            return None;
        }
        self.downcast::<K::Handle>()
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("locator", &self.locator)
            .field("interfaces", &self.interfaces)
            .finish_non_exhaustive()
    }
}
