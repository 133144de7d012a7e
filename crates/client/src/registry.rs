//! Registry of resolved remote resources
//!
//! Maps a resource identity to the backing handle resolved from the
//! directory. Each identity can be registered once; entries are immutable and
//! live as long as the client.

use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use txlink_protocol::{Enlistable, Locator, Participant, ResourceIdentity};

/// A registered remote resource
pub struct RegisteredResource {
    pub identity: ResourceIdentity,
    pub locator: Locator,
    /// Backing handle, as handed to coordinators
    pub participant: Arc<dyn Participant>,
    /// Registration order within the client
    pub sequence: u64,
    pub registered_at: DateTime<Utc>,
}

impl fmt::Debug for RegisteredResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredResource")
            .field("identity", &self.identity)
            .field("locator", &self.locator)
            .field("sequence", &self.sequence)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<ResourceIdentity, Arc<RegisteredResource>>,
    next_sequence: u64,
}

/// Identity -> backing handle map
#[derive(Default)]
pub struct ResourceRegistry {
    state: RwLock<RegistryState>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a backing handle under `identity`
    ///
    /// The conflict check and the insert happen under one write lock, so two
    /// concurrent registrations of the same identity can't both succeed.
    pub fn register(
        &self,
        identity: ResourceIdentity,
        locator: Locator,
        participant: Arc<dyn Participant>,
    ) -> Result<Arc<RegisteredResource>> {
        let mut state = self.state.write();
        if state.entries.contains_key(&identity) {
            return Err(ClientError::RegistrationConflict(identity));
        }

        let entry = Arc::new(RegisteredResource {
            identity: identity.clone(),
            locator,
            participant,
            sequence: state.next_sequence,
            registered_at: Utc::now(),
        });
        state.next_sequence += 1;
        state.entries.insert(identity, entry.clone());

        tracing::debug!(
            "Registered resource {} at {} (#{})",
            entry.identity,
            entry.locator,
            entry.sequence
        );
        Ok(entry)
    }

    /// Whether any identity declared by `candidate` is registered
    pub fn is_registered(&self, candidate: &dyn Enlistable) -> bool {
        self.lookup_backing(candidate).is_some()
    }

    /// Entry for the first identity declared by `candidate` that is registered
    pub fn lookup_backing(&self, candidate: &dyn Enlistable) -> Option<Arc<RegisteredResource>> {
        let state = self.state.read();
        candidate
            .identities()
            .iter()
            .find_map(|identity| state.entries.get(identity).cloned())
    }

    pub fn get(&self, identity: &ResourceIdentity) -> Option<Arc<RegisteredResource>> {
        self.state.read().entries.get(identity).cloned()
    }

    pub fn contains(&self, identity: &ResourceIdentity) -> bool {
        self.state.read().entries.contains_key(identity)
    }

    /// Registered identities, in registration order
    pub fn identities(&self) -> Vec<ResourceIdentity> {
        let state = self.state.read();
        let mut entries: Vec<_> = state.entries.values().collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries.iter().map(|entry| entry.identity.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
