//! Test doubles shared by the unit tests

use crate::error::ClientError;
use crate::proxy::EnlistingProxy;
use crate::registry::RegisteredResource;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use txlink_protocol::{
    Enlistable, Locator, Participant, ParticipantError, ResourceIdentity, Transaction,
};

/// Participant that accepts everything
pub struct NullParticipant;

#[async_trait]
impl Participant for NullParticipant {
    async fn active_transaction(
        &self,
        _transaction: Arc<dyn Transaction>,
    ) -> Result<(), ParticipantError> {
        Ok(())
    }

    async fn prepare(&self) -> Result<(), ParticipantError> {
        Ok(())
    }

    async fn commit(&self) -> Result<(), ParticipantError> {
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ParticipantError> {
        Ok(())
    }
}

/// Object declaring a fixed set of identities
pub struct Tagged(Vec<ResourceIdentity>);

impl Tagged {
    pub fn new(names: &[&'static str]) -> Self {
        Self(names.iter().map(|&n| ResourceIdentity::from_static(n)).collect())
    }
}

impl Enlistable for Tagged {
    fn identities(&self) -> &[ResourceIdentity] {
        &self.0
    }
}

/// Registry entry built without a registry
pub fn registered(name: &'static str, participant: Arc<dyn Participant>) -> RegisteredResource {
    RegisteredResource {
        identity: ResourceIdentity::from_static(name),
        locator: Locator::parse(&format!("mem://test/{}", name)).unwrap(),
        participant,
        sequence: 0,
        registered_at: Utc::now(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EchoError {
    #[error("empty message")]
    Empty,

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[async_trait]
pub trait EchoService: Participant {
    async fn echo(&self, message: String) -> Result<String, EchoError>;
}

/// Echo resource counting the calls it receives
#[derive(Default)]
pub struct Echo {
    calls: AtomicUsize,
}

impl Echo {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EchoService for Echo {
    async fn echo(&self, message: String) -> Result<String, EchoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if message.is_empty() {
            return Err(EchoError::Empty);
        }
        Ok(message)
    }
}

#[async_trait]
impl Participant for Echo {
    async fn active_transaction(
        &self,
        _transaction: Arc<dyn Transaction>,
    ) -> Result<(), ParticipantError> {
        Ok(())
    }

    async fn prepare(&self) -> Result<(), ParticipantError> {
        Ok(())
    }

    async fn commit(&self) -> Result<(), ParticipantError> {
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ParticipantError> {
        Ok(())
    }
}

#[async_trait]
impl EchoService for EnlistingProxy<dyn EchoService> {
    async fn echo(&self, message: String) -> Result<String, EchoError> {
        self.invoke(|echo| echo.echo(message)).await
    }
}
