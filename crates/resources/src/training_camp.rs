//! Training camp resource

use crate::error::{ResourceError, Result};
use crate::register::UnitRegister;
use crate::unit::{Title, Unit};
use async_trait::async_trait;
use std::sync::Arc;
use txlink_client::EnlistingProxy;
use txlink_protocol::{
    Enlistable, Participant, ParticipantError, ParticipantState, ResourceIdentity, ResourceKind,
    Transaction,
};

const RESOURCE: &str = "TrainingCamp";

#[async_trait]
pub trait TrainingCamp: Participant {
    /// Train a recruit into a soldier
    async fn train(&self, unit: Unit) -> Result<Unit>;

    /// Soldiers whose training has committed
    async fn graduates(&self) -> Result<Vec<Unit>>;
}

pub struct TrainingCampKind;

impl ResourceKind for TrainingCampKind {
    const IDENTITY: ResourceIdentity = ResourceIdentity::from_static(RESOURCE);
    type Handle = dyn TrainingCamp;

    fn participant(handle: Arc<dyn TrainingCamp>) -> Arc<dyn Participant> {
        handle
    }
}

static IDENTITIES: [ResourceIdentity; 1] = [TrainingCampKind::IDENTITY];

/// Raw handles are matched against the registry by identity
impl Enlistable for dyn TrainingCamp {
    fn identities(&self) -> &[ResourceIdentity] {
        &IDENTITIES
    }
}

impl Enlistable for LocalTrainingCamp {
    fn identities(&self) -> &[ResourceIdentity] {
        &IDENTITIES
    }
}

pub struct LocalTrainingCamp {
    register: UnitRegister,
}

impl LocalTrainingCamp {
    pub fn new() -> Self {
        Self {
            register: UnitRegister::new(RESOURCE, None),
        }
    }

    pub fn pending(&self) -> Vec<Unit> {
        self.register.pending()
    }

    pub fn phase(&self) -> ParticipantState {
        self.register.phase()
    }
}

impl Default for LocalTrainingCamp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrainingCamp for LocalTrainingCamp {
    async fn train(&self, unit: Unit) -> Result<Unit> {
        if unit.title != Title::Recruit {
            return Err(ResourceError::WrongTitle {
                resource: RESOURCE,
                unit,
                expected: Title::Recruit,
            });
        }

        let soldier = unit.promoted(Title::Soldier);
        self.register.record(soldier.clone())?;
        Ok(soldier)
    }

    async fn graduates(&self) -> Result<Vec<Unit>> {
        Ok(self.register.enrolled())
    }
}

#[async_trait]
impl Participant for LocalTrainingCamp {
    async fn active_transaction(
        &self,
        transaction: Arc<dyn Transaction>,
    ) -> std::result::Result<(), ParticipantError> {
        self.register.bind(transaction.id())
    }

    async fn prepare(&self) -> std::result::Result<(), ParticipantError> {
        self.register.prepare()
    }

    async fn commit(&self) -> std::result::Result<(), ParticipantError> {
        self.register.commit()
    }

    async fn rollback(&self) -> std::result::Result<(), ParticipantError> {
        self.register.rollback()
    }
}

#[async_trait]
impl TrainingCamp for EnlistingProxy<dyn TrainingCamp> {
    async fn train(&self, unit: Unit) -> Result<Unit> {
        self.invoke(|camp| camp.train(unit)).await
    }

    async fn graduates(&self) -> Result<Vec<Unit>> {
        self.invoke(|camp| camp.graduates()).await
    }
}
