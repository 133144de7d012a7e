//! Battlefield resource
//!
//! Deploying a soldier turns it into a warrior. Warriors join the field's
//! roster when the deploying transaction commits.

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

const RESOURCE: &str = "BattleField";

#[async_trait]
pub trait BattleField: Participant {
    /// Promote a soldier to warrior and station it on the field
    async fn deploy(&self, unit: Unit) -> Result<Unit>;

    /// Warriors committed to the field
    async fn roster(&self) -> Result<Vec<Unit>>;
}

/// Binds `dyn BattleField` to the `"BattleField"` identity
pub struct BattleFieldKind;

impl ResourceKind for BattleFieldKind {
    const IDENTITY: ResourceIdentity = ResourceIdentity::from_static(RESOURCE);
    type Handle = dyn BattleField;

    fn participant(handle: Arc<dyn BattleField>) -> Arc<dyn Participant> {
        handle
    }
}

static IDENTITIES: [ResourceIdentity; 1] = [BattleFieldKind::IDENTITY];

/// Raw handles are matched against the registry by identity
impl Enlistable for dyn BattleField {
    fn identities(&self) -> &[ResourceIdentity] {
        &IDENTITIES
    }
}

impl Enlistable for LocalBattleField {
    fn identities(&self) -> &[ResourceIdentity] {
        &IDENTITIES
    }
}

/// In-process battlefield
pub struct LocalBattleField {
    register: UnitRegister,
}

impl LocalBattleField {
    pub fn new() -> Self {
        Self {
            register: UnitRegister::new(RESOURCE, None),
        }
    }

    /// A field that votes no once more than `capacity` warriors would be on it
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            register: UnitRegister::new(RESOURCE, Some(capacity)),
        }
    }

    pub fn pending(&self) -> Vec<Unit> {
        self.register.pending()
    }

    pub fn phase(&self) -> ParticipantState {
        self.register.phase()
    }
}

impl Default for LocalBattleField {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BattleField for LocalBattleField {
    async fn deploy(&self, unit: Unit) -> Result<Unit> {
        if unit.title != Title::Soldier {
            return Err(ResourceError::WrongTitle {
                resource: RESOURCE,
                unit,
                expected: Title::Soldier,
            });
        }

        let warrior = unit.promoted(Title::Warrior);
        self.register.record(warrior.clone())?;
        Ok(warrior)
    }

    async fn roster(&self) -> Result<Vec<Unit>> {
        Ok(self.register.enrolled())
    }
}

#[async_trait]
impl Participant for LocalBattleField {
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
impl BattleField for EnlistingProxy<dyn BattleField> {
    async fn deploy(&self, unit: Unit) -> Result<Unit> {
        self.invoke(|field| field.deploy(unit)).await
    }

    async fn roster(&self) -> Result<Vec<Unit>> {
        self.invoke(|field| field.roster()).await
    }
}
