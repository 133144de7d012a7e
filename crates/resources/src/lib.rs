//! Sample transactional resources
//!
//! Two participants to exercise the client library with: a training camp
//! that turns recruits into soldiers, and a battlefield that turns soldiers
//! into warriors. Each keeps a register of units that only changes when the
//! transaction that recorded them commits.
//!
//! Each interface also gets its `EnlistingProxy<dyn ...>` binding, so the
//! proxies returned by `TransactionClient::register_as_resource` implement
//! the interface directly.

mod battlefield;
mod error;
mod register;
mod training_camp;
mod unit;

pub use battlefield::{BattleField, BattleFieldKind, LocalBattleField};
pub use error::{ResourceError, Result};
pub use register::UnitRegister;
pub use training_camp::{LocalTrainingCamp, TrainingCamp, TrainingCampKind};
pub use unit::{Title, Unit};
