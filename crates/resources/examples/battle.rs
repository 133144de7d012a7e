//! Train a squad and send it to the battlefield in one transaction
//!
//! Runs against the in-memory mock service:
//!
//! ```text
//! RUST_LOG=info cargo run -p txlink-resources --example battle
//! ```

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use txlink_client::{ClientConfig, TransactionApi};
use txlink_engine::{MockDirectory, MockEngine};
use txlink_protocol::{ResourceKind, Transaction};
use txlink_resources::{
    BattleField, BattleFieldKind, LocalBattleField, LocalTrainingCamp, ResourceError,
    TrainingCamp, TrainingCampKind, Unit,
};

const MANAGER: &str = "mem://cos:2809/TransactionManager";
const FIELD: &str = "mem://army:2809/BattleField";
const CAMP: &str = "mem://army:2809/TrainingCamp";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let directory = Arc::new(MockDirectory::new());
    directory.bind_manager(MANAGER, Arc::new(MockEngine::new()))?;

    let field = Arc::new(LocalBattleField::new());
    let handle: Arc<dyn BattleField> = field.clone();
    directory.bind(FIELD, vec![BattleFieldKind::IDENTITY], handle)?;

    let handle: Arc<dyn TrainingCamp> = Arc::new(LocalTrainingCamp::new());
    directory.bind(CAMP, vec![TrainingCampKind::IDENTITY], handle)?;

    let mut api = TransactionApi::new(directory, ClientConfig::new("battle"));
    let client = api.init(MANAGER).await?;

    let battlefield = client.register_as_resource::<BattleFieldKind>(FIELD).await?;
    let camp = client.register_as_resource::<TrainingCampKind>(CAMP).await?;

    let txn = client.create_transaction().await?;
    txn.begin().await?;

    let squad = client
        .scope(&txn, async {
            let mut squad = Vec::new();
            for name in ["Ada", "Bo", "Cy"] {
                let soldier = camp.train(Unit::recruit(name)).await?;
                squad.push(battlefield.deploy(soldier).await?);
            }
            Ok::<_, ResourceError>(squad)
        })
        .await?;

    for warrior in &squad {
        println!("{}", warrior.present());
    }

    client.commit(&txn).await?;
    println!("Roster after commit: {} warriors", field.roster().await?.len());

    // This one is left open; teardown rolls it back
    let stray = client.create_transaction().await?;
    stray.begin().await?;
    drop(client);

    if let Some(report) = api.teardown().await {
        println!("Rolled back {} unfinished transactions", report.rolled_back.len());
    }
    Ok(())
}
