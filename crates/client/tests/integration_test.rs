//! Integration tests for registration, attachment and shutdown recovery

mod common;

use common::*;
use std::sync::Arc;
use txlink_client::{ClientError, Enlistment, EnlistmentPolicy, Result, TransactionClient};
use txlink_engine::TransactionStatus;
use txlink_protocol::{Enlistable, ResourceIdentity, ResourceKind, Transaction};

/// Object declaring identities without being registered
struct Declared(Vec<ResourceIdentity>);

impl Enlistable for Declared {
    fn identities(&self) -> &[ResourceIdentity] {
        &self.0
    }
}

#[tokio::test]
async fn test_duplicate_registration_keeps_first() {
    let ctx = TestContext::new();
    let client = ctx.client().await;

    let first = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    let original = client.registry().get(&DepotKind::IDENTITY).unwrap();

    let err = client
        .register_as_resource::<DepotKind>(DEPOT)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ClientError::RegistrationConflict(ref id) if *id == DepotKind::IDENTITY));
    let kept = client.registry().get(&DepotKind::IDENTITY).unwrap();
    assert!(Arc::ptr_eq(&original, &kept));
    assert!(Arc::ptr_eq(first.registration(), &kept));
    assert_eq!(client.registry().len(), 1);
}

#[tokio::test]
async fn test_type_mismatch_leaves_registry_untouched() {
    let ctx = TestContext::new();
    let client = ctx.client().await;

    // The armory locator is bound under "Armory", not "Depot"
    let err = client
        .register_as_resource::<DepotKind>(ARMORY)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ClientError::TypeMismatch { .. }));
    assert!(client.registry().is_empty());
    assert!(client.registered_identities().is_empty());
}

#[tokio::test]
async fn test_unreachable_resource() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    ctx.directory.set_unreachable(true);

    let err = client
        .register_as_resource::<DepotKind>(DEPOT)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ClientError::ResourceUnreachable { .. }));
    assert!(client.registry().is_empty());
}

#[tokio::test]
async fn test_malformed_resource_locator() {
    let ctx = TestContext::new();
    let client = ctx.client().await;

    let err = client
        .register_as_resource::<DepotKind>("depot")
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ClientError::ResourceUnreachable { .. }));
}

#[tokio::test]
async fn test_attach_unregistered_never_reaches_coordinator() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let txn = client.create_transaction().await.unwrap();

    let err = client
        .attach_resource(&txn, &Declared(vec![DepotKind::IDENTITY]))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::UnregisteredResource(_)));
    let mock = ctx.engine.transaction(&txn.id()).unwrap();
    assert_eq!(mock.mock_coordinator().registration_count(), 0);
}

#[tokio::test]
async fn test_create_transaction_with_registers_in_order() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    let armory = client.register_as_resource::<ArmoryKind>(ARMORY).await.unwrap();

    let txn = client
        .create_transaction_with(&[&armory, &depot])
        .await
        .unwrap();

    let coordinator = ctx.engine.transaction(&txn.id()).unwrap().mock_coordinator().clone();
    assert_eq!(coordinator.registration_count(), 2);
    assert_eq!(coordinator.position_of(&ctx.armory), Some(0));
    assert_eq!(coordinator.position_of(&ctx.depot), Some(1));
}

#[tokio::test]
async fn test_partial_attachment_returns_the_transaction() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    let stranger = Declared(vec![ResourceIdentity::new("Stables")]);

    let err = client
        .create_transaction_with(&[&depot, &stranger])
        .await
        .err()
        .unwrap();

    let ClientError::PartialAttachment {
        transaction,
        attached,
        requested,
        source,
    } = err
    else {
        panic!("expected PartialAttachment");
    };

    assert_eq!(attached, 1);
    assert_eq!(requested, 2);
    assert!(matches!(*source, ClientError::UnregisteredResource(_)));

    let mock = ctx.engine.transaction(&transaction.id()).unwrap();
    assert_eq!(mock.status(), TransactionStatus::Created);
    assert!(mock.mock_coordinator().is_registered(&ctx.depot));
}

#[tokio::test]
async fn test_is_registered_resource_matches_any_declared_identity() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();

    assert!(client.is_registered_resource(&depot));
    assert!(client.is_registered_resource(&Declared(vec![
        ResourceIdentity::new("Stables"),
        DepotKind::IDENTITY,
    ])));
    assert!(!client.is_registered_resource(&Declared(vec![ArmoryKind::IDENTITY])));
    assert!(!client.is_registered_resource(&Declared(Vec::new())));
}

#[tokio::test]
async fn test_end_to_end_enlistment() {
    let ctx = TestContext::new();
    let client = ctx.client().await;

    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    assert!(client.is_registered_resource(&depot));

    let txn = client.create_transaction().await.unwrap();
    txn.begin().await.unwrap();
    assert_eq!(
        client.attach_resource(&txn, &depot).await.unwrap(),
        Enlistment::Registered
    );

    let coordinator = ctx.engine.transaction(&txn.id()).unwrap().mock_coordinator().clone();
    assert_eq!(coordinator.registration_count(), 1);
    assert!(coordinator.is_registered(&ctx.depot));

    let outcome: Result<()> = client
        .scope(&txn, async {
            assert_eq!(depot.put("rations".to_string()).await.unwrap(), 1);
            assert_eq!(depot.put("water".to_string()).await.unwrap(), 2);
            let err = depot.take("boots".to_string()).await.unwrap_err();
            assert!(matches!(err, StoreError::OutOfStock(ref item) if item == "boots"));
            Ok(())
        })
        .await;
    outcome.unwrap();

    assert_eq!(coordinator.registration_count(), 1);
    assert_eq!(*ctx.depot.items.lock(), vec!["rations", "water"]);

    txn.commit().await.unwrap();
    assert_eq!(ctx.depot.phases(), vec!["active", "prepare", "commit"]);
}

#[tokio::test]
async fn test_first_call_enlists_without_explicit_attach() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    let txn = client.create_transaction().await.unwrap();
    txn.begin().await.unwrap();

    client
        .scope(&txn, depot.put("rope".to_string()))
        .await
        .unwrap();

    assert!(client.ledger().is_enlisted(&DepotKind::IDENTITY, &txn.id()));
    assert_eq!(
        client.attach_resource(&txn, &depot).await.unwrap(),
        Enlistment::AlreadyEnlisted
    );
    let mock = ctx.engine.transaction(&txn.id()).unwrap();
    assert_eq!(mock.mock_coordinator().registration_count(), 1);
}

#[tokio::test]
async fn test_explicit_policy_requires_attach() {
    let ctx = TestContext::new();
    let config = TestContext::config().with_enlistment(EnlistmentPolicy::Explicit);
    let client = TransactionClient::connect(ctx.directory.clone(), MANAGER, config)
        .await
        .unwrap();
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    let txn = client.create_transaction().await.unwrap();

    client
        .scope(&txn, depot.put("rope".to_string()))
        .await
        .unwrap();

    let mock = ctx.engine.transaction(&txn.id()).unwrap();
    assert_eq!(mock.mock_coordinator().registration_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_enlist_once() {
    let ctx = TestContext::new();
    ctx.engine
        .set_registration_delay(Some(std::time::Duration::from_millis(10)));
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();
    let txn = client.create_transaction().await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let depot = depot.clone();
            let txn = txn.clone();
            tokio::spawn(txlink_client::scope(txn, async move {
                depot.put(format!("crate-{i}")).await.unwrap();
            }))
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mock = ctx.engine.transaction(&txn.id()).unwrap();
    assert_eq!(mock.mock_coordinator().registration_count(), 1);
    assert_eq!(ctx.depot.items.lock().len(), 8);
}

#[tokio::test]
async fn test_shutdown_rolls_back_started_transactions_only() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();

    let idle = client.create_transaction().await.unwrap();
    let started = client.create_transaction_with(&[&depot]).await.unwrap();
    started.begin().await.unwrap();
    let finished = client.create_transaction().await.unwrap();
    finished.begin().await.unwrap();
    finished.commit().await.unwrap();

    let report = client.shutdown().await.unwrap();

    assert_eq!(report.inspected, 3);
    assert_eq!(report.rolled_back, vec![started.id()]);
    assert_eq!(report.already_terminal, 1);
    assert_eq!(report.not_started, 1);

    assert_eq!(ctx.engine.transaction(&idle.id()).unwrap().rollback_calls(), 0);
    assert_eq!(ctx.engine.transaction(&started.id()).unwrap().rollback_calls(), 1);
    assert_eq!(
        ctx.engine.transaction(&started.id()).unwrap().status(),
        TransactionStatus::RolledBack
    );
    assert_eq!(ctx.depot.phases(), vec!["rollback"]);
}

#[tokio::test]
async fn test_init_twice_connects_once() {
    let ctx = TestContext::new();
    let api = ctx.api();

    let first = api.init(MANAGER).await.unwrap();
    let second = api.init(MANAGER).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.directory.lookup_count(), 1);
    assert_eq!(ctx.engine.factory_requests(), 1);
}

#[tokio::test]
async fn test_init_failures() {
    let ctx = TestContext::new();
    let api = ctx.api();

    let malformed = api.init("cos:2809").await.err().unwrap();
    assert!(matches!(malformed, ClientError::ConnectionFailure { .. }));

    let missing = api.init("mem://cos:2809/Nothing").await.err().unwrap();
    assert!(matches!(missing, ClientError::ConnectionFailure { .. }));

    ctx.engine.set_offline(true);
    let offline = api.init(MANAGER).await.err().unwrap();
    assert!(matches!(offline, ClientError::ConnectionFailure { .. }));

    assert!(api.get().is_none());
}

#[tokio::test]
async fn test_finished_transactions_leave_no_enlistments() {
    let ctx = TestContext::new();
    let client = ctx.client().await;
    let depot = client.register_as_resource::<DepotKind>(DEPOT).await.unwrap();

    for i in 0..100 {
        let txn = client.create_transaction().await.unwrap();
        txn.begin().await.unwrap();
        client
            .scope(&txn, depot.put(format!("crate-{i}")))
            .await
            .unwrap();
        if i % 2 == 0 {
            client.commit(&txn).await.unwrap();
        } else {
            client.rollback(&txn).await.unwrap();
        }
    }

    assert!(client.ledger().is_empty());
    assert_eq!(ctx.depot.items.lock().len(), 100);
}
