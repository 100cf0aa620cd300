//! Integration tests for custody, wrap key, chain assignment and
//! operator repositories using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use trustforge_core::error::CaError;
use trustforge_core::models::assignment::NewChainAssignment;
use trustforge_core::models::custody::{NewCustodyRecord, NewOperatorWrapKey};
use trustforge_core::models::operator::NewOperator;
use trustforge_core::repository::{
    ChainAssignmentRepository, CustodyRepository, OperatorRepository, WrapKeyRepository,
};
use trustforge_db::repository::{
    SurrealChainAssignmentRepository, SurrealCustodyRepository, SurrealOperatorRepository,
    SurrealWrapKeyRepository,
};
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    trustforge_db::run_migrations(&db).await.unwrap();
    db
}

fn custody_input(certificate_id: Uuid, owner_id: Uuid, alias: &str) -> NewCustodyRecord {
    NewCustodyRecord {
        certificate_id,
        owner_id,
        alias: alias.into(),
        wrapped_password: "d2hvIGtub3dz".into(),
        wrap_key_version: 1,
    }
}

// -----------------------------------------------------------------------
// Custody tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_active_custody() {
    let db = setup().await;
    let repo = SurrealCustodyRepository::new(db);
    let cert_id = Uuid::new_v4();
    let owner = Uuid::new_v4();

    let record = repo.create(custody_input(cert_id, owner, "a1")).await.unwrap();
    assert!(record.active);
    assert_eq!(record.certificate_id, cert_id);
    assert_eq!(record.owner_id, owner);

    let active = repo.get_active_for_certificate(cert_id).await.unwrap();
    assert_eq!(active.map(|r| r.id), Some(record.id));

    let none = repo
        .get_active_for_certificate(Uuid::new_v4())
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn new_custody_record_deactivates_predecessor() {
    let db = setup().await;
    let repo = SurrealCustodyRepository::new(db);
    let cert_id = Uuid::new_v4();
    let owner = Uuid::new_v4();

    let first = repo.create(custody_input(cert_id, owner, "a1")).await.unwrap();
    let second = repo.create(custody_input(cert_id, owner, "a2")).await.unwrap();

    let active = repo
        .get_active_for_certificate(cert_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, second.id);
    assert_ne!(active.id, first.id);

    // Only the replacement remains in the owner's active listing.
    let listing = repo.list_by_owner(owner).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, second.id);
}

#[tokio::test]
async fn list_by_owner_spans_certificates() {
    let db = setup().await;
    let repo = SurrealCustodyRepository::new(db);
    let owner = Uuid::new_v4();

    repo.create(custody_input(Uuid::new_v4(), owner, "a1"))
        .await
        .unwrap();
    repo.create(custody_input(Uuid::new_v4(), owner, "a2"))
        .await
        .unwrap();
    repo.create(custody_input(Uuid::new_v4(), Uuid::new_v4(), "a3"))
        .await
        .unwrap();

    let listing = repo.list_by_owner(owner).await.unwrap();
    assert_eq!(listing.len(), 2);
    assert!(listing.iter().all(|r| r.owner_id == owner));
}

// -----------------------------------------------------------------------
// Wrap key tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn latest_wrap_key_has_highest_version() {
    let db = setup().await;
    let repo = SurrealWrapKeyRepository::new(db);
    let operator = Uuid::new_v4();

    assert!(repo.get_latest(operator).await.unwrap().is_none());

    for version in 1..=3 {
        repo.create(NewOperatorWrapKey {
            operator_id: operator,
            version,
            protected_key: format!("blob-v{version}"),
        })
        .await
        .unwrap();
    }

    let latest = repo.get_latest(operator).await.unwrap().unwrap();
    assert_eq!(latest.version, 3);

    let v2 = repo.get_by_version(operator, 2).await.unwrap();
    assert_eq!(v2.protected_key, "blob-v2");

    let missing = repo.get_by_version(operator, 9).await;
    assert!(matches!(missing, Err(CaError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_wrap_key_version_rejected() {
    let db = setup().await;
    let repo = SurrealWrapKeyRepository::new(db);
    let operator = Uuid::new_v4();

    repo.create(NewOperatorWrapKey {
        operator_id: operator,
        version: 1,
        protected_key: "blob".into(),
    })
    .await
    .unwrap();

    let again = repo
        .create(NewOperatorWrapKey {
            operator_id: operator,
            version: 1,
            protected_key: "other".into(),
        })
        .await;
    assert!(matches!(again, Err(CaError::Conflict { .. })));
}

// -----------------------------------------------------------------------
// Chain assignment tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn assignment_lookup_and_root_listing() {
    let db = setup().await;
    let repo = SurrealChainAssignmentRepository::new(db);
    let operator = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let root_a = Uuid::new_v4();
    let root_b = Uuid::new_v4();

    repo.create(NewChainAssignment {
        operator_id: operator,
        chain_root_id: root_a,
        assigned_by: Some(admin),
    })
    .await
    .unwrap();
    repo.create(NewChainAssignment {
        operator_id: operator,
        chain_root_id: root_b,
        assigned_by: None,
    })
    .await
    .unwrap();

    let active = repo.get_active(operator, root_a).await.unwrap().unwrap();
    assert_eq!(active.assigned_by, Some(admin));
    assert!(active.active);

    let none = repo.get_active(operator, Uuid::new_v4()).await.unwrap();
    assert!(none.is_none());

    let mut roots = repo.list_roots_for_operator(operator).await.unwrap();
    roots.sort();
    let mut expected = vec![root_a, root_b];
    expected.sort();
    assert_eq!(roots, expected);
}

#[tokio::test]
async fn duplicate_assignment_rejected() {
    let db = setup().await;
    let repo = SurrealChainAssignmentRepository::new(db);
    let operator = Uuid::new_v4();
    let root = Uuid::new_v4();

    repo.create(NewChainAssignment {
        operator_id: operator,
        chain_root_id: root,
        assigned_by: None,
    })
    .await
    .unwrap();

    let again = repo
        .create(NewChainAssignment {
            operator_id: operator,
            chain_root_id: root,
            assigned_by: None,
        })
        .await;
    assert!(matches!(again, Err(CaError::Conflict { .. })));
}

// -----------------------------------------------------------------------
// Operator tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_operator() {
    let db = setup().await;
    let repo = SurrealOperatorRepository::new(db);

    let op = repo
        .create(NewOperator {
            name: "alice".into(),
            organization: "ACME".into(),
            is_admin: false,
        })
        .await
        .unwrap();

    assert_eq!(op.name, "alice");
    assert_eq!(op.organization, "ACME");
    assert!(!op.is_admin);

    let fetched = repo.get_by_id(op.id).await.unwrap();
    assert_eq!(fetched.id, op.id);

    let missing = repo.get_by_id(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(CaError::NotFound { .. })));
}
