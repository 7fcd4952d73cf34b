//! PostgreSQL secret backend tests
//!
//! Run with `cargo test --features postgres_tests`; each test starts its
//! own PostgreSQL container.

#![cfg(feature = "postgres_tests")]

mod common;

use common::test_db::TestDatabase;
use common::{manager_with, test_crypto, TENANT_ID};
use secret_mgt::secrets::DatabaseSecretBackend;
use secret_mgt::{
    CryptoProvider, ErrorMessage, Secret, SecretBackend, SecretId, SecretString, SecretType,
};
use std::sync::Arc;

fn stored(name: &str, value: &str) -> Secret {
    let mut secret = Secret::new(name, value).with_id(SecretId::new());
    secret.secret_type = "USER".to_string();
    secret.tenant_domain = "acme.com".to_string();
    secret
}

#[tokio::test]
async fn test_crud_round_trip() {
    let db = TestDatabase::new("secret_crud").await;
    let backend = DatabaseSecretBackend::new(db.pool().clone());
    let user = SecretType::new("USER");

    let secret = stored("db-pass", "Y2lwaGVy").with_description("primary");
    backend.add(&secret, TENANT_ID).await.unwrap();

    let by_name = backend.get_by_name("db-pass", &user, TENANT_ID).await.unwrap().unwrap();
    assert_eq!(by_name.secret_id, secret.secret_id);
    assert_eq!(by_name.secret_value.expose_secret(), "Y2lwaGVy");
    assert_eq!(by_name.description.as_deref(), Some("primary"));
    assert!(by_name.created.is_some());

    let id = secret.secret_id.clone().unwrap();
    let updated = backend.update_value(&by_name, "bmV3", TENANT_ID).await.unwrap();
    assert_eq!(updated.secret_value.expose_secret(), "bmV3");
    assert!(updated.last_modified >= by_name.last_modified);

    let described = backend.update_description(&updated, "rotated", TENANT_ID).await.unwrap();
    assert_eq!(described.description.as_deref(), Some("rotated"));

    backend.delete_by_id(&id, TENANT_ID).await.unwrap();
    assert!(backend.get_by_id(&id, TENANT_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unique_name_per_tenant_and_type() {
    let db = TestDatabase::new("secret_unique").await;
    let backend = DatabaseSecretBackend::new(db.pool().clone());

    backend.add(&stored("db-pass", "YQ=="), TENANT_ID).await.unwrap();

    let err = backend.add(&stored("db-pass", "Yg=="), TENANT_ID).await.unwrap_err();
    assert_eq!(err.error_message(), ErrorMessage::SecretAlreadyExists);

    // Another tenant may reuse the name
    backend.add(&stored("db-pass", "Yw=="), TENANT_ID + 1).await.unwrap();
}

#[tokio::test]
async fn test_reads_are_tenant_scoped() {
    let db = TestDatabase::new("secret_tenants").await;
    let backend = DatabaseSecretBackend::new(db.pool().clone());
    let user = SecretType::new("USER");

    let secret = stored("db-pass", "YQ==");
    backend.add(&secret, TENANT_ID).await.unwrap();
    let id = secret.secret_id.clone().unwrap();

    let other = TENANT_ID + 1;
    assert!(backend.get_by_id(&id, other).await.unwrap().is_none());
    assert!(backend.get_by_name("db-pass", &user, other).await.unwrap().is_none());
    assert!(backend.get_list(&user, other).await.unwrap().is_none());

    // A delete from another tenant leaves the row alone
    backend.delete_by_id(&id, other).await.unwrap();
    assert!(backend.get_by_id(&id, TENANT_ID).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_and_replace() {
    let db = TestDatabase::new("secret_list").await;
    let backend = DatabaseSecretBackend::new(db.pool().clone());
    let user = SecretType::new("USER");

    let first = stored("a", "YQ==");
    backend.add(&first, TENANT_ID).await.unwrap();
    backend.add(&stored("b", "Yg=="), TENANT_ID).await.unwrap();

    let listed = backend.get_list(&user, TENANT_ID).await.unwrap().unwrap();
    assert_eq!(listed.len(), 2);

    backend.replace(&first.clone().with_value("eg=="), TENANT_ID).await.unwrap();
    let read = backend.get_by_name("a", &user, TENANT_ID).await.unwrap().unwrap();
    assert_eq!(read.secret_value.expose_secret(), "eg==");

    // Moving "b" onto the type and name of "a" hits the unique constraint
    let mut clash = stored("a", "YQ==");
    clash.secret_id = backend.get_by_name("b", &user, TENANT_ID).await.unwrap().unwrap().secret_id;
    let err = backend.replace(&clash, TENANT_ID).await.unwrap_err();
    assert_eq!(err.error_message(), ErrorMessage::SecretAlreadyExists);
    assert!(err.is_client());

    let missing = stored("ghost", "YQ==");
    let err = backend.replace(&missing, TENANT_ID).await.unwrap_err();
    assert_eq!(err.error_message(), ErrorMessage::SecretIdDoesNotExist);
}

#[tokio::test]
async fn test_manager_stores_ciphertext_in_database() {
    let db = TestDatabase::new("secret_manager_db").await;
    let backend = Arc::new(DatabaseSecretBackend::new(db.pool().clone()));
    let manager = manager_with(backend.clone());

    let added = manager.add_secret("USER", Secret::new("db-pass", "s3cr3t!")).await.unwrap();
    manager.update_secret_value("USER", "db-pass", SecretString::new("n3w!")).await.unwrap();

    let value: String = sqlx::query_scalar("SELECT value FROM secrets WHERE id = $1")
        .bind(added.id_str())
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_ne!(value, "n3w!");
    assert_eq!(test_crypto().decode_and_decrypt(&value).unwrap(), b"n3w!");

    let read = manager.get_secret("USER", "db-pass").await.unwrap();
    assert_eq!(read.secret_value.expose_secret(), "n3w!");

    backend.health_check().await.unwrap();
}
