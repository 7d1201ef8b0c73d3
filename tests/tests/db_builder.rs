use std::time::Duration;
use tests::fixtures::*;
use weft::{stmt::Query, Changeset, Db};

#[tokio::test]
async fn connect_by_url() {
    let db = Db::builder()
        .schema(schema())
        .transaction_timeout(Duration::from_secs(1))
        .connect("memory:")
        .await
        .unwrap();

    assert_eq!(db.transaction_timeout(), Duration::from_secs(1));

    let user = db.save(new_user(db.schema(), "ann")).await.unwrap();
    assert_eq!(db.all(&Query::new(USER)).await.unwrap(), vec![user]);
}

#[tokio::test]
async fn unsupported_scheme() {
    let err = Db::builder()
        .schema(schema())
        .connect("postgres://localhost/weft")
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("unsupported storage; scheme=postgres"));
}

#[tokio::test]
async fn schema_is_required() {
    let err = Db::builder().connect("memory:").await.unwrap_err();

    assert!(err.is_invalid_schema());
}

#[tokio::test]
async fn save_rejects_deletes() {
    let db = Db::builder()
        .schema(schema())
        .connect("memory:")
        .await
        .unwrap();

    let user = db.save(new_user(db.schema(), "ann")).await.unwrap();
    let changeset = Changeset::for_entity(db.schema(), USER, user).mark_delete();

    let err = db.save(changeset).await.unwrap_err();
    assert!(err.is_invalid_statement());
    assert_eq!(db.all(&Query::new(USER)).await.unwrap().len(), 1);
}
