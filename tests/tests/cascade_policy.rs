use pretty_assertions::assert_eq;
use std::sync::Arc;
use tests::{fixtures::*, setup, setup_with, LoggingDriver};
use weft::{
    schema::RelationDef,
    stmt::{Query, Value, ValueRecord},
    Changeset, Db,
};
use weft_core::{
    driver::{Cascade, Operation, Write},
    Connection, Driver,
};
use weft_driver_memory::Memory;

fn setup_policy(f: impl FnOnce(RelationDef) -> RelationDef) -> Db {
    setup_with(schema_with_todos(f), LoggingDriver::new(Memory::new()), |_| {}).0
}

async fn todos(db: &Db) -> Vec<ValueRecord> {
    db.all(&Query::new(TODO)).await.unwrap()
}

#[tokio::test]
async fn cascade_deletes_children() {
    let (db, log) = setup();
    let schema = db.schema().clone();

    let ann = seed_user(&db, "ann", &["a", "b"]).await;
    let bob = seed_user(&db, "bob", &["c"]).await;
    let ann_id = get(&schema, USER, &ann, "id").clone();

    let profile = Changeset::new(&schema, PROFILE).put_change("user_id", ann_id.clone());
    db.save(profile).await.unwrap();

    db.delete(USER, ann_id).await.unwrap();

    assert!(log.has_commit());
    assert_eq!(db.all(&Query::new(USER)).await.unwrap(), vec![bob.clone()]);
    assert!(db.all(&Query::new(PROFILE)).await.unwrap().is_empty());

    let remaining = todos(&db).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        get(&schema, TODO, &remaining[0], "user_id"),
        get(&schema, USER, &bob, "id")
    );
}

#[tokio::test]
async fn nullify_keeps_children() {
    let db = setup_policy(|todos| todos.nullify());
    let schema = db.schema().clone();

    let ann = seed_user(&db, "ann", &["a", "b"]).await;
    db.delete(USER, get(&schema, USER, &ann, "id").clone())
        .await
        .unwrap();

    let remaining = todos(&db).await;
    assert_eq!(remaining.len(), 2);
    assert!(remaining
        .iter()
        .all(|todo| get(&schema, TODO, todo, "user_id").is_null()));
    assert_eq!(get(&schema, TODO, &remaining[0], "title"), &Value::from("a"));
}

#[tokio::test]
async fn restrict_blocks_delete_and_changes_nothing() {
    let db = setup_policy(|todos| todos.restrict());
    let schema = db.schema().clone();

    let ann = seed_user(&db, "ann", &["a", "b"]).await;
    let ann_id = get(&schema, USER, &ann, "id").clone();
    let before = todos(&db).await;

    let err = db.delete(USER, ann_id.clone()).await.unwrap_err();

    assert!(err.is_constraint_violation());
    assert_eq!(
        err.to_string(),
        "constraint violation: `user.todos` is restricted and still has 2 child record(s)"
    );
    assert_eq!(db.all(&Query::new(USER)).await.unwrap(), vec![ann]);
    assert_eq!(todos(&db).await, before);

    // Without children the delete goes through
    let bob = seed_user(&db, "bob", &[]).await;
    db.delete(USER, get(&schema, USER, &bob, "id").clone())
        .await
        .unwrap();
}

#[tokio::test]
async fn no_policy_leaves_dangling_children() {
    let db = setup_policy(|todos| todos.no_action());
    let schema = db.schema().clone();

    let ann = seed_user(&db, "ann", &["a"]).await;
    let ann_id = get(&schema, USER, &ann, "id").clone();

    db.delete(USER, ann_id.clone()).await.unwrap();

    assert!(db.all(&Query::new(USER)).await.unwrap().is_empty());
    let remaining = todos(&db).await;
    assert_eq!(get(&schema, TODO, &remaining[0], "user_id"), &ann_id);
}

#[tokio::test]
async fn self_referential_cascade_is_transitive() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    async fn category(db: &Db, name: &str, parent: Option<&Value>) -> Value {
        let schema = db.schema();
        let changeset = Changeset::new(schema, CATEGORY)
            .put_change("name", name)
            .put_change("parent_id", parent.cloned().unwrap_or_default());
        let record = db.save(changeset).await.unwrap();
        get(schema, CATEGORY, &record, "id").clone()
    }

    let root = category(&db, "root", None).await;
    let a = category(&db, "a", Some(&root)).await;
    category(&db, "b", Some(&root)).await;
    let a1 = category(&db, "a1", Some(&a)).await;
    category(&db, "a1x", Some(&a1)).await;
    category(&db, "other", None).await;

    db.delete(CATEGORY, root).await.unwrap();

    let names: Vec<_> = db
        .all(&Query::new(CATEGORY))
        .await
        .unwrap()
        .iter()
        .map(|category| get(&schema, CATEGORY, category, "name").clone())
        .collect();

    assert_eq!(names, [Value::from("other")]);
}

#[tokio::test]
async fn adapter_applies_one_association_policy() {
    let schema = Arc::new(schema());
    let todos = field(&schema, USER, "todos").id;
    let mut conn = Memory::new().connect().await.unwrap();

    let user = ValueRecord::from_vec(vec![Value::Null, "ann".into(), Value::Null, Value::Null, Value::Null]);
    conn.exec(&schema, Write::insert(USER, user).into())
        .await
        .unwrap();

    for title in ["a", "b"] {
        let todo = ValueRecord::from_vec(vec![
            Value::Null,
            Value::I64(1),
            title.into(),
            Value::Null,
            Value::Null,
            Value::Null,
        ]);
        conn.exec(&schema, Write::insert(TODO, todo).into())
            .await
            .unwrap();
    }

    let response = conn
        .exec(
            &schema,
            Operation::Cascade(Cascade {
                relation: todos,
                parent: Value::I64(1),
            }),
        )
        .await
        .unwrap();

    assert_eq!(response.rows.into_count(), 2);

    // The parent itself is kept
    let users = conn
        .exec(&schema, Query::new(USER).into())
        .await
        .unwrap()
        .rows
        .into_values();
    assert_eq!(users.len(), 1);

    let todos = conn
        .exec(&schema, Query::new(TODO).into())
        .await
        .unwrap()
        .rows
        .into_values();
    assert!(todos.is_empty());

    // Associations without a policy cannot be cascaded
    let user_field = field(&schema, TODO, "user").id;
    let err = conn
        .exec(
            &schema,
            Operation::Cascade(Cascade {
                relation: user_field,
                parent: Value::I64(1),
            }),
        )
        .await
        .unwrap_err();
    assert!(err.is_invalid_statement());
}

#[tokio::test]
async fn failed_rollback_keeps_the_delete_error() {
    let driver = LoggingDriver::new(Memory::new()).fail_rollback();
    let (db, _) = setup_with(
        schema_with_todos(|todos| todos.restrict()),
        driver,
        |_| {},
    );
    let schema = db.schema().clone();

    let ann = seed_user(&db, "ann", &["a"]).await;

    let err = db
        .delete(USER, get(&schema, USER, &ann, "id").clone())
        .await
        .unwrap_err();

    assert!(err.is_constraint_violation());
    assert_eq!(db.all(&Query::new(USER)).await.unwrap(), vec![ann]);
}
