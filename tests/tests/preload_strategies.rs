use pretty_assertions::assert_eq;
use tests::{fixtures::*, setup, setup_with, ExecLog, LoggingDriver};
use weft::{
    stmt::{Query, Strategy, Value},
    Changeset, Db, Plan,
};
use weft_core::driver::{Operation, Transaction};
use weft_driver_memory::Memory;

/// ann: two todos and a profile, bob: one todo, cat: nothing
async fn seed(db: &Db) -> Value {
    let schema = db.schema();

    let ann = seed_user(db, "ann", &["a1", "a2"]).await;
    seed_user(db, "bob", &["b1"]).await;
    seed_user(db, "cat", &[]).await;

    let ann_id = get(schema, USER, &ann, "id").clone();
    db.save(
        Changeset::new(schema, PROFILE)
            .put_change("user_id", ann_id.clone())
            .put_change("bio", "hi"),
    )
    .await
    .unwrap();

    ann_id
}

fn user_query(db: &Db, strategy: Strategy) -> Query {
    let schema = db.schema();
    Query::new(USER)
        .preload(field(schema, USER, "todos"), strategy)
        .preload(field(schema, USER, "profile"), strategy)
}

#[tokio::test]
async fn joined_and_separate_yield_the_same_graph() {
    let (db, log) = setup();
    seed(&db).await;
    let schema = db.schema().clone();

    log.clear();
    let joined = db.all(&user_query(&db, Strategy::Joined)).await.unwrap();
    assert_eq!(log.reads(), 1);

    log.clear();
    let separate = db.all(&user_query(&db, Strategy::Separate)).await.unwrap();
    assert_eq!(log.reads(), 3);

    assert_eq!(joined, separate);

    assert_eq!(joined.len(), 3);
    assert_eq!(children(&schema, USER, &joined[0], "todos").len(), 2);
    assert_eq!(children(&schema, USER, &joined[1], "todos").len(), 1);
    assert!(children(&schema, USER, &joined[2], "todos").is_empty());

    assert!(get(&schema, USER, &joined[0], "profile").is_record());
    assert!(get(&schema, USER, &joined[1], "profile").is_null());
}

#[tokio::test]
async fn belongs_to_preload() {
    let (db, _log) = setup();
    seed(&db).await;
    let schema = db.schema().clone();
    let user = field(&schema, TODO, "user");

    let joined = db
        .all(&Query::new(TODO).preload(user, Strategy::Joined))
        .await
        .unwrap();
    let separate = db
        .all(&Query::new(TODO).preload(user, Strategy::Separate))
        .await
        .unwrap();

    assert_eq!(joined, separate);

    let owners: Vec<_> = joined
        .iter()
        .map(|todo| {
            let owner = get(&schema, TODO, todo, "user").expect_record();
            get(&schema, USER, owner, "name").clone()
        })
        .collect();
    assert_eq!(owners, ["ann", "ann", "bob"].map(Value::from));
}

#[tokio::test]
async fn sequential_preload_matches_concurrent() {
    let (concurrent, _log) = setup();
    let (sequential, _log) = setup_with(schema(), LoggingDriver::new(Memory::new()), |builder| {
        builder.concurrent_preload(false);
    });

    seed(&concurrent).await;
    seed(&sequential).await;

    assert_eq!(
        concurrent
            .all(&user_query(&concurrent, Strategy::Separate))
            .await
            .unwrap(),
        sequential
            .all(&user_query(&sequential, Strategy::Separate))
            .await
            .unwrap(),
    );
}

#[tokio::test]
async fn get_with_preloads() {
    let (db, _log) = setup();
    let ann_id = seed(&db).await;
    let schema = db.schema().clone();

    for strategy in [Strategy::Joined, Strategy::Separate] {
        let ann = db.get(user_query(&db, strategy), ann_id.clone()).await.unwrap();
        assert_eq!(get(&schema, USER, &ann, "name"), &Value::from("ann"));
        assert_eq!(children(&schema, USER, &ann, "todos").len(), 2);
    }

    let err = db.get(Query::new(USER), 999).await.unwrap_err();
    assert!(err.is_record_not_found());
}

#[tokio::test]
async fn preloads_inside_a_plan_see_uncommitted_writes() {
    let (db, log) = setup();
    let ann_id = seed(&db).await;
    let schema = db.schema().clone();

    log.clear();

    let plan = Plan::new()
        .insert("todo", new_todo(&schema, &ann_id, "a3"))
        .read("users", user_query(&db, Strategy::Separate));

    let results = db.run(plan).await.into_result().unwrap();
    let users = results.records("users");

    assert_eq!(children(&schema, USER, users[0], "todos").len(), 3);

    // Every read went through the transaction's connection
    assert_reads_in_transaction(&log);
}

fn assert_reads_in_transaction(log: &ExecLog) {
    log.with_ops(|ops| {
        let first = ops.first().map(|op| &op.operation);
        let last = ops.last().map(|op| &op.operation);

        assert_eq!(first, Some(&Operation::Transaction(Transaction::Start)));
        assert_eq!(last, Some(&Operation::Transaction(Transaction::Commit)));
    });
    assert_eq!(log.reads(), 3);
}

#[tokio::test]
async fn projections_are_rows_not_entities() {
    let (db, _log) = setup();
    seed(&db).await;
    let schema = db.schema().clone();
    let name = field(&schema, USER, "name");

    let err = db
        .all(&Query::new(USER).select([name]))
        .await
        .unwrap_err();
    assert!(err.is_invalid_statement());

    let rows = db.rows(&Query::new(USER).select([name])).await.unwrap();
    assert_eq!(rows.len(), 3);
}
