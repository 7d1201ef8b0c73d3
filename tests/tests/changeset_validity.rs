use pretty_assertions::assert_eq;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tests::{fixtures::*, setup, setup_with, LoggingDriver};
use weft::{
    changeset::Action,
    nested_cast,
    stmt::{Query, Value, ValueRecord},
    validate, Changeset, FieldError, Input, NestedCast, Pipeline,
};
use weft_driver_memory::Memory;

/// Validity recomputed from the raw error lists of the whole tree.
fn tree_is_valid(changeset: &Changeset) -> bool {
    changeset.errors().values().all(Vec::is_empty)
        && changeset
            .associations()
            .all(|(_, children)| children.iter().all(tree_is_valid))
}

#[tokio::test]
async fn validity_is_the_conjunction_of_the_tree() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    let cast = NestedCast::new(&["title", "done"]);

    let valid = nested_cast(
        new_user(&schema, "ann"),
        "todos",
        &json!([{ "title": "a" }, { "title": "b", "done": "true" }]),
        &cast,
    )
    .unwrap();

    let invalid_child = nested_cast(
        new_user(&schema, "ann"),
        "todos",
        &json!([{ "title": "a" }, { "title": "" }]),
        &cast,
    )
    .unwrap();

    let invalid_parent = nested_cast(
        Changeset::new(&schema, USER),
        "todos",
        &json!([{ "title": "a" }]),
        &cast,
    )
    .unwrap()
    .validate_required(&["name"]);

    for changeset in [&valid, &invalid_child, &invalid_parent] {
        assert_eq!(changeset.is_valid(), tree_is_valid(changeset));
    }

    assert!(valid.is_valid());

    // The parent's own errors are empty; the child makes it invalid
    assert!(invalid_child.errors().values().all(Vec::is_empty));
    assert!(!invalid_child.is_valid());
    assert_eq!(
        invalid_child.nested("todos")[1].errors_on("title"),
        [FieldError::validation("can't be blank")]
    );

    assert!(!invalid_parent.is_valid());
    assert!(invalid_parent.nested("todos")[0].is_valid());
}

#[tokio::test]
async fn invalid_changeset_is_rejected_without_writes() {
    let (db, log) = setup();
    let schema = db.schema().clone();

    let changeset = nested_cast(
        new_user(&schema, "ann"),
        "todos",
        &json!([{ "title": "a" }, { "title": "  " }]),
        &NestedCast::new(&["title"]),
    )
    .unwrap();

    let err = db.save(changeset).await.unwrap_err();

    assert!(err.is_invalid_changeset());
    assert_eq!(
        err.to_string(),
        "invalid changeset for `user`: todos[1].title: can't be blank"
    );

    assert!(log.has_start());
    assert!(log.has_rollback());
    assert!(!log.has_commit());
    assert_eq!(log.writes(), 0);

    assert!(db.all(&Query::new(USER)).await.unwrap().is_empty());
    assert!(db.all(&Query::new(TODO)).await.unwrap().is_empty());
}

#[tokio::test]
async fn cast_errors_suppress_business_validators() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    let email = Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap();
    let pipeline = Pipeline::new()
        .then(move |changeset| changeset.validate_format("email", &email))
        .then(|changeset| changeset.validate_length("name", 2..=20));

    let changeset = validate(
        Changeset::new(&schema, TODO),
        Input::raw(json!({ "title": "a", "rank": "first" }), &["title", "rank"]),
        &Pipeline::new().then(|changeset| changeset.validate_number("rank", 0..)),
    );

    // `rank` failed to cast, so the number check never saw it
    assert_eq!(changeset.errors_on("rank"), [FieldError::cast("expected i64")]);
    assert!(!changeset.is_valid());

    let changeset = validate(
        Changeset::new(&schema, USER),
        Input::raw(json!({ "name": "a", "email": "nope" }), &["name", "email"]),
        &pipeline,
    );

    assert_eq!(
        changeset.errors_on("email"),
        [FieldError::validation("has invalid format")]
    );
    assert_eq!(
        changeset.errors_on("name"),
        [FieldError::validation("should be at least 2 character(s)")]
    );

    let changeset = validate(
        Changeset::new(&schema, USER),
        Input::raw(json!({ "name": "ann", "email": "ann@example.com" }), &["name", "email"]),
        &pipeline,
    );

    assert!(changeset.is_valid(), "{}", changeset.error_summary());

    let user = db.save(changeset).await.unwrap();
    assert_eq!(get(&schema, USER, &user, "email"), &Value::from("ann@example.com"));
}

#[tokio::test]
async fn update_writes_only_changed_fields() {
    let (db, log) = setup();
    let schema: Arc<_> = db.schema().clone();

    let user = seed_user(&db, "ann", &[]).await;
    log.clear();

    let unchanged = Changeset::for_entity(&schema, USER, user.clone()).put_change("name", "ann");
    assert_eq!(unchanged.action(), Action::Update);
    assert!(!unchanged.has_changes());

    let stored = db.save(unchanged).await.unwrap();
    assert_eq!(stored, user);
    assert_eq!(log.writes(), 0);

    let changeset = validate(
        Changeset::for_entity(&schema, USER, user.clone()),
        Input::trusted([("email", Value::from("ann@example.com"))]),
        &Pipeline::new(),
    );

    let stored = db.save(changeset).await.unwrap();

    assert_eq!(log.updates(USER), 1);
    assert_eq!(get(&schema, USER, &stored, "name"), &Value::from("ann"));
    assert_eq!(
        get(&schema, USER, &stored, "email"),
        &Value::from("ann@example.com")
    );
}

#[tokio::test]
async fn malformed_entity_is_rejected_on_save() {
    let (db, log) = setup();

    let short = ValueRecord::from_vec(vec![Value::I64(1)]);
    let changeset = validate(
        Changeset::for_entity(db.schema(), USER, short),
        Input::None,
        &Pipeline::new(),
    );

    assert!(!changeset.is_valid());

    let err = db.save(changeset).await.unwrap_err();
    assert!(err.is_invalid_changeset());
    assert!(err
        .to_string()
        .contains("base: is invalid (record has 1 values, expected 5)"));
    assert_eq!(log.writes(), 0);
}

#[tokio::test]
async fn failed_rollback_keeps_the_save_error() {
    let driver = LoggingDriver::new(Memory::new()).fail_rollback();
    let (db, _) = setup_with(schema(), driver, |_| {});

    let changeset = new_user(db.schema(), "  ");
    let changeset = validate(changeset, Input::None, &Pipeline::new());

    let err = db.save(changeset).await.unwrap_err();

    assert!(err.is_invalid_changeset());
    assert!(db.all(&Query::new(USER)).await.unwrap().is_empty());
}
