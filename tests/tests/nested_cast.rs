use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{fixtures::*, setup, setup_with, LoggingDriver};
use weft::{
    changeset::Action,
    nested_cast,
    stmt::{Query, Strategy, Value, ValueRecord},
    Changeset, Db, NestedCast,
};
use weft_core::AssociationErrorKind;
use weft_driver_memory::Memory;

fn todo_cast() -> NestedCast {
    NestedCast::new(&["title", "done"])
}

/// The user with key `id`, `todos` preloaded.
async fn load_user(db: &Db, id: &Value) -> ValueRecord {
    let todos = field(db.schema(), USER, "todos");
    db.get(Query::new(USER).preload(todos, Strategy::Separate), id.clone())
        .await
        .unwrap()
}

fn titles(db: &Db, user: &ValueRecord) -> Vec<Value> {
    children(db.schema(), USER, user, "todos")
        .into_iter()
        .map(|todo| get(db.schema(), TODO, todo, "title").clone())
        .collect()
}

fn ids(db: &Db, user: &ValueRecord) -> Vec<i64> {
    children(db.schema(), USER, user, "todos")
        .into_iter()
        .map(|todo| get(db.schema(), TODO, todo, "id").as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn recasting_stable_identities_inserts_nothing() {
    let (db, log) = setup();
    let schema = db.schema().clone();

    let user = seed_user(&db, "ann", &[]).await;
    let id = get(&schema, USER, &user, "id").clone();

    let user = load_user(&db, &id).await;
    let changeset = nested_cast(
        Changeset::for_entity(&schema, USER, user),
        "todos",
        &json!([{ "title": "a" }, { "title": "b" }]),
        &todo_cast(),
    )
    .unwrap();
    db.save(changeset).await.unwrap();

    let user = load_user(&db, &id).await;
    let [a, b] = ids(&db, &user)[..] else {
        panic!("expected two todos");
    };
    let input = json!([{ "id": a, "title": "a" }, { "id": b, "title": "b" }]);

    for _ in 0..2 {
        log.clear();

        let user = load_user(&db, &id).await;
        let changeset = nested_cast(
            Changeset::for_entity(&schema, USER, user),
            "todos",
            &input,
            &todo_cast(),
        )
        .unwrap();

        assert!(changeset
            .nested("todos")
            .iter()
            .all(|child| child.is_persisted() && !child.has_changes()));

        db.save(changeset).await.unwrap();

        assert_eq!(log.inserts(TODO), 0);
        assert_eq!(log.updates(TODO), 0);
    }

    assert_eq!(db.all(&Query::new(TODO)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dropped_children_are_untouched_without_delete_missing() {
    let (db, log) = setup();
    let schema = db.schema().clone();

    let user = seed_user(&db, "ann", &["a", "b", "c"]).await;
    let id = get(&schema, USER, &user, "id").clone();
    let user = load_user(&db, &id).await;
    let [a, b, _c] = ids(&db, &user)[..] else {
        panic!("expected three todos");
    };

    log.clear();

    let changeset = nested_cast(
        Changeset::for_entity(&schema, USER, user),
        "todos",
        &json!([
            { "id": a, "title": "a" },
            { "id": b, "title": "b" },
            { "title": "d" },
        ]),
        &todo_cast(),
    )
    .unwrap();

    // The dropped child is not part of the nested changesets
    assert_eq!(changeset.nested("todos").len(), 3);

    let saved = db.save(changeset).await.unwrap();

    assert_eq!(log.inserts(TODO), 1);
    assert_eq!(log.updates(TODO), 0);
    assert_eq!(titles(&db, &saved), ["a", "b", "c", "d"].map(Value::from));

    let reloaded = load_user(&db, &id).await;
    assert_eq!(titles(&db, &reloaded), ["a", "b", "c", "d"].map(Value::from));
    assert_eq!(
        children(&schema, USER, &reloaded, "todos")
            .iter()
            .map(|todo| get(&schema, TODO, todo, "user_id").clone())
            .collect::<Vec<_>>(),
        vec![id.clone(); 4]
    );
}

#[tokio::test]
async fn delete_missing_removes_dropped_children() {
    let (db, _log) = setup_with(
        schema_with_todos(|todos| todos.delete_missing(true)),
        LoggingDriver::new(Memory::new()),
        |_| {},
    );
    let schema = db.schema().clone();

    let user = seed_user(&db, "ann", &["a", "b", "c"]).await;
    let id = get(&schema, USER, &user, "id").clone();
    let user = load_user(&db, &id).await;
    let [a, b, c] = ids(&db, &user)[..] else {
        panic!("expected three todos");
    };

    let changeset = nested_cast(
        Changeset::for_entity(&schema, USER, user),
        "todos",
        &json!([{ "id": a, "title": "a" }, { "id": b, "title": "b2" }, { "title": "d" }]),
        &todo_cast(),
    )
    .unwrap();

    let deletes = changeset
        .nested("todos")
        .iter()
        .filter(|child| child.action() == Action::Delete)
        .count();
    assert_eq!(deletes, 1);

    let saved = db.save(changeset).await.unwrap();
    assert_eq!(titles(&db, &saved), ["a", "b2", "d"].map(Value::from));

    let todos = db.all(&Query::new(TODO)).await.unwrap();
    assert_eq!(todos.len(), 3);
    assert!(todos
        .iter()
        .all(|todo| get(&schema, TODO, todo, "id") != &Value::I64(c)));
}

#[tokio::test]
async fn duplicate_identities_conflict() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    let user = seed_user(&db, "ann", &["a"]).await;
    let id = get(&schema, USER, &user, "id").clone();
    let user = load_user(&db, &id).await;
    let [a] = ids(&db, &user)[..] else {
        panic!("expected one todo");
    };

    let err = nested_cast(
        Changeset::for_entity(&schema, USER, user),
        "todos",
        &json!([{ "id": a, "title": "x" }, { "id": a.to_string(), "title": "y" }]),
        &todo_cast(),
    )
    .unwrap_err();

    assert!(err.is_identity_conflict());
    assert_eq!(
        err.to_string(),
        format!("identity conflict: `user.todos` received identity ({a}) more than once")
    );
}

#[tokio::test]
async fn persisted_parent_needs_loaded_children() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    let user = seed_user(&db, "ann", &["a"]).await;

    let err = nested_cast(
        Changeset::for_entity(&schema, USER, user),
        "todos",
        &json!([]),
        &todo_cast(),
    )
    .unwrap_err();

    assert_eq!(err.association_kind(), Some(AssociationErrorKind::NotLoaded));
}

#[tokio::test]
async fn has_one_and_belongs_to_children() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    let user = nested_cast(
        new_user(&schema, "ann"),
        "profile",
        &json!({ "bio": "hello" }),
        &NestedCast::new(&["bio"]),
    )
    .unwrap();

    let user = db.save(user).await.unwrap();
    let user_id = get(&schema, USER, &user, "id").clone();

    let profile = get(&schema, USER, &user, "profile").expect_record();
    assert_eq!(get(&schema, PROFILE, profile, "bio"), &Value::from("hello"));
    assert_eq!(get(&schema, PROFILE, profile, "user_id"), &user_id);

    // The owner is written first so the todo can reference it
    let todo = nested_cast(
        Changeset::new(&schema, TODO).put_change("title", "write tests"),
        "user",
        &json!({ "name": "bob" }),
        &NestedCast::new(&["name"]),
    )
    .unwrap();

    assert!(todo.is_deferred("user_id"));

    let todo = db.save(todo).await.unwrap();
    let owner = get(&schema, TODO, &todo, "user").expect_record();

    assert_eq!(get(&schema, USER, owner, "name"), &Value::from("bob"));
    assert_eq!(
        get(&schema, TODO, &todo, "user_id"),
        get(&schema, USER, owner, "id")
    );
}

#[tokio::test]
async fn nested_children_are_cast_recursively() {
    let (db, _log) = setup();
    let schema = db.schema().clone();

    let children = NestedCast::new(&["name"]);
    let cast = NestedCast::new(&["name"]).nest("children", children.clone().nest("children", children));

    let root = nested_cast(
        Changeset::new(&schema, CATEGORY).put_change("name", "root"),
        "children",
        &json!([
            { "name": "a", "children": [{ "name": "a1" }, { "name": "a2" }] },
            { "name": "b" },
        ]),
        &cast,
    )
    .unwrap();

    assert!(root.is_valid(), "{}", root.error_summary());

    db.save(root).await.unwrap();

    let rows = db
        .rows(&Query::new(CATEGORY).select([field(&schema, CATEGORY, "name")]))
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);
}
