use pretty_assertions::assert_eq;
use tests::{fixtures::*, setup};
use weft::stmt::{Direction, Expr, FieldRef, Query, Strategy, Value};

fn names(rows: &[Value]) -> Vec<Value> {
    rows.iter()
        .map(|row| row.expect_record()[0].clone())
        .collect()
}

#[tokio::test]
async fn filter_order_and_project() {
    let (db, _log) = setup();
    for name in ["ann", "bob", "cat"] {
        seed_user(&db, name, &[]).await;
    }
    let schema = db.schema().clone();
    let name = field(&schema, USER, "name");

    let rows = db
        .rows(
            &Query::new(USER)
                .filter(Expr::ne(name, "bob"))
                .order_by(name, Direction::Desc)
                .select([name]),
        )
        .await
        .unwrap();

    assert_eq!(names(&rows), ["cat", "ann"].map(Value::from));
}

#[tokio::test]
async fn filter_through_a_join() {
    let (db, _log) = setup();
    seed_user(&db, "ann", &["a1", "a2"]).await;
    seed_user(&db, "bob", &["b1"]).await;
    seed_user(&db, "cat", &[]).await;

    let schema = db.schema().clone();
    let todos = field(&schema, USER, "todos");
    let title = field(&schema, TODO, "title");
    let name = field(&schema, USER, "name");
    let on = todos.join_on().unwrap();

    let rows = db
        .rows(
            &Query::new(USER)
                .inner_join(todos)
                .filter(Expr::eq(FieldRef::joined(title, on), "b1"))
                .select([name]),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), [Value::from("bob")]);

    // One row per user with at least one todo
    let rows = db
        .rows(
            &Query::new(USER)
                .inner_join(todos)
                .group_by([schema.model(USER).primary_key])
                .select([name]),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), ["ann", "bob"].map(Value::from));

    // Entities read through a plain join are not repeated
    let users = db.all(&Query::new(USER).inner_join(todos)).await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(get(&schema, USER, &users[0], "todos").is_null());

    // Left join keeps users without todos
    let users = db.all(&Query::new(USER).left_join(todos)).await.unwrap();
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn unreachable_fields_are_rejected() {
    let (db, log) = setup();
    let schema = db.schema().clone();

    let err = db
        .rows(&Query::new(USER).filter(Expr::eq(field(&schema, TODO, "title"), "a")))
        .await
        .unwrap_err();

    assert!(err.is_invalid_statement());
    assert_eq!(
        err.to_string(),
        "invalid statement: field `todo.title` is not reachable from `user`"
    );
    assert_eq!(log.reads(), 0);
}

#[test]
fn compose_leaves_fragments_untouched() {
    let schema = schema();
    let name = field(&schema, USER, "name");
    let email = field(&schema, USER, "email");
    let todos = field(&schema, USER, "todos");

    let base = Query::new(USER).filter(Expr::ne(name, "bob"));
    let snapshot = base.clone();

    let by_name = base
        .clone()
        .compose(Query::new(USER).order_by(name, Direction::Asc))
        .unwrap();
    let with_todos = base
        .clone()
        .compose(
            Query::new(USER)
                .filter(Expr::is_null(email))
                .preload(todos, Strategy::Joined),
        )
        .unwrap();

    assert_eq!(base, snapshot);
    assert_eq!(by_name.filters, base.filters);
    assert!(by_name.preloads.is_empty());
    assert_eq!(with_todos.filters.len(), 2);
    assert_eq!(with_todos.joins.len(), 1);
    assert!(with_todos.order_by.is_empty());

    // Associative
    let a = Query::new(USER).filter(Expr::ne(name, "a"));
    let b = Query::new(USER).preload(todos, Strategy::Separate);
    let c = Query::new(USER)
        .preload(todos, Strategy::Joined)
        .order_by(name, Direction::Desc);

    assert_eq!(
        a.clone().compose(b.clone()).unwrap().compose(c.clone()).unwrap(),
        a.compose(b.compose(c).unwrap()).unwrap()
    );

    let err = Query::new(USER).compose(Query::new(TODO)).unwrap_err();
    assert!(err.is_invalid_statement());
}

#[test]
fn textual_form() {
    let schema = schema();
    let name = field(&schema, USER, "name");
    let todos = field(&schema, USER, "todos");
    let profile = field(&schema, USER, "profile");

    let query = Query::new(USER)
        .preload(todos, Strategy::Joined)
        .preload(profile, Strategy::Separate)
        .filter(Expr::eq(name, "ann"))
        .group_by([schema.model(USER).primary_key])
        .order_by(name, Direction::Asc);

    assert_eq!(
        query.display(&schema).to_string(),
        "SOURCE user LEFT JOIN todo ON user.id = todo.user_id \
         WHERE user.name = 'ann' \
         GROUP BY user.id \
         ORDER BY user.name ASC \
         PRELOAD todos:joined,profile:separate"
    );
}
