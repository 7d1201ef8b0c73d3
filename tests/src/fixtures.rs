//! Models shared by the integration tests.
//!
//! ```text
//! user     id, name*, email, todos -> [todo], profile -> profile
//! todo     id, user_id, title*, done, rank, user -> user
//! profile  id, user_id, bio
//! category id, parent_id, name*, children -> [category]
//! ```

use std::sync::Arc;
use weft::{
    schema::{Field, ModelDef, ModelId, RelationDef},
    stmt::{Type, Value, ValueRecord},
    Changeset, Db, Schema,
};

pub const USER: ModelId = ModelId(0);
pub const TODO: ModelId = ModelId(1);
pub const PROFILE: ModelId = ModelId(2);
pub const CATEGORY: ModelId = ModelId(3);

pub fn schema() -> Schema {
    schema_with_todos(|todos| todos)
}

/// The fixture schema with the `user.todos` association adjusted by `f`. The
/// association starts out cascading with `rank` as its position field.
pub fn schema_with_todos(f: impl FnOnce(RelationDef) -> RelationDef) -> Schema {
    let todos = RelationDef::has_many("todos", "todo", "user_id")
        .cascade()
        .position("rank");

    Schema::builder()
        .model(
            ModelDef::new("user")
                .key("id", Type::I64)
                .required("name", Type::String)
                .field("email", Type::String)
                .relation(f(todos))
                .relation(RelationDef::has_one("profile", "profile", "user_id").cascade()),
        )
        .model(
            ModelDef::new("todo")
                .key("id", Type::I64)
                .field("user_id", Type::I64)
                .required("title", Type::String)
                .field("done", Type::Bool)
                .field("rank", Type::I64)
                .relation(RelationDef::belongs_to("user", "user", "user_id")),
        )
        .model(
            ModelDef::new("profile")
                .key("id", Type::I64)
                .field("user_id", Type::I64)
                .field("bio", Type::String),
        )
        .model(
            ModelDef::new("category")
                .key("id", Type::I64)
                .field("parent_id", Type::I64)
                .required("name", Type::String)
                .relation(RelationDef::has_many("children", "category", "parent_id").cascade()),
        )
        .build()
        .expect("fixture schema is valid")
}

/// Looks up `model.name`.
pub fn field<'a>(schema: &'a Schema, model: ModelId, name: &str) -> &'a Field {
    schema
        .model(model)
        .field_by_name(name)
        .unwrap_or_else(|| panic!("no field `{name}`"))
}

/// Value of `name` in a record of `model`.
pub fn get<'a>(schema: &Schema, model: ModelId, record: &'a ValueRecord, name: &str) -> &'a Value {
    &record[field(schema, model, name).id.index]
}

/// Records held by a loaded many-association slot.
pub fn children<'a>(
    schema: &Schema,
    model: ModelId,
    record: &'a ValueRecord,
    name: &str,
) -> Vec<&'a ValueRecord> {
    get(schema, model, record, name)
        .as_list()
        .unwrap_or_else(|| panic!("`{name}` is not loaded"))
        .iter()
        .map(Value::expect_record)
        .collect()
}

pub fn new_user(schema: &Arc<Schema>, name: &str) -> Changeset {
    Changeset::new(schema, USER).put_change("name", name)
}

pub fn new_todo(schema: &Arc<Schema>, user_id: &Value, title: &str) -> Changeset {
    Changeset::new(schema, TODO)
        .put_change("user_id", user_id.clone())
        .put_change("title", title)
}

/// Inserts a user with one todo per title and returns the stored user.
pub async fn seed_user(db: &Db, name: &str, titles: &[&str]) -> ValueRecord {
    let schema = db.schema();
    let user = db.save(new_user(schema, name)).await.expect("insert user");
    let id = get(schema, USER, &user, "id").clone();

    for title in titles {
        db.save(new_todo(schema, &id, title))
            .await
            .expect("insert todo");
    }

    user
}
