use super::Engine;
use crate::changeset::{Action, Changeset};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use weft_core::{
    driver::{Response, Write},
    schema::{Cardinality, Field, OwningSide},
    stmt::{Value, ValueRecord},
    Connection, Error, Result,
};

impl Engine {
    /// Writes `changeset` and every nested changeset, returning the stored
    /// entity. Association slots touched by the changeset hold what was
    /// written, merged into whatever was loaded. A delete returns `None`.
    ///
    /// Children owning the key of their parent (`belongs_to` targets) are
    /// written first so the parent can reference them. Children referencing
    /// the parent are written after it, with a deferred foreign key filled
    /// from the parent's stored key.
    #[async_recursion]
    pub(crate) async fn persist(
        &self,
        conn: &mut dyn Connection,
        changeset: Changeset,
    ) -> Result<Option<ValueRecord>> {
        let schema = self.schema.clone();
        let model = schema.model(changeset.model_id());

        if !changeset.is_valid() {
            return Err(Error::invalid_changeset(
                &model.name,
                changeset.error_summary(),
            ));
        }

        tracing::debug!(model = %model.name, action = ?changeset.action(), "persist");

        if changeset.action() == Action::Delete {
            let key = model.key_of(changeset.data()).clone();
            self.delete(conn, model.id, key).await?;
            return Ok(None);
        }

        let nested = changeset.nested_all().clone();
        let mut changeset = changeset;
        let mut written = IndexMap::new();

        for (name, children) in &nested {
            let Some((relation, fk)) = relation(model.field_by_name(name), OwningSide::ThisHasFk)
            else {
                continue;
            };

            let mut results = Vec::with_capacity(children.len());
            for child in children {
                let record = self.persist(conn, child.clone()).await?;
                if let Some(record) = &record {
                    changeset = changeset.set_change(fk.source.index, record[fk.target.index].clone());
                }
                results.push(record);
            }
            written.insert(relation.id.index, results);
        }

        let mut record = match changeset.action() {
            Action::Insert => {
                let record = model.strip_relations(&changeset.apply());
                let response = conn
                    .exec(&schema, Write::insert(model.id, record).into())
                    .await?;
                single(response)?
            }
            Action::Update if changeset.has_changes() => {
                let key = model.key_of(changeset.data()).clone();
                let response = conn
                    .exec(
                        &schema,
                        Write::update(model.id, key, changeset.change_list()).into(),
                    )
                    .await?;
                single(response)?
            }
            _ => model.strip_relations(&changeset.apply()),
        };

        for (name, children) in &nested {
            let Some((relation, fk)) = relation(model.field_by_name(name), OwningSide::OtherHasFk)
            else {
                continue;
            };

            let key = record[fk.target.index].clone();
            let mut results = Vec::with_capacity(children.len());

            for child in children {
                let child = if child.deferred().contains(&fk.source.index) {
                    child.clone().set_change(fk.source.index, key.clone())
                } else {
                    child.clone()
                };
                results.push(self.persist(conn, child).await?);
            }
            written.insert(relation.id.index, results);
        }

        for field in model.relations() {
            let index = field.id.index;
            let loaded = &changeset.data()[index];

            record[index] = match written.shift_remove(&index) {
                Some(results) => {
                    let children = nested
                        .get(&field.name)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    self.merged_slot(field, loaded, children, results)
                }
                None => loaded.clone(),
            };
        }

        Ok(Some(record))
    }

    /// The association slot after writing `children`: loaded entries are
    /// replaced by their written version, deleted ones removed and new ones
    /// appended.
    fn merged_slot(
        &self,
        relation: &Field,
        loaded: &Value,
        children: &[Changeset],
        results: Vec<Option<ValueRecord>>,
    ) -> Value {
        let Some(target) = relation.relation_target_id().map(|id| self.schema.model(id)) else {
            return loaded.clone();
        };

        let loaded = match loaded {
            Value::List(items) => items.iter().filter_map(Value::as_record).cloned().collect(),
            Value::Record(record) => vec![record.clone()],
            _ => vec![],
        };

        let mut slot: IndexMap<Value, ValueRecord> = loaded
            .into_iter()
            .map(|record| (target.key_of(&record).clone(), record))
            .collect();

        for (child, result) in children.iter().zip(results) {
            match result {
                Some(record) => {
                    slot.insert(target.key_of(&record).clone(), record);
                }
                None => {
                    slot.shift_remove(target.key_of(child.data()));
                }
            }
        }

        match relation.cardinality() {
            Some(Cardinality::Many) => Value::List(slot.into_values().map(Value::Record).collect()),
            _ => slot.into_values().last().map(Value::Record).unwrap_or_default(),
        }
    }
}

fn relation(
    field: Option<&Field>,
    side: OwningSide,
) -> Option<(&Field, weft_core::schema::ForeignKey)> {
    let field = field?;
    if field.owning_side()? != side {
        return None;
    }
    Some((field, *field.foreign_key()?))
}

fn single(response: Response) -> Result<ValueRecord> {
    response
        .rows
        .into_records()
        .into_iter()
        .next()
        .ok_or_else(|| Error::invalid_statement("adapter returned no record for a write"))
}
