//! Delete policy planning.
//!
//! Storage adapters call [`plan`] before deleting a record. The plan holds
//! every effect of the delete, computed before anything is mutated, so a
//! `Restrict` violation anywhere in the graph leaves storage untouched. A
//! `Restrict` association blocks the delete whenever it has children, no
//! matter which other policies reach the same records.

use crate::{
    schema::{Field, FieldId, ModelId, OnDelete, Schema},
    stmt::{Value, ValueRecord},
    Error, Result,
};

use indexmap::IndexSet;

/// Read access to child records, provided by the storage adapter.
pub trait ChildSource {
    /// Records of `fk.model` whose `fk` column equals `value`.
    fn children(&self, fk: FieldId, value: &Value) -> Result<Vec<ValueRecord>>;
}

/// Effects of deleting a record, in the order they must be applied:
/// nullifications first, then deletions.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CascadePlan {
    /// Records to delete, as `(model, primary key)`, in discovery order.
    pub deletes: Vec<(ModelId, Value)>,

    /// Records to keep with some columns cleared.
    pub nullify: Vec<Nullify>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nullify {
    pub model: ModelId,
    pub key: Value,
    pub columns: Vec<FieldId>,
}

impl CascadePlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.nullify.is_empty()
    }

    /// Number of records touched
    pub fn len(&self) -> usize {
        self.deletes.len() + self.nullify.len()
    }
}

/// Plans the delete of `record`, an instance of `model`. The record itself is
/// the first entry of `deletes`.
pub fn plan(
    schema: &Schema,
    model: ModelId,
    record: &ValueRecord,
    source: &impl ChildSource,
) -> Result<CascadePlan> {
    let mut planner = Planner::new(schema, source);
    planner.delete(model, record.clone());
    planner.run()?;
    Ok(planner.finish())
}

/// Plans the policy of a single association for the parent whose referenced
/// key is `parent`. The parent itself is not deleted.
pub fn plan_relation(
    schema: &Schema,
    relation: FieldId,
    parent: &Value,
    source: &impl ChildSource,
) -> Result<CascadePlan> {
    let field = schema.field(relation);

    if field.on_delete().is_none() {
        return Err(Error::invalid_statement(format!(
            "`{}` does not carry a delete policy",
            schema.qualified_name(relation)
        )));
    }

    let mut planner = Planner::new(schema, source);
    planner.apply(field, parent)?;
    planner.run()?;
    Ok(planner.finish())
}

struct Planner<'a, S> {
    schema: &'a Schema,
    source: &'a S,

    /// Records scheduled for deletion
    visited: IndexSet<(ModelId, Value)>,

    /// Deleted records whose dependents have not been visited yet
    pending: Vec<(ModelId, ValueRecord)>,

    nullify: Vec<Nullify>,
}

impl<'a, S: ChildSource> Planner<'a, S> {
    fn new(schema: &'a Schema, source: &'a S) -> Self {
        Planner {
            schema,
            source,
            visited: IndexSet::new(),
            pending: vec![],
            nullify: vec![],
        }
    }

    fn delete(&mut self, model: ModelId, record: ValueRecord) {
        let key = self.schema.model(model).key_of(&record).clone();

        // A record reached twice (self-referential trees, diamonds) is only
        // deleted and expanded once.
        if self.visited.insert((model, key)) {
            self.pending.push((model, record));
        }
    }

    fn run(&mut self) -> Result<()> {
        let schema = self.schema;
        let mut next = 0;

        while next < self.pending.len() {
            let (model, record) = self.pending[next].clone();
            next += 1;

            for field in schema.model(model).dependents() {
                let Some(fk) = field.foreign_key() else {
                    continue;
                };
                let parent = &record[fk.target.index];

                if parent.is_null() {
                    continue;
                }

                self.apply(field, parent)?;
            }
        }

        Ok(())
    }

    fn apply(&mut self, field: &Field, parent: &Value) -> Result<()> {
        let (Some(fk), Some(on_delete)) = (field.foreign_key(), field.on_delete()) else {
            return Ok(());
        };

        if *on_delete == OnDelete::None {
            return Ok(());
        }

        let schema = self.schema;
        let child_model = schema.model(fk.source.model);
        let children = self.source.children(fk.source, parent)?;

        match on_delete {
            OnDelete::None => {}
            OnDelete::Cascade => {
                for child in children {
                    self.delete(child_model.id, child);
                }
            }
            OnDelete::Nullify(columns) => {
                for child in children {
                    self.nullify.push(Nullify {
                        model: child_model.id,
                        key: child_model.key_of(&child).clone(),
                        columns: columns.clone(),
                    });
                }
            }
            // Any referencing child blocks the delete, even one another
            // association of the same parent would remove.
            OnDelete::Restrict if !children.is_empty() => {
                tracing::debug!(
                    association = %schema.qualified_name(field.id),
                    children = children.len(),
                    "delete blocked by restrict policy"
                );
                return Err(Error::constraint_violation(
                    schema.qualified_name(field.id),
                    children.len(),
                ));
            }
            OnDelete::Restrict => {}
        }

        Ok(())
    }

    fn finish(self) -> CascadePlan {
        let visited = self.visited;

        // Nullifying a record that is deleted anyway is pointless
        let nullify = self
            .nullify
            .into_iter()
            .filter(|nullify| !visited.contains(&(nullify.model, nullify.key.clone())))
            .collect();

        CascadePlan {
            deletes: visited.into_iter().collect(),
            nullify,
        }
    }
}
