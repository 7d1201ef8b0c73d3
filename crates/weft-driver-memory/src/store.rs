use indexmap::IndexMap;
use weft_core::{
    cascade::{self, CascadePlan, ChildSource},
    schema::{Auto, FieldId, ModelId},
    stmt::{Value, ValueRecord},
    Error, Result, Schema,
};

/// Every table, keyed by model.
#[derive(Debug, Default, Clone)]
pub(crate) struct Store {
    tables: IndexMap<ModelId, Table>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Table {
    /// Rows keyed by primary key, in insertion order
    pub(crate) rows: IndexMap<Value, ValueRecord>,

    /// Last value handed out for an auto-increment key
    last_id: i64,
}

impl Store {
    pub(crate) fn table(&self, model: ModelId) -> Option<&Table> {
        self.tables.get(&model)
    }

    pub(crate) fn rows(&self, model: ModelId) -> impl Iterator<Item = &ValueRecord> + '_ {
        self.table(model).into_iter().flat_map(|table| table.rows.values())
    }

    pub(crate) fn insert(
        &mut self,
        schema: &Schema,
        model: ModelId,
        record: ValueRecord,
    ) -> Result<ValueRecord> {
        let model = schema.model(model);

        if record.len() != model.fields.len() {
            return Err(Error::invalid_statement(format!(
                "record for `{}` has {} values; expected {}",
                model.name,
                record.len(),
                model.fields.len()
            )));
        }

        let mut record = model.strip_relations(&record);
        let table = self.tables.entry(model.id).or_default();
        let pk = model.primary_key_field();

        if record[pk.id.index].is_null() {
            record[pk.id.index] = match pk.auto {
                Some(Auto::Increment) => {
                    table.last_id += 1;
                    Value::I64(table.last_id)
                }
                Some(Auto::Uuid) => Value::Uuid(uuid::Uuid::new_v4()),
                None => {
                    return Err(Error::invalid_statement(format!(
                        "missing primary key for `{}`",
                        model.name
                    )))
                }
            };
        } else if let Value::I64(id) = record[pk.id.index] {
            table.last_id = table.last_id.max(id);
        }

        let key = record[pk.id.index].clone();

        if table.rows.contains_key(&key) {
            return Err(Error::driver(DuplicateKey(format!(
                "{}.{} = {key}",
                model.name, pk.name
            ))));
        }

        table.rows.insert(key, record.clone());
        Ok(record)
    }

    pub(crate) fn update(
        &mut self,
        schema: &Schema,
        model: ModelId,
        key: &Value,
        changes: Vec<(usize, Value)>,
    ) -> Result<ValueRecord> {
        let model = schema.model(model);

        for (index, _) in &changes {
            let field = model.fields.get(*index).ok_or_else(|| {
                Error::invalid_statement(format!("`{}` has no field #{index}", model.name))
            })?;

            if field.is_relation() || field.primary_key {
                return Err(Error::invalid_statement(format!(
                    "`{}` cannot be updated",
                    schema.qualified_name(field.id)
                )));
            }
        }

        let row = self
            .tables
            .get_mut(&model.id)
            .and_then(|table| table.rows.get_mut(key))
            .ok_or_else(|| Error::record_not_found(format!("model={} key={key}", model.name)))?;

        for (index, value) in changes {
            row[index] = value;
        }

        Ok(row.clone())
    }

    /// Deletes a record along with everything its dependents' policies
    /// require. Returns the number of deleted records.
    pub(crate) fn delete(&mut self, schema: &Schema, model: ModelId, key: &Value) -> Result<u64> {
        let record = self
            .table(model)
            .and_then(|table| table.rows.get(key))
            .cloned()
            .ok_or_else(|| {
                Error::record_not_found(format!("model={} key={key}", schema.model(model).name))
            })?;

        let plan = cascade::plan(schema, model, &record, &*self)?;
        Ok(self.apply(plan))
    }

    pub(crate) fn cascade(
        &mut self,
        schema: &Schema,
        relation: FieldId,
        parent: &Value,
    ) -> Result<u64> {
        let plan = cascade::plan_relation(schema, relation, parent, &*self)?;
        let touched = plan.len() as u64;
        self.apply(plan);
        Ok(touched)
    }

    fn apply(&mut self, plan: CascadePlan) -> u64 {
        for nullify in plan.nullify {
            if let Some(row) = self
                .tables
                .get_mut(&nullify.model)
                .and_then(|table| table.rows.get_mut(&nullify.key))
            {
                for column in nullify.columns {
                    row[column.index] = Value::Null;
                }
            }
        }

        let mut deleted = 0;

        for (model, key) in plan.deletes {
            if let Some(table) = self.tables.get_mut(&model) {
                if table.rows.shift_remove(&key).is_some() {
                    deleted += 1;
                }
            }
        }

        deleted
    }
}

impl ChildSource for Store {
    fn children(&self, fk: FieldId, value: &Value) -> Result<Vec<ValueRecord>> {
        Ok(self
            .rows(fk.model)
            .filter(|row| row[fk.index] == *value)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
struct DuplicateKey(String);

impl std::error::Error for DuplicateKey {}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate primary key: {}", self.0)
    }
}
