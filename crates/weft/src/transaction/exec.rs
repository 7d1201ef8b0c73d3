use super::{plan::Step, Action, CancelHandle, Plan, Results, TerminalState, Transaction};
use crate::{association, changeset::Changeset, engine::Engine};

use std::{collections::HashSet, sync::Arc, time::Duration};
use weft_core::{
    schema::FieldId,
    stmt::{Value, ValueRecord},
    Error, Result, Schema,
};

/// Runs `plan` in one transaction, bounded by `timeout`.
pub(crate) async fn run(engine: &Engine, timeout: Duration, plan: Plan) -> TerminalState {
    let Plan { steps, cancel } = plan;

    let mut names = HashSet::new();
    for step in &steps {
        if !names.insert(step.name.as_str()) {
            let err = Error::invalid_statement(format!("duplicate step name `{}`", step.name));
            return TerminalState::aborted(None, err, Results::default());
        }
    }

    if cancel.is_cancelled() {
        return TerminalState::aborted(None, Error::transaction_cancelled(), Results::default());
    }

    let mut tx = match Transaction::begin(engine).await {
        Ok(tx) => tx,
        Err(err) => return TerminalState::aborted(None, err, Results::default()),
    };

    let mut results = Results::default();
    let mut current = None;

    let outcome = tokio::time::timeout(
        timeout,
        run_steps(&mut tx, &engine.schema, steps, &cancel, &mut results, &mut current),
    )
    .await;

    let error = match outcome {
        Ok(Ok(())) if cancel.is_cancelled() => Some(Error::transaction_cancelled()),
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(_) => Some(Error::transaction_timed_out(timeout)),
    };

    let Some(error) = error else {
        return match tx.commit().await {
            Ok(()) => TerminalState::Committed(results),
            Err(err) => TerminalState::aborted(None, err, results),
        };
    };

    tracing::debug!(step = ?current, %error, "plan aborted");

    if let Err(err) = tx.rollback().await {
        tracing::error!(%err, "rollback failed");
    }

    TerminalState::aborted(current, error, results)
}

/// Runs every step in order. `current` names the running step so the caller
/// still knows it when the future is dropped on timeout.
async fn run_steps(
    tx: &mut Transaction,
    schema: &Arc<Schema>,
    steps: Vec<Step>,
    cancel: &CancelHandle,
    results: &mut Results,
    current: &mut Option<String>,
) -> Result<()> {
    for Step { name, run: build } in steps {
        *current = Some(name.clone());

        if cancel.is_cancelled() {
            return Err(Error::transaction_cancelled());
        }

        tracing::debug!(step = %name, "running step");

        let value = match build(results)? {
            Action::Persist(changeset) => tx
                .persist(changeset)
                .await?
                .map(Value::Record)
                .unwrap_or_default(),
            Action::Delete { model, key } => Value::I64(tx.delete(model, key).await? as i64),
            Action::Read(query) => {
                Value::List(tx.read(&query).await?.into_iter().map(Value::Record).collect())
            }
            Action::Get { query, key } => Value::Record(tx.get(query, &key).await?),
            Action::Value(value) => value,
            Action::Attach {
                parent,
                relation,
                entities,
            } => {
                let changeset = attach(schema, results, &parent, relation, entities)?;
                tx.persist(changeset)
                    .await?
                    .map(Value::Record)
                    .unwrap_or_default()
            }
        };

        results.insert(name, value);
    }

    *current = None;
    Ok(())
}

/// The changeset attaching `entities` to the record produced by `parent`.
fn attach(
    schema: &Arc<Schema>,
    results: &Results,
    parent: &str,
    relation: FieldId,
    entities: Vec<ValueRecord>,
) -> Result<Changeset> {
    let model = schema.model(relation.model);
    let qualified = schema.qualified_name(relation);

    let record = results
        .record(parent)
        .filter(|record| record.len() == model.fields.len() && !model.key_of(record).is_null())
        .ok_or_else(|| Error::missing_required_parent(&qualified))?;

    let parent = Changeset::for_entity(schema, model.id, record.clone());
    association::attach(parent, &schema.field(relation).name, entities)
}
