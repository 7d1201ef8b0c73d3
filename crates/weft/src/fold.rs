//! Rebuilding parent and child graphs from flat rows.
//!
//! A joined read returns one row per combination of parent and joined
//! children, so the same parent and the same child can appear many times.
//! [`fold`] collapses those rows back into one record per parent with its
//! preloaded association slots filled. [`merge`] does the same for children
//! fetched by a separate read. For the same data both produce the same
//! records.

use indexmap::IndexMap;
use weft_core::{
    schema::{Cardinality, Field},
    stmt::{Query, Strategy, Value, ValueRecord},
    Error, Result, Schema,
};

/// Where one joined preload sits in a flat row.
struct Segment<'a> {
    relation: &'a Field,
    start: usize,
    len: usize,
    key: usize,
}

/// Folds the flat rows of `query` into one record per distinct parent, in
/// order of first appearance.
///
/// Each row holds the source model's fields followed by the fields of every
/// join. Joined preloads fill their association slot: many-associations get
/// the distinct children in order of first appearance, one-associations
/// the first child found. Columns of other joins are dropped.
pub fn fold(schema: &Schema, query: &Query, rows: Vec<ValueRecord>) -> Result<Vec<ValueRecord>> {
    let source = schema.model(query.source);
    let width = source.fields.len();

    let mut starts = Vec::with_capacity(query.joins.len());
    let mut total = width;
    for join in &query.joins {
        starts.push(total);
        total += schema.model(join.target).fields.len();
    }

    let mut segments = vec![];
    for preload in &query.preloads {
        if preload.strategy != Strategy::Joined {
            continue;
        }

        let relation = schema.field(preload.field);
        let target = relation
            .relation_target_id()
            .map(|id| schema.model(id))
            .ok_or_else(|| Error::invalid_statement("preload of a non-association field"))?;
        let on = relation
            .join_on()
            .ok_or_else(|| Error::invalid_statement("preload of a non-association field"))?;
        let index = query.join_index(target.id, on).ok_or_else(|| {
            Error::invalid_statement(format!(
                "joined preload `{}` has no matching join",
                schema.qualified_name(relation.id)
            ))
        })?;

        segments.push(Segment {
            relation,
            start: starts[index],
            len: target.fields.len(),
            key: target.primary_key.index,
        });
    }

    let mut groups: IndexMap<Value, (ValueRecord, Vec<IndexMap<Value, ValueRecord>>)> =
        IndexMap::new();

    for row in rows {
        if row.len() != total {
            return Err(Error::invalid_statement(format!(
                "row has {} values, expected {total}",
                row.len()
            )));
        }

        let key = row[source.primary_key.index].clone();
        let (_, children) = groups.entry(key).or_insert_with(|| {
            (
                ValueRecord::from_vec(row[..width].to_vec()),
                segments.iter().map(|_| IndexMap::new()).collect(),
            )
        });

        for (segment, children) in segments.iter().zip(children.iter_mut()) {
            let child = &row[segment.start..segment.start + segment.len];

            // A left join without a match pads the child with nulls
            let child_key = &child[segment.key];
            if child_key.is_null() {
                continue;
            }

            children
                .entry(child_key.clone())
                .or_insert_with(|| ValueRecord::from_vec(child.to_vec()));
        }
    }

    Ok(groups
        .into_values()
        .map(|(mut parent, children)| {
            for (segment, children) in segments.iter().zip(children) {
                parent[segment.relation.id.index] =
                    slot(segment.relation, children.into_values().collect());
            }
            parent
        })
        .collect())
}

/// The distinct non-null values `parents` hold for the key `relation` joins
/// on, in order of first appearance. A separate preload reads children
/// matching this set.
pub fn parent_keys(parents: &[ValueRecord], relation: &Field) -> Vec<Value> {
    let Some(on) = relation.join_on() else {
        return vec![];
    };

    let mut keys = indexmap::IndexSet::new();
    for parent in parents {
        let key = &parent[on.source.index];
        if !key.is_null() {
            keys.insert(key.clone());
        }
    }
    keys.into_iter().collect()
}

/// Assigns separately read `children` to the `relation` slot of each parent.
pub fn merge(parents: Vec<ValueRecord>, relation: &Field, children: Vec<ValueRecord>) -> Vec<ValueRecord> {
    let Some(on) = relation.join_on() else {
        return parents;
    };

    let mut by_key: IndexMap<Value, Vec<ValueRecord>> = IndexMap::new();
    for child in children {
        let key = child[on.target.index].clone();
        by_key.entry(key).or_default().push(child);
    }

    parents
        .into_iter()
        .map(|mut parent| {
            let key = &parent[on.source.index];
            let children = if key.is_null() {
                vec![]
            } else {
                by_key.get(key).cloned().unwrap_or_default()
            };

            parent[relation.id.index] = slot(relation, children);
            parent
        })
        .collect()
}

fn slot(relation: &Field, children: Vec<ValueRecord>) -> Value {
    match relation.cardinality() {
        Some(Cardinality::Many) => Value::List(children.into_iter().map(Value::Record).collect()),
        _ => children.into_iter().next().map(Value::Record).unwrap_or_default(),
    }
}
