use crate::Store;

use std::{cmp::Ordering, collections::HashSet};
use weft_core::{
    stmt::{Direction, FieldRef, Input, JoinKind, Query, Value, ValueRecord},
    Result, Schema,
};

/// A source row followed by one record per join, in join order.
struct Row<'a> {
    query: &'a Query,
    segments: Vec<ValueRecord>,
}

impl Input for Row<'_> {
    fn resolve(&self, field: &FieldRef) -> Option<&Value> {
        let segment = match &field.via {
            None if field.field.model == self.query.source => 0,
            None => return None,
            Some(on) => self.query.join_index(field.field.model, *on)? + 1,
        };
        self.segments.get(segment)?.get(field.field.index)
    }
}

pub(crate) fn exec(store: &Store, schema: &Schema, query: &Query) -> Result<Vec<Value>> {
    query.verify(schema)?;

    let mut rows: Vec<Row<'_>> = store
        .rows(query.source)
        .map(|record| Row {
            query,
            segments: vec![record.clone()],
        })
        .collect();

    for join in &query.joins {
        let target = schema.model(join.target);
        let mut joined = Vec::with_capacity(rows.len());

        for mut row in rows {
            let key = &row.segments[0][join.on.source.index];

            let matches: Vec<ValueRecord> = if key.is_null() {
                vec![]
            } else {
                store
                    .rows(join.target)
                    .filter(|candidate| candidate[join.on.target.index] == *key)
                    .cloned()
                    .collect()
            };

            if matches.is_empty() {
                if join.kind == JoinKind::Left {
                    row.segments.push(target.blank_record());
                    joined.push(row);
                }
                continue;
            }

            for record in matches {
                let mut segments = row.segments.clone();
                segments.push(record);
                joined.push(Row { query, segments });
            }
        }

        rows = joined;
    }

    let mut filtered = Vec::with_capacity(rows.len());
    'rows: for row in rows {
        for filter in &query.filters {
            if !filter.eval(&row)? {
                continue 'rows;
            }
        }
        filtered.push(row);
    }
    let mut rows = filtered;

    if !query.group_by.is_empty() {
        let mut seen = HashSet::new();
        let mut grouped = Vec::with_capacity(rows.len());

        for row in rows {
            let key = resolve_all(&row, &query.group_by);
            if seen.insert(key) {
                grouped.push(row);
            }
        }

        rows = grouped;
    }

    if !query.order_by.is_empty() {
        rows.sort_by(|lhs, rhs| {
            for order_by in &query.order_by {
                let lhs = lhs.resolve(&order_by.field).unwrap_or(&Value::Null);
                let rhs = rhs.resolve(&order_by.field).unwrap_or(&Value::Null);

                let ordering = match order_by.direction {
                    Direction::Asc => lhs.sort_cmp(rhs),
                    Direction::Desc => rhs.sort_cmp(lhs),
                };

                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    tracing::debug!(
        source = %schema.model(query.source).name,
        rows = rows.len(),
        "memory read"
    );

    Ok(rows
        .into_iter()
        .map(|row| {
            if query.projection.is_empty() {
                row.segments.into_iter().flatten().collect::<ValueRecord>().into()
            } else {
                ValueRecord::from_vec(resolve_all(&row, &query.projection)).into()
            }
        })
        .collect())
}

fn resolve_all(row: &Row<'_>, fields: &[FieldRef]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| row.resolve(field).cloned().unwrap_or_default())
        .collect()
}
