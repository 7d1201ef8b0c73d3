use super::{Direction, Expr, FieldRef, Join, JoinKind, JoinOn, OrderBy, Preload, Strategy};
use crate::{
    schema::{Field, FieldId, ModelId, Schema},
    Error, Result,
};

use std::fmt;

/// An immutable query fragment.
///
/// Every builder method consumes the fragment and returns a new one, so a
/// base fragment is reused by cloning it.
///
/// Rows produced for a fragment without a projection are records laid out as
/// the source model's fields followed by the fields of each joined model, in
/// join order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Model being queried
    pub source: ModelId,

    pub joins: Vec<Join>,

    /// Predicates, all of which must hold
    pub filters: Vec<Expr>,

    /// When set, one row per distinct group (the first row of each group)
    pub group_by: Vec<FieldRef>,

    pub order_by: Vec<OrderBy>,

    /// When set, rows only carry these fields in this order
    pub projection: Vec<FieldRef>,

    pub preloads: Vec<Preload>,
}

/// Renders a query in its textual debugging form.
pub struct QueryDisplay<'a> {
    query: &'a Query,
    schema: &'a Schema,
}

impl Query {
    pub fn new(source: impl Into<ModelId>) -> Query {
        Query {
            source: source.into(),
            joins: vec![],
            filters: vec![],
            group_by: vec![],
            order_by: vec![],
            projection: vec![],
            preloads: vec![],
        }
    }

    /// Adds a join unless an identical one (same target and condition) is
    /// already present.
    pub fn join(mut self, join: Join) -> Query {
        push_join(&mut self.joins, join);
        self
    }

    /// Inner join through the association `relation` of the source model.
    pub fn inner_join(self, relation: &Field) -> Query {
        self.join_relation(relation, JoinKind::Inner)
    }

    /// Left join through the association `relation` of the source model.
    pub fn left_join(self, relation: &Field) -> Query {
        self.join_relation(relation, JoinKind::Left)
    }

    /// A field that is not an association is joined onto itself, which
    /// `verify` rejects.
    fn join_relation(self, relation: &Field, kind: JoinKind) -> Query {
        let join = match (relation.relation_target_id(), relation.join_on()) {
            (Some(target), Some(on)) => Join { target, on, kind },
            _ => Join {
                target: relation.id.model,
                on: JoinOn {
                    source: relation.id,
                    target: relation.id,
                },
                kind,
            },
        };
        self.join(join)
    }

    pub fn filter(mut self, expr: Expr) -> Query {
        self.filters.push(expr);
        self
    }

    /// Replaces the grouping.
    pub fn group_by<I, F>(mut self, fields: I) -> Query
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a sort key.
    pub fn order_by(mut self, field: impl Into<FieldRef>, direction: Direction) -> Query {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Replaces the projection.
    pub fn select<I, F>(mut self, fields: I) -> Query
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        self.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Preloads the association `relation`. The joined strategy also adds a
    /// left join to the target. Preloading an association twice keeps its
    /// position and takes the later strategy.
    pub fn preload(mut self, relation: &Field, strategy: Strategy) -> Query {
        if strategy == Strategy::Joined {
            self = self.left_join(relation);
        }

        push_preload(
            &mut self.preloads,
            Preload {
                field: relation.id,
                strategy,
            },
        );
        self
    }

    /// Combines two fragments over the same source.
    ///
    /// Filters are concatenated, joins are deduplicated by target and
    /// condition with the first occurrence kept, and preloads deduplicated by
    /// association with the later strategy kept. Grouping, ordering and
    /// projection are not merged: when `other` declares any of them it
    /// replaces the value from `self`. The operation is associative.
    pub fn compose(mut self, other: Query) -> Result<Query> {
        if self.source != other.source {
            return Err(Error::invalid_statement(format!(
                "cannot compose queries over different sources ({:?} and {:?})",
                self.source, other.source
            )));
        }

        for join in other.joins {
            push_join(&mut self.joins, join);
        }

        self.filters.extend(other.filters);

        if !other.group_by.is_empty() {
            self.group_by = other.group_by;
        }

        if !other.order_by.is_empty() {
            self.order_by = other.order_by;
        }

        if !other.projection.is_empty() {
            self.projection = other.projection;
        }

        for preload in other.preloads {
            push_preload(&mut self.preloads, preload);
        }

        Ok(self)
    }

    pub fn display<'a>(&'a self, schema: &'a Schema) -> QueryDisplay<'a> {
        QueryDisplay {
            query: self,
            schema,
        }
    }

    /// Checks that every reference in the fragment is reachable from the
    /// source.
    pub fn verify(&self, schema: &Schema) -> Result<()> {
        let source = schema
            .models
            .get(&self.source)
            .ok_or_else(|| Error::invalid_statement("unknown query source"))?;

        for join in &self.joins {
            if join.on.source == join.on.target {
                return Err(Error::invalid_statement(format!(
                    "`{}` is not an association",
                    schema.qualified_name(join.on.source)
                )));
            }

            if join.on.source.model != self.source || join.on.target.model != join.target {
                return Err(Error::invalid_statement(format!(
                    "join to `{}` must connect the source to the joined model",
                    schema.model(join.target).name
                )));
            }
        }

        let mut unreachable = None;
        let mut check = |field: &FieldRef| {
            let reachable = match &field.via {
                None => field.field.model == self.source,
                Some(on) => self
                    .joins
                    .iter()
                    .any(|join| join.on == *on && join.target == field.field.model),
            };
            if !reachable && unreachable.is_none() {
                unreachable = Some(field.field);
            }
        };

        for filter in &self.filters {
            filter.for_each_field(&mut check);
        }
        self.group_by.iter().for_each(&mut check);
        self.order_by.iter().for_each(|order_by| check(&order_by.field));
        self.projection.iter().for_each(&mut check);

        if let Some(field) = unreachable {
            return Err(Error::invalid_statement(format!(
                "field `{}` is not reachable from `{}`",
                schema.qualified_name(field),
                source.name
            )));
        }

        for preload in &self.preloads {
            if preload.field.model != self.source || !schema.field(preload.field).is_relation() {
                return Err(Error::invalid_statement(format!(
                    "`{}` is not an association of `{}`",
                    schema.qualified_name(preload.field),
                    source.name
                )));
            }
        }

        Ok(())
    }

    /// Position of the join matching `on` and `target`.
    pub fn join_index(&self, target: ModelId, on: JoinOn) -> Option<usize> {
        self.joins
            .iter()
            .position(|join| join.target == target && join.on == on)
    }
}

fn push_join(joins: &mut Vec<Join>, join: Join) {
    if !joins.iter().any(|existing| existing.is_same(&join)) {
        joins.push(join);
    }
}

fn push_preload(preloads: &mut Vec<Preload>, preload: Preload) {
    match preloads.iter_mut().find(|existing| existing.field == preload.field) {
        Some(existing) => existing.strategy = preload.strategy,
        None => preloads.push(preload),
    }
}

impl QueryDisplay<'_> {
    fn field(&self, f: &mut fmt::Formatter<'_>, field: &FieldRef) -> fmt::Result {
        f.write_str(&self.schema.qualified_name(field.field))
    }

    fn fields(&self, f: &mut fmt::Formatter<'_>, fields: &[FieldRef]) -> fmt::Result {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.field(f, field)?;
        }
        Ok(())
    }

    fn expr(&self, f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
        match expr {
            Expr::And(operands) => self.operands(f, operands, " AND "),
            Expr::Or(operands) => self.operands(f, operands, " OR "),
            Expr::Not(expr) => {
                f.write_str("NOT ")?;
                self.expr(f, expr)
            }
            Expr::BinaryOp { lhs, op, rhs } => {
                self.field(f, lhs)?;
                write!(f, " {op} {rhs}")
            }
            Expr::InList { field, list } => {
                self.field(f, field)?;
                write!(f, " IN {}", super::Value::List(list.clone()))
            }
            Expr::IsNull(field) => {
                self.field(f, field)?;
                f.write_str(" IS NULL")
            }
        }
    }

    fn operands(&self, f: &mut fmt::Formatter<'_>, operands: &[Expr], sep: &str) -> fmt::Result {
        f.write_str("(")?;
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            self.expr(f, operand)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for QueryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = self.query;
        let schema = self.schema;

        write!(f, "SOURCE {}", schema.model(query.source).name)?;

        for join in &query.joins {
            let kind = match join.kind {
                JoinKind::Inner => "JOIN",
                JoinKind::Left => "LEFT JOIN",
            };
            write!(
                f,
                " {kind} {} ON {} = {}",
                schema.model(join.target).name,
                schema.qualified_name(join.on.source),
                schema.qualified_name(join.on.target),
            )?;
        }

        if !query.filters.is_empty() {
            f.write_str(" WHERE ")?;
            for (i, filter) in query.filters.iter().enumerate() {
                if i > 0 {
                    f.write_str(" AND ")?;
                }
                self.expr(f, filter)?;
            }
        }

        if !query.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            self.fields(f, &query.group_by)?;
        }

        if !query.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, order_by) in query.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                self.field(f, &order_by.field)?;
                write!(f, " {}", order_by.direction.as_str())?;
            }
        }

        if !query.projection.is_empty() {
            f.write_str(" SELECT ")?;
            self.fields(f, &query.projection)?;
        }

        if !query.preloads.is_empty() {
            f.write_str(" PRELOAD ")?;
            for (i, preload) in query.preloads.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(
                    f,
                    "{}:{}",
                    schema.field(preload.field).name,
                    preload.strategy.as_str()
                )?;
            }
        }

        Ok(())
    }
}
