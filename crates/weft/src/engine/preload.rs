use super::Engine;
use crate::fold;

use tokio::task::JoinSet;
use weft_core::{
    schema::{Field, FieldId},
    stmt::{Expr, Query, ValueRecord},
    Connection, Error, Result,
};

impl Engine {
    /// The read fetching children of `relation` for `parents`. `None` when no
    /// parent holds a key, in which case every parent gets no children.
    fn child_query(&self, parents: &[ValueRecord], relation: &Field) -> Option<Query> {
        let keys = fold::parent_keys(parents, relation);
        if keys.is_empty() {
            return None;
        }

        let target = relation.relation_target_id()?;
        let on = relation.join_on()?;
        Some(Query::new(target).filter(Expr::in_list(on.target, keys)))
    }

    pub(super) async fn preload_sequential(
        &self,
        conn: &mut dyn Connection,
        mut parents: Vec<ValueRecord>,
        relations: &[FieldId],
    ) -> Result<Vec<ValueRecord>> {
        for relation in relations {
            let relation = self.schema.field(*relation);

            let children = match self.child_query(&parents, relation) {
                Some(query) => self.load(conn, &query).await?,
                None => vec![],
            };

            parents = fold::merge(parents, relation, children);
        }

        Ok(parents)
    }

    /// Issues every child read at once, each on its own connection. The
    /// parent key sets are captured before any of them starts.
    pub(super) async fn preload_concurrent(
        &self,
        mut parents: Vec<ValueRecord>,
        relations: &[FieldId],
    ) -> Result<Vec<ValueRecord>> {
        let mut tasks = JoinSet::new();

        for (i, relation) in relations.iter().enumerate() {
            let Some(query) = self.child_query(&parents, self.schema.field(*relation)) else {
                continue;
            };

            let engine = self.clone();
            tasks.spawn(async move {
                let mut conn = engine.connect().await?;
                let children = engine.load(&mut *conn, &query).await?;
                Ok::<_, Error>((i, children))
            });
        }

        let mut loaded = vec![vec![]; relations.len()];
        while let Some(res) = tasks.join_next().await {
            let (i, children) = res.map_err(|err| Error::from(anyhow::Error::from(err)))??;
            loaded[i] = children;
        }

        for (relation, children) in relations.iter().zip(loaded) {
            parents = fold::merge(parents, self.schema.field(*relation), children);
        }

        Ok(parents)
    }
}
