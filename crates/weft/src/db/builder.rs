use super::{Config, Db};
use crate::engine::Engine;

use std::{sync::Arc, time::Duration};
use weft_core::{Driver, Error, Result, Schema};

pub struct Builder {
    schema: Option<Arc<Schema>>,
    config: Config,
}

impl Builder {
    /// The entity registry. Required.
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// Upper bound on the run time of a plan. Defaults to 5 seconds.
    pub fn transaction_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.transaction_timeout = timeout;
        self
    }

    /// Whether separate preloads outside a transaction run concurrently, each
    /// on its own connection. Defaults to `true`.
    pub fn concurrent_preload(&mut self, concurrent: bool) -> &mut Self {
        self.config.concurrent_preload = concurrent;
        self
    }

    /// Connects through the driver selected by the URL scheme.
    pub async fn connect(&mut self, url: &str) -> Result<Db> {
        let driver = super::driver_for(url)?;
        self.build_with(driver)
    }

    pub fn build(&mut self, driver: impl Driver) -> Result<Db> {
        self.build_with(Arc::new(driver))
    }

    fn build_with(&mut self, driver: Arc<dyn Driver>) -> Result<Db> {
        let schema = self
            .schema
            .clone()
            .ok_or_else(|| Error::invalid_schema("no schema registered with the builder"))?;

        tracing::debug!(
            models = schema.models.len(),
            timeout = ?self.config.transaction_timeout,
            concurrent_preload = self.config.concurrent_preload,
            "database ready"
        );

        Ok(Db {
            engine: Engine::new(schema, driver),
            config: self.config,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            schema: None,
            config: Config {
                transaction_timeout: Duration::from_secs(5),
                concurrent_preload: true,
            },
        }
    }
}
