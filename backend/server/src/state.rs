use std::sync::Arc;

use redis::RedisError;
use thiserror::Error;
use tracing::info;

use super::{
    access::LessonAccess,
    config::Config,
    database::{RedisStore, init_redis},
    memory::InMemoryStore,
    store::{ContentStore, EnrollmentStore, SessionStore},
};

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Catalog error: {0:#}")]
    Catalog(#[from] anyhow::Error),
}

pub struct State {
    pub config: Config,
    pub access: LessonAccess,
    pub sessions: Arc<dyn SessionStore>,
}

impl State {
    /// Redis backed, or in memory when `catalog_path` is set.
    pub async fn new(config: Config) -> Result<Arc<Self>, StateError> {
        if let Some(path) = &config.catalog_path {
            let catalog = catalog::read_catalog(path)?;
            info!("Serving catalog {} from memory", path.display());

            let store = Arc::new(InMemoryStore::from_catalog(catalog));
            return Ok(Self::with_store(config, store));
        }

        let redis_connection = init_redis(&config.redis_url).await?;

        Ok(Self::with_store(config, Arc::new(RedisStore::new(redis_connection))))
    }

    /// One backend serving content, enrollments and sessions.
    pub fn with_store<S>(config: Config, store: Arc<S>) -> Arc<Self>
    where
        S: ContentStore + EnrollmentStore + SessionStore + 'static,
    {
        Arc::new(Self {
            config,
            access: LessonAccess::new(store.clone(), store.clone()),
            sessions: store,
        })
    }
}
