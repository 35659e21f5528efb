use async_trait::async_trait;
use wfcore::platform::{
    ConnectorOption,
    PlatformConnector,
    PlatformUrl,
    SchemaPlatform,
    WFPlatform,
};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

use crate::SqliteBackend;

impl PlatformUrl for SqliteBackend {
    fn url(&self) -> &str {
        self.url.as_ref()
    }
}

impl SqliteBackend {
    pub async fn connect(opts: ConnectorOption) -> Result<SqliteBackend, sqlx::Error> {
        if opts.auto_create_db && !Sqlite::database_exists(&opts.url).await.unwrap_or(false) {
            log::warn!("sqlite database {} does not exist; creating...", &opts.url);
            Sqlite::create_database(&opts.url).await?
        }

        let pool = SqlitePool::connect(&opts.url).await?;
        Ok(SqliteBackend {
            pool: Arc::new(pool),
            url: opts.url,
        })
    }

    pub async fn migrate_wf(self) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("migrations/wf").run(&*self.pool).await?;
        Ok(self)
    }
}

#[async_trait]
impl PlatformConnector for SqliteBackend {
    async fn wf(opts: ConnectorOption) -> Result<impl WFPlatform, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let backend = SqliteBackend::connect(opts).await
            .map_err(Box::new)?
            .migrate_wf()
            .await
            .map_err(Box::new)?;
        Ok(backend)
    }

    async fn schema(opts: ConnectorOption) -> Result<impl SchemaPlatform, Box<dyn std::error::Error + Send + Sync + 'static>> {
        // historical databases are left as they are found
        let backend = SqliteBackend::connect(opts).await
            .map_err(Box::new)?;
        Ok(backend)
    }
}

mod schema;
mod state;
mod workflow;
mod workflow_object;

mod default_impl {
    use wfcore::platform::{
        DefaultSchemaPlatform,
        DefaultWFPlatform,
    };
    use crate::SqliteBackend;

    impl DefaultWFPlatform for SqliteBackend {}
    impl DefaultSchemaPlatform for SqliteBackend {}
}
