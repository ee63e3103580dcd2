use std::path::Path;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Error, SqlitePool};

use crate::configs::schema::SchemaManager;
use crate::configs::settings::Database;

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database: Database, schema_manager: SchemaManager) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1) // in memory db is dropped with its last connection
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(database.acquire_timeout))
            .connect(&database.url)
            .await?;

        let storage = Self { pool };

        if database.clean_start {
            storage.reset(&schema_manager).await?;
        }
        storage.execute_all(&schema_manager.create_schema()).await?;

        if let Some(migration_path) = &database.migration_path {
            storage.migrate(Path::new(migration_path)).await?;
        }

        Ok(storage)
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drops every managed table and the migration history.
    async fn reset(&self, schema_manager: &SchemaManager) -> Result<(), Error> {
        sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations")
            .execute(&self.pool)
            .await?;
        self.execute_all(&schema_manager.dispose_schema()).await?;

        tracing::warn!("clean start: schema dropped and recreated");

        Ok(())
    }

    async fn execute_all(&self, statements: &[String]) -> Result<(), Error> {
        sqlx::raw_sql(&statements.join("\n")).execute(&self.pool).await?;

        Ok(())
    }

    async fn migrate(&self, migration_path: &Path) -> Result<(), Error> {
        let mut connection = self.pool.acquire().await?;
        Migrator::new(migration_path).await?.run(&mut connection).await?;

        tracing::info!(path = %migration_path.display(), "database migration applied");

        Ok(())
    }
}
