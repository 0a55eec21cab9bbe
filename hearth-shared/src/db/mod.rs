/// Database plumbing for the PostgreSQL store
///
/// # Modules
///
/// - `pool`: connection pool creation, health checks and shutdown
/// - `migrations`: embedded schema migrations and seed data
///
/// Queries live in [`crate::repository::PostgresRepo`].
///
/// # Example
///
/// ```no_run
/// use hearth_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
