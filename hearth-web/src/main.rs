//! # Hearth Web Server
//!
//! Serves the public booking site and the back office.
//!
//! ## Startup
//!
//! 1. load configuration from the environment
//! 2. connect to PostgreSQL and apply migrations
//! 3. provision the administrator from `HEARTH_ADMIN_EMAIL` / `HEARTH_ADMIN_PASSWORD`
//! 4. compile templates; a missing or broken template aborts startup
//! 5. start the mail listener and the expired-session purge
//! 6. serve until Ctrl-C, then drain connections, stop the background tasks and close
//!    the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p hearth-web
//! ```

use anyhow::Context;
use hearth_shared::{
    auth::password::{hash_password, validate_password_strength},
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::ADMIN_ACCESS_LEVEL,
    repository::PostgresRepo,
};
use hearth_web::{
    app::{build_router, AppState},
    config::{AdminBootstrap, Config},
    mail::{spawn_mail_listener, MailQueue, MAIL_QUEUE_CAPACITY},
    render::Renderer,
    session::spawn_purge_task,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

async fn provision_admin(repo: &PostgresRepo, admin: &AdminBootstrap) -> anyhow::Result<()> {
    validate_password_strength(&admin.password)
        .map_err(|e| anyhow::anyhow!("HEARTH_ADMIN_PASSWORD rejected: {}", e))?;
    let hash = hash_password(&admin.password)?;
    let id = repo
        .upsert_user("Site", "Admin", &admin.email, &hash, ADMIN_ACCESS_LEVEL)
        .await?;
    tracing::info!(user_id = id, email = %admin.email, "Administrator provisioned");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hearth_web=debug,hearth_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Hearth web server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("connecting to the database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let repo = PostgresRepo::new(pool);
    if let Some(admin) = &config.admin {
        provision_admin(&repo, admin).await?;
    }

    let sessions = PostgresStore::new(repo.pool().clone());
    sessions.migrate().await.context("creating the session table")?;

    let renderer = Renderer::new(&config.site.template_dir, config.site.use_template_cache)
        .context("loading templates")?;

    let address = config.bind_address();
    let pool = repo.pool().clone();
    let shutdown = CancellationToken::new();

    let (mail, outbox) = MailQueue::new(MAIL_QUEUE_CAPACITY);
    let mailer = spawn_mail_listener(outbox, shutdown.clone());
    let purge = spawn_purge_task(sessions.clone(), SESSION_PURGE_INTERVAL, shutdown.clone());

    let state = AppState::new(Arc::new(repo), renderer, config, mail);
    let app = build_router(state, sessions);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received, draining connections...");
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = purge.await {
        tracing::warn!(error = %e, "Session purge task ended abnormally");
    }
    if let Err(e) = mailer.await {
        tracing::warn!(error = %e, "Mail listener ended abnormally");
    }
    close_pool(pool).await;

    tracing::info!("Server stopped");
    Ok(())
}
