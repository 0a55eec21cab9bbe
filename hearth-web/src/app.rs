/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use hearth_shared::repository::MemoryRepo;
/// use hearth_web::{app::AppState, config::Config, mail::MailQueue, render::Renderer};
/// use std::sync::Arc;
/// use tower_sessions::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let renderer = Renderer::new(&config.site.template_dir, config.site.use_template_cache)?;
/// let (mail, _outbox) = MailQueue::new(16);
/// let state = AppState::new(Arc::new(MemoryRepo::seeded()), renderer, config, mail);
/// let app = hearth_web::app::build_router(state, MemoryStore::default());
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_auth, security::SecurityHeadersLayer},
    mail::MailQueue,
    render::Renderer,
    session::session_layer,
};
use axum::{
    routing::{get, post},
    Router,
};
use hearth_shared::repository::DatabaseRepo;
use std::sync::Arc;
use tower_sessions::SessionStore;
use tower_http::{
    compression::CompressionLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Storage behind the whole site
    pub repo: Arc<dyn DatabaseRepo>,

    pub renderer: Renderer,

    /// Booking mail, delivered in the background
    pub mail: MailQueue,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn DatabaseRepo>,
        renderer: Renderer,
        config: Config,
        mail: MailQueue,
    ) -> Self {
        Self {
            repo,
            renderer,
            mail,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /                                         home and room pages
/// /search-availability                      GET form, POST search
/// /search-availability-json                 POST, JSON answer for one room
/// /choose-room/:id                          pick a room from the search results
/// /book-room?id=&s=&e=                      book straight from a room page
/// /make-reservation                         GET form, POST submit
/// /reservation-summary                      one-time confirmation
/// /user/login, /user/logout                 back-office login
/// /admin/...                                back office (login required)
/// /health                                   store health
/// /static/...                               assets
/// ```
///
/// Layers, outermost first: security headers, compression, tracing, sessions kept in
/// `sessions`.
pub fn build_router<S>(state: AppState, sessions: S) -> Router
where
    S: SessionStore + Clone,
{
    use crate::routes;

    let admin_routes = Router::new()
        .route("/dashboard", get(routes::admin::dashboard))
        .route("/reservations-new", get(routes::admin::new_reservations))
        .route("/reservations-all", get(routes::admin::all_reservations))
        .route(
            "/reservations-calendar",
            get(routes::admin::reservations_calendar).post(routes::admin::post_reservations_calendar),
        )
        .route("/reservations/:src/:id/show", get(routes::admin::show_reservation))
        .route("/reservations/:src/:id", post(routes::admin::post_show_reservation))
        .route(
            "/process-reservation/:src/:id/do",
            get(routes::admin::process_reservation),
        )
        .route(
            "/delete-reservation/:src/:id/do",
            get(routes::admin::delete_reservation),
        )
        .layer(axum::middleware::from_fn(require_auth));

    let static_files = ServeDir::new(&state.config.site.static_dir);
    let sessions = session_layer(
        sessions,
        state.config.session_lifetime(),
        state.config.server.in_production,
    );

    Router::new()
        .route("/", get(routes::pages::home))
        .route("/about", get(routes::pages::about))
        .route("/contact", get(routes::pages::contact))
        .route("/generals-quarters", get(routes::pages::generals))
        .route("/majors-suite", get(routes::pages::majors))
        .route(
            "/search-availability",
            get(routes::availability::search_availability)
                .post(routes::availability::post_search_availability),
        )
        .route(
            "/search-availability-json",
            post(routes::availability::availability_json),
        )
        .route("/choose-room/:id", get(routes::reservation::choose_room))
        .route("/book-room", get(routes::reservation::book_room))
        .route(
            "/make-reservation",
            get(routes::reservation::make_reservation)
                .post(routes::reservation::post_make_reservation),
        )
        .route(
            "/reservation-summary",
            get(routes::reservation::reservation_summary),
        )
        .route(
            "/user/login",
            get(routes::auth::login).post(routes::auth::post_login),
        )
        .route("/user/logout", get(routes::auth::logout))
        .route("/health", get(routes::health::health_check))
        .nest("/admin", admin_routes)
        .nest_service("/static", static_files)
        .layer(sessions)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(SecurityHeadersLayer::new(state.config.server.in_production))
        .with_state(state)
}
