/// Sessions
///
/// Sessions are handled by `tower-sessions`: [`session_layer`] configures the
/// `hearth_session` cookie and handlers extract a [`Session`] directly. Production stores
/// sessions in PostgreSQL next to the rest of the data; tests use the in-memory store.
///
/// The helpers here cover what every handler needs on top of the plain key/value API:
/// one-shot messages ([`FLASH`], [`WARNING`], [`ERROR`]) and the login marker
/// ([`USER_ID`]).
///
/// # Example
///
/// ```no_run
/// use hearth_web::session::{self, Session};
///
/// async fn handler(session: Session) {
///     session::put(&session, session::FLASH, "Welcome back").await.ok();
///     let shown = session::take_message(&session, session::FLASH).await;
/// }
/// ```

use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_sessions::{
    cookie::SameSite, session_store::ExpiredDeletion, Expiry, SessionManagerLayer, SessionStore,
};
use tracing::{debug, info, warn};

pub use tower_sessions::Session;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "hearth_session";

/// Informational message shown once on the next rendered page
pub const FLASH: &str = "flash";
/// Warning shown once on the next rendered page
pub const WARNING: &str = "warning";
/// Error shown once on the next rendered page
pub const ERROR: &str = "error";
/// ID of the logged-in administrator
pub const USER_ID: &str = "user_id";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store failed: {0}")]
    Store(#[from] tower_sessions::session::Error),
}

/// Session middleware for `store`
///
/// The cookie is `HttpOnly` and `SameSite=Lax`, `Secure` when `secure` is set, and the
/// session expires after `lifetime` without a request.
pub fn session_layer<S>(store: S, lifetime: Duration, secure: bool) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    let inactivity = time::Duration::seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX));
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(secure)
        .with_expiry(Expiry::OnInactivity(inactivity))
}

/// Stores `value` under `key`, replacing any previous value
pub async fn put<T: Serialize + ?Sized>(
    session: &Session,
    key: &str,
    value: &T,
) -> Result<(), SessionError> {
    session.insert(key, value).await?;
    Ok(())
}

/// Removes and returns a one-shot message, empty when there is none or it is unreadable
pub async fn take_message(session: &Session, key: &str) -> String {
    match session.remove::<String>(key).await {
        Ok(message) => message.unwrap_or_default(),
        Err(e) => {
            warn!(key, error = %e, "Dropping unreadable session message");
            String::new()
        }
    }
}

/// Whether an administrator is logged in on this session
pub async fn is_logged_in(session: &Session) -> bool {
    matches!(session.get::<i32>(USER_ID).await, Ok(Some(_)))
}

/// Periodically deletes expired sessions from `store` until `shutdown` is cancelled
pub fn spawn_purge_task<S>(store: S, every: Duration, shutdown: CancellationToken) -> JoinHandle<()>
where
    S: ExpiredDeletion + Clone,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session purge task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match store.delete_expired().await {
                        Ok(()) => debug!("Purged expired sessions"),
                        Err(e) => warn!(error = %e, "Failed to purge expired sessions"),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    async fn remember(session: Session) -> StatusCode {
        put(&session, FLASH, "saved").await.unwrap();
        StatusCode::OK
    }

    async fn recall(session: Session) -> String {
        take_message(&session, FLASH).await
    }

    fn app(secure: bool) -> Router {
        Router::new()
            .route("/remember", get(remember))
            .route("/recall", get(recall))
            .layer(session_layer(
                MemoryStore::default(),
                Duration::from_secs(3600),
                secure,
            ))
    }

    fn set_cookie(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    }

    #[tokio::test]
    async fn test_cookie_attributes() {
        let response = app(false)
            .oneshot(Request::get("/remember").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = set_cookie(&response);

        assert!(cookie.starts_with("hearth_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));

        let response = app(true)
            .oneshot(Request::get("/remember").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(set_cookie(&response).contains("Secure"));
    }

    #[tokio::test]
    async fn test_message_is_shown_once() {
        let app = app(false);
        let response = app
            .clone()
            .oneshot(Request::get("/remember").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = set_cookie(&response);
        let pair = cookie.split(';').next().unwrap().to_string();

        let recall = |pair: String| {
            let app = app.clone();
            async move {
                let response = app
                    .oneshot(
                        Request::get("/recall")
                            .header(header::COOKIE, pair)
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                String::from_utf8(body.to_vec()).unwrap()
            }
        };

        assert_eq!(recall(pair.clone()).await, "saved");
        assert_eq!(recall(pair).await, "");
    }
}
