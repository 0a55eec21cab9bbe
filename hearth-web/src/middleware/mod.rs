/// Middleware for the web server
///
/// - `security`: security response headers
/// - `auth`: back-office login guard
///
/// Session loading lives in [`crate::session::session_layer`].

pub mod auth;
pub mod security;
