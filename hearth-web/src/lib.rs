//! # Hearth Web
//!
//! Public booking site and back office for a small bed & breakfast.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `mail`: Booking mail queue and its listener
//! - `middleware`: Login guard and security headers
//! - `render`: Template loading and rendering
//! - `routes`: HTTP handlers
//! - `session`: Session layer and one-shot messages

pub mod app;
pub mod config;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod session;
