/// Configuration for the web server
///
/// Loaded once at startup from environment variables (a `.env` file is honoured in
/// development) and handed to every handler through [`crate::app::AppState`].
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `IN_PRODUCTION`: enables secure cookies and HSTS (default: false)
/// - `USE_TEMPLATE_CACHE`: compile templates once at startup (default: true)
/// - `TEMPLATE_DIR`: template directory (default: ./templates)
/// - `STATIC_DIR`: static asset directory (default: ./static)
/// - `SESSION_LIFETIME_HOURS`: session lifetime (default: 24)
/// - `BOOKING_TIMEOUT_SECONDS`: upper bound on storing a reservation (default: 5)
/// - `HEARTH_ADMIN_EMAIL` / `HEARTH_ADMIN_PASSWORD`: optional administrator provisioned at startup
/// - `HEARTH_MAIL_FROM`: sender of booking mail (default: bookings@hearth.local)
/// - `HEARTH_OWNER_EMAIL`: recipient of booking notifications (default: owner@hearth.local)
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use hearth_web::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub site: SiteConfig,
    pub mail: MailConfig,

    /// Administrator provisioned at startup, if configured
    #[serde(skip_serializing)]
    pub admin: Option<AdminBootstrap>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Serving over HTTPS in production
    pub in_production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Templates, assets, sessions and booking behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub use_template_cache: bool,
    pub template_dir: PathBuf,
    pub static_dir: PathBuf,
    pub session_lifetime_hours: u64,
    pub booking_timeout_seconds: u64,
}

/// Addresses used for booking mail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from: String,

    /// The house's inbox for new-booking notifications
    pub owner: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "bookings@hearth.local".to_string(),
            owner: "owner@hearth.local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            use_template_cache: true,
            template_dir: PathBuf::from("./templates"),
            static_dir: PathBuf::from("./static"),
            session_lifetime_hours: 24,
            booking_timeout_seconds: 5,
        }
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a variable does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let defaults = SiteConfig::default();
        let site = SiteConfig {
            use_template_cache: var_or("USE_TEMPLATE_CACHE", defaults.use_template_cache)?,
            template_dir: var_or("TEMPLATE_DIR", defaults.template_dir)?,
            static_dir: var_or("STATIC_DIR", defaults.static_dir)?,
            session_lifetime_hours: var_or("SESSION_LIFETIME_HOURS", defaults.session_lifetime_hours)?,
            booking_timeout_seconds: var_or("BOOKING_TIMEOUT_SECONDS", defaults.booking_timeout_seconds)?,
        };
        if site.session_lifetime_hours == 0 {
            anyhow::bail!("SESSION_LIFETIME_HOURS must be at least 1");
        }

        let mail_defaults = MailConfig::default();
        let mail = MailConfig {
            from: env::var("HEARTH_MAIL_FROM").unwrap_or(mail_defaults.from),
            owner: env::var("HEARTH_OWNER_EMAIL").unwrap_or(mail_defaults.owner),
        };

        let admin = match (env::var("HEARTH_ADMIN_EMAIL"), env::var("HEARTH_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminBootstrap { email, password }),
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                anyhow::bail!("HEARTH_ADMIN_EMAIL and HEARTH_ADMIN_PASSWORD must be set together")
            }
            _ => None,
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: var_or("API_PORT", 8080)?,
                in_production: var_or("IN_PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            site,
            mail,
            admin,
        })
    }

    /// Configuration for tests and local runs without a database URL
    pub fn for_templates(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                in_production: false,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
            },
            site: SiteConfig {
                template_dir: template_dir.into(),
                ..SiteConfig::default()
            },
            mail: MailConfig::default(),
            admin: None,
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.site.session_lifetime_hours * 3600)
    }

    pub fn booking_timeout(&self) -> Duration {
        Duration::from_secs(self.site.booking_timeout_seconds)
    }
}
