/// Hearth API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Redis connection string backing presence sets and the broadcast bus.
    /// When unset the server falls back to process-local stores, which only
    /// works for a single instance.
    pub redis_url: Option<String>,
    /// Shared secret for verifying access tokens minted by the auth service.
    pub jwt_secret: String,
    /// Bearer token the CRUD service presents on the internal notify routes.
    /// When unset those routes are disabled.
    pub service_token: Option<String>,
    /// Snowflake worker id for this instance (must be unique per instance).
    pub worker_id: u16,
    /// Port the HTTP server binds to.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_var("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: required_var("JWT_SECRET"),
            service_token: std::env::var("SERVICE_TOKEN").ok().filter(|s| !s.is_empty()),
            worker_id: std::env::var("WORKER_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
