use std::env;

use crate::types::SeverityPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub host: String,
    pub port: u16,

    // Sessions
    pub session_secret: String,

    // Seed admin account
    pub admin_email: String,
    pub admin_password: String,

    // Duplicate engine
    pub duplicate_window_minutes: i64,
    pub similarity_threshold: f64,

    // Severity rollup
    pub severity_policy: SeverityPolicy,

    // External calls
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let admin_password = required_env("ADMIN_PASSWORD");
        let session_secret =
            env::var("SESSION_SECRET").unwrap_or_else(|_| admin_password.clone());
        Self {
            host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            session_secret,
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@campus.local".to_string()),
            admin_password,
            duplicate_window_minutes: env::var("DUPLICATE_WINDOW_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("DUPLICATE_WINDOW_MINUTES must be a number"),
            similarity_threshold: env::var("SIMILARITY_THRESHOLD")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .expect("SIMILARITY_THRESHOLD must be a number"),
            severity_policy: env::var("SEVERITY_POLICY")
                .ok()
                .map(|raw| {
                    SeverityPolicy::parse(&raw)
                        .unwrap_or_else(|| panic!("SEVERITY_POLICY must be relative or absolute"))
                })
                .unwrap_or(SeverityPolicy::Relative),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
