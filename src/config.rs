use std::env;
use thiserror::Error;

/// Fallback signing secret used when `ACCESS_TOKEN_SECRET` is unset outside production.
pub const LOCAL_TOKEN_SECRET: &str = "assignment-hub-local-development-secret";

/// Origin of the web client during local development (Vite dev server).
pub const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:5173";

pub const DEFAULT_PORT: u16 = 5000;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers receive it through `AppState` via `FromRef`, so
/// the signing secret and the policy switches are never read from globals.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls cookie hardening and log format.
    pub env: Env,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // HMAC secret used to sign and verify session credentials.
    pub jwt_secret: String,
    // Browser origins allowed to call the API with credentials.
    pub client_origins: Vec<String>,
    // Whether guarded routes actually require a session credential.
    pub access_mode: AccessMode,
    // What grading an unknown submission id does.
    pub grading_policy: GradingPolicy,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AccessMode
///
/// `Guarded` rejects requests to guarded routes that carry no valid session
/// credential and enforces owner checks. `Open` lets every request through,
/// attaching the caller's identity only when a valid credential happens to be present.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessMode {
    Guarded,
    Open,
}

/// GradingPolicy
///
/// `Strict` answers 404 when the submission being graded does not exist.
/// `Upsert` keeps the legacy behaviour of creating a new submission document instead.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GradingPolicy {
    Strict,
    Upsert,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: DEFAULT_PORT,
            db_url: None,
            jwt_secret: LOCAL_TOKEN_SECRET.to_string(),
            client_origins: vec![DEFAULT_CLIENT_ORIGIN.to_string()],
            access_mode: AccessMode::Guarded,
            grading_policy: GradingPolicy::Strict,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Fails fast when a
    /// variable required by the current environment is missing or a value cannot
    /// be parsed, so the server never starts half-configured.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// from_lookup
    ///
    /// Same as [`AppConfig::load`], but resolves variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset, like a blank line in a .env file.
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let env = match var("APP_ENV").as_deref() {
            None | Some("local") => Env::Local,
            Some("production") => Env::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "APP_ENV",
                    value: other.to_string(),
                });
            }
        };

        let jwt_secret = match (env, var("ACCESS_TOKEN_SECRET")) {
            (_, Some(secret)) => secret,
            (Env::Production, None) => return Err(ConfigError::Missing("ACCESS_TOKEN_SECRET")),
            (Env::Local, None) => LOCAL_TOKEN_SECRET.to_string(),
        };

        let db_url = var("DATABASE_URL");
        if env == Env::Production && db_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let client_origins = var("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_CLIENT_ORIGIN.to_string()]);

        let access_mode = match var("ACCESS_MODE").as_deref() {
            None | Some("guarded") => AccessMode::Guarded,
            Some("open") => AccessMode::Open,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "ACCESS_MODE",
                    value: other.to_string(),
                });
            }
        };

        let grading_policy = match var("GRADING_POLICY").as_deref() {
            None | Some("strict") => GradingPolicy::Strict,
            Some("upsert") => GradingPolicy::Upsert,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "GRADING_POLICY",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            env,
            port,
            db_url,
            jwt_secret,
            client_origins,
            access_mode,
            grading_policy,
        })
    }

    /// Session cookies are only marked `Secure` (and cross-site) in production.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}
