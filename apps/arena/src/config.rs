//! Server configuration from flags and `ARENA_*` environment variables.

use clap::Args;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Minimum token secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a token secret is required (ARENA_TOKEN_SECRET or ARENA_TOKEN_SECRET_FILE)")]
    MissingSecret,

    #[error("token secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,

    #[error("cannot read token secret file {path}: {source}")]
    SecretFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid CORS origin '{0}'")]
    CorsOrigin(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Flags of `arena serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "ARENA_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// HMAC secret for bearer tokens
    #[arg(long, env = "ARENA_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// File holding the token secret (takes precedence)
    #[arg(long, env = "ARENA_TOKEN_SECRET_FILE")]
    pub token_secret_file: Option<PathBuf>,

    /// Token lifetime in seconds
    #[arg(long, env = "ARENA_TOKEN_TTL_SECS", default_value_t = 24 * 60 * 60)]
    pub token_ttl_secs: u64,

    /// Comma-separated list of allowed CORS origins
    #[arg(
        long,
        env = "ARENA_CORS_ORIGINS",
        default_value = "http://localhost:80,http://0.0.0.0:80",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,

    /// Login attempts allowed per minute
    #[arg(long, env = "ARENA_LOGIN_PER_MINUTE", default_value_t = 10)]
    pub login_per_minute: u32,
}

/// Validated server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db: PathBuf,
    pub token_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub cors_origins: Vec<String>,
    pub login_per_minute: NonZeroU32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("db", &self.db)
            .field("token_ttl", &self.token_ttl)
            .field("cors_origins", &self.cors_origins)
            .field("login_per_minute", &self.login_per_minute)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    pub fn from_args(args: ServeArgs, db: PathBuf) -> Result<Self, ConfigError> {
        let secret = match (&args.token_secret_file, &args.token_secret) {
            (Some(path), _) => std::fs::read_to_string(path)
                .map_err(|source| ConfigError::SecretFile {
                    path: path.clone(),
                    source,
                })?
                .trim()
                .to_string(),
            (None, Some(inline)) => inline.trim().to_string(),
            (None, None) => return Err(ConfigError::MissingSecret),
        };
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let cors_origins: Vec<String> = args
            .cors_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if let Some(bad) = cors_origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(ConfigError::CorsOrigin(bad.clone()));
        }

        if args.token_ttl_secs == 0 {
            return Err(ConfigError::Zero("token TTL"));
        }
        let login_per_minute =
            NonZeroU32::new(args.login_per_minute).ok_or(ConfigError::Zero("login rate"))?;

        Ok(Self {
            bind: args.bind,
            db,
            token_secret: secret.into_bytes(),
            token_ttl: Duration::from_secs(args.token_ttl_secs),
            cors_origins,
            login_per_minute,
        })
    }

    /// Settings for tests: in-memory friendly defaults and a fixed secret.
    pub fn for_tests() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            db: PathBuf::from("arena-test.redb"),
            token_secret: b"test-secret-test-secret-test-secret!".to_vec(),
            token_ttl: Duration::from_secs(3600),
            cors_origins: vec!["http://localhost:80".into()],
            login_per_minute: NonZeroU32::MIN.saturating_add(99),
        }
    }
}
