use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IDEMPOTENCY_TTL_HOURS: u64 = 72;
pub const DEFAULT_EMAIL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EMAIL_FROM: &str = "Notifications <notifications@example.com>";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdempotencyStore {
    /// Durable ledger table; survives restarts and is shared across instances.
    #[default]
    Postgres,
    /// Process-local bounded set.
    Memory,
}

impl FromStr for IdempotencyStore {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "IDEMPOTENCY_STORE",
                reason: format!("expected `postgres` or `memory`, got `{other}`"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub payment_token: String,
    pub subscription_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// `None` means emails are logged instead of sent.
    pub api_key: Option<String>,
    pub from: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub gateway: GatewayConfig,
    pub idempotency_store: IdempotencyStore,
    pub idempotency_ttl: Duration,
    pub email: EmailConfig,
    pub status_map_path: Option<PathBuf>,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let timeout_secs = parse_timeout_secs(
            get("GATEWAY_TIMEOUT_SECS"),
            "GATEWAY_TIMEOUT_SECS",
            DEFAULT_GATEWAY_TIMEOUT_SECS,
        )?;
        let email_timeout_secs = parse_timeout_secs(
            get("EMAIL_TIMEOUT_SECS"),
            "EMAIL_TIMEOUT_SECS",
            DEFAULT_EMAIL_TIMEOUT_SECS,
        )?;

        let ttl_hours = parse_u64(get("IDEMPOTENCY_TTL_HOURS"), "IDEMPOTENCY_TTL_HOURS")?
            .unwrap_or(DEFAULT_IDEMPOTENCY_TTL_HOURS);

        let idempotency_store = match get("IDEMPOTENCY_STORE") {
            Some(raw) => raw.parse()?,
            None => IdempotencyStore::default(),
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            bind_addr,
            gateway: GatewayConfig {
                base_url: get("GATEWAY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string()),
                payment_token: require("GATEWAY_PAYMENT_TOKEN")?,
                subscription_token: require("GATEWAY_SUBSCRIPTION_TOKEN")?,
                timeout: Duration::from_secs(timeout_secs),
            },
            idempotency_store,
            idempotency_ttl: Duration::from_secs(ttl_hours * 3600),
            email: EmailConfig {
                api_key: get("EMAIL_API_KEY"),
                from: get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
                timeout: Duration::from_secs(email_timeout_secs),
            },
            status_map_path: get("STATUS_MAP_PATH").map(PathBuf::from),
        })
    }
}

fn parse_u64(raw: Option<String>, name: &'static str) -> Result<Option<u64>, ConfigError> {
    raw.map(|v| {
        v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })
    })
    .transpose()
}

fn parse_timeout_secs(
    raw: Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let secs = parse_u64(raw, name)?.unwrap_or(default);
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(secs)
}
