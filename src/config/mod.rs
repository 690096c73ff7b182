use std::env;
use std::time::Duration;

const DEFAULT_VENUE_URL: &str = "http://127.0.0.1:9000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Bearer token for the admin API; `None` disables auth.
    pub api_token: Option<String>,
    pub log_json: bool,

    // Venue API (credentials optional; all three enable live submission)
    pub venue_base_url: String,
    pub venue_api_key: Option<String>,
    pub venue_api_secret: Option<String>,
    pub venue_passphrase: Option<String>,
    pub dry_run: bool,

    // Ingestion
    pub ingest_interval: Duration,
    pub ingest_autostart: bool,

    // Execution
    pub submit_max_retries: u32,
    pub submit_backoff: Duration,
    pub dispatch_concurrency: usize,
    pub scaled_quantity_dp: Option<u32>,

    // Timeouts
    pub query_timeout: Duration,
    pub submit_timeout: Duration,
    pub lookup_timeout: Duration,

    // Risk
    pub risk_fail_open_on_balance_error: bool,

    // Notifications
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notifications_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| -> anyhow::Result<bool> {
            match var(key) {
                Some(v) => v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{key} must be true or false, got {v:?}")),
                None => Ok(default),
            }
        };
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match var(key) {
                Some(v) => v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{key} must be a non-negative integer, got {v:?}")),
                None => Ok(default),
            }
        };

        let scaled_quantity_dp = match var("SCALED_QUANTITY_DP") {
            Some(v) => Some(
                v.parse()
                    .map_err(|_| anyhow::anyhow!("SCALED_QUANTITY_DP must be a non-negative integer, got {v:?}"))?,
            ),
            None => None,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: number("PORT", 8080)?
                .try_into()
                .map_err(|_| anyhow::anyhow!("PORT out of range"))?,
            api_token: var("API_TOKEN"),
            log_json: flag("LOG_JSON", false)?,

            venue_base_url: var("VENUE_BASE_URL").unwrap_or_else(|| DEFAULT_VENUE_URL.into()),
            venue_api_key: var("VENUE_API_KEY"),
            venue_api_secret: var("VENUE_API_SECRET"),
            venue_passphrase: var("VENUE_PASSPHRASE"),
            dry_run: flag("DRY_RUN", true)?,

            ingest_interval: Duration::from_secs(number("INGEST_INTERVAL_SECS", 10)?.max(1)),
            ingest_autostart: flag("INGEST_AUTOSTART", true)?,

            submit_max_retries: number("SUBMIT_MAX_RETRIES", 2)? as u32,
            submit_backoff: Duration::from_millis(number("SUBMIT_BACKOFF_MS", 1_500)?),
            dispatch_concurrency: (number("DISPATCH_CONCURRENCY", 1)? as usize).max(1),
            scaled_quantity_dp,

            query_timeout: Duration::from_secs(number("QUERY_TIMEOUT_SECS", 10)?.max(1)),
            submit_timeout: Duration::from_secs(number("SUBMIT_TIMEOUT_SECS", 15)?.max(1)),
            lookup_timeout: Duration::from_secs(number("LOOKUP_TIMEOUT_SECS", 5)?.max(1)),

            risk_fail_open_on_balance_error: flag("RISK_FAIL_OPEN_ON_BALANCE_ERROR", true)?,

            telegram_bot_token: var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: var("TELEGRAM_CHAT_ID"),
            notifications_enabled: flag("NOTIFICATIONS_ENABLED", true)?,
        })
    }

    /// Returns true if all venue API credentials are configured.
    pub fn has_venue_auth(&self) -> bool {
        self.venue_api_key.is_some() && self.venue_api_secret.is_some() && self.venue_passphrase.is_some()
    }

    /// Live submission needs credentials and `DRY_RUN=false`.
    pub fn live_trading(&self) -> bool {
        !self.dry_run && self.has_venue_auth()
    }

    pub fn telegram(&self) -> Option<(String, String)> {
        if !self.notifications_enabled {
            return None;
        }
        Some((self.telegram_bot_token.clone()?, self.telegram_chat_id.clone()?))
    }
}
