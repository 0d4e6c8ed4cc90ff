use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub room_api_url: String,
    pub room_api_key: String,
    pub room_domain_url: String,
    pub room_token_secret: String,
    pub room_token_ttl_seconds: i64,
    pub rotation_penalty_weight: i32,
    pub connecting_timeout_seconds: i64,
    pub housekeeping_interval_seconds: u64,
    pub local_utc_offset_minutes: i32,
    pub default_wait_normal_seconds: i64,
    pub default_wait_urgent_seconds: i64,
    pub default_wait_critical_seconds: i64,
    pub directory_seed_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            server_port: parse_or("SERVER_PORT", 3000),
            room_api_url: env::var("ROOM_API_URL")
                .unwrap_or_else(|_| {
                    warn!("ROOM_API_URL not set, using default");
                    "https://api.daily.co/v1".to_string()
                }),
            room_api_key: env::var("ROOM_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("ROOM_API_KEY not set, rooms will be provisioned locally");
                    String::new()
                }),
            room_domain_url: env::var("ROOM_DOMAIN_URL")
                .unwrap_or_else(|_| {
                    warn!("ROOM_DOMAIN_URL not set, using default");
                    "https://support.daily.co".to_string()
                }),
            room_token_secret: env::var("ROOM_TOKEN_SECRET")
                .unwrap_or_else(|_| {
                    warn!("ROOM_TOKEN_SECRET not set, using empty value");
                    String::new()
                }),
            room_token_ttl_seconds: parse_or("ROOM_TOKEN_TTL_SECONDS", 3600),
            rotation_penalty_weight: parse_or("ROTATION_PENALTY_WEIGHT", 5),
            connecting_timeout_seconds: parse_or("CONNECTING_TIMEOUT_SECONDS", 600),
            housekeeping_interval_seconds: parse_or("HOUSEKEEPING_INTERVAL_SECONDS", 30),
            local_utc_offset_minutes: parse_or("LOCAL_UTC_OFFSET_MINUTES", 0),
            default_wait_normal_seconds: parse_or("DEFAULT_WAIT_NORMAL_SECONDS", 300),
            default_wait_urgent_seconds: parse_or("DEFAULT_WAIT_URGENT_SECONDS", 120),
            default_wait_critical_seconds: parse_or("DEFAULT_WAIT_CRITICAL_SECONDS", 60),
            directory_seed_path: env::var("DIRECTORY_SEED_PATH").ok(),
        };

        if config.room_token_secret.is_empty() {
            warn!("Room tokens will be signed with an empty secret - set ROOM_TOKEN_SECRET");
        }

        config
    }

    pub fn is_room_provisioning_configured(&self) -> bool {
        !self.room_api_url.is_empty() && !self.room_api_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            room_api_url: "https://api.daily.co/v1".to_string(),
            room_api_key: String::new(),
            room_domain_url: "https://support.daily.co".to_string(),
            room_token_secret: String::new(),
            room_token_ttl_seconds: 3600,
            rotation_penalty_weight: 5,
            connecting_timeout_seconds: 600,
            housekeeping_interval_seconds: 30,
            local_utc_offset_minutes: 0,
            default_wait_normal_seconds: 300,
            default_wait_urgent_seconds: 120,
            default_wait_critical_seconds: 60,
            directory_seed_path: None,
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
