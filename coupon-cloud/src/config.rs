//! Service configuration

use std::time::Duration;

use crate::gateway::alfa::AlfaBankConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Alfa-Bank sandbox, used whenever test mode is on and no URL is given
pub const SANDBOX_BASE_URL: &str = "https://alfa.rbsuat.com";

/// Service configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Sandbox gateway, verbose payload logging and demo data
    pub payment_test_mode: bool,
    /// Gateway REST base URL (without `/payment/rest`)
    pub alfa_bank_base_url: String,
    pub alfa_bank_username: String,
    pub alfa_bank_password: String,
    /// Timeout of every outbound gateway call
    pub gateway_timeout_secs: u64,
    /// Lifetime of the hosted payment form
    pub payment_session_timeout_secs: u32,
    /// Insert demo coupons into an empty catalog at startup
    pub seed_demo_coupons: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(var: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let is_development = environment == "development";

        let payment_test_mode = parse_bool(var("PAYMENT_TEST_MODE")).unwrap_or(is_development);

        let alfa_bank_base_url = match var("ALFA_BANK_BASE_URL").filter(|s| !s.is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if payment_test_mode => SANDBOX_BASE_URL.to_string(),
            None => return Err("ALFA_BANK_BASE_URL must be set when test mode is off".into()),
        };

        Ok(Self {
            database_url: var("DATABASE_URL")
                .filter(|s| !s.is_empty())
                .ok_or("DATABASE_URL must be set")?,
            http_port: var("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            payment_test_mode,
            alfa_bank_base_url,
            alfa_bank_username: require_secret(&var, "ALFA_BANK_USERNAME", &environment)?,
            alfa_bank_password: require_secret(&var, "ALFA_BANK_PASSWORD", &environment)?,
            gateway_timeout_secs: var("GATEWAY_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(30),
            payment_session_timeout_secs: var("PAYMENT_SESSION_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1200),
            seed_demo_coupons: parse_bool(var("SEED_DEMO_COUPONS")).unwrap_or(payment_test_mode),
            environment,
        })
    }

    /// Gateway client settings
    pub fn alfa_bank(&self) -> AlfaBankConfig {
        AlfaBankConfig {
            base_url: self.alfa_bank_base_url.clone(),
            username: self.alfa_bank_username.clone(),
            password: self.alfa_bank_password.clone(),
            timeout: Duration::from_secs(self.gateway_timeout_secs),
            test_mode: self.payment_test_mode,
        }
    }
}

/// Require a secret env var: must be set and non-empty in non-development environments.
fn require_secret<F>(var: &F, name: &str, environment: &str) -> Result<String, BoxError>
where
    F: Fn(&str) -> Option<String>,
{
    let val = match var(name) {
        Some(v) => v,
        None => {
            if environment != "development" {
                return Err(format!("{name} must be set in {environment} environment").into());
            }
            format!("dev-{name}-not-for-production")
        }
    };
    if val.is_empty() && environment != "development" {
        return Err(format!("{name} must not be empty in {environment} environment").into());
    }
    Ok(val)
}

fn parse_bool(value: Option<String>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
