use serde::Deserialize;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Chain gateway base URL; when unset the in-memory chain is used
    pub chain_gateway_url: Option<String>,

    /// Poll loop cadence (generalized from the 30s UI refresh)
    pub poll_interval_secs: u64,

    /// Bounded external-call timeouts
    pub submit_timeout_ms: u64,
    pub confirm_timeout_ms: u64,
    pub confirm_poll_ms: u64,

    /// Reconciliation backoff after an ambiguous timeout
    pub reconcile_initial_backoff_ms: u64,
    pub reconcile_max_window_ms: u64,

    /// Sweep coordinator knobs
    pub sweep_horizon_ceiling_secs: u64,
    pub min_sweep_amount: u128,

    /// Static credential table (structural stand-in for a real store)
    pub org_email: String,
    pub org_password: String,
    pub org_name: String,
    pub employee_email: String,
    pub employee_password: String,
    pub employee_name: String,
    pub employee_wallet: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:8080"),
            chain_gateway_url: std::env::var("CHAIN_GATEWAY_URL").ok(),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 30),
            submit_timeout_ms: env_parse("SUBMIT_TIMEOUT_MS", 10_000),
            confirm_timeout_ms: env_parse("CONFIRM_TIMEOUT_MS", 30_000),
            confirm_poll_ms: env_parse("CONFIRM_POLL_MS", 2_000),
            reconcile_initial_backoff_ms: env_parse("RECONCILE_INITIAL_BACKOFF_MS", 5_000),
            reconcile_max_window_ms: env_parse("RECONCILE_MAX_WINDOW_MS", 300_000),
            sweep_horizon_ceiling_secs: env_parse("SWEEP_HORIZON_CEILING_SECS", 2_592_000),
            min_sweep_amount: env_parse("MIN_SWEEP_AMOUNT", 10_000_000_000_000_000u128),
            org_email: env_or("ORG_EMAIL", "admin@techcorp.com"),
            org_password: env_or("ORG_PASSWORD", "admin123"),
            org_name: env_or("ORG_NAME", "TechCorp Inc."),
            employee_email: env_or("EMPLOYEE_EMAIL", "john@techcorp.com"),
            employee_password: env_or("EMPLOYEE_PASSWORD", "employee123"),
            employee_name: env_or("EMPLOYEE_NAME", "John Doe"),
            employee_wallet: std::env::var("EMPLOYEE_WALLET").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.org_email, "admin@techcorp.com");
        assert!(config.reconcile_max_window_ms >= config.reconcile_initial_backoff_ms);
    }
}
