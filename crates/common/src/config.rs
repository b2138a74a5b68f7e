/// Default instruments watched when `SMC_SYMBOLS` is unset.
pub const DEFAULT_SYMBOLS: [&str; 9] = [
    "EURUSD", "XAUUSD", "GBPJPY", "AUDJPY", "NZDJPY", "BTCUSD", "CADJPY", "GBPUSD", "USDJPY",
];

/// All process configuration loaded from environment variables at startup.
/// Invalid values cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Symbols
    pub symbols: Vec<String>,
    /// `true` ⇒ engines are created on the first payload for a symbol.
    pub auto_register: bool,

    // Webhook
    pub webhook_port: u16,
    pub webhook_token: Option<String>,

    // Alerts
    pub alert_channel_capacity: usize,

    // Detector config file path
    pub smc_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let symbols = match optional_env("SMC_SYMBOLS") {
            Some(raw) => parse_symbols(&raw),
            None => DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };

        let auto_register = match optional_env("SMC_AUTO_REGISTER")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => panic!("SMC_AUTO_REGISTER must be 'true' or 'false', got: '{other}'"),
        };

        Config {
            symbols,
            auto_register,
            webhook_port: parsed_env("WEBHOOK_PORT").unwrap_or(5000),
            webhook_token: optional_env("WEBHOOK_TOKEN").filter(|t| !t.is_empty()),
            alert_channel_capacity: parsed_env("ALERT_CHANNEL_CAPACITY").unwrap_or(128),
            smc_config_path: optional_env("SMC_CONFIG_PATH")
                .unwrap_or_else(|| "config/smc.toml".to_string()),
        }
    }
}

/// Split a comma list into upper-cased, de-duplicated symbols.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for s in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !s.is_empty() && !symbols.contains(&s) {
            symbols.push(s);
        }
    }
    symbols
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|v| {
        v.trim()
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable '{key}' has an invalid value: '{v}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_trimmed_uppercased_and_deduplicated() {
        assert_eq!(
            parse_symbols(" eurusd, XAUUSD ,,EURUSD"),
            vec!["EURUSD".to_string(), "XAUUSD".to_string()]
        );
    }
}
