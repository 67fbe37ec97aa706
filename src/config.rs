use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    // Google Translate TTS
    pub gtts_tld: String,
    pub gtts_timeout: Duration,
    // espeak-ng
    pub espeak_bin: String,
    pub espeak_base_rate: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "8000").parse()?,
            gtts_tld: var("GTTS_TLD", "com"),
            gtts_timeout: Duration::from_secs(var("GTTS_TIMEOUT_SECS", "15").parse()?),
            espeak_bin: var("ESPEAK_BIN", "espeak-ng"),
            espeak_base_rate: var("ESPEAK_BASE_RATE", "200").parse()?,
        };

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
