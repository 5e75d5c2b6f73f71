use std::env;

use url::Url;

pub const DEFAULT_HISTORY_API_URL: &str = "https://api.g.alchemy.com/data/v1";
pub const DEFAULT_PRICES_API_URL: &str = "https://api.g.alchemy.com/prices/v1";

#[derive(Debug, Clone)]
pub struct Config {
    /// Full transaction-history endpoint, API key included.
    pub history_endpoint: Url,
    /// Full historical-price endpoint, API key included.
    pub prices_endpoint: Url,
    pub network: String,
    pub price_symbol: String,
    pub http_bind_addr: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing ALCHEMY_API_KEY env var")]
    MissingApiKey,
    #[error("invalid {var}: {reason}")]
    InvalidUrl { var: &'static str, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ALCHEMY_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let history_base =
            env::var("HISTORY_API_URL").unwrap_or_else(|_| DEFAULT_HISTORY_API_URL.to_string());
        let prices_base =
            env::var("PRICES_API_URL").unwrap_or_else(|_| DEFAULT_PRICES_API_URL.to_string());

        let history_endpoint = build_endpoint(
            "HISTORY_API_URL",
            &history_base,
            &[api_key.as_str(), "transactions", "history", "by-address"],
        )?;
        let prices_endpoint = build_endpoint(
            "PRICES_API_URL",
            &prices_base,
            &[api_key.as_str(), "tokens", "historical"],
        )?;

        let network = env::var("GAS_NETWORK").unwrap_or_else(|_| "eth-mainnet".to_string());
        let price_symbol = env::var("PRICE_SYMBOL").unwrap_or_else(|_| "ETH".to_string());
        let http_bind_addr = env::var("HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        Ok(Self {
            history_endpoint,
            prices_endpoint,
            network,
            price_symbol,
            http_bind_addr,
        })
    }
}

/// Appends `segments` to `base`, tolerating a trailing slash on the base.
pub fn build_endpoint(
    var: &'static str,
    base: &str,
    segments: &[&str],
) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base.trim()).map_err(|e| ConfigError::InvalidUrl {
        var,
        reason: e.to_string(),
    })?;
    url.path_segments_mut()
        .map_err(|_| ConfigError::InvalidUrl {
            var,
            reason: "not a base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
