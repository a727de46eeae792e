use crate::model::FilterBounds;
use std::env;

const MIN_SWEEP_INTERVAL_MS: u64 = 100;

#[derive(Clone, Debug)]
pub struct Config {
    pub provider_one_base_url: Option<String>,
    pub provider_two_base_url: Option<String>,
    pub sweep_interval_ms: u64,
    pub filter_bounds: FilterBounds,
    pub use_mock_providers: bool,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let use_mock_providers = env::var("USE_MOCK_PROVIDERS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let provider_one_base_url = env::var("PROVIDER_ONE_BASE_URL").ok();
        let provider_two_base_url = env::var("PROVIDER_TWO_BASE_URL").ok();

        if !use_mock_providers {
            if provider_one_base_url.is_none() {
                anyhow::bail!("PROVIDER_ONE_BASE_URL not set");
            }
            if provider_two_base_url.is_none() {
                anyhow::bail!("PROVIDER_TWO_BASE_URL not set");
            }
        }

        let sweep_interval_ms = match env::var("CACHE_SWEEP_INTERVAL_MS") {
            Ok(value) => value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("CACHE_SWEEP_INTERVAL_MS must be an integer"))?,
            Err(_) => 5000,
        };
        if sweep_interval_ms < MIN_SWEEP_INTERVAL_MS {
            anyhow::bail!("CACHE_SWEEP_INTERVAL_MS must be at least {MIN_SWEEP_INTERVAL_MS}");
        }

        let filter_bounds = match env::var("FILTER_BOUNDS") {
            Ok(value) => value.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            Err(_) => FilterBounds::default(),
        };

        Ok(Config {
            provider_one_base_url,
            provider_two_base_url,
            sweep_interval_ms,
            filter_bounds,
            use_mock_providers,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}
