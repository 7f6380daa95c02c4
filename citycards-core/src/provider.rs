use crate::{Config, WeatherSnapshot, error::FetchError, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Source of current weather for a city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, FetchError>;
}

/// Construct the OpenWeather provider from config, with the API key taken
/// from `env_override` when present.
pub fn provider_from_config(
    config: &Config,
    env_override: Option<String>,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.resolve_api_key(env_override)?;

    let provider = match &config.endpoint {
        Some(endpoint) => OpenWeatherProvider::with_endpoint(api_key, endpoint)?,
        None => OpenWeatherProvider::new(api_key)?,
    };

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg, None).unwrap_err();
        assert!(err.to_string().contains("No OpenWeather API key configured"));
    }

    #[test]
    fn provider_from_config_rejects_bad_endpoint() {
        let cfg = Config {
            api_key: Some("KEY".into()),
            endpoint: Some("not a url".into()),
            store_dir: None,
        };
        let err = provider_from_config(&cfg, None).unwrap_err();
        assert!(err.to_string().contains("Invalid weather endpoint"));
    }

    #[test]
    fn provider_from_config_works_with_env_key() {
        let cfg = Config::default();
        assert!(provider_from_config(&cfg, Some("ENV_KEY".into())).is_ok());
    }
}
