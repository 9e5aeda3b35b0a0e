use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{error::WeatherError, model::{WeatherRecord, round_half_up}};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the provider at a different API root, e.g. a local mock server.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn fetch_current(&self, name: &str) -> Result<WeatherRecord, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        debug!(location = name, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", name), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| {
                warn!(location = name, error = %e, "OpenWeather request failed");
                WeatherError::from_transport(&e)
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            warn!(location = name, error = %e, "failed to read OpenWeather response body");
            WeatherError::from_transport(&e)
        })?;

        if !status.is_success() {
            warn!(
                location = name,
                status = status.as_u16(),
                body = %truncate_body(&body),
                "OpenWeather returned an error status"
            );
            return Err(WeatherError::from_status(status.as_u16()));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(location = name, error = %e, "failed to parse OpenWeather JSON");
            WeatherError::InvalidResponse
        })?;

        to_record(parsed, Utc::now().timestamp_millis())
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    id: u64,
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: OwSys,
}

fn to_record(parsed: OwCurrentResponse, timestamp: i64) -> Result<WeatherRecord, WeatherError> {
    let weather = parsed.weather.into_iter().next().ok_or(WeatherError::InvalidResponse)?;

    Ok(WeatherRecord {
        id: parsed.id.to_string(),
        location: parsed.name,
        temperature: round_half_up(parsed.main.temp),
        feels_like: round_half_up(parsed.main.feels_like),
        description: weather.description,
        icon: weather.icon,
        humidity: parsed.main.humidity,
        // m/s -> km/h
        wind_speed: round_half_up(parsed.wind.speed * 3.6),
        country: parsed.sys.country,
        timestamp,
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_by_location_name(&self, name: &str) -> Result<WeatherRecord, WeatherError> {
        self.fetch_current(name).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
