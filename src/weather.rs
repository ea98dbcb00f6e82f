/*
 *  weather.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  OpenWeatherMap current conditions, forecast and assistant tip
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, HttpConfig, Units};

const OWM_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const OWM_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const OWM_ASSISTANT_URL: &str = "https://api.openweathermap.org/assistant/session";

const USER_AGENT: &str = concat!("wxmons/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum WeatherApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("OpenWeatherMap returned status {0}")]
    Status(u16),
    #[error("JSON deserialization error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("assistant response carried no answer")]
    MissingAnswer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainReadings {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u32,
    pub pressure: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub description: String,
    /// OWM icon code such as `10d`
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wind {
    pub speed: f64,
    pub deg: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

/// `/data/2.5/weather` document, the parts we show.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentWeather {
    pub name: String,
    pub main: MainReadings,
    pub weather: Vec<Condition>,
    pub wind: Wind,
    pub sys: SunTimes,
    pub dt: i64,
}

impl CurrentWeather {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// One 3-hourly slot of `/data/2.5/forecast`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainReadings,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Forecast {
    pub list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct TipResponse {
    answer: Option<String>,
}

/// Anything that can answer the three questions the dashboard asks.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn current(&self) -> Result<CurrentWeather, WeatherApiError>;
    async fn forecast(&self) -> Result<Forecast, WeatherApiError>;
    async fn tip(&self) -> Result<String, WeatherApiError>;
}

/// Natural language prompt for the assistant endpoint.
pub fn tip_prompt(location: &str, other_location: Option<&str>, units: Units) -> String {
    let where_ = match other_location {
        Some(other) => format!("between {location} and {other}"),
        None => format!("around {location}"),
    };
    let places = match other_location {
        Some(other) => format!("{location} and {other}"),
        None => location.to_string(),
    };
    format!(
        "I am travelling {where_} today. Give me one concise, single-line weather tip \
         under 100 characters. Only mention an umbrella if it will rain. \
         Mention {places} by name and use {} units.",
        units.as_query()
    )
}

pub struct OwmClient {
    client: Client,
    api_key: String,
    location: String,
    other_location: Option<String>,
    units: Units,
    http: HttpConfig,
}

impl OwmClient {
    pub fn new(cfg: &Config) -> Result<Self, WeatherApiError> {
        let api_key = cfg.api_key().ok_or(WeatherApiError::MissingApiKey)?.to_string();

        let mut headers = header::HeaderMap::new();
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.http.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            location: cfg.location.clone(),
            other_location: cfg.other_location.clone(),
            units: cfg.units,
            http: cfg.http.clone(),
        })
    }

    /// Fixed-delay retry around a request; transport errors and non-2xx both count.
    async fn send_with_retries<F>(&self, what: &str, build: F) -> Result<String, WeatherApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = self.http.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match build().send().await {
                Ok(resp) if resp.status().is_success() => resp.text().await.map_err(WeatherApiError::from),
                Ok(resp) => Err(WeatherApiError::Status(resp.status().as_u16())),
                Err(e) => Err(WeatherApiError::from(e)),
            };
            match result {
                Ok(body) => return Ok(body),
                Err(e) if attempt >= attempts => {
                    warn!("{what}: giving up after {attempt} attempts: {e}");
                    return Err(e);
                }
                Err(e) => {
                    warn!("{what}: attempt {attempt}/{attempts} failed: {e}");
                    tokio::time::sleep(Duration::from_secs(self.http.retry_delay_secs)).await;
                }
            }
        }
    }

    fn query_get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).query(&[
            ("q", self.location.as_str()),
            ("appid", self.api_key.as_str()),
            ("units", self.units.as_query()),
        ])
    }
}

impl WeatherSource for OwmClient {
    async fn current(&self) -> Result<CurrentWeather, WeatherApiError> {
        info!("Fetching current weather for {}", self.location);
        let body = self.send_with_retries("weather", || self.query_get(OWM_WEATHER_URL)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn forecast(&self) -> Result<Forecast, WeatherApiError> {
        info!("Fetching forecast for {}", self.location);
        let body = self.send_with_retries("forecast", || self.query_get(OWM_FORECAST_URL)).await?;
        let fc: Forecast = serde_json::from_str(&body)?;
        debug!("forecast carries {} entries", fc.list.len());
        Ok(fc)
    }

    async fn tip(&self) -> Result<String, WeatherApiError> {
        let prompt = tip_prompt(&self.location, self.other_location.as_deref(), self.units);
        let body = self
            .send_with_retries("assistant", || {
                self.client
                    .post(OWM_ASSISTANT_URL)
                    .header("X-Api-Key", self.api_key.as_str())
                    .json(&serde_json::json!({ "prompt": prompt }))
            })
            .await?;
        let resp: TipResponse = serde_json::from_str(&body)?;
        resp.answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(WeatherApiError::MissingAnswer)
    }
}
