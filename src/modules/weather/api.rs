//! data.gov.sg and weather.gov.sg clients

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Offset, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::rainmap;
use super::render::round_down_minutes;
use crate::cache::TtlCache;

const FORECAST_2H_URL: &str = "https://api.data.gov.sg/v1/environment/2-hour-weather-forecast";
const FORECAST_24H_URL: &str = "https://api.data.gov.sg/v1/environment/24-hour-weather-forecast";
const FORECAST_4D_URL: &str = "https://api.data.gov.sg/v1/environment/4-day-weather-forecast";
const BASE_MAP_URL: &str = "http://www.weather.gov.sg/wp-content/themes/wiptheme/assets/img/base-853.png";
const TOWNSHIP_URL: &str = "http://www.weather.gov.sg/wp-content/themes/wiptheme/images/SG-Township.png";

const CACHE_TTL: Duration = Duration::from_secs(60);
/// Rain area images are published every 5 minutes
const RAINMAP_STEP_MINUTES: u32 = 5;
const RAINMAP_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("API returned no data")]
    EmptyResponse,
    #[error("no rain area image published in the last {minutes} minutes")]
    RainmapUnavailable { minutes: u32 },
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Singapore Standard Time, UTC+8
pub fn sgt() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AreaMetadata {
    pub name: String,
    pub label_location: LabelLocation,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AreaForecast {
    pub area: String,
    pub forecast: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Period {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Wind {
    pub speed: Range,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast2hItem {
    pub update_timestamp: String,
    pub valid_period: Option<Period>,
    pub forecasts: Vec<AreaForecast>,
}

/// 2-hour nowcast together with the area coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast2h {
    pub areas: Vec<AreaMetadata>,
    pub item: Forecast2hItem,
}

impl Forecast2h {
    /// Forecast text of an area, by name
    pub fn forecast_for(&self, area: &str) -> Option<&str> {
        self.item
            .forecasts
            .iter()
            .find(|f| f.area == area)
            .map(|f| f.forecast.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct General24h {
    pub forecast: String,
    pub relative_humidity: Range,
    pub temperature: Range,
    pub wind: Wind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Period24h {
    pub time: Period,
    pub regions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast24h {
    pub update_timestamp: String,
    pub valid_period: Period,
    pub general: General24h,
    pub periods: Vec<Period24h>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DayForecast {
    pub date: String,
    pub forecast: String,
    pub temperature: Range,
    pub relative_humidity: Range,
    pub wind: Wind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast4d {
    pub update_timestamp: String,
    pub forecasts: Vec<DayForecast>,
}

/// Stitched rain area map
#[derive(Debug, Clone)]
pub struct Rainmap {
    pub time: DateTime<FixedOffset>,
    pub png: Arc<Vec<u8>>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    area_metadata: Vec<AreaMetadata>,
    items: Vec<Value>,
}

/// First entry of `items`; the API reports outages as `[{}]`
fn first_item<T: DeserializeOwned>(items: Vec<Value>) -> Result<T, WeatherError> {
    match items.into_iter().next() {
        Some(Value::Object(map)) if !map.is_empty() => Ok(serde_json::from_value(Value::Object(map))?),
        _ => Err(WeatherError::EmptyResponse),
    }
}

pub fn parse_forecast_2h(body: &str) -> Result<Forecast2h, WeatherError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    Ok(Forecast2h {
        areas: envelope.area_metadata,
        item: first_item(envelope.items)?,
    })
}

pub fn parse_forecast_24h(body: &str) -> Result<Forecast24h, WeatherError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    first_item(envelope.items)
}

pub fn parse_forecast_4d(body: &str) -> Result<Forecast4d, WeatherError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    first_item(envelope.items)
}

/// URL of the rain area overlay published at `time`
pub fn rainmap_overlay_url(time: &DateTime<FixedOffset>) -> String {
    format!(
        "http://www.weather.gov.sg/files/rainarea/50km/v2/dpsri_70km_{}0000dBR.dpsri.png",
        time.format("%Y%m%d%H%M")
    )
}

struct StaticLayers {
    base: Vec<u8>,
    town: Vec<u8>,
}

/// Weather API client with response caching
pub struct WeatherApi {
    http: reqwest::Client,
    forecast_2h: TtlCache<(), Arc<Forecast2h>>,
    forecast_24h: TtlCache<(), Arc<Forecast24h>>,
    forecast_4d: TtlCache<(), Arc<Forecast4d>>,
    rainmap: TtlCache<DateTime<FixedOffset>, Rainmap>,
    layers: OnceCell<Arc<StaticLayers>>,
}

impl WeatherApi {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            forecast_2h: TtlCache::new(CACHE_TTL),
            forecast_24h: TtlCache::new(CACHE_TTL),
            forecast_4d: TtlCache::new(CACHE_TTL),
            rainmap: TtlCache::new(CACHE_TTL),
            layers: OnceCell::new(),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, WeatherError> {
        debug!(url, "Fetching weather data");
        Ok(self.http.get(url).send().await?.error_for_status()?.text().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, WeatherError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn forecast_2h(&self) -> Result<Arc<Forecast2h>, WeatherError> {
        self.forecast_2h
            .get_or_try_insert((), || async {
                Ok(Arc::new(parse_forecast_2h(&self.get_text(FORECAST_2H_URL).await?)?))
            })
            .await
    }

    pub async fn forecast_24h(&self) -> Result<Arc<Forecast24h>, WeatherError> {
        self.forecast_24h
            .get_or_try_insert((), || async {
                Ok(Arc::new(parse_forecast_24h(&self.get_text(FORECAST_24H_URL).await?)?))
            })
            .await
    }

    pub async fn forecast_4d(&self) -> Result<Arc<Forecast4d>, WeatherError> {
        self.forecast_4d
            .get_or_try_insert((), || async {
                Ok(Arc::new(parse_forecast_4d(&self.get_text(FORECAST_4D_URL).await?)?))
            })
            .await
    }

    async fn static_layers(&self) -> Result<Arc<StaticLayers>, WeatherError> {
        self.layers
            .get_or_try_init(|| async {
                Ok(Arc::new(StaticLayers {
                    base: self.get_bytes(BASE_MAP_URL).await?,
                    town: self.get_bytes(TOWNSHIP_URL).await?,
                }))
            })
            .await
            .cloned()
    }

    /// Latest published overlay at or before `time`
    async fn overlay(&self, time: DateTime<FixedOffset>) -> Result<(DateTime<FixedOffset>, Vec<u8>), WeatherError> {
        let mut time = time;

        for attempt in 0..=RAINMAP_RETRIES {
            let url = rainmap_overlay_url(&time);
            let response = self.http.get(&url).send().await?;

            if response.status().is_success() {
                return Ok((time, response.bytes().await?.to_vec()));
            }

            debug!(url, attempt, status = %response.status(), "Rain area image not available");
            time -= ChronoDuration::minutes(i64::from(RAINMAP_STEP_MINUTES));
        }

        warn!("No rain area image found");
        Err(WeatherError::RainmapUnavailable {
            minutes: RAINMAP_STEP_MINUTES * (RAINMAP_RETRIES + 1),
        })
    }

    /// Current rain map, stitched onto the base map and township layer
    pub async fn rainmap(&self) -> Result<Rainmap, WeatherError> {
        let now = round_down_minutes(Utc::now().with_timezone(&sgt()), RAINMAP_STEP_MINUTES);

        self.rainmap
            .get_or_try_insert(now, || async move {
                let (time, overlay) = self.overlay(now).await?;
                let layers = self.static_layers().await?;

                let png = tokio::task::spawn_blocking(move || {
                    rainmap::stitch(&layers.base, &overlay, &layers.town)
                })
                .await??;

                Ok(Rainmap {
                    time,
                    png: Arc::new(png),
                })
            })
            .await
    }
}
