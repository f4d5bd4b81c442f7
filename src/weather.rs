use crate::database::Database;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const UNKNOWN_TEMPERATURE: &str = "--°";
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no location found for {0:?}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "c" | "celsius" => Some(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }

    pub fn setting_value(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "c",
            TemperatureUnit::Fahrenheit => "f",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// Persisted weather preferences (`weather_*` settings keys).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSettings {
    pub enabled: bool,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub unit: TemperatureUnit,
}

impl WeatherSettings {
    pub fn load(db: &Database) -> anyhow::Result<Self> {
        let mut settings = WeatherSettings {
            enabled: db.get_setting("weather_enabled")?.as_deref() == Some("1"),
            city: db.get_setting("weather_city")?.unwrap_or_default(),
            ..WeatherSettings::default()
        };
        if let Some(lat) = db.get_setting("weather_lat")?.and_then(|v| v.parse().ok()) {
            settings.lat = lat;
        }
        if let Some(lon) = db.get_setting("weather_lon")?.and_then(|v| v.parse().ok()) {
            settings.lon = lon;
        }
        if let Some(unit) = db.get_setting("weather_unit")?.as_deref().and_then(TemperatureUnit::parse) {
            settings.unit = unit;
        }
        Ok(settings)
    }

    pub fn has_coordinates(&self) -> bool {
        coordinates_known(self.lat, self.lon)
    }

    pub fn request(&self) -> WeatherRequest {
        WeatherRequest {
            city: self.city.clone(),
            lat: self.lat,
            lon: self.lon,
            unit: self.unit,
        }
    }
}

/// Runtime weather state: settings plus the last reading and its throttle.
#[derive(Debug, Clone)]
pub struct WeatherState {
    pub settings: WeatherSettings,
    pub temperature: String,
    pub checked_at: Option<Instant>,
    pub in_flight: bool,
}

impl WeatherState {
    pub fn new(settings: WeatherSettings) -> Self {
        WeatherState {
            settings,
            temperature: UNKNOWN_TEMPERATURE.to_string(),
            checked_at: None,
            in_flight: false,
        }
    }

    /// Whether a background fetch should start now.
    pub fn is_due(&self, now: Instant) -> bool {
        if !self.settings.enabled || self.in_flight {
            return false;
        }
        if self.settings.city.is_empty() && !self.settings.has_coordinates() {
            return false;
        }
        match self.checked_at {
            Some(at) => now.saturating_duration_since(at) >= CHECK_INTERVAL,
            None => true,
        }
    }

    /// Forget the throttle so the next tick fetches again.
    pub fn invalidate(&mut self) {
        self.checked_at = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub unit: TemperatureUnit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
}

/// Geocodes the city when coordinates are unknown, then reads the current temperature.
pub async fn fetch(request: WeatherRequest) -> Result<WeatherReading, WeatherError> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    let (mut lat, mut lon) = (request.lat, request.lon);
    if !request.city.is_empty() && !coordinates_known(lat, lon) {
        let geo: GeocodingResponse = client
            .get(GEOCODING_URL)
            .query(&[
                ("name", request.city.trim()),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let Some(first) = geo.results.first() else {
            warn!(city = %request.city, "geocoding returned no results");
            return Err(WeatherError::NotFound(request.city));
        };
        lat = first.latitude;
        lon = first.longitude;
    }

    let forecast: ForecastResponse = client
        .get(FORECAST_URL)
        .query(&[
            ("latitude", format_coordinate(lat)),
            ("longitude", format_coordinate(lon)),
            ("current", "temperature_2m".to_string()),
            ("temperature_unit", request.unit.name().to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    debug!(lat, lon, "weather fetched");
    Ok(WeatherReading {
        temperature: format_temperature(forecast.current.temperature_2m, request.unit),
        lat,
        lon,
    })
}

pub fn format_coordinate(value: f64) -> String {
    format!("{value:.4}")
}

/// `(0, 0)` stands for "not resolved yet"; any other pair is a real location,
/// including points on the equator or the prime meridian.
pub fn coordinates_known(lat: f64, lon: f64) -> bool {
    lat != 0.0 || lon != 0.0
}

pub fn format_temperature(value: f64, unit: TemperatureUnit) -> String {
    format!("{value:.0}{}", unit.suffix())
}
