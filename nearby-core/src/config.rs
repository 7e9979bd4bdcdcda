use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::PathBuf, time::Duration};

/// The three upstream services, each with its own API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    Geocoding,
    Weather,
    Places,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::Geocoding => "geocoding",
            ServiceId::Weather => "weather",
            ServiceId::Places => "places",
        }
    }

    pub const fn all() -> &'static [ServiceId] {
        &[ServiceId::Geocoding, ServiceId::Weather, ServiceId::Places]
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "geocoding" => Ok(ServiceId::Geocoding),
            "weather" => Ok(ServiceId::Weather),
            "places" => Ok(ServiceId::Places),
            _ => Err(anyhow!(
                "Unknown service '{value}'. Supported services: geocoding, weather, places."
            )),
        }
    }
}

/// Credentials for a single service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of geocoding candidates.
    pub geocoding_limit: u32,
    /// Maximum number of nearby POIs.
    pub poi_limit: u32,
    /// POI search radius in meters.
    pub poi_radius_m: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            geocoding_limit: 5,
            poi_limit: 10,
            poi_radius_m: 1000,
        }
    }
}

/// Base URLs of the upstream APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub weather: String,
    /// Root of the POI API; language and resource are appended per request.
    pub places: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: "https://graphhopper.com/api/1/geocode".to_string(),
            weather: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            places: "https://api.opentripmap.com/0.1".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// language = "en"
///
/// [services.weather]
/// api_key = "..."
///
/// [limits]
/// poi_radius_m = 2000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub services: HashMap<String, ServiceConfig>,
    pub limits: Limits,
    /// Language of POI names and descriptions.
    pub language: String,
    pub connect_timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: HashMap::new(),
            limits: Limits::default(),
            language: "ru".to_string(),
            connect_timeout_secs: 20,
            endpoints: Endpoints::default(),
        }
    }
}

/// Everything the orchestrator needs, validated once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub geocoding_key: String,
    pub weather_key: String,
    pub places_key: String,
    pub limits: Limits,
    pub language: String,
    pub connect_timeout: Duration,
    pub geocoding_url: Url,
    pub weather_url: Url,
    pub places_url: Url,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nearby", "nearby")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace the API key of a service.
    pub fn upsert_api_key(&mut self, service: ServiceId, api_key: String) {
        self.services
            .insert(service.as_str().to_string(), ServiceConfig { api_key });
    }

    /// Returns API key for a service, if present.
    pub fn api_key(&self, service: ServiceId) -> Option<&str> {
        self.services
            .get(service.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.is_empty())
    }

    pub fn is_configured(&self, service: ServiceId) -> bool {
        self.api_key(service).is_some()
    }

    fn require_key(&self, service: ServiceId) -> Result<String> {
        self.api_key(service).map(str::to_owned).ok_or_else(|| {
            anyhow!(
                "No API key configured for service '{service}'.\n\
                 Hint: run `nearby configure {service}` and enter your API key."
            )
        })
    }

    /// Validate the configuration and build orchestrator settings.
    pub fn settings(&self) -> Result<Settings> {
        let parse = |name: &str, raw: &str| {
            Url::parse(raw).with_context(|| format!("Invalid {name} endpoint URL: {raw}"))
        };

        if self.language.trim().is_empty() {
            return Err(anyhow!("Configured language must not be empty"));
        }

        let places_url = parse("places", &self.endpoints.places)?;
        if places_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid places endpoint URL: {places_url} cannot take a path"));
        }

        Ok(Settings {
            geocoding_key: self.require_key(ServiceId::Geocoding)?,
            weather_key: self.require_key(ServiceId::Weather)?,
            places_key: self.require_key(ServiceId::Places)?,
            limits: self.limits,
            language: self.language.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            geocoding_url: parse("geocoding", &self.endpoints.geocoding)?,
            weather_url: parse("weather", &self.endpoints.weather)?,
            places_url,
        })
    }
}
