use serde::{Deserialize, Serialize};
use std::fmt;

/// A geocoding candidate returned by a place search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub city: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    /// Label shown to the user: "name, city" when the city is known.
    pub fn label(&self) -> String {
        match &self.city {
            Some(city) => format!("{}, {}", self.name, city),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Current conditions at a place, metric units.
///
/// Every field is optional: providers omit sub-objects freely and a missing
/// one means "unavailable", not a broken response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub condition: Option<String>,
    pub description: Option<String>,
    pub temperature_c: Option<f64>,
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let condition = self.condition.as_deref().unwrap_or("Unknown");
        match self.temperature_c {
            Some(temp) => write!(f, "Weather: {condition}. Temp: {temp}°C"),
            None => write!(f, "Weather: {condition}"),
        }
    }
}

/// A nearby landmark as returned by POI discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub xid: String,
    pub name: String,
}

/// A discovered POI plus its lazily fetched description.
///
/// `detail_attempted` only ever goes from `false` to `true`; the store
/// enforces this, so the field is read-only outside the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfInterestDetail {
    pub xid: String,
    pub name: String,
    pub description: Option<String>,
    pub(crate) detail_attempted: bool,
}

impl PointOfInterestDetail {
    pub fn detail_attempted(&self) -> bool {
        self.detail_attempted
    }

    /// `true` once a detail fetch finished with a description.
    pub fn is_resolved(&self) -> bool {
        self.description.is_some()
    }
}

impl From<PointOfInterest> for PointOfInterestDetail {
    fn from(poi: PointOfInterest) -> Self {
        Self {
            xid: poi.xid,
            name: poi.name,
            description: None,
            detail_attempted: false,
        }
    }
}

impl fmt::Display for PointOfInterestDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}", self.name)?;
        if let Some(description) = &self.description {
            write!(f, "\nDescription: {description}")?;
        }
        Ok(())
    }
}

/// Decoded body of a POI detail request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoiDetailBody {
    pub xid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}
