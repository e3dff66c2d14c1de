use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, time::Duration};

/// Weather data as returned by the upstream provider. Never inspected, only
/// serialized for cache storage and passed through to the caller.
pub type WeatherPayload = serde_json::Value;

/// Lifetime of every cache entry written by the proxy.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

const KEY_DELIMITER: char = ':';

/// Unit system requested from the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Metric,
    Us,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Metric => "metric",
            Unit::Us => "us",
        }
    }

    /// Lenient parse: anything other than `metric` or `us` falls back to metric.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("us") => Unit::Us,
            _ => Unit::Metric,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two mutually exclusive ways a client can name a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    ByName { city: String, country: String },
    ByCoordinates { latitude: String, longitude: String },
}

impl Location {
    /// The two location fields in key order.
    pub fn parts(&self) -> (&str, &str) {
        match self {
            Location::ByName { city, country } => (city.as_str(), country.as_str()),
            Location::ByCoordinates {
                latitude,
                longitude,
            } => (latitude.as_str(), longitude.as_str()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.parts();
        write!(f, "{a},{b}")
    }
}

/// A validated request for weather at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationQuery {
    pub location: Location,
    pub unit: Unit,
}

impl LocationQuery {
    pub fn by_name(city: impl Into<String>, country: impl Into<String>, unit: Unit) -> Self {
        Self {
            location: Location::ByName {
                city: city.into(),
                country: country.into(),
            },
            unit,
        }
    }

    pub fn by_coordinates(
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        unit: Unit,
    ) -> Self {
        Self {
            location: Location::ByCoordinates {
                latitude: latitude.into(),
                longitude: longitude.into(),
            },
            unit,
        }
    }

    /// Derive the cache key: both location fields then the unit, `:`-joined.
    ///
    /// `%` and `:` inside a field are percent-encoded so distinct field pairs
    /// can never collapse onto the same key.
    pub fn cache_key(&self) -> CacheKey {
        let (a, b) = self.location.parts();
        CacheKey(format!(
            "{a}{d}{b}{d}{unit}",
            a = escape_key_part(a),
            b = escape_key_part(b),
            d = KEY_DELIMITER,
            unit = self.unit
        ))
    }
}

fn escape_key_part(part: &str) -> Cow<'_, str> {
    if !part.contains(['%', KEY_DELIMITER]) {
        return Cow::Borrowed(part);
    }
    Cow::Owned(part.replace('%', "%25").replace(KEY_DELIMITER, "%3A"))
}

/// Cache key for one [`LocationQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
