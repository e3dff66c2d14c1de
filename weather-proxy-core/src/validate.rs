use serde::Deserialize;

use crate::{
    error::ValidationError,
    model::{LocationQuery, Unit},
};

/// Raw query parameters as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub unit: Option<String>,
}

impl WeatherParams {
    /// Turn raw parameters into a [`LocationQuery`].
    ///
    /// A complete city/country pair wins over a complete coordinate pair when
    /// both are supplied. Blank values count as missing.
    pub fn validate(&self) -> Result<LocationQuery, ValidationError> {
        let unit = Unit::parse_or_default(self.unit.as_deref());

        if let (Some(city), Some(country)) = (present(&self.city), present(&self.country)) {
            return Ok(LocationQuery::by_name(city, country, unit));
        }

        if let (Some(lat), Some(lon)) = (present(&self.latitude), present(&self.longitude)) {
            return Ok(LocationQuery::by_coordinates(lat, lon, unit));
        }

        Err(ValidationError::MissingLocation)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
