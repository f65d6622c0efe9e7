use crate::core::interpolation::XYInterpolatorType;
use crate::types::{GeoError, GeoResult, MEAN_EARTH_RADIUS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

pub const PROPERTY_FRACTION_ACCURACY: &str = "snap.pixelGeoCoding.fractionAccuracy";
pub const PROPERTY_INTERPOLATOR: &str = "snap.pixelGeoCoding.interpolator";
pub const PROPERTY_IDW_POWER: &str = "snap.pixelGeoCoding.idwPower";
pub const PROPERTY_MEAN_EARTH_RADIUS: &str = "snap.pixelGeoCoding.meanEarthRadiusMeters";

/// Settings for pixel geocoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Strategy used for fractional pixel positions
    pub interpolator: XYInterpolatorType,
    /// Inverse-distance exponent
    pub power: f64,
    /// Radius for the distance floor and the acceptance check (meters)
    pub mean_earth_radius_m: f64,
    /// Interpolate pixel positions instead of snapping to the nearest pixel
    pub fraction_accuracy: bool,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            interpolator: XYInterpolatorType::Geodetic,
            power: 1.0,
            mean_earth_radius_m: MEAN_EARTH_RADIUS,
            fraction_accuracy: false,
        }
    }
}

impl GeocodingConfig {
    /// Read settings from a property map, keeping defaults for absent keys
    pub fn from_properties(properties: &HashMap<String, String>) -> GeoResult<Self> {
        let mut config = Self::default();

        if let Some(value) = properties.get(PROPERTY_INTERPOLATOR) {
            config.interpolator = value.parse()?;
        }
        if let Some(value) = properties.get(PROPERTY_IDW_POWER) {
            config.power = parse_property(PROPERTY_IDW_POWER, value)?;
        }
        if let Some(value) = properties.get(PROPERTY_MEAN_EARTH_RADIUS) {
            config.mean_earth_radius_m = parse_property(PROPERTY_MEAN_EARTH_RADIUS, value)?;
        }
        if let Some(value) = properties.get(PROPERTY_FRACTION_ACCURACY) {
            config.fraction_accuracy = parse_property(PROPERTY_FRACTION_ACCURACY, value)?;
        }

        config.validate()?;
        log::debug!("Geocoding configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> GeoResult<()> {
        if !(self.power.is_finite() && self.power > 0.0) {
            return Err(GeoError::InvalidConfiguration(format!(
                "{} must be positive, got {}",
                PROPERTY_IDW_POWER, self.power
            )));
        }
        if !(self.mean_earth_radius_m.is_finite() && self.mean_earth_radius_m > 0.0) {
            return Err(GeoError::InvalidConfiguration(format!(
                "{} must be positive, got {}",
                PROPERTY_MEAN_EARTH_RADIUS, self.mean_earth_radius_m
            )));
        }
        Ok(())
    }
}

fn parse_property<T: FromStr>(key: &str, value: &str) -> GeoResult<T> {
    value.trim().parse().map_err(|_| {
        GeoError::InvalidConfiguration(format!("Cannot parse value '{}' of property {}", value, key))
    })
}
