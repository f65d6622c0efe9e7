use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, used for the IDW distance floor and the
/// acceptance radius of the inverse coding
pub const MEAN_EARTH_RADIUS: f64 = 6_370_997.0;

/// WGS84 semi-major axis in meters
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 semi-minor axis in meters
pub const WGS84_SEMI_MINOR_AXIS: f64 = 6_356_752.314245;

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPos {
    pub const INVALID: GeoPos = GeoPos {
        lon: f64::NAN,
        lat: f64::NAN,
    };

    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// False if either component is NaN
    pub fn is_valid(&self) -> bool {
        !(self.lon.is_nan() || self.lat.is_nan())
    }

    /// Range check used at the interpolation boundary
    pub fn validate(&self) -> GeoResult<()> {
        if self.is_valid()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
        {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate {
                lon: self.lon,
                lat: self.lat,
            })
        }
    }
}

impl std::fmt::Display for GeoPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.lon, self.lat)
    }
}

/// Pixel position, fractional when interpolated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

impl PixelPos {
    pub const INVALID: PixelPos = PixelPos {
        x: f64::NAN,
        y: f64::NAN,
    };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        !(self.x.is_nan() || self.y.is_nan())
    }
}

/// A known value at a geographic location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(lon: f64, lat: f64, value: f64) -> Self {
        Self { lon, lat, value }
    }

    pub fn geo_pos(&self) -> GeoPos {
        GeoPos::new(self.lon, self.lat)
    }
}

impl From<(f64, f64, f64)> for Sample {
    fn from((lon, lat, value): (f64, f64, f64)) -> Self {
        Self { lon, lat, value }
    }
}

/// Error types for geolocation
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("At least one sample is required for interpolation")]
    InsufficientSamples,

    #[error("Invalid coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid geolocation raster: {0}")]
    InvalidRaster(String),

    #[error("Inverse coding is not initialized")]
    NotInitialized,

    #[error("Unknown inverse coding key: {0}")]
    UnknownCodingKey(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type for geolocation operations
pub type GeoResult<T> = Result<T, GeoError>;
