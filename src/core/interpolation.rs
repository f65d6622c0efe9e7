use crate::core::distance::{DistanceMeasure, EuclideanDistance, SphericalDistance};
use crate::core::geo_raster::GeoRaster;
use crate::types::{GeoError, GeoPos, GeoResult, PixelPos, Sample, MEAN_EARTH_RADIUS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of the minimum distance floor in meters
const MIN_DISTANCE_METERS: f64 = 0.001;

/// Inverse-distance family of interpolators
///
/// Implementors only choose the distance measure, the distance floor and
/// optionally the weighting exponent; the weighting itself is shared.
pub trait DistanceWeightingInterpolator {
    type Measure: DistanceMeasure;

    /// Distance measure bound to the query location
    fn distance_measure(&self, lon: f64, lat: f64) -> Self::Measure;

    /// Smallest distance used for weighting, in the measure's units
    fn min_distance(&self) -> f64;

    /// Exponent `p` in `w = 1 / d^p`
    fn power(&self) -> f64 {
        1.0
    }

    /// Weight for a raw distance after applying the floor
    fn weight(&self, distance: f64) -> f64 {
        let d = distance.max(self.min_distance());
        let p = self.power();
        if p == 1.0 {
            1.0 / d
        } else {
            1.0 / d.powf(p)
        }
    }

    /// Estimate the value at the query location from the given samples
    ///
    /// A sample located exactly at the query is returned as is. All
    /// coordinates are validated before any weighting happens.
    fn interpolate(&self, query_lon: f64, query_lat: f64, samples: &[Sample]) -> GeoResult<f64> {
        GeoPos::new(query_lon, query_lat).validate()?;
        if samples.is_empty() {
            return Err(GeoError::InsufficientSamples);
        }
        for sample in samples {
            sample.geo_pos().validate()?;
        }

        let measure = self.distance_measure(query_lon, query_lat);
        let distances: Vec<f64> = samples
            .iter()
            .map(|s| measure.distance(s.lon, s.lat))
            .collect();

        if let Some(index) = distances.iter().position(|&d| d == 0.0) {
            return Ok(samples[index].value);
        }

        let nearest = nearest_floored(&distances, self.min_distance());
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for (sample, &distance) in samples.iter().zip(&distances) {
            let w = relative_weight(distance, nearest, self.min_distance(), self.power());
            weight_sum += w;
            value_sum += w * sample.value;
        }

        Ok(value_sum / weight_sum)
    }

    /// Fractional pixel position of `geo_pos` from the pixels of `context`
    ///
    /// Returns raster indices without offsets; an empty context gives
    /// `PixelPos::INVALID`.
    fn interpolate_pixel(&self, geo_pos: &GeoPos, context: &InterpolationContext) -> PixelPos {
        if context.is_empty() {
            return PixelPos::INVALID;
        }

        let measure = self.distance_measure(geo_pos.lon, geo_pos.lat);
        let distances: Vec<f64> = context
            .points()
            .iter()
            .map(|point| measure.distance(point.lon, point.lat))
            .collect();
        if let Some(index) = distances.iter().position(|&d| d == 0.0) {
            let point = &context.points()[index];
            return PixelPos::new(point.x as f64, point.y as f64);
        }

        let nearest = nearest_floored(&distances, self.min_distance());
        let mut weight_sum = 0.0;
        let mut x_sum = 0.0;
        let mut y_sum = 0.0;
        for (point, &distance) in context.points().iter().zip(&distances) {
            let w = relative_weight(distance, nearest, self.min_distance(), self.power());
            weight_sum += w;
            x_sum += w * point.x as f64;
            y_sum += w * point.y as f64;
        }

        PixelPos::new(x_sum / weight_sum, y_sum / weight_sum)
    }
}

fn nearest_floored(distances: &[f64], min_distance: f64) -> f64 {
    distances
        .iter()
        .map(|d| d.max(min_distance))
        .fold(f64::INFINITY, f64::min)
}

/// `weight(distance) / weight(nearest)`, in (0, 1] for any positive power
///
/// Stays finite where `1 / d^p` overflows for large `p`.
fn relative_weight(distance: f64, nearest: f64, min_distance: f64, power: f64) -> f64 {
    let ratio = nearest / distance.max(min_distance);
    if power == 1.0 {
        ratio
    } else {
        ratio.powf(power)
    }
}

fn check_power(power: f64) -> GeoResult<f64> {
    if power.is_finite() && power > 0.0 {
        Ok(power)
    } else {
        Err(GeoError::InvalidConfiguration(format!(
            "IDW power must be a positive finite number, got {}",
            power
        )))
    }
}

fn check_radius(mean_earth_radius_m: f64) -> GeoResult<f64> {
    if mean_earth_radius_m.is_finite() && mean_earth_radius_m > 0.0 {
        Ok(mean_earth_radius_m)
    } else {
        Err(GeoError::InvalidConfiguration(format!(
            "Mean Earth radius must be a positive finite number of meters, got {}",
            mean_earth_radius_m
        )))
    }
}

/// Inverse-distance weighting on the sphere
///
/// Distances are great-circle angles in radians. The floor is one millimeter
/// on a sphere of the configured radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseDistanceWeightingInterpolator {
    min_distance: f64,
    power: f64,
}

impl Default for InverseDistanceWeightingInterpolator {
    fn default() -> Self {
        Self {
            min_distance: MIN_DISTANCE_METERS / MEAN_EARTH_RADIUS,
            power: 1.0,
        }
    }
}

impl InverseDistanceWeightingInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different planetary radius for the distance floor
    pub fn with_mean_earth_radius(self, mean_earth_radius_m: f64) -> GeoResult<Self> {
        let radius = check_radius(mean_earth_radius_m)?;
        Ok(Self {
            min_distance: MIN_DISTANCE_METERS / radius,
            ..self
        })
    }

    pub fn with_power(self, power: f64) -> GeoResult<Self> {
        Ok(Self {
            power: check_power(power)?,
            ..self
        })
    }
}

impl DistanceWeightingInterpolator for InverseDistanceWeightingInterpolator {
    type Measure = SphericalDistance;

    fn distance_measure(&self, lon: f64, lat: f64) -> SphericalDistance {
        SphericalDistance::new(lon, lat)
    }

    fn min_distance(&self) -> f64 {
        self.min_distance
    }

    fn power(&self) -> f64 {
        self.power
    }
}

/// Inverse-distance weighting in the lon/lat plane (degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuclideanDistanceWeightingInterpolator {
    min_distance: f64,
    power: f64,
}

impl Default for EuclideanDistanceWeightingInterpolator {
    fn default() -> Self {
        Self {
            min_distance: (MIN_DISTANCE_METERS / MEAN_EARTH_RADIUS).to_degrees(),
            power: 1.0,
        }
    }
}

impl EuclideanDistanceWeightingInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mean_earth_radius(self, mean_earth_radius_m: f64) -> GeoResult<Self> {
        let radius = check_radius(mean_earth_radius_m)?;
        Ok(Self {
            min_distance: (MIN_DISTANCE_METERS / radius).to_degrees(),
            ..self
        })
    }

    pub fn with_power(self, power: f64) -> GeoResult<Self> {
        Ok(Self {
            power: check_power(power)?,
            ..self
        })
    }
}

impl DistanceWeightingInterpolator for EuclideanDistanceWeightingInterpolator {
    type Measure = EuclideanDistance;

    fn distance_measure(&self, lon: f64, lat: f64) -> EuclideanDistance {
        EuclideanDistance::new(lon, lat)
    }

    fn min_distance(&self) -> f64 {
        self.min_distance
    }

    fn power(&self) -> f64 {
        self.power
    }
}

/// Selectable pixel interpolation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XYInterpolatorType {
    #[serde(rename = "GEODETIC")]
    Geodetic,
    #[serde(rename = "EUCLIDIAN")]
    Euclidean,
}

impl Default for XYInterpolatorType {
    fn default() -> Self {
        XYInterpolatorType::Geodetic
    }
}

impl fmt::Display for XYInterpolatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XYInterpolatorType::Geodetic => write!(f, "GEODETIC"),
            XYInterpolatorType::Euclidean => write!(f, "EUCLIDIAN"),
        }
    }
}

impl FromStr for XYInterpolatorType {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GEODETIC" => Ok(XYInterpolatorType::Geodetic),
            "EUCLIDIAN" | "EUCLIDEAN" => Ok(XYInterpolatorType::Euclidean),
            other => Err(GeoError::InvalidConfiguration(format!(
                "Unknown interpolator type: {}",
                other
            ))),
        }
    }
}

/// Pixel interpolator picked at runtime
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XYInterpolator {
    Geodetic(InverseDistanceWeightingInterpolator),
    Euclidean(EuclideanDistanceWeightingInterpolator),
}

impl Default for XYInterpolator {
    fn default() -> Self {
        XYInterpolator::Geodetic(InverseDistanceWeightingInterpolator::default())
    }
}

impl XYInterpolator {
    pub fn create(kind: XYInterpolatorType, power: f64, mean_earth_radius_m: f64) -> GeoResult<Self> {
        Ok(match kind {
            XYInterpolatorType::Geodetic => XYInterpolator::Geodetic(
                InverseDistanceWeightingInterpolator::new()
                    .with_mean_earth_radius(mean_earth_radius_m)?
                    .with_power(power)?,
            ),
            XYInterpolatorType::Euclidean => XYInterpolator::Euclidean(
                EuclideanDistanceWeightingInterpolator::new()
                    .with_mean_earth_radius(mean_earth_radius_m)?
                    .with_power(power)?,
            ),
        })
    }

    pub fn kind(&self) -> XYInterpolatorType {
        match self {
            XYInterpolator::Geodetic(_) => XYInterpolatorType::Geodetic,
            XYInterpolator::Euclidean(_) => XYInterpolatorType::Euclidean,
        }
    }

    pub fn interpolate(&self, query_lon: f64, query_lat: f64, samples: &[Sample]) -> GeoResult<f64> {
        match self {
            XYInterpolator::Geodetic(i) => i.interpolate(query_lon, query_lat, samples),
            XYInterpolator::Euclidean(i) => i.interpolate(query_lon, query_lat, samples),
        }
    }

    /// Extract the neighbourhood around pixel `(x, y)` and interpolate within it
    pub fn interpolate_at(&self, geo_pos: &GeoPos, x: usize, y: usize, raster: &GeoRaster) -> PixelPos {
        match self {
            XYInterpolator::Geodetic(i) => {
                let measure = i.distance_measure(geo_pos.lon, geo_pos.lat);
                let context = InterpolationContext::extract(x, y, raster, &measure);
                i.interpolate_pixel(geo_pos, &context)
            }
            XYInterpolator::Euclidean(i) => {
                let measure = i.distance_measure(geo_pos.lon, geo_pos.lat);
                let context = InterpolationContext::extract(x, y, raster, &measure);
                i.interpolate_pixel(geo_pos, &context)
            }
        }
    }
}

/// A geolocated raster pixel taking part in pixel interpolation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextPoint {
    pub x: usize,
    pub y: usize,
    pub lon: f64,
    pub lat: f64,
}

/// Up to four pixels spanning the cell that contains the query
#[derive(Debug, Clone, Default)]
pub struct InterpolationContext {
    points: Vec<ContextPoint>,
}

impl InterpolationContext {
    pub fn new(points: Vec<ContextPoint>) -> Self {
        Self { points }
    }

    /// Build the 2x2 neighbourhood of the nearest pixel `(x, y)`
    ///
    /// The horizontal and vertical neighbours are those closer to the query
    /// according to `measure`; the diagonal pixel completes the square.
    /// Pixels outside the raster or without geolocation are left out.
    pub fn extract<M: DistanceMeasure>(x: usize, y: usize, raster: &GeoRaster, measure: &M) -> Self {
        let width = raster.width();
        let height = raster.height();
        if x >= width || y >= height {
            return Self::default();
        }

        let closer = |a: Option<(usize, usize)>, b: Option<(usize, usize)>| -> Option<(usize, usize)> {
            let dist = |p: Option<(usize, usize)>| {
                p.and_then(|(px, py)| {
                    let d = measure.distance(raster.lon(px, py), raster.lat(px, py));
                    if d.is_nan() {
                        None
                    } else {
                        Some(d)
                    }
                })
            };
            match (dist(a), dist(b)) {
                (Some(da), Some(db)) => {
                    if da <= db {
                        a
                    } else {
                        b
                    }
                }
                (Some(_), None) => a,
                (None, Some(_)) => b,
                (None, None) => None,
            }
        };

        let left = x.checked_sub(1).map(|nx| (nx, y));
        let right = if x + 1 < width { Some((x + 1, y)) } else { None };
        let up = y.checked_sub(1).map(|ny| (x, ny));
        let down = if y + 1 < height { Some((x, y + 1)) } else { None };

        let nx = closer(left, right).map(|(px, _)| px);
        let ny = closer(up, down).map(|(_, py)| py);

        let mut candidates = vec![(x, y)];
        if let Some(nx) = nx {
            candidates.push((nx, y));
        }
        if let Some(ny) = ny {
            candidates.push((x, ny));
        }
        if let (Some(nx), Some(ny)) = (nx, ny) {
            candidates.push((nx, ny));
        }

        let points = candidates
            .into_iter()
            .filter_map(|(px, py)| {
                let lon = raster.lon(px, py);
                let lat = raster.lat(px, py);
                if !(lon.is_finite() && lat.is_finite()) {
                    None
                } else {
                    Some(ContextPoint { x: px, y: py, lon, lat })
                }
            })
            .collect();

        Self { points }
    }

    pub fn points(&self) -> &[ContextPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
