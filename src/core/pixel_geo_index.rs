use crate::core::distance::{DistanceMeasure, SphericalDistance};
use crate::core::geo_raster::GeoRaster;
use crate::core::interpolation::XYInterpolator;
use crate::io::config::GeocodingConfig;
use crate::types::{GeoError, GeoPos, GeoResult, PixelPos, MEAN_EARTH_RADIUS};
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Bounding box of all raster pixels that fall into one index cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterRegion {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

impl RasterRegion {
    fn new(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn extend(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn is_point(&self) -> bool {
        self.min_x == self.max_x && self.min_y == self.max_y
    }
}

/// Index built by `initialize`, shared between clones
#[derive(Debug)]
struct GeoIndex {
    raster: GeoRaster,
    regions: BTreeMap<i64, RasterRegion>,
    multiplicator: f64,
    /// Acceptance radius in meters
    epsilon: f64,
}

impl GeoIndex {
    fn to_index(&self, lon: f64, lat: f64) -> Option<i64> {
        to_index(lon, lat, self.multiplicator)
    }
}

/// Inverse coding (geographic to pixel position) backed by a lon/lat bucket index
///
/// Every geolocated pixel is sorted into a cell of a regular lon/lat grid whose
/// size follows the raster resolution. A lookup searches the pixel bounding box
/// of the query's cell for the closest pixel and accepts it only if it lies
/// within half a pixel diagonal of the query.
#[derive(Debug, Clone)]
pub struct PixelGeoIndexInverse {
    fractional_accuracy: bool,
    interpolator: XYInterpolator,
    mean_earth_radius_m: f64,
    index: Option<Arc<GeoIndex>>,
}

impl PixelGeoIndexInverse {
    pub const KEY: &'static str = "INV_PIXEL_GEO_INDEX";
    pub const KEY_INTERPOLATING: &'static str = "INV_PIXEL_GEO_INDEX_INTERPOLATING";

    pub fn new(fractional_accuracy: bool) -> Self {
        Self::with_interpolator(fractional_accuracy, XYInterpolator::default())
    }

    pub fn with_interpolator(fractional_accuracy: bool, interpolator: XYInterpolator) -> Self {
        Self {
            fractional_accuracy,
            interpolator,
            mean_earth_radius_m: MEAN_EARTH_RADIUS,
            index: None,
        }
    }

    /// Create from a validated configuration
    pub fn from_config(config: &GeocodingConfig) -> GeoResult<Self> {
        config.validate()?;
        let interpolator =
            XYInterpolator::create(config.interpolator, config.power, config.mean_earth_radius_m)?;
        Ok(Self {
            fractional_accuracy: config.fraction_accuracy,
            interpolator,
            mean_earth_radius_m: config.mean_earth_radius_m,
            index: None,
        })
    }

    pub fn key(&self) -> &'static str {
        if self.fractional_accuracy {
            Self::KEY_INTERPOLATING
        } else {
            Self::KEY
        }
    }

    pub fn fractional_accuracy(&self) -> bool {
        self.fractional_accuracy
    }

    pub fn interpolator(&self) -> &XYInterpolator {
        &self.interpolator
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    /// Build the bucket index for `raster`, replacing any previous one
    pub fn initialize(&mut self, raster: GeoRaster) {
        let multiplicator = multiplicator(raster.resolution_km());
        let mut regions: BTreeMap<i64, RasterRegion> = BTreeMap::new();
        let mut valid_pixels = 0usize;

        for ((y, x), &lon) in raster.longitudes().indexed_iter() {
            let lat = raster.lat(x, y);
            // fill values outside any representable cell are treated like missing geolocation
            let cell = match to_index(lon, lat, multiplicator) {
                Some(cell) => cell,
                None => continue,
            };
            valid_pixels += 1;

            regions
                .entry(cell)
                .and_modify(|region| region.extend(x, y))
                .or_insert_with(|| RasterRegion::new(x, y));
        }

        if valid_pixels == 0 {
            log::warn!("Geolocation raster contains no valid pixels");
        }
        log::info!(
            "Built pixel geo index: {} cells for {} of {} pixels",
            regions.len(),
            valid_pixels,
            raster.width() * raster.height()
        );
        log::debug!("Index multiplicator: {:.4}, raster resolution: {:.3} km", multiplicator, raster.resolution_km());

        let epsilon = raster.resolution_km() * 1000.0 / std::f64::consts::SQRT_2;
        self.index = Some(Arc::new(GeoIndex {
            raster,
            regions,
            multiplicator,
            epsilon,
        }));
    }

    /// Release the index; clones made before keep working
    pub fn dispose(&mut self) {
        self.index = None;
    }

    pub fn raster(&self) -> Option<&GeoRaster> {
        self.index.as_deref().map(|index| &index.raster)
    }

    /// Cell index of a location for the current raster, `None` for non-finite
    /// or out-of-range locations
    pub fn to_index(&self, lon: f64, lat: f64) -> GeoResult<Option<i64>> {
        let index = self.index.as_deref().ok_or(GeoError::NotInitialized)?;
        Ok(index.to_index(lon, lat))
    }

    /// Pixel position of `geo_pos`, `PixelPos::INVALID` where the raster has no coverage
    pub fn get_pixel_pos(&self, geo_pos: &GeoPos) -> GeoResult<PixelPos> {
        let index = self.index.as_deref().ok_or(GeoError::NotInitialized)?;
        Ok(self.locate(index, geo_pos))
    }

    /// Batch variant of [`get_pixel_pos`](Self::get_pixel_pos)
    pub fn get_pixel_positions(&self, geo_positions: &[GeoPos]) -> GeoResult<Vec<PixelPos>> {
        let index = self.index.as_deref().ok_or(GeoError::NotInitialized)?;
        log::debug!("Locating {} geo positions", geo_positions.len());

        #[cfg(feature = "parallel")]
        let positions = geo_positions
            .par_iter()
            .map(|geo_pos| self.locate(index, geo_pos))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let positions = geo_positions
            .iter()
            .map(|geo_pos| self.locate(index, geo_pos))
            .collect();

        Ok(positions)
    }

    fn locate(&self, index: &GeoIndex, geo_pos: &GeoPos) -> PixelPos {
        let region = match index
            .to_index(geo_pos.lon, geo_pos.lat)
            .and_then(|cell| index.regions.get(&cell))
        {
            Some(region) => region,
            None => return PixelPos::INVALID,
        };

        let (x, y) = if region.is_point() {
            (region.min_x, region.min_y)
        } else {
            closest_pixel(&index.raster, region, geo_pos)
        };

        let raster = &index.raster;
        let measure = SphericalDistance::new(geo_pos.lon, geo_pos.lat);
        let distance = measure.distance(raster.lon(x, y), raster.lat(x, y)) * self.mean_earth_radius_m;
        if distance.is_nan() || distance >= index.epsilon {
            return PixelPos::INVALID;
        }

        let pixel = if self.fractional_accuracy {
            self.interpolator.interpolate_at(geo_pos, x, y, raster)
        } else {
            PixelPos::new(x as f64, y as f64)
        };

        PixelPos::new(pixel.x + raster.offset_x(), pixel.y + raster.offset_y())
    }
}

// squared lon/lat distance is sufficient for ranking pixels within one cell
fn closest_pixel(raster: &GeoRaster, region: &RasterRegion, geo_pos: &GeoPos) -> (usize, usize) {
    let mut best = (region.min_x, region.min_y);
    let mut best_distance = f64::MAX;
    for y in region.min_y..=region.max_y {
        for x in region.min_x..=region.max_x {
            let d_lon = raster.lon(x, y) - geo_pos.lon;
            let d_lat = raster.lat(x, y) - geo_pos.lat;
            let square_distance = d_lon * d_lon + d_lat * d_lat;
            if square_distance < best_distance {
                best_distance = square_distance;
                best = (x, y);
            }
        }
    }
    best
}

/// Index cells per degree for a raster resolution in kilometers
pub fn multiplicator(resolution_km: f64) -> f64 {
    if resolution_km > 33.3 {
        1.0
    } else if resolution_km <= 0.333 {
        100.0
    } else {
        100.0 / (3.0 * resolution_km)
    }
}

/// Combined cell index of a location
///
/// `None` for NaN or infinite coordinates and for locations so far outside
/// the globe that the combined index does not fit an `i64`.
pub fn to_index(lon: f64, lat: f64, multiplicator: f64) -> Option<i64> {
    if !(lon.is_finite() && lat.is_finite()) {
        return None;
    }
    let lon_idx = ((lon + 180.0) * multiplicator).floor() as i64;
    let lat_idx = ((lat + 90.0) * multiplicator).floor() as i64;
    100_000i64.checked_mul(lon_idx)?.checked_add(lat_idx)
}
