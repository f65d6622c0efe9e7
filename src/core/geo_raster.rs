use crate::core::distance::{DistanceMeasure, SphericalDistance};
use crate::types::{GeoError, GeoResult, PixelPos, MEAN_EARTH_RADIUS, WGS84_SEMI_MAJOR_AXIS, WGS84_SEMI_MINOR_AXIS};
use ndarray::Array2;

/// Longitude step (degrees) between neighbours that indicates a wrap-around
const STEP_THRESHOLD: f64 = 180.0;

/// Side length of the window used for resolution estimation
const RESOLUTION_WINDOW: usize = 10;

/// Per-pixel geolocation of a raster
///
/// Both grids have shape `(height, width)`; NaN marks pixels without
/// geolocation. The offsets are added to every pixel position handed out
/// (0.5 for pixel-center convention).
#[derive(Debug, Clone)]
pub struct GeoRaster {
    longitudes: Array2<f64>,
    latitudes: Array2<f64>,
    offset_x: f64,
    offset_y: f64,
    resolution_km: f64,
}

impl GeoRaster {
    pub fn new(
        longitudes: Array2<f64>,
        latitudes: Array2<f64>,
        offset_x: f64,
        offset_y: f64,
        resolution_km: f64,
    ) -> GeoResult<Self> {
        if longitudes.dim() != latitudes.dim() {
            return Err(GeoError::InvalidRaster(format!(
                "Longitude grid {:?} and latitude grid {:?} differ in shape",
                longitudes.dim(),
                latitudes.dim()
            )));
        }
        if !(resolution_km.is_finite() && resolution_km > 0.0) {
            return Err(GeoError::InvalidRaster(format!(
                "Resolution must be a positive number of kilometers, got {}",
                resolution_km
            )));
        }

        Ok(Self {
            longitudes,
            latitudes,
            offset_x,
            offset_y,
            resolution_km,
        })
    }

    /// Build from flat row-major buffers
    pub fn from_vecs(
        longitudes: Vec<f64>,
        latitudes: Vec<f64>,
        width: usize,
        height: usize,
        offset_x: f64,
        offset_y: f64,
        resolution_km: f64,
    ) -> GeoResult<Self> {
        let lons = Array2::from_shape_vec((height, width), longitudes)
            .map_err(|e| GeoError::InvalidRaster(format!("Failed to reshape longitudes: {}", e)))?;
        let lats = Array2::from_shape_vec((height, width), latitudes)
            .map_err(|e| GeoError::InvalidRaster(format!("Failed to reshape latitudes: {}", e)))?;
        Self::new(lons, lats, offset_x, offset_y, resolution_km)
    }

    /// Build with the resolution estimated from the grids themselves
    pub fn with_estimated_resolution(
        longitudes: Array2<f64>,
        latitudes: Array2<f64>,
        offset_x: f64,
        offset_y: f64,
    ) -> GeoResult<Self> {
        let resolution_km = compute_resolution_in_km(&longitudes, &latitudes)?;
        log::debug!("Estimated raster resolution: {:.3} km", resolution_km);
        Self::new(longitudes, latitudes, offset_x, offset_y, resolution_km)
    }

    pub fn width(&self) -> usize {
        self.longitudes.ncols()
    }

    pub fn height(&self) -> usize {
        self.longitudes.nrows()
    }

    pub fn lon(&self, x: usize, y: usize) -> f64 {
        self.longitudes[[y, x]]
    }

    pub fn lat(&self, x: usize, y: usize) -> f64 {
        self.latitudes[[y, x]]
    }

    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    /// Nominal pixel size in kilometers, always positive and finite
    pub fn resolution_km(&self) -> f64 {
        self.resolution_km
    }

    pub fn longitudes(&self) -> &Array2<f64> {
        &self.longitudes
    }

    pub fn latitudes(&self) -> &Array2<f64> {
        &self.latitudes
    }

    pub fn contains_anti_meridian(&self) -> bool {
        contains_anti_meridian(&self.longitudes)
    }

    pub fn pole_locations(&self) -> Vec<PixelPos> {
        pole_locations(self)
    }
}

/// Whether the raster border crosses the anti-meridian
///
/// Walks the four borders; a longitude step above 180 degrees between
/// adjacent border pixels can only come from wrapping around.
pub fn contains_anti_meridian(longitudes: &Array2<f64>) -> bool {
    let (height, width) = longitudes.dim();
    if height == 0 || width == 0 {
        return false;
    }

    let jumps = |a: f64, b: f64| (a - b).abs() > STEP_THRESHOLD;

    for row in [0, height - 1] {
        for x in 1..width {
            if jumps(longitudes[[row, x]], longitudes[[row, x - 1]]) {
                return true;
            }
        }
    }
    for col in [0, width - 1] {
        for y in 1..height {
            if jumps(longitudes[[y, col]], longitudes[[y - 1, col]]) {
                return true;
            }
        }
    }

    false
}

/// Latitude difference in degrees equivalent to `distance_km` along a meridian
pub fn lat_delta_to_pole(distance_km: f64) -> f64 {
    let mean_earth_radius_km = MEAN_EARTH_RADIUS * 0.001;
    (distance_km * 180.0) / (std::f64::consts::PI * mean_earth_radius_km)
}

/// Pixels that contain a geographic pole
///
/// Interior pixels within one resolution cell of a pole are candidates. Walking
/// once around a true pole crosses the anti-meridian an odd number of times.
pub fn pole_locations(raster: &GeoRaster) -> Vec<PixelPos> {
    let delta = lat_delta_to_pole(raster.resolution_km());
    let max_lat = 90.0 - delta;
    let min_lat = -90.0 + delta;

    let lons = raster.longitudes();
    let mut poles = Vec::new();
    for (x, y) in find_pole_candidates(raster, max_lat, min_lat) {
        // clockwise ring around the candidate
        let ring = [
            lons[[y - 1, x - 1]],
            lons[[y, x - 1]],
            lons[[y + 1, x - 1]],
            lons[[y + 1, x]],
            lons[[y + 1, x + 1]],
            lons[[y, x + 1]],
            lons[[y - 1, x + 1]],
            lons[[y - 1, x]],
        ];

        let crossings = (0..ring.len())
            .filter(|&i| (ring[(i + 1) % ring.len()] - ring[i]).abs() > STEP_THRESHOLD)
            .count();

        if crossings % 2 == 1 {
            poles.push(PixelPos::new(x as f64, y as f64));
        }
    }

    if !poles.is_empty() {
        log::debug!("Found {} pole location(s)", poles.len());
    }
    poles
}

// border pixels are skipped, the ring walk needs all eight neighbours
fn find_pole_candidates(raster: &GeoRaster, max_lat: f64, min_lat: f64) -> Vec<(usize, usize)> {
    let width = raster.width();
    let height = raster.height();
    let mut candidates = Vec::new();
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let lat = raster.lat(x, y);
            if lat >= max_lat || lat <= min_lat {
                candidates.push((x, y));
            }
        }
    }
    candidates
}

/// Mean distance between neighbouring pixels in kilometers
///
/// Evaluated on a window of at most 10x10 pixels in the raster center, using
/// the WGS84 mean radius.
pub fn compute_resolution_in_km(longitudes: &Array2<f64>, latitudes: &Array2<f64>) -> GeoResult<f64> {
    if longitudes.dim() != latitudes.dim() {
        return Err(GeoError::InvalidRaster(
            "Longitude and latitude grids differ in shape".to_string(),
        ));
    }

    let (height, width) = longitudes.dim();
    let win_w = RESOLUTION_WINDOW.min(width);
    let win_h = RESOLUTION_WINDOW.min(height);
    let x0 = (width - win_w) / 2;
    let y0 = (height - win_h) / 2;
    let x_max = x0 + win_w;
    let y_max = y0 + win_h;

    let mut count = 0usize;
    let mut distance_sum = 0.0;
    for y in y0..y_max {
        for x in x0..x_max {
            let measure = SphericalDistance::new(longitudes[[y, x]], latitudes[[y, x]]);
            if x + 1 < x_max {
                distance_sum += measure.distance(longitudes[[y, x + 1]], latitudes[[y, x + 1]]);
                count += 1;
            }
            if y + 1 < y_max {
                distance_sum += measure.distance(longitudes[[y + 1, x]], latitudes[[y + 1, x]]);
                count += 1;
            }
        }
    }

    if count == 0 {
        return Err(GeoError::InvalidRaster(format!(
            "Cannot estimate resolution of a {}x{} raster",
            width, height
        )));
    }

    let mean_radians = distance_sum / count as f64;
    let mean_radius_km = (WGS84_SEMI_MAJOR_AXIS + WGS84_SEMI_MINOR_AXIS) / 2.0 / 1000.0;
    let resolution = mean_radians * mean_radius_km;
    if resolution.is_nan() || resolution <= 0.0 {
        return Err(GeoError::InvalidRaster(
            "Resolution estimate is not a positive number".to_string(),
        ));
    }

    Ok(resolution)
}
