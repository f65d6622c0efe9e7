//! Distance measures bound to a fixed reference point

/// Distance from a bound reference point to candidate locations
pub trait DistanceMeasure {
    /// Distance to the candidate at `lon`/`lat` (degrees), in the measure's own units
    fn distance(&self, lon: f64, lat: f64) -> f64;
}

/// Great-circle angle (radians) on the unit sphere, haversine formulation
///
/// The reference latitude's sine/cosine terms are computed once at construction,
/// so a single instance can be evaluated against many candidates cheaply.
/// NaN inputs propagate to a NaN distance; poles and the anti-meridian are
/// ordinary inputs.
#[derive(Debug, Clone, Copy)]
pub struct SphericalDistance {
    lon: f64,
    lat_rad: f64,
    cos_lat: f64,
}

impl SphericalDistance {
    pub fn new(lon: f64, lat: f64) -> Self {
        let lat_rad = lat.to_radians();
        Self {
            lon,
            lat_rad,
            cos_lat: lat_rad.cos(),
        }
    }
}

impl DistanceMeasure for SphericalDistance {
    fn distance(&self, lon: f64, lat: f64) -> f64 {
        let phi = lat.to_radians();
        let half_dphi = 0.5 * (phi - self.lat_rad);
        let half_dlambda = 0.5 * (lon - self.lon).to_radians();

        let sin_dphi = half_dphi.sin();
        let sin_dlambda = half_dlambda.sin();
        let h = sin_dphi * sin_dphi + self.cos_lat * phi.cos() * sin_dlambda * sin_dlambda;

        // rounding can push h marginally above 1 for antipodal points; keep NaN as is
        let h = if h > 1.0 { 1.0 } else { h };
        2.0 * h.sqrt().asin()
    }
}

/// Planar distance in degrees, treating lon/lat as cartesian
#[derive(Debug, Clone, Copy)]
pub struct EuclideanDistance {
    lon: f64,
    lat: f64,
}

impl EuclideanDistance {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl DistanceMeasure for EuclideanDistance {
    fn distance(&self, lon: f64, lat: f64) -> f64 {
        let d_lon = lon - self.lon;
        let d_lat = lat - self.lat;
        (d_lon * d_lon + d_lat * d_lat).sqrt()
    }
}
