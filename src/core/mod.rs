//! Core geolocation modules

pub mod distance;
pub mod interpolation;
pub mod geo_raster;
pub mod pixel_geo_index;

// Re-export main types
pub use distance::{DistanceMeasure, SphericalDistance, EuclideanDistance};
pub use interpolation::{
    DistanceWeightingInterpolator, InverseDistanceWeightingInterpolator,
    EuclideanDistanceWeightingInterpolator, InterpolationContext, ContextPoint, XYInterpolator,
    XYInterpolatorType,
};
pub use geo_raster::{GeoRaster, contains_anti_meridian, pole_locations, lat_delta_to_pole, compute_resolution_in_km};
pub use pixel_geo_index::{PixelGeoIndexInverse, RasterRegion};
