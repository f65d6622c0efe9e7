//! pixgeo: pixel-based geolocation for Earth-observation rasters
//!
//! Maps geographic positions to pixel positions for swath data whose
//! geolocation is given per pixel (longitude/latitude grids) rather than by an
//! analytic projection. Fractional pixel positions and point estimates from
//! scattered samples use inverse-distance weighting on the sphere.

pub mod types;
pub mod core;
pub mod io;

// Re-export main types and functions for easier access
pub use crate::types::{GeoPos, PixelPos, Sample, GeoError, GeoResult, MEAN_EARTH_RADIUS};

pub use crate::core::{
    DistanceMeasure, SphericalDistance, DistanceWeightingInterpolator,
    InverseDistanceWeightingInterpolator, XYInterpolator, XYInterpolatorType, GeoRaster,
    PixelGeoIndexInverse,
};
pub use crate::io::{GeocodingConfig, CodingDescriptor};

#[cfg(feature = "python")]
mod python {
    use crate::core::{DistanceWeightingInterpolator, GeoRaster, InverseDistanceWeightingInterpolator, PixelGeoIndexInverse, XYInterpolatorType};
    use crate::io::GeocodingConfig;
    use crate::types::{GeoError, GeoPos, Sample, MEAN_EARTH_RADIUS};
    use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2};
    use pyo3::prelude::*;

    impl From<GeoError> for PyErr {
        fn from(e: GeoError) -> Self {
            match e {
                GeoError::Io(_) | GeoError::Persistence(_) | GeoError::NotInitialized => {
                    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e))
                }
                _ => PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)),
            }
        }
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PyInverseDistanceInterpolator>()?;
        m.add_class::<PyPixelGeoIndex>()?;
        Ok(())
    }

    /// Python wrapper for InverseDistanceWeightingInterpolator
    #[pyclass(name = "InverseDistanceInterpolator")]
    struct PyInverseDistanceInterpolator {
        inner: InverseDistanceWeightingInterpolator,
    }

    #[pymethods]
    impl PyInverseDistanceInterpolator {
        #[new]
        #[pyo3(signature = (power = 1.0, mean_earth_radius = MEAN_EARTH_RADIUS))]
        fn new(power: f64, mean_earth_radius: f64) -> PyResult<Self> {
            let inner = InverseDistanceWeightingInterpolator::new()
                .with_mean_earth_radius(mean_earth_radius)?
                .with_power(power)?;
            Ok(PyInverseDistanceInterpolator { inner })
        }

        /// Samples are (lon, lat, value) tuples
        fn interpolate(&self, lon: f64, lat: f64, samples: Vec<(f64, f64, f64)>) -> PyResult<f64> {
            let samples: Vec<Sample> = samples.into_iter().map(Sample::from).collect();
            Ok(self.inner.interpolate(lon, lat, &samples)?)
        }

        #[getter]
        fn min_distance(&self) -> f64 {
            self.inner.min_distance()
        }

        #[getter]
        fn power(&self) -> f64 {
            self.inner.power()
        }
    }

    /// Python wrapper for PixelGeoIndexInverse
    #[pyclass(name = "PixelGeoIndex")]
    struct PyPixelGeoIndex {
        inner: PixelGeoIndexInverse,
    }

    #[pymethods]
    impl PyPixelGeoIndex {
        #[new]
        #[pyo3(signature = (
            longitudes,
            latitudes,
            resolution_km = None,
            offset_x = 0.5,
            offset_y = 0.5,
            fraction_accuracy = false,
            interpolator = "GEODETIC"
        ))]
        fn new<'py>(
            longitudes: PyReadonlyArray2<'py, f64>,
            latitudes: PyReadonlyArray2<'py, f64>,
            resolution_km: Option<f64>,
            offset_x: f64,
            offset_y: f64,
            fraction_accuracy: bool,
            interpolator: &str,
        ) -> PyResult<Self> {
            let lons = longitudes.as_array().to_owned();
            let lats = latitudes.as_array().to_owned();
            let raster = match resolution_km {
                Some(resolution) => GeoRaster::new(lons, lats, offset_x, offset_y, resolution)?,
                None => GeoRaster::with_estimated_resolution(lons, lats, offset_x, offset_y)?,
            };

            let config = GeocodingConfig {
                interpolator: interpolator.parse::<XYInterpolatorType>()?,
                fraction_accuracy,
                ..GeocodingConfig::default()
            };
            let mut inner = PixelGeoIndexInverse::from_config(&config)?;
            inner.initialize(raster);
            Ok(PyPixelGeoIndex { inner })
        }

        #[getter]
        fn key(&self) -> &'static str {
            self.inner.key()
        }

        fn get_pixel_pos(&self, lon: f64, lat: f64) -> PyResult<(f64, f64)> {
            let pixel = self.inner.get_pixel_pos(&GeoPos::new(lon, lat))?;
            Ok((pixel.x, pixel.y))
        }

        /// Vectorized lookup, returns (x, y) arrays with NaN where not covered
        fn get_pixel_positions<'py>(
            &self,
            py: Python<'py>,
            longitudes: PyReadonlyArray1<'py, f64>,
            latitudes: PyReadonlyArray1<'py, f64>,
        ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
            let lons = longitudes.as_array();
            let lats = latitudes.as_array();
            if lons.len() != lats.len() {
                return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                    "Longitude and latitude arrays differ in length: {} vs {}",
                    lons.len(),
                    lats.len()
                )));
            }

            let geo_positions: Vec<GeoPos> = lons
                .iter()
                .zip(lats.iter())
                .map(|(&lon, &lat)| GeoPos::new(lon, lat))
                .collect();
            let pixels = py.allow_threads(|| self.inner.get_pixel_positions(&geo_positions))?;

            let xs: Vec<f64> = pixels.iter().map(|p| p.x).collect();
            let ys: Vec<f64> = pixels.iter().map(|p| p.y).collect();
            Ok((PyArray1::from_vec(py, xs), PyArray1::from_vec(py, ys)))
        }
    }
}
