use approx::assert_abs_diff_eq;
use ndarray::Array2;
use pixgeo::io::config::{PROPERTY_FRACTION_ACCURACY, PROPERTY_INTERPOLATOR};
use pixgeo::{GeoError, GeoPos, GeoRaster, GeocodingConfig, PixelGeoIndexInverse, XYInterpolatorType};
use std::collections::HashMap;

const WIDTH: usize = 20;
const HEIGHT: usize = 16;
const STEP: f64 = 0.1;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pixel_lon(x: usize) -> f64 {
    -10.0 + x as f64 * STEP
}

fn pixel_lat(y: usize) -> f64 {
    50.0 - y as f64 * STEP
}

/// Regular 0.1 degree grid west of Brittany
fn regular_raster(resolution_km: f64) -> GeoRaster {
    let lons = Array2::from_shape_fn((HEIGHT, WIDTH), |(_, x)| pixel_lon(x));
    let lats = Array2::from_shape_fn((HEIGHT, WIDTH), |(y, _)| pixel_lat(y));
    GeoRaster::new(lons, lats, 0.5, 0.5, resolution_km).unwrap()
}

fn inverse(fractional: bool, resolution_km: f64) -> PixelGeoIndexInverse {
    let mut inverse = PixelGeoIndexInverse::new(fractional);
    inverse.initialize(regular_raster(resolution_km));
    inverse
}

#[test]
fn test_exact_pixel_locations() {
    init_logging();
    let inverse = inverse(false, 10.0);

    for &(x, y) in &[(0, 0), (5, 7), (19, 0), (19, 15), (0, 15), (11, 3)] {
        let pixel = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(x), pixel_lat(y))).unwrap();
        assert_abs_diff_eq!(pixel.x, x as f64 + 0.5, epsilon = 1e-8);
        assert_abs_diff_eq!(pixel.y, y as f64 + 0.5, epsilon = 1e-8);
    }
}

#[test]
fn test_snaps_to_nearest_pixel() {
    let inverse = inverse(false, 10.0);
    let pixel = inverse
        .get_pixel_pos(&GeoPos::new(pixel_lon(8) + 0.02, pixel_lat(4) - 0.03))
        .unwrap();
    assert_abs_diff_eq!(pixel.x, 8.5, epsilon = 1e-8);
    assert_abs_diff_eq!(pixel.y, 4.5, epsilon = 1e-8);
}

#[test]
fn test_outside_coverage() {
    let inverse = inverse(false, 10.0);
    for geo_pos in [
        GeoPos::new(100.0, 50.0),
        GeoPos::new(-10.0, -20.0),
        GeoPos::new(f64::NAN, 49.5),
        GeoPos::new(-9.5, f64::NAN),
    ] {
        let pixel = inverse.get_pixel_pos(&geo_pos).unwrap();
        assert!(!pixel.is_valid(), "{:?} located at {:?}", geo_pos, pixel);
    }
}

#[test]
fn test_unbounded_queries_are_not_located() {
    let inverse = inverse(true, 10.0);
    let queries = [
        GeoPos::new(f64::INFINITY, 49.5),
        GeoPos::new(f64::NEG_INFINITY, 49.5),
        GeoPos::new(-9.5, f64::INFINITY),
        GeoPos::new(1e16, 49.5),
        GeoPos::new(-1e16, 49.5),
        GeoPos::new(-9.5, 1e16),
    ];
    for geo_pos in &queries {
        assert!(!inverse.get_pixel_pos(geo_pos).unwrap().is_valid(), "{:?}", geo_pos);
    }
    let batch = inverse.get_pixel_positions(&queries).unwrap();
    assert!(batch.iter().all(|pixel| !pixel.is_valid()));
}

#[test]
fn test_huge_fill_values_are_skipped() {
    let mut lons = Array2::from_shape_fn((HEIGHT, WIDTH), |(_, x)| pixel_lon(x));
    let lats = Array2::from_shape_fn((HEIGHT, WIDTH), |(y, _)| pixel_lat(y));
    lons[[0, 0]] = 1e16;
    lons[[0, 1]] = f64::INFINITY;

    let mut inverse = PixelGeoIndexInverse::new(false);
    inverse.initialize(GeoRaster::new(lons, lats, 0.5, 0.5, 10.0).unwrap());

    assert!(!inverse.get_pixel_pos(&GeoPos::new(1e16, pixel_lat(0))).unwrap().is_valid());
    let pixel = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(5), pixel_lat(5))).unwrap();
    assert_abs_diff_eq!(pixel.x, 5.5, epsilon = 1e-8);
    assert_abs_diff_eq!(pixel.y, 5.5, epsilon = 1e-8);
}

#[test]
fn test_rejects_query_beyond_acceptance_radius() {
    // 1 km resolution: acceptance radius ~707 m, pixels are ~7-11 km apart
    let inverse = inverse(false, 1.0);

    let on_pixel = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(4), pixel_lat(7))).unwrap();
    assert_abs_diff_eq!(on_pixel.x, 4.5, epsilon = 1e-8);

    // ~1.1 km north of the same pixel, still in its index cell
    let off_pixel = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(4), pixel_lat(7) + 0.01)).unwrap();
    assert!(!off_pixel.is_valid());
}

#[test]
fn test_fractional_accuracy_between_pixels() {
    let inverse = inverse(true, 10.0);
    assert_eq!(inverse.key(), PixelGeoIndexInverse::KEY_INTERPOLATING);

    let exact = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(5), pixel_lat(7))).unwrap();
    assert_abs_diff_eq!(exact.x, 5.5, epsilon = 1e-8);
    assert_abs_diff_eq!(exact.y, 7.5, epsilon = 1e-8);

    // half way between pixel columns 5 and 6 on row 7
    let midway = GeoPos::new(0.5 * (pixel_lon(5) + pixel_lon(6)), pixel_lat(7));
    let pixel = inverse.get_pixel_pos(&midway).unwrap();
    assert_abs_diff_eq!(pixel.x, 6.0, epsilon = 1e-6);
    assert!((pixel.y - 7.5).abs() < 0.5, "y = {}", pixel.y);

    // a quarter of the way towards column 6 stays closer to column 5
    let quarter = GeoPos::new(pixel_lon(5) + 0.25 * STEP, pixel_lat(7));
    let pixel = inverse.get_pixel_pos(&quarter).unwrap();
    assert!(pixel.x > 5.5 && pixel.x < 6.0, "x = {}", pixel.x);
}

#[test]
fn test_euclidean_interpolator_from_properties() {
    let properties: HashMap<String, String> = [
        (PROPERTY_INTERPOLATOR.to_string(), "EUCLIDIAN".to_string()),
        (PROPERTY_FRACTION_ACCURACY.to_string(), "true".to_string()),
    ]
    .into_iter()
    .collect();
    let config = GeocodingConfig::from_properties(&properties).unwrap();

    let mut inverse = PixelGeoIndexInverse::from_config(&config).unwrap();
    assert_eq!(inverse.interpolator().kind(), XYInterpolatorType::Euclidean);
    inverse.initialize(regular_raster(10.0));

    let midway = GeoPos::new(0.5 * (pixel_lon(12) + pixel_lon(13)), pixel_lat(2));
    let pixel = inverse.get_pixel_pos(&midway).unwrap();
    assert_abs_diff_eq!(pixel.x, 13.0, epsilon = 1e-6);
}

#[test]
fn test_missing_geolocation_is_skipped() {
    let mut lons = Array2::from_shape_fn((HEIGHT, WIDTH), |(_, x)| pixel_lon(x));
    let lats = Array2::from_shape_fn((HEIGHT, WIDTH), |(y, _)| pixel_lat(y));
    lons[[3, 3]] = f64::NAN;

    // coarse enough that all four direct neighbours are within the acceptance radius
    let mut inverse = PixelGeoIndexInverse::new(true);
    inverse.initialize(GeoRaster::new(lons, lats, 0.5, 0.5, 20.0).unwrap());

    let pixel = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(3), pixel_lat(3))).unwrap();
    // the fill pixel can't be found, a neighbour within the acceptance radius is used
    assert!(pixel.is_valid());
    assert!(!(pixel.x == 3.5 && pixel.y == 3.5));
}

#[test]
fn test_batch_matches_single_lookups() {
    let inverse = inverse(true, 10.0);
    let queries: Vec<GeoPos> = (0..200)
        .map(|i| GeoPos::new(-10.05 + i as f64 * 0.0107, 50.02 - i as f64 * 0.0081))
        .collect();

    let batch = inverse.get_pixel_positions(&queries).unwrap();
    assert_eq!(batch.len(), queries.len());
    for (query, pixel) in queries.iter().zip(&batch) {
        let single = inverse.get_pixel_pos(query).unwrap();
        if single.is_valid() {
            assert_eq!(single, *pixel);
        } else {
            assert!(!pixel.is_valid());
        }
    }
}

#[test]
fn test_clone_survives_dispose() {
    let mut original = inverse(true, 10.0);
    let geo_pos = GeoPos::new(pixel_lon(9) + 0.03, pixel_lat(9) - 0.02);
    let expected = original.get_pixel_pos(&geo_pos).unwrap();

    let clone = original.clone();
    original.dispose();

    assert!(!original.is_initialized());
    assert!(matches!(original.get_pixel_pos(&geo_pos), Err(GeoError::NotInitialized)));
    assert_eq!(clone.get_pixel_pos(&geo_pos).unwrap(), expected);
}

#[test]
fn test_estimated_resolution_raster() {
    let lons = Array2::from_shape_fn((HEIGHT, WIDTH), |(_, x)| pixel_lon(x));
    let lats = Array2::from_shape_fn((HEIGHT, WIDTH), |(y, _)| pixel_lat(y));
    let raster = GeoRaster::with_estimated_resolution(lons, lats, 0.5, 0.5).unwrap();
    // mean of ~7.2 km along rows and ~11.1 km along columns
    let resolution_km = raster.resolution_km();
    assert!(resolution_km > 8.5 && resolution_km < 10.0, "{}", resolution_km);

    let mut inverse = PixelGeoIndexInverse::new(false);
    inverse.initialize(raster);
    let pixel = inverse.get_pixel_pos(&GeoPos::new(pixel_lon(10), pixel_lat(10))).unwrap();
    assert_abs_diff_eq!(pixel.x, 10.5, epsilon = 1e-8);
    assert_abs_diff_eq!(pixel.y, 10.5, epsilon = 1e-8);
}
