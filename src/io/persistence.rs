use crate::core::geo_raster::GeoRaster;
use crate::core::interpolation::XYInterpolatorType;
use crate::core::pixel_geo_index::PixelGeoIndexInverse;
use crate::io::config::GeocodingConfig;
use crate::types::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted description of a pixel geocoding
///
/// Holds what is needed to rebuild the inverse coding once the geolocation
/// grids have been read again from the named variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "ComponentGeoCoding")]
pub struct CodingDescriptor {
    #[serde(rename = "InverseCodingKey")]
    pub inverse_coding_key: String,
    #[serde(rename = "Interpolator")]
    pub interpolator: String,
    #[serde(rename = "LonVariableName")]
    pub lon_variable_name: String,
    #[serde(rename = "LatVariableName")]
    pub lat_variable_name: String,
    #[serde(rename = "RasterResolutionKm")]
    pub raster_resolution_km: f64,
    #[serde(rename = "OffsetX")]
    pub offset_x: f64,
    #[serde(rename = "OffsetY")]
    pub offset_y: f64,
}

impl CodingDescriptor {
    /// Describe an inverse coding operating on `raster`
    pub fn describe(
        inverse: &PixelGeoIndexInverse,
        raster: &GeoRaster,
        lon_variable_name: &str,
        lat_variable_name: &str,
    ) -> Self {
        Self {
            inverse_coding_key: inverse.key().to_string(),
            interpolator: inverse.interpolator().kind().to_string(),
            lon_variable_name: lon_variable_name.to_string(),
            lat_variable_name: lat_variable_name.to_string(),
            raster_resolution_km: raster.resolution_km(),
            offset_x: raster.offset_x(),
            offset_y: raster.offset_y(),
        }
    }

    pub fn to_xml(&self) -> GeoResult<String> {
        quick_xml::se::to_string(self)
            .map_err(|e| GeoError::Persistence(format!("Failed to serialize geocoding: {}", e)))
    }

    pub fn from_xml(xml: &str) -> GeoResult<Self> {
        quick_xml::de::from_str(xml)
            .map_err(|e| GeoError::Persistence(format!("Failed to parse geocoding: {}", e)))
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> GeoResult<()> {
        let xml = self.to_xml()?;
        std::fs::write(path.as_ref(), xml)?;
        log::info!("Wrote geocoding descriptor: {}", path.as_ref().display());
        Ok(())
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        log::info!("Reading geocoding descriptor: {}", path.as_ref().display());
        let xml = std::fs::read_to_string(path.as_ref())?;
        Self::from_xml(&xml)
    }
}

/// Rebuild and initialize the inverse coding described by `descriptor`
///
/// `config` supplies the settings not stored in the descriptor (IDW power and
/// Earth radius). The raster's resolution and offsets are overridden with the
/// persisted ones.
pub fn restore_inverse(
    descriptor: &CodingDescriptor,
    longitudes: ndarray::Array2<f64>,
    latitudes: ndarray::Array2<f64>,
    config: &GeocodingConfig,
) -> GeoResult<PixelGeoIndexInverse> {
    let fraction_accuracy = match descriptor.inverse_coding_key.as_str() {
        PixelGeoIndexInverse::KEY => false,
        PixelGeoIndexInverse::KEY_INTERPOLATING => true,
        other => return Err(GeoError::UnknownCodingKey(other.to_string())),
    };
    let interpolator: XYInterpolatorType = descriptor.interpolator.parse()?;

    let config = GeocodingConfig {
        interpolator,
        fraction_accuracy,
        ..config.clone()
    };

    let raster = GeoRaster::new(
        longitudes,
        latitudes,
        descriptor.offset_x,
        descriptor.offset_y,
        descriptor.raster_resolution_km,
    )?;

    let mut inverse = PixelGeoIndexInverse::from_config(&config)?;
    inverse.initialize(raster);
    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> CodingDescriptor {
        CodingDescriptor {
            inverse_coding_key: PixelGeoIndexInverse::KEY_INTERPOLATING.to_string(),
            interpolator: "EUCLIDIAN".to_string(),
            lon_variable_name: "longitude".to_string(),
            lat_variable_name: "latitude".to_string(),
            raster_resolution_km: 1.2,
            offset_x: 0.5,
            offset_y: 0.5,
        }
    }

    #[test]
    fn test_xml_layout() {
        let xml = descriptor().to_xml().unwrap();
        assert!(xml.starts_with("<ComponentGeoCoding>"));
        assert!(xml.contains("<InverseCodingKey>INV_PIXEL_GEO_INDEX_INTERPOLATING</InverseCodingKey>"));
        assert!(xml.contains("<Interpolator>EUCLIDIAN</Interpolator>"));
        assert!(xml.contains("<RasterResolutionKm>1.2</RasterResolutionKm>"));
    }

    #[test]
    fn test_parse_hand_written_xml() {
        let xml = r#"
            <ComponentGeoCoding>
                <InverseCodingKey>INV_PIXEL_GEO_INDEX</InverseCodingKey>
                <Interpolator>GEODETIC</Interpolator>
                <LonVariableName>lon</LonVariableName>
                <LatVariableName>lat</LatVariableName>
                <RasterResolutionKm>0.3</RasterResolutionKm>
                <OffsetX>0.5</OffsetX>
                <OffsetY>0.5</OffsetY>
            </ComponentGeoCoding>"#;

        let parsed = CodingDescriptor::from_xml(xml).unwrap();
        assert_eq!(parsed.inverse_coding_key, "INV_PIXEL_GEO_INDEX");
        assert_eq!(parsed.lon_variable_name, "lon");
        assert_eq!(parsed.raster_resolution_km, 0.3);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            CodingDescriptor::from_xml("<ComponentGeoCoding><OffsetX>left</OffsetX></ComponentGeoCoding>"),
            Err(GeoError::Persistence(_))
        ));
    }

    #[test]
    fn test_restore_unknown_key() {
        let mut foreign = descriptor();
        foreign.inverse_coding_key = "INV_PIXEL_QUAD_TREE".to_string();
        let lons = ndarray::Array2::zeros((2, 2));
        let lats = ndarray::Array2::zeros((2, 2));
        assert!(matches!(
            restore_inverse(&foreign, lons, lats, &GeocodingConfig::default()),
            Err(GeoError::UnknownCodingKey(_))
        ));
    }
}
