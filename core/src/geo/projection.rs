use crate::prelude::{StageError, StageResult};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

const GEOGRAPHIC_WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// EPSG code of the WGS84 UTM zone containing (lon, lat).
pub fn utm_epsg(lon: f64, lat: f64) -> StageResult<u16> {
    if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0 {
        return Err(StageError::Projection(format!(
            "no UTM zone for position ({}, {})",
            lon, lat
        )));
    }
    let zone = (((lon + 180.0) / 6.0).floor() as u16 + 1).clamp(1, 60);
    Ok(if lat >= 0.0 { 32600 + zone } else { 32700 + zone })
}

/// Converts between WGS84 lon/lat and one fixed UTM zone.
pub struct GeodeticProjector {
    epsg: u16,
    geographic: Proj,
    projected: Proj,
}

impl std::fmt::Debug for GeodeticProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeodeticProjector")
            .field("epsg", &self.epsg)
            .finish_non_exhaustive()
    }
}

impl GeodeticProjector {
    pub fn new(epsg: u16) -> StageResult<Self> {
        let (zone, south) = match epsg {
            32601..=32660 => (epsg - 32600, false),
            32701..=32760 => (epsg - 32700, true),
            _ => {
                return Err(StageError::Projection(format!(
                    "EPSG:{} is not a WGS84 UTM zone",
                    epsg
                )))
            }
        };
        let utm = format!(
            "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
            zone,
            if south { " +south" } else { "" }
        );

        let geographic = Proj::from_proj_string(GEOGRAPHIC_WGS84)
            .map_err(|e| StageError::Projection(format!("geographic CRS: {e:?}")))?;
        let projected = Proj::from_proj_string(&utm)
            .map_err(|e| StageError::Projection(format!("EPSG:{epsg}: {e:?}")))?;

        Ok(Self {
            epsg,
            geographic,
            projected,
        })
    }

    /// Projector for the zone holding the survey's initial position.
    pub fn for_position(lon: f64, lat: f64) -> StageResult<Self> {
        Self::new(utm_epsg(lon, lat)?)
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// (lon, lat) in degrees to (easting, northing) in meters.
    pub fn project(&self, lon: f64, lat: f64) -> StageResult<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(StageError::Projection(format!(
                "cannot project non-finite position ({}, {})",
                lon, lat
            )));
        }
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&self.geographic, &self.projected, &mut point)
            .map_err(|e| StageError::Projection(format!("forward transform: {e:?}")))?;
        Ok((point.0, point.1))
    }

    /// (easting, northing) in meters back to (lon, lat) in degrees.
    pub fn unproject(&self, easting: f64, northing: f64) -> StageResult<(f64, f64)> {
        let mut point = (easting, northing, 0.0);
        transform(&self.projected, &self.geographic, &mut point)
            .map_err(|e| StageError::Projection(format!("inverse transform: {e:?}")))?;
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }

    pub fn project_all(&self, lons: &[f64], lats: &[f64]) -> StageResult<(Vec<f64>, Vec<f64>)> {
        let mut eastings = Vec::with_capacity(lons.len());
        let mut northings = Vec::with_capacity(lons.len());
        for (&lon, &lat) in lons.iter().zip(lats) {
            let (e, n) = self.project(lon, lat)?;
            eastings.push(e);
            northings.push(n);
        }
        Ok((eastings, northings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utm_zone_selection() {
        assert_eq!(utm_epsg(-89.4, 43.07).unwrap(), 32616);
        assert_eq!(utm_epsg(151.2, -33.8).unwrap(), 32756);
        assert_eq!(utm_epsg(180.0, 0.0).unwrap(), 32660);
        assert!(utm_epsg(f64::NAN, 0.0).is_err());
        assert!(GeodeticProjector::new(4326).is_err());
    }

    #[test]
    fn projects_into_zone_and_back() {
        let projector = GeodeticProjector::for_position(-89.4, 43.07).unwrap();
        let (e, n) = projector.project(-89.4, 43.07).unwrap();
        assert!(e > 295_000.0 && e < 315_000.0, "easting {}", e);
        assert!(n > 4_760_000.0 && n < 4_780_000.0, "northing {}", n);

        let (lon, lat) = projector.unproject(e, n).unwrap();
        assert!((lon + 89.4).abs() < 1e-7);
        assert!((lat - 43.07).abs() < 1e-7);
    }

    #[test]
    fn rejects_non_finite_positions() {
        let projector = GeodeticProjector::new(32616).unwrap();
        assert!(projector.project(f64::NAN, 43.0).is_err());
    }
}
