/// Equatorial radius used for the destination-point formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Folds any angle in degrees into [0, 360).
pub fn normalize_bearing(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if folded >= 360.0 {
        0.0
    } else {
        folded
    }
}

/// Great-circle initial bearing from the first fix to the second, in degrees.
pub fn initial_bearing(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let x = d_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    normalize_bearing(x.atan2(y).to_degrees())
}

/// Bearings between consecutive fixes.
///
/// The last fix repeats the previous bearing; a single fix gets 0.
pub fn course_over_ground(lons: &[f64], lats: &[f64]) -> Vec<f64> {
    let n = lons.len().min(lats.len());
    if n < 2 {
        return vec![0.0; n];
    }
    let mut cog: Vec<f64> = (0..n - 1)
        .map(|i| initial_bearing(lons[i], lats[i], lons[i + 1], lats[i + 1]))
        .collect();
    let last = cog[n - 2];
    cog.push(last);
    cog
}

/// Point reached travelling `distance_m` from (lon, lat) on the given bearing.
pub fn destination_point(lon: f64, lat: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
    (lon2.to_degrees(), lat2.to_degrees())
}
