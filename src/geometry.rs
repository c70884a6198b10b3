//! Geometry kernels: circle fitting with a shape-error metric, great-circle
//! distances and polygon containment tests.

use crate::error::{EddyError, EddyResult};
use nalgebra::{DMatrix, DVector};
use ndarray::prelude::*;
use rayon::prelude::*;

/// Earth radius used by every great-circle computation, meters.
pub const EARTH_RADIUS_M: f64 = 6_371_315.0;

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Meters spanned by one degree of latitude (or of longitude at the equator).
pub fn meters_per_degree() -> f64 {
    EARTH_RADIUS_M * DEG2RAD
}

/// Result of a least-squares circle fit.
#[derive(Debug, Clone, Copy)]
pub struct CircleFit {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Percent deviation of the ring from the fitted circle.
    pub shape_error: f64,
}

/// Least-squares circle fit to an ordered ring of planar points.
///
/// Points are centered and rescaled by their maximum radial extent before
/// solving the normal equations for `(2cx, 2cy, cx^2 + cy^2 - r^2)`, then the
/// solution is scaled back. The shape error compares the ring's shoelace area
/// against the fitted circle's area, with vertices outside the circle
/// projected radially onto its boundary before the enclosed area is
/// recomputed:
///
/// `100 * [(1 - enclosed/circle) + |ring - enclosed| / circle]`
pub fn fit_circle(x: &[f64], y: &[f64]) -> EddyResult<CircleFit> {
    let npts = x.len();
    if npts != y.len() {
        return Err(EddyError::DegenerateGeometry(format!(
            "coordinate lengths differ: {} vs {}",
            npts,
            y.len()
        )));
    }
    if count_distinct(x, y) < 3 {
        return Err(EddyError::DegenerateGeometry(
            "need at least 3 distinct points".to_string(),
        ));
    }

    let xmean = x.iter().sum::<f64>() / npts as f64;
    let ymean = y.iter().sum::<f64>() / npts as f64;
    let xsc: Vec<f64> = x.iter().map(|v| v - xmean).collect();
    let ysc: Vec<f64> = y.iter().map(|v| v - ymean).collect();

    let scale = xsc
        .iter()
        .zip(&ysc)
        .map(|(a, b)| (a * a + b * b).sqrt())
        .fold(0.0_f64, f64::max);
    if scale <= 0.0 {
        return Err(EddyError::DegenerateGeometry("zero extent".to_string()));
    }

    let a = DMatrix::from_fn(npts, 3, |i, j| match j {
        0 => 2.0 * xsc[i] / scale,
        1 => 2.0 * ysc[i] / scale,
        _ => 1.0,
    });
    let b = DVector::from_fn(npts, |i, _| {
        let xs = xsc[i] / scale;
        let ys = ysc[i] / scale;
        xs * xs + ys * ys
    });

    let sol = a
        .svd(true, true)
        .solve(&b, 1e-12)
        .map_err(|e| EddyError::DegenerateGeometry(e.to_string()))?;

    let cx = sol[0];
    let cy = sol[1];
    let r2 = sol[2] + cx * cx + cy * cy;
    if !(r2.is_finite() && r2 > 0.0) {
        return Err(EddyError::DegenerateGeometry(
            "circle radius is not positive".to_string(),
        ));
    }

    let center_x = cx * scale + xmean;
    let center_y = cy * scale + ymean;
    let radius = r2.sqrt() * scale;

    // Shape test: ring area vs fitted-circle area, with outside vertices
    // pulled back onto the circle boundary.
    let circle_area = radius * radius * std::f64::consts::PI;
    let ring_area = polygon_area(x, y).abs();

    let mut px = x.to_vec();
    let mut py = y.to_vec();
    for i in 0..npts {
        let dx = px[i] - center_x;
        let dy = py[i] - center_y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > radius {
            px[i] = center_x + dx * radius / dist;
            py[i] = center_y + dy * radius / dist;
        }
    }
    let enclosed_area = polygon_area(&px, &py).abs();

    let shape_error =
        100.0 * ((1.0 - enclosed_area / circle_area) + (ring_area - enclosed_area).abs() / circle_area);

    Ok(CircleFit {
        center_x,
        center_y,
        radius,
        shape_error,
    })
}

fn count_distinct(x: &[f64], y: &[f64]) -> usize {
    let mut seen: Vec<(f64, f64)> = Vec::new();
    for (&a, &b) in x.iter().zip(y) {
        if !seen.iter().any(|&(sa, sb)| sa == a && sb == b) {
            seen.push((a, b));
        }
    }
    seen.len()
}

/// Signed area of a polygon via the shoelace formula. The ring is treated as
/// closed whether or not the last vertex repeats the first.
pub fn polygon_area(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut j = n - 1;
    for i in 0..n {
        sum += x[j] * y[i] - x[i] * y[j];
        j = i;
    }
    0.5 * sum
}

/// Haversine great-circle distance between two lon/lat points, meters.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1 * DEG2RAD;
    let phi2 = lat2 * DEG2RAD;
    let dphi = (lat2 - lat1) * DEG2RAD;
    let dlam = (lon2 - lon1) * DEG2RAD;
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlam / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// All-pairs haversine distance matrix, meters.
/// Rows index `old` points, columns index `new` points.
pub fn distance_matrix(old: &[(f64, f64)], new: &[(f64, f64)]) -> Array2<f64> {
    let n_old = old.len();
    let n_new = new.len();
    if n_old == 0 || n_new == 0 {
        return Array2::zeros((n_old, n_new));
    }

    let data: Vec<f64> = (0..n_old)
        .into_par_iter()
        .flat_map(|i| {
            let (lon_o, lat_o) = old[i];
            new.iter()
                .map(|&(lon_n, lat_n)| haversine_distance(lon_o, lat_o, lon_n, lat_n))
                .collect::<Vec<_>>()
        })
        .collect();

    Array2::from_shape_vec((n_old, n_new), data).unwrap()
}

/// Ray-casting point-in-polygon test over an ordered vertex ring.
pub fn point_in_polygon(px: f64, py: f64, xs: &[f64], ys: &[f64]) -> bool {
    let n = xs.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        if (ys[i] > py) != (ys[j] > py) {
            let t = (py - ys[j]) / (ys[i] - ys[j]);
            let x_cross = xs[j] + t * (xs[i] - xs[j]);
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// True when every vertex of the inner ring lies inside the outer ring.
pub fn polygon_contains_polygon(
    outer_x: &[f64],
    outer_y: &[f64],
    inner_x: &[f64],
    inner_y: &[f64],
) -> bool {
    inner_x
        .iter()
        .zip(inner_y)
        .all(|(&px, &py)| point_in_polygon(px, py, outer_x, outer_y))
}

/// Local equidistant planar frame centered on a lon/lat origin.
///
/// Adequate for the eddy-scale rings handled here (tens to a few hundred
/// kilometers); distances along the axes through the origin are exact.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    lon0: f64,
    lat0: f64,
    cos_lat0: f64,
}

impl LocalProjection {
    pub fn new(lon0: f64, lat0: f64) -> Self {
        LocalProjection {
            lon0,
            lat0,
            cos_lat0: (lat0 * DEG2RAD).cos(),
        }
    }

    /// Lon/lat to planar meters relative to the origin.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS_M * (lon - self.lon0) * DEG2RAD * self.cos_lat0;
        let y = EARTH_RADIUS_M * (lat - self.lat0) * DEG2RAD;
        (x, y)
    }

    /// Planar meters back to lon/lat.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = self.lon0 + x / (EARTH_RADIUS_M * DEG2RAD * self.cos_lat0);
        let lat = self.lat0 + y / (EARTH_RADIUS_M * DEG2RAD);
        (lon, lat)
    }
}

/// Lon/lat points at a fixed great-circle distance around a center.
/// Returns `npts` vertices; the ring is left open (callers append the first
/// vertex to close it).
pub fn circle_on_sphere(lon: f64, lat: f64, distance_m: f64, npts: usize) -> (Vec<f64>, Vec<f64>) {
    let lon_r = lon * DEG2RAD;
    let lat_r = lat * DEG2RAD;
    let ang = distance_m / EARTH_RADIUS_M;
    let mut lons = Vec::with_capacity(npts);
    let mut lats = Vec::with_capacity(npts);
    for k in 0..npts {
        let theta = 2.0 * std::f64::consts::PI * k as f64 / npts as f64;
        let lat1 = (lat_r.sin() * ang.cos() + lat_r.cos() * ang.sin() * theta.cos()).asin();
        let lon1 = lon_r
            + (theta.sin() * ang.sin() * lat_r.cos()).atan2(ang.cos() - lat_r.sin() * lat1.sin());
        lons.push(lon1 / DEG2RAD);
        lats.push(lat1 / DEG2RAD);
    }
    (lons, lats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn circle_ring(cx: f64, cy: f64, r: f64, npts: usize) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::with_capacity(npts + 1);
        let mut ys = Vec::with_capacity(npts + 1);
        for k in 0..=npts {
            let t = 2.0 * std::f64::consts::PI * k as f64 / npts as f64;
            xs.push(cx + r * t.cos());
            ys.push(cy + r * t.sin());
        }
        (xs, ys)
    }

    #[test]
    fn fit_circle_recovers_exact_circle() {
        let (xs, ys) = circle_ring(3.5, -2.0, 47.0, 64);
        let fit = fit_circle(&xs, &ys).unwrap();
        assert_abs_diff_eq!(fit.center_x, 3.5, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.center_y, -2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.radius, 47.0, epsilon = 1e-6);
        // Only polygon discretization remains.
        assert!(fit.shape_error < 1.0);
    }

    #[test]
    fn fit_circle_rejects_degenerate_input() {
        let xs = vec![1.0, 1.0, 1.0, 1.0];
        let ys = vec![2.0, 2.0, 2.0, 2.0];
        assert!(matches!(
            fit_circle(&xs, &ys),
            Err(EddyError::DegenerateGeometry(_))
        ));
        assert!(matches!(
            fit_circle(&[0.0, 1.0], &[0.0, 1.0]),
            Err(EddyError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn shape_error_grows_with_eccentricity() {
        let mut previous = -1.0;
        for stretch in [1.0, 1.3, 1.6, 2.0] {
            let npts = 128;
            let mut xs = Vec::with_capacity(npts + 1);
            let mut ys = Vec::with_capacity(npts + 1);
            for k in 0..=npts {
                let t = 2.0 * std::f64::consts::PI * k as f64 / npts as f64;
                xs.push(10.0 * t.cos());
                ys.push(10.0 * stretch * t.sin());
            }
            let fit = fit_circle(&xs, &ys).unwrap();
            assert!(
                fit.shape_error > previous,
                "shape error not increasing at stretch {stretch}"
            );
            previous = fit.shape_error;
        }
    }

    #[test]
    fn haversine_matches_known_distance() {
        // One degree of latitude along a meridian.
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(d, EARTH_RADIUS_M * DEG2RAD, epsilon = 1.0);
        assert_abs_diff_eq!(haversine_distance(5.0, 5.0, 5.0, 5.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn distance_matrix_symmetric_under_swap() {
        let a = vec![(0.0, 0.0), (1.0, 1.0), (-3.0, 7.5)];
        let b = vec![(0.5, 0.2), (2.0, -1.0)];
        let ab = distance_matrix(&a, &b);
        let ba = distance_matrix(&b, &a);
        for i in 0..a.len() {
            for j in 0..b.len() {
                assert_abs_diff_eq!(ab[[i, j]], ba[[j, i]], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn point_in_polygon_square() {
        let xs = vec![0.0, 4.0, 4.0, 0.0, 0.0];
        let ys = vec![0.0, 0.0, 4.0, 4.0, 0.0];
        assert!(point_in_polygon(2.0, 2.0, &xs, &ys));
        assert!(!point_in_polygon(5.0, 2.0, &xs, &ys));
        let (inner_x, inner_y) = circle_ring(2.0, 2.0, 1.0, 16);
        assert!(polygon_contains_polygon(&xs, &ys, &inner_x, &inner_y));
        assert!(!polygon_contains_polygon(&inner_x, &inner_y, &xs, &ys));
    }

    #[test]
    fn local_projection_round_trip() {
        let proj = LocalProjection::new(-42.0, 31.0);
        let (x, y) = proj.project(-41.5, 31.2);
        let (lon, lat) = proj.inverse(x, y);
        assert_abs_diff_eq!(lon, -41.5, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 31.2, epsilon = 1e-9);
    }

    #[test]
    fn sphere_circle_keeps_distance() {
        let (lons, lats) = circle_on_sphere(10.0, 20.0, 50_000.0, 36);
        for (lon, lat) in lons.iter().zip(&lats) {
            let d = haversine_distance(10.0, 20.0, *lon, *lat);
            assert_abs_diff_eq!(d, 50_000.0, epsilon = 1.0);
        }
    }
}
