//! Closed contour rings and per-level contour sets.

use crate::geometry::{point_in_polygon, polygon_contains_polygon, LocalProjection};
use serde::{Deserialize, Serialize};

/// Ordered lon/lat vertex ring of one iso-contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourRing {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
}

impl ContourRing {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>) -> Self {
        ContourRing { lons, lats }
    }

    /// A usable closed contour: first vertex repeats the last and the ring
    /// has nonzero extent on both axes.
    pub fn is_closed(&self) -> bool {
        let n = self.lons.len();
        n >= 4
            && n == self.lats.len()
            && self.lons[0] == self.lons[n - 1]
            && self.lats[0] == self.lats[n - 1]
            && self.lon_extent() > 0.0
            && self.lat_extent() > 0.0
    }

    pub fn mean_lon(&self) -> f64 {
        self.lons.iter().sum::<f64>() / self.lons.len() as f64
    }

    pub fn mean_lat(&self) -> f64 {
        self.lats.iter().sum::<f64>() / self.lats.len() as f64
    }

    pub fn lon_bounds(&self) -> (f64, f64) {
        bounds(&self.lons)
    }

    pub fn lat_bounds(&self) -> (f64, f64) {
        bounds(&self.lats)
    }

    fn lon_extent(&self) -> f64 {
        let (lo, hi) = self.lon_bounds();
        hi - lo
    }

    fn lat_extent(&self) -> f64 {
        let (lo, hi) = self.lat_bounds();
        hi - lo
    }

    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        point_in_polygon(lon, lat, &self.lons, &self.lats)
    }

    pub fn contains_ring(&self, other: &ContourRing) -> bool {
        polygon_contains_polygon(&self.lons, &self.lats, &other.lons, &other.lats)
    }

    /// Vertices projected into a local planar frame.
    pub fn project(&self, proj: &LocalProjection) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::with_capacity(self.lons.len());
        let mut ys = Vec::with_capacity(self.lats.len());
        for (&lon, &lat) in self.lons.iter().zip(&self.lats) {
            let (x, y) = proj.project(lon, lat);
            xs.push(x);
            ys.push(y);
        }
        (xs, ys)
    }

    /// Resample the ring to `npts` vertices spaced uniformly in cumulative
    /// chord length. The result is closed (last vertex == first). Gives the
    /// interpolation in `swirl_average` an even circumferential footing.
    pub fn resample_uniform(&self, npts: usize) -> ContourRing {
        let n = self.lons.len();
        if n < 2 || npts < 2 {
            return self.clone();
        }

        let mut cum = Vec::with_capacity(n);
        cum.push(0.0);
        for k in 1..n {
            let dx = self.lons[k] - self.lons[k - 1];
            let dy = self.lats[k] - self.lats[k - 1];
            cum.push(cum[k - 1] + (dx * dx + dy * dy).sqrt());
        }
        let total = cum[n - 1];
        if total <= 0.0 {
            return self.clone();
        }

        let mut lons = Vec::with_capacity(npts + 1);
        let mut lats = Vec::with_capacity(npts + 1);
        let mut seg = 0;
        for k in 0..npts {
            let target = total * k as f64 / npts as f64;
            while seg + 2 < n && cum[seg + 1] < target {
                seg += 1;
            }
            let span = cum[seg + 1] - cum[seg];
            let t = if span > 0.0 {
                (target - cum[seg]) / span
            } else {
                0.0
            };
            lons.push(self.lons[seg] + t * (self.lons[seg + 1] - self.lons[seg]));
            lats.push(self.lats[seg] + t * (self.lats[seg + 1] - self.lats[seg]));
        }
        lons.push(lons[0]);
        lats.push(lats[0]);
        ContourRing { lons, lats }
    }
}

/// Every closed polygon found at one field level.
#[derive(Debug, Clone)]
pub struct LevelSet {
    pub level: f64,
    pub rings: Vec<ContourRing>,
}

impl LevelSet {
    pub fn new(level: f64, rings: Vec<ContourRing>) -> Self {
        LevelSet { level, rings }
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_square() -> ContourRing {
        ContourRing::new(
            vec![0.0, 1.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0, 0.0],
        )
    }

    #[test]
    fn closedness() {
        assert!(unit_square().is_closed());
        let open = ContourRing::new(vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0]);
        assert!(!open.is_closed());
        let flat = ContourRing::new(vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 0.0]);
        assert!(!flat.is_closed());
    }

    #[test]
    fn containment() {
        let outer = unit_square();
        let inner = ContourRing::new(
            vec![0.25, 0.75, 0.75, 0.25, 0.25],
            vec![0.25, 0.25, 0.75, 0.75, 0.25],
        );
        assert!(outer.contains_ring(&inner));
        assert!(!inner.contains_ring(&outer));
        assert!(outer.contains_point(0.5, 0.5));
        assert!(!outer.contains_point(1.5, 0.5));
    }

    #[test]
    fn resample_is_closed_with_requested_density() {
        let ring = unit_square();
        let resampled = ring.resample_uniform(40);
        assert_eq!(resampled.lons.len(), 41);
        assert_eq!(resampled.lons[0], *resampled.lons.last().unwrap());
        assert_eq!(resampled.lats[0], *resampled.lats.last().unwrap());
        // All resampled vertices stay on the square's perimeter.
        for (lon, lat) in resampled.lons.iter().zip(&resampled.lats) {
            let on_edge = lon.abs() < 1e-9
                || (lon - 1.0).abs() < 1e-9
                || lat.abs() < 1e-9
                || (lat - 1.0).abs() < 1e-9;
            assert!(on_edge, "({lon}, {lat}) left the perimeter");
        }
    }

    #[test]
    fn means_and_bounds() {
        let ring = unit_square();
        assert_abs_diff_eq!(ring.mean_lon(), 0.4, epsilon = 1e-12);
        assert_eq!(ring.lon_bounds(), (0.0, 1.0));
        assert_eq!(ring.lat_bounds(), (0.0, 1.0));
    }
}
