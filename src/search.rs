//! Per-track admissible search regions for candidate matches.

use crate::config::SeparationPolicy;

/// Axis-aligned ellipse centered on an old track's last projected position.
/// Semi-axes come from the local zonal/meridional grid scales times the
/// configured resolution factor.
#[derive(Debug, Clone, Copy)]
pub struct SearchEllipse {
    center_x: f64,
    center_y: f64,
    semi_zonal: f64,
    semi_meridional: f64,
}

impl SearchEllipse {
    pub fn new(
        center_x: f64,
        center_y: f64,
        zonal_scale_m: f64,
        meridional_scale_m: f64,
        factor: f64,
    ) -> Self {
        SearchEllipse {
            center_x,
            center_y,
            semi_zonal: zonal_scale_m * factor,
            semi_meridional: meridional_scale_m * factor,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.semi_zonal <= 0.0 || self.semi_meridional <= 0.0 {
            return false;
        }
        let u = (x - self.center_x) / self.semi_zonal;
        let v = (y - self.center_y) / self.semi_meridional;
        u * u + v * v <= 1.0
    }
}

/// Exact admissibility test for one old track, built per matching call.
#[derive(Debug, Clone, Copy)]
pub enum SearchRegion {
    Ellipse(SearchEllipse),
    SumOfRadii { factor: f64, old_radius: f64 },
}

impl SearchRegion {
    /// Build the region an old track searches for its continuation.
    ///
    /// `center_xy` is the old track's last position in the common planar
    /// frame; grid scales are meters per cell at the old track's latitude.
    pub fn from_policy(
        policy: SeparationPolicy,
        center_xy: (f64, f64),
        zonal_scale_m: f64,
        meridional_scale_m: f64,
        old_radius: f64,
    ) -> Self {
        match policy {
            SeparationPolicy::Ellipse { factor } => SearchRegion::Ellipse(SearchEllipse::new(
                center_xy.0,
                center_xy.1,
                zonal_scale_m,
                meridional_scale_m,
                factor,
            )),
            SeparationPolicy::SumOfRadii { factor } => SearchRegion::SumOfRadii {
                factor,
                old_radius,
            },
        }
    }

    /// Whether a candidate may continue this track. The raw distance is
    /// checked against the coarse cutoff first; only survivors get the exact
    /// containment / radius-sum test.
    pub fn admits(
        &self,
        distance_m: f64,
        candidate_xy: (f64, f64),
        candidate_radius: f64,
        coarse_cutoff_m: f64,
    ) -> bool {
        if distance_m > coarse_cutoff_m {
            return false;
        }
        match self {
            SearchRegion::Ellipse(ellipse) => ellipse.contains(candidate_xy.0, candidate_xy.1),
            SearchRegion::SumOfRadii { factor, old_radius } => {
                distance_m <= factor * (old_radius + candidate_radius)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_policies_admit_the_stationary_candidate() {
        // A candidate sitting exactly at the old position must always pass.
        for policy in [
            SeparationPolicy::Ellipse { factor: 0.5 },
            SeparationPolicy::SumOfRadii { factor: 0.1 },
        ] {
            let region =
                SearchRegion::from_policy(policy, (1_000.0, -2_000.0), 5_000.0, 5_000.0, 30_000.0);
            assert!(region.admits(0.0, (1_000.0, -2_000.0), 10_000.0, 200_000.0));
        }
    }

    #[test]
    fn coarse_cutoff_rejects_before_exact_test() {
        let region = SearchRegion::from_policy(
            SeparationPolicy::SumOfRadii { factor: 10.0 },
            (0.0, 0.0),
            5_000.0,
            5_000.0,
            100_000.0,
        );
        // Exact test would pass (10 * 200km), coarse cutoff must win.
        assert!(!region.admits(250_000.0, (0.0, 0.0), 100_000.0, 200_000.0));
    }

    #[test]
    fn ellipse_edges() {
        let ellipse = SearchEllipse::new(0.0, 0.0, 10_000.0, 5_000.0, 1.0);
        assert!(ellipse.contains(9_999.0, 0.0));
        assert!(!ellipse.contains(10_001.0, 0.0));
        assert!(ellipse.contains(0.0, 4_999.0));
        assert!(!ellipse.contains(0.0, 5_001.0));
        // Off-axis point outside the ellipse but inside its bounding box.
        assert!(!ellipse.contains(9_000.0, 4_000.0));
    }

    #[test]
    fn sum_of_radii_scales_with_both_radii() {
        let region = SearchRegion::from_policy(
            SeparationPolicy::SumOfRadii { factor: 1.0 },
            (0.0, 0.0),
            5_000.0,
            5_000.0,
            40_000.0,
        );
        assert!(region.admits(79_000.0, (0.0, 0.0), 40_000.0, 200_000.0));
        assert!(!region.admits(81_000.0, (0.0, 0.0), 40_000.0, 200_000.0));
    }
}
