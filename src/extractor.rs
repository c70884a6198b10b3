//! Contour-based eddy extraction for one frame.
//!
//! Consumes the closed iso-contour polygons found at each field level and
//! turns the ones that survive the geometric, mask and amplitude filters into
//! `EddyDetection` candidates. Cheap rejections (circle fit, center sample,
//! pixel count) run before the interpolation-heavy swirl-speed scan, which
//! dominates the per-candidate cost.

use crate::config::{DiagnosticMode, EddyConfig};
use crate::contour::{ContourRing, LevelSet};
use crate::detection::{DetectionExtras, EddyDetection, Sign};
use crate::geometry::{fit_circle, LocalProjection};
use crate::grid::FrameFields;

/// Per-frame extractor for one rotation sense.
pub struct ContourExtractor<'a> {
    config: &'a EddyConfig,
    sign: Sign,
}

impl<'a> ContourExtractor<'a> {
    pub fn new(config: &'a EddyConfig, sign: Sign) -> Self {
        ContourExtractor { config, sign }
    }

    /// Extract every accepted candidate from one frame.
    ///
    /// Levels are processed in the order the caller supplies them; cells of
    /// an accepted eddy are overwritten with the fill value, so the first
    /// contour to claim an extremum wins.
    pub fn extract(
        &self,
        fields: &mut FrameFields,
        levels: &[LevelSet],
        time: f64,
    ) -> Vec<EddyDetection> {
        let mut detections = Vec::new();
        for level_set in levels {
            for ring in &level_set.rings {
                if !ring.is_closed() {
                    continue;
                }
                if let Some(det) =
                    self.extract_candidate(fields, levels, level_set.level, ring, time)
                {
                    detections.push(det);
                }
            }
        }
        log::debug!(
            "extracted {} {} candidate(s) at t={}",
            detections.len(),
            self.sign.as_str(),
            time
        );
        detections
    }

    fn extract_candidate(
        &self,
        fields: &mut FrameFields,
        levels: &[LevelSet],
        level: f64,
        ring: &ContourRing,
        time: f64,
    ) -> Option<EddyDetection> {
        // Effective circle fit in a local planar frame at the ring centroid.
        let mean_lon = ring.mean_lon();
        let proj = LocalProjection::new(mean_lon, ring.mean_lat());
        let (xs, ys) = ring.project(&proj);
        let fit = fit_circle(&xs, &ys).ok()?;
        let (centlon_e, centlat_e) = proj.inverse(fit.center_x, fit.center_y);
        let centlon_e = wrap_center_lon(centlon_e, mean_lon);
        let radius_e = fit.radius;

        // Field value at the centroid cell must be valid and consistent with
        // the requested rotation sense.
        let (cj, ci) = fields.axes.nearest_cell(centlon_e, centlat_e)?;
        let center_value = fields.field[[cj, ci]];
        if fields.is_fill(center_value) {
            return None;
        }
        if !self.sign_consistent(center_value, level) {
            return None;
        }

        // Pixel-count criterion over the enclosed mask (CSS11 criterion 2).
        let cells = fields.cells_inside(ring);
        if cells.len() < self.config.pixel_min || cells.len() > self.config.pixel_max {
            return None;
        }

        // Even circumferential point density for the interpolation below.
        let ring_e = ring.resample_uniform(self.config.resample_points);

        let amplitude = self.amplitude(fields, &cells, level)?;

        let (uavg, ring_s, _had_inner) =
            self.swirl_average(fields, levels, ring, &ring_e, (centlon_e, centlat_e));

        // Speed-based circle fit in a fresh local frame.
        let s_mean_lon = ring_s.mean_lon();
        let sproj = LocalProjection::new(s_mean_lon, ring_s.mean_lat());
        let (sxs, sys) = ring_s.project(&sproj);
        let sfit = fit_circle(&sxs, &sys).ok()?;
        let (centlon_s, centlat_s) = sproj.inverse(sfit.center_x, sfit.center_y);
        let centlon_s = wrap_center_lon(centlon_s, s_mean_lon);

        let teke = cells
            .iter()
            .map(|&(j, i)| fields.eke[[j, i]])
            .filter(|&v| !fields.is_fill(v))
            .sum();

        let extras = if self.config.track_extra_variables {
            Some(DetectionExtras {
                contour_e: ring_e,
                contour_s: ring_s,
                shape_error: fit.shape_error,
            })
        } else {
            None
        };

        fields.consume_cells(&cells);

        Some(EddyDetection {
            sign: self.sign,
            lon: centlon_s,
            lat: centlat_s,
            radius_e,
            radius_s: sfit.radius,
            amplitude,
            uavg,
            teke,
            time,
            extras,
        })
    }

    fn sign_consistent(&self, center_value: f64, level: f64) -> bool {
        match (self.config.diagnostic, self.sign) {
            (DiagnosticMode::SeaLevelAnomaly, Sign::Anticyclonic) => center_value >= level,
            (DiagnosticMode::SeaLevelAnomaly, Sign::Cyclonic) => center_value < level,
            (DiagnosticMode::Vorticity, Sign::Anticyclonic) => center_value <= 0.0,
            (DiagnosticMode::Vorticity, Sign::Cyclonic) => center_value >= 0.0,
        }
    }

    /// Field extremum inside the mask relative to the contour level, or
    /// `None` when the mask is empty/invalid or the value falls outside the
    /// configured amplitude window.
    fn amplitude(&self, fields: &FrameFields, cells: &[(usize, usize)], level: f64) -> Option<f64> {
        let values: Vec<f64> = cells
            .iter()
            .map(|&(j, i)| fields.field[[j, i]])
            .filter(|&v| !fields.is_fill(v))
            .collect();
        if values.is_empty() {
            return None;
        }
        let amplitude = match self.config.diagnostic {
            DiagnosticMode::SeaLevelAnomaly => match self.sign {
                Sign::Anticyclonic => values.iter().fold(f64::MIN, |m, &v| m.max(v)) - level,
                Sign::Cyclonic => level - values.iter().fold(f64::MAX, |m, &v| m.min(v)),
            },
            DiagnosticMode::Vorticity => values.iter().fold(0.0_f64, |m, &v| m.max(v.abs())),
        };
        if amplitude < self.config.amplitude_min || amplitude > self.config.amplitude_max {
            return None;
        }
        Some(amplitude)
    }

    /// Average swirl speed around the effective ring and every qualifying
    /// inner ring; the ring with the maximum average becomes the speed-based
    /// contour. Falls back to the effective ring when no inner contour
    /// qualifies.
    fn swirl_average(
        &self,
        fields: &FrameFields,
        levels: &[LevelSet],
        ring_e: &ContourRing,
        ring_e_resampled: &ContourRing,
        center: (f64, f64),
    ) -> (f64, ContourRing, bool) {
        let mut best = self
            .ring_speed(fields, ring_e_resampled)
            .unwrap_or(0.0);
        let mut best_ring = ring_e_resampled.clone();
        let mut any_inner = false;

        // When a full profile is wanted the scan descends to single-pixel
        // contours.
        let pixel_min = if self.config.track_extra_variables {
            1
        } else {
            self.config.pixel_min
        };

        for level_set in levels {
            for ring in &level_set.rings {
                if !ring.is_closed() || ring == ring_e {
                    continue;
                }
                if !ring.contains_point(center.0, center.1) {
                    continue;
                }
                if !ring_e.contains_ring(ring) {
                    continue;
                }
                let count = fields.cells_inside(ring).len();
                if count < pixel_min || count > self.config.pixel_max {
                    continue;
                }
                let resampled = ring.resample_uniform(self.config.resample_points);
                if let Some(u) = self.ring_speed(fields, &resampled) {
                    any_inner = true;
                    if u >= best {
                        best = u;
                        best_ring = resampled;
                    }
                }
            }
        }

        (best, best_ring, any_inner)
    }

    /// Swirl field interpolated onto a ring's vertices and averaged.
    fn ring_speed(&self, fields: &FrameFields, ring: &ContourRing) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        // First vertex repeats the last; skip it.
        for (&lon, &lat) in ring.lons.iter().zip(&ring.lats).skip(1) {
            if let Some(v) = fields.sample_bilinear(&fields.swirl, lon, lat) {
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// Put a reprojected center longitude back into the ring's own branch.
///
/// The inverse projection can land on either side of the antimeridian;
/// normalize into [-180, 180) first, then shift by 360 degrees when the ring
/// itself lives outside that range (grids spanning the antimeridian keep
/// their native branch).
fn wrap_center_lon(center_lon: f64, ring_mean_lon: f64) -> f64 {
    let normalized = (center_lon + 180.0).rem_euclid(360.0) - 180.0;
    if ring_mean_lon < -180.0 {
        normalized - 360.0
    } else if ring_mean_lon >= 180.0 {
        normalized + 360.0
    } else {
        normalized
    }
}
