//! Frame-to-frame association of new detections with live tracks.
//!
//! The default pass is the historical greedy one: old tracks are visited in
//! ascending id order, each claims the candidates inside its search region,
//! ties are broken with a composite separation metric, and losing candidates
//! are released for later tracks. The final assignment therefore depends on
//! iteration order; it is a documented tie-break policy, not a global
//! optimum. `AssignmentStrategy::Optimal` swaps the pass for a minimum-cost
//! assignment over the same metric.

use crate::assignment::AssignmentSolver;
use crate::config::{AssignmentStrategy, EddyConfig};
use crate::detection::EddyDetection;
use crate::geometry::{distance_matrix, LocalProjection};
use crate::grid::GridAxes;
use crate::search::SearchRegion;
use crate::store::{FrameOutcome, TrackSnapshot, TrackStore};
use ndarray::prelude::*;

/// Sentinel distance for claimed columns.
const FAR_AWAY: f64 = 1e9;

/// Offset applied to old positions on the first record, degrees. Keeps the
/// old and new sets from coinciding exactly when both come from the same
/// frame.
const FIRST_RECORD_NUDGE_DEG: f64 = 0.01;

pub struct TrackMatcher<'a> {
    config: &'a EddyConfig,
}

impl<'a> TrackMatcher<'a> {
    pub fn new(config: &'a EddyConfig) -> Self {
        TrackMatcher { config }
    }

    /// Match this frame's detections against the store's live tracks,
    /// extending matched tracks and spawning the rest.
    pub fn track_eddies(
        &self,
        store: &mut TrackStore,
        new: &[EddyDetection],
        axes: &GridAxes,
        first_record: bool,
    ) -> anyhow::Result<FrameOutcome> {
        let old = store.last_positions();
        let mut outcome = FrameOutcome::default();

        if old.is_empty() {
            for det in new {
                outcome.spawned.push(store.spawn(det.clone().into()));
            }
            return Ok(outcome);
        }
        if new.is_empty() {
            return Ok(outcome);
        }

        // Common planar frame for the search-region containment test.
        let mean_lon = (old.iter().map(|s| s.lon).sum::<f64>()
            + new.iter().map(|d| d.lon).sum::<f64>())
            / (old.len() + new.len()) as f64;
        let mean_lat = (old.iter().map(|s| s.lat).sum::<f64>()
            + new.iter().map(|d| d.lat).sum::<f64>())
            / (old.len() + new.len()) as f64;
        let proj = LocalProjection::new(mean_lon, mean_lat);
        let old_xy: Vec<(f64, f64)> = old.iter().map(|s| proj.project(s.lon, s.lat)).collect();
        let new_xy: Vec<(f64, f64)> = new.iter().map(|d| proj.project(d.lon, d.lat)).collect();

        let old_pts: Vec<(f64, f64)> = old
            .iter()
            .map(|s| {
                if first_record {
                    (
                        s.lon + FIRST_RECORD_NUDGE_DEG,
                        s.lat + FIRST_RECORD_NUDGE_DEG,
                    )
                } else {
                    (s.lon, s.lat)
                }
            })
            .collect();
        let new_pts: Vec<(f64, f64)> = new.iter().map(|d| (d.lon, d.lat)).collect();

        let pristine = distance_matrix(&old_pts, &new_pts);

        match self.config.assignment {
            AssignmentStrategy::Greedy => {
                self.greedy_pass(store, &old, new, axes, &old_xy, &new_xy, pristine, &mut outcome)?
            }
            AssignmentStrategy::Optimal => {
                self.optimal_pass(store, &old, new, axes, &old_xy, &new_xy, &pristine, &mut outcome)?
            }
        }

        log::debug!(
            "frame matched: {} extended, {} spawned",
            outcome.extended.len(),
            outcome.spawned.len()
        );
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn greedy_pass(
        &self,
        store: &mut TrackStore,
        old: &[TrackSnapshot],
        new: &[EddyDetection],
        axes: &GridAxes,
        old_xy: &[(f64, f64)],
        new_xy: &[(f64, f64)],
        pristine: Array2<f64>,
        outcome: &mut FrameOutcome,
    ) -> anyhow::Result<()> {
        let mut working = pristine.clone();
        let mut is_new = vec![true; new.len()];

        for (old_idx, snapshot) in old.iter().enumerate() {
            // Rows with nothing inside the coarse cutoff are skipped; the
            // track simply gets no match this frame.
            let has_candidate = (0..new.len())
                .any(|j| working[[old_idx, j]] <= self.config.coarse_cutoff_m);
            if !has_candidate {
                continue;
            }

            let (zonal, meridional) = axes.local_scales_m(snapshot.lat);
            let region = SearchRegion::from_policy(
                self.config.separation,
                old_xy[old_idx],
                zonal,
                meridional,
                snapshot.radius_e,
            );

            // Claim everything the region admits; losers are released below.
            let mut candidates: Vec<(usize, f64)> = Vec::new();
            for j in 0..new.len() {
                let d = working[[old_idx, j]];
                if region.admits(d, new_xy[j], new[j].radius_e, self.config.coarse_cutoff_m) {
                    candidates.push((j, d));
                    is_new[j] = false;
                    working.column_mut(j).fill(FAR_AWAY);
                }
            }

            if candidates.is_empty() {
                continue;
            }

            let winner = if candidates.len() == 1 {
                candidates[0].0
            } else {
                let mut best = (candidates[0].0, f64::INFINITY);
                for &(j, d) in &candidates {
                    let delta = self.delta_x(snapshot, &new[j], d);
                    if delta < best.1 {
                        best = (j, delta);
                    }
                }
                // Release losing candidates back to the pool so a later old
                // track can still take them.
                for &(j, _) in &candidates {
                    if j != best.0 {
                        working.column_mut(j).assign(&pristine.column(j));
                        is_new[j] = true;
                    }
                }
                best.0
            };

            store.extend(snapshot.id, new[winner].clone().into())?;
            outcome.extended.push(snapshot.id);
        }

        for (j, det) in new.iter().enumerate() {
            if is_new[j] {
                outcome.spawned.push(store.spawn(det.clone().into()));
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn optimal_pass(
        &self,
        store: &mut TrackStore,
        old: &[TrackSnapshot],
        new: &[EddyDetection],
        axes: &GridAxes,
        old_xy: &[(f64, f64)],
        new_xy: &[(f64, f64)],
        pristine: &Array2<f64>,
        outcome: &mut FrameOutcome,
    ) -> anyhow::Result<()> {
        let mut cost = Array2::from_elem((old.len(), new.len()), f64::INFINITY);
        for (old_idx, snapshot) in old.iter().enumerate() {
            let (zonal, meridional) = axes.local_scales_m(snapshot.lat);
            let region = SearchRegion::from_policy(
                self.config.separation,
                old_xy[old_idx],
                zonal,
                meridional,
                snapshot.radius_e,
            );
            for j in 0..new.len() {
                let d = pristine[[old_idx, j]];
                if region.admits(d, new_xy[j], new[j].radius_e, self.config.coarse_cutoff_m) {
                    cost[[old_idx, j]] = self.delta_x(snapshot, &new[j], d);
                }
            }
        }

        let result = AssignmentSolver::solve(cost.view(), f64::MAX);
        for (old_idx, new_idx) in result.assignments {
            store.extend(old[old_idx].id, new[new_idx].clone().into())?;
            outcome.extended.push(old[old_idx].id);
        }
        for new_idx in result.unassigned_cols {
            outcome.spawned.push(store.spawn(new[new_idx].clone().into()));
        }
        Ok(())
    }

    /// Composite separation metric (Penven et al. 2005): normalized area,
    /// amplitude and distance differences in quadrature.
    fn delta_x(&self, old: &TrackSnapshot, candidate: &EddyDetection, distance_m: f64) -> f64 {
        let pi = std::f64::consts::PI;
        let delta_area =
            (pi * old.radius_e * old.radius_e - pi * candidate.radius_e * candidate.radius_e).abs();
        let delta_amp = (old.amplitude - candidate.amplitude).abs();
        ((delta_area / self.config.area0).powi(2)
            + (delta_amp / self.config.amp0).powi(2)
            + (distance_m / self.config.dist0).powi(2))
        .sqrt()
    }
}
