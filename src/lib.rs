//! Contour-based detection and tracking of mesoscale ocean eddies in gridded
//! sea-level-anomaly or vorticity fields.
//!
//! Detection follows Chelton, Schlax and Samelson (2011): at each iso-contour
//! level the closed polygons are fitted with a least-squares circle, filtered
//! on shape, pixel count and amplitude, and scanned for the inner contour of
//! maximum average swirl speed. Tracking associates frames with a composite
//! area/amplitude/distance metric inside a per-track search region, greedily
//! by default or via minimum-cost assignment.
//!
//! [`EddyTracker`] ties the two stages together:
//!
//! ```no_run
//! use eddytrack::{EddyConfig, EddyTracker, Sign};
//! # let (mut fields, levels): (eddytrack::FrameFields, Vec<eddytrack::LevelSet>) = todo!();
//!
//! let mut tracker = EddyTracker::new(Sign::Anticyclonic, EddyConfig::default());
//! let outcome = tracker.step(&mut fields, &levels, 0.0)?;
//! println!("{} extended, {} spawned", outcome.extended.len(), outcome.spawned.len());
//! # anyhow::Ok(())
//! ```

pub mod assignment;
pub mod config;
pub mod contour;
pub mod detection;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod grid;
pub mod matcher;
pub mod search;
pub mod store;

pub use config::{AssignmentStrategy, DiagnosticMode, EddyConfig, SeparationPolicy};
pub use contour::{ContourRing, LevelSet};
pub use detection::{DetectionExtras, EddyDetection, Sign};
pub use error::{EddyError, EddyResult};
pub use extractor::ContourExtractor;
pub use grid::{FrameFields, GridAxes};
pub use matcher::TrackMatcher;
pub use store::{FrameOutcome, Track, TrackRecord, TrackStore};

/// Detection plus tracking over a sequence of frames, one rotation sense per
/// tracker.
pub struct EddyTracker {
    config: EddyConfig,
    store: TrackStore,
    n_steps: u64,
}

impl EddyTracker {
    pub fn new(sign: Sign, config: EddyConfig) -> Self {
        EddyTracker {
            store: TrackStore::new(sign),
            config,
            n_steps: 0,
        }
    }

    /// Process one frame: extract candidates, then match them against the
    /// live tracks. The scalar field is consumed in place (accepted eddy
    /// interiors are overwritten with the fill value).
    pub fn step(
        &mut self,
        fields: &mut FrameFields,
        levels: &[LevelSet],
        time: f64,
    ) -> anyhow::Result<FrameOutcome> {
        let detections =
            ContourExtractor::new(&self.config, self.store.sign()).extract(fields, levels, time);
        let first_record = self.n_steps == 0;
        let outcome = TrackMatcher::new(&self.config).track_eddies(
            &mut self.store,
            &detections,
            &fields.axes,
            first_record,
        )?;
        self.n_steps += 1;
        Ok(outcome)
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TrackStore {
        &mut self.store
    }

    pub fn config(&self) -> &EddyConfig {
        &self.config
    }
}
