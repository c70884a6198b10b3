//! Per-frame eddy candidate records.

use crate::contour::ContourRing;
use serde::{Deserialize, Serialize};

/// Rotation sense of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    Cyclonic,
    Anticyclonic,
}

impl Sign {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sign::Cyclonic => "cyclonic",
            Sign::Anticyclonic => "anticyclonic",
        }
    }
}

/// Optional payload retained when `track_extra_variables` is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionExtras {
    /// Effective (outermost accepted) contour, resampled.
    pub contour_e: ContourRing,
    /// Speed-based contour (maximum average swirl speed), resampled.
    pub contour_s: ContourRing,
    /// Shape error of the effective circle fit, percent.
    pub shape_error: f64,
}

/// One eddy candidate produced by the contour extractor for one frame.
///
/// The center is the speed-based center (CSS11 appendix B4); the effective
/// radius comes from the outermost accepted contour, the speed radius from
/// the inner contour of maximum average swirl speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EddyDetection {
    pub sign: Sign,
    pub lon: f64,
    pub lat: f64,
    /// Effective radius, meters.
    pub radius_e: f64,
    /// Speed-based radius, meters.
    pub radius_s: f64,
    /// Field extremum relative to the bounding contour level.
    pub amplitude: f64,
    /// Average swirl speed around the speed-based contour.
    pub uavg: f64,
    /// Total eddy kinetic energy over the enclosed mask.
    pub teke: f64,
    pub time: f64,
    pub extras: Option<DetectionExtras>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_serializes_round_trip() {
        let det = EddyDetection {
            sign: Sign::Anticyclonic,
            lon: 10.0,
            lat: 20.0,
            radius_e: 50_000.0,
            radius_s: 42_000.0,
            amplitude: 0.08,
            uavg: 0.31,
            teke: 123.4,
            time: 86_400.0,
            extras: None,
        };
        let json = serde_json::to_string(&det).unwrap();
        let back: EddyDetection = serde_json::from_str(&json).unwrap();
        assert_eq!(det, back);
    }
}
