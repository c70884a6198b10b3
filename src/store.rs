//! Append-only track database.
//!
//! The store owns every `Track` and its history. The matcher drives it
//! through two operations: `extend` appends a record to an existing track,
//! `spawn` creates a track with a fresh identifier. Nothing here ever
//! deletes or reorders history; lapse pruning is an external policy that may
//! clear the `alive` flag.

use crate::detection::{DetectionExtras, EddyDetection, Sign};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One time step of a track's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub lon: f64,
    pub lat: f64,
    pub radius_s: f64,
    pub radius_e: f64,
    pub amplitude: f64,
    pub uavg: f64,
    pub teke: f64,
    pub time: f64,
    pub extras: Option<DetectionExtras>,
}

impl From<EddyDetection> for TrackRecord {
    fn from(det: EddyDetection) -> Self {
        TrackRecord {
            lon: det.lon,
            lat: det.lat,
            radius_s: det.radius_s,
            radius_e: det.radius_e,
            amplitude: det.amplitude,
            uavg: det.uavg,
            teke: det.teke,
            time: det.time,
            extras: det.extras,
        }
    }
}

/// Ordered time series of detections believed to be one physical eddy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub sign: Sign,
    pub alive: bool,
    records: Vec<TrackRecord>,
}

impl Track {
    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> &TrackRecord {
        // A track is never created without an initial record.
        self.records.last().expect("track has no records")
    }
}

/// Last known state of a live track, as consumed by the matcher.
#[derive(Debug, Clone, Copy)]
pub struct TrackSnapshot {
    pub id: u32,
    pub lon: f64,
    pub lat: f64,
    pub radius_e: f64,
    pub amplitude: f64,
}

/// Summary of one matching call: which tracks were extended and which were
/// spawned this frame.
#[derive(Debug, Clone, Default)]
pub struct FrameOutcome {
    pub extended: Vec<u32>,
    pub spawned: Vec<u32>,
}

/// Owner of all tracks of one sign.
#[derive(Debug, Clone)]
pub struct TrackStore {
    sign: Sign,
    tracks: BTreeMap<u32, Track>,
    next_track_id: u32,
}

impl TrackStore {
    pub fn new(sign: Sign) -> Self {
        TrackStore {
            sign,
            tracks: BTreeMap::new(),
            next_track_id: 0,
        }
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// Append a record to an existing track.
    pub fn extend(&mut self, track_id: u32, record: TrackRecord) -> Result<()> {
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or_else(|| anyhow!("unknown track id {track_id}"))?;
        track.records.push(record);
        Ok(())
    }

    /// Create a track with the next unused identifier and one initial record.
    pub fn spawn(&mut self, record: TrackRecord) -> u32 {
        let id = self.next_track_id;
        self.next_track_id += 1;
        log::debug!("spawning {} track {id}", self.sign.as_str());
        self.tracks.insert(
            id,
            Track {
                id,
                sign: self.sign,
                alive: true,
                records: vec![record],
            },
        );
        id
    }

    /// Last known positions and attributes of every live track, in id order.
    pub fn last_positions(&self) -> Vec<TrackSnapshot> {
        self.tracks
            .values()
            .filter(|t| t.alive)
            .map(|t| {
                let r = t.last();
                TrackSnapshot {
                    id: t.id,
                    lon: r.lon,
                    lat: r.lat,
                    radius_e: r.radius_e,
                    amplitude: r.amplitude,
                }
            })
            .collect()
    }

    pub fn get(&self, track_id: u32) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// External lapse policy hook; the store itself never flips this.
    pub fn set_alive(&mut self, track_id: u32, alive: bool) {
        if let Some(track) = self.tracks.get_mut(&track_id) {
            track.alive = alive;
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }
}
