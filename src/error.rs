//! Common error type for detection and tracking operations.

use thiserror::Error;

/// Errors raised while extracting or tracking eddies.
///
/// `DegenerateGeometry` is a per-candidate anomaly; the extractor treats it
/// as "discard this candidate and keep going". The `Unknown*` variants
/// indicate a misconfiguration and are fatal.
#[derive(Error, Debug)]
pub enum EddyError {
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("unknown diagnostic mode: {0}")]
    UnknownDiagnosticMode(String),
    #[error("unknown separation policy: {0}")]
    UnknownSeparationPolicy(String),
}

pub type EddyResult<T> = Result<T, EddyError>;
