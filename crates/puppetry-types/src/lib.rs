//! `puppetry-types` – shared vocabulary for the pose streaming pipeline.
//!
//! - [`Quaternion`] – a rotation expressed as `(x, y, z, w)`.
//! - [`PoseSample`] – one observed orientation at one instant.
//! - [`PuppetError`] – the error type used across the workspace.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Norm tolerance below which a quaternion is treated as degenerate.
const DEGENERATE_NORM: f64 = 1e-12;

/// A rotation quaternion in `(x, y, z, w)` order, `w` being the real part.
///
/// The tracking source is expected to hand over unit quaternions; nothing in
/// the pipeline re-normalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Rotation of `radians` about `axis`.
    ///
    /// Returns `None` when the axis has zero length or is not finite.
    pub fn from_axis_angle(axis: [f64; 3], radians: f64) -> Option<Self> {
        let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if !len.is_finite() || len < DEGENERATE_NORM || !radians.is_finite() {
            return None;
        }
        let (s, c) = (radians / 2.0).sin_cos();
        Some(Self::new(
            axis[0] / len * s,
            axis[1] / len * s,
            axis[2] / len * s,
            c,
        ))
    }

    /// Euclidean norm `sqrt(x² + y² + z² + w²)`.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Unit-length copy of this quaternion, or `None` if it cannot be
    /// normalized (zero length or non-finite components).
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        if !n.is_finite() || n < DEGENERATE_NORM {
            return None;
        }
        Some(Self::new(self.x / n, self.y / n, self.z / n, self.w / n))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// One observed orientation at one instant.
///
/// Samples are immutable once built: the fields are private and only
/// exposed through getters.  Construction goes through [`PoseSample::new`],
/// which refuses non-finite input so that nothing downstream (publisher,
/// codec, transport) ever sees NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    captured_at: f64,
    orientation: Quaternion,
}

impl PoseSample {
    /// Build a sample from a wall-clock timestamp (seconds since the Unix
    /// epoch, source clock) and an already-normalized orientation.
    ///
    /// # Errors
    ///
    /// [`PuppetError::NonFinite`] if the timestamp or any quaternion
    /// component is NaN or infinite.
    pub fn new(captured_at: f64, orientation: Quaternion) -> Result<Self, PuppetError> {
        if !captured_at.is_finite() {
            return Err(PuppetError::NonFinite("captured_at"));
        }
        if !orientation.is_finite() {
            return Err(PuppetError::NonFinite("orientation"));
        }
        Ok(Self {
            captured_at,
            orientation,
        })
    }

    /// Build a sample stamped with the current wall-clock time.
    pub fn now(orientation: Quaternion) -> Result<Self, PuppetError> {
        Self::new(unix_seconds_now(), orientation)
    }

    /// Capture time in seconds since the Unix epoch.
    pub fn captured_at(&self) -> f64 {
        self.captured_at
    }

    pub fn orientation(&self) -> Quaternion {
        self.orientation
    }
}

/// Human-readable text card for the display layer.
///
/// Same shape as the wire payload, with the timestamp at 3 decimals and the
/// quaternion components at 12.
impl fmt::Display for PoseSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = &self.orientation;
        writeln!(f, "{{")?;
        writeln!(f, "  \"timestamp\": {:.3},", self.captured_at)?;
        writeln!(f, "  \"quaternion\": {{")?;
        writeln!(
            f,
            "    \"x\": {:.12}, \"y\": {:.12}, \"z\": {:.12}, \"w\": {:.12}",
            q.x, q.y, q.z, q.w
        )?;
        writeln!(f, "  }}")?;
        write!(f, "}}")
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn unix_seconds_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Errors raised while building, encoding, or configuring the pose stream.
#[derive(Error, Debug)]
pub enum PuppetError {
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Runtime Error: {0}")]
    Runtime(String),
}
