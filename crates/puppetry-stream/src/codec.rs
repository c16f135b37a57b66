//! Wire codec for admitted pose samples.
//!
//! Payload shape (JSON):
//!
//! ```text
//! {
//!   "timestamp": 1718000000.123,
//!   "quaternion": { "x": 0.0, "y": 0.0, "z": 0.7071067811865476, "w": 0.7071067811865476 }
//! }
//! ```
//!
//! The timestamp is rounded to the millisecond.  Quaternion components are
//! written at full `f64` precision so that receivers doing drift analysis get
//! the exact value the tracker produced.

use puppetry_types::{PoseSample, PuppetError, Quaternion};
use serde::{Deserialize, Serialize};

/// Content-type attached to every outbound payload.
pub const CONTENT_TYPE: &str = "application/json";

/// Decoded form of one wire message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePose {
    pub timestamp: f64,
    pub quaternion: Quaternion,
}

impl From<&PoseSample> for WirePose {
    fn from(sample: &PoseSample) -> Self {
        Self {
            timestamp: round_to_millis(sample.captured_at()),
            quaternion: sample.orientation(),
        }
    }
}

/// Encode `sample` into the JSON wire payload.
///
/// # Errors
///
/// [`PuppetError::Serialization`] if the encoder fails.  This does not happen
/// for samples built through [`PoseSample::new`], which refuses non-finite
/// values.
pub fn serialize(sample: &PoseSample) -> Result<Vec<u8>, PuppetError> {
    serde_json::to_vec(&WirePose::from(sample))
        .map_err(|e| PuppetError::Serialization(e.to_string()))
}

/// Decode a wire payload.
pub fn deserialize(bytes: &[u8]) -> Result<WirePose, PuppetError> {
    serde_json::from_slice(bytes).map_err(|e| PuppetError::Serialization(e.to_string()))
}

fn round_to_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
