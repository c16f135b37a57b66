//! Latest-value publisher for the display layer.
//!
//! Built on [`tokio::sync::watch`]: the controller owns the single
//! [`LatestPose`] writer, and any number of [`PoseReader`]s observe
//! snapshots.  A whole [`PublishedPose`] is swapped in per update, so a
//! reader can never see the four quaternion components of two different
//! samples mixed together.
//!
//! Readers do not need a Tokio runtime for [`PoseReader::snapshot`]; only
//! [`PoseReader::changed`] is async.

use puppetry_types::PoseSample;
use tokio::sync::watch;

/// A sample together with its position in the capture sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedPose {
    /// 1 for the first capture event, incremented on every update.
    pub sequence: u64,
    pub sample: PoseSample,
}

/// Write side, held by the streaming controller.
#[derive(Debug)]
pub struct LatestPose {
    tx: watch::Sender<Option<PublishedPose>>,
}

impl LatestPose {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current value with `sample`.
    ///
    /// Never blocks and succeeds whether or not any reader exists.
    pub fn publish(&self, sample: PoseSample) {
        self.tx.send_modify(|slot| {
            let sequence = slot.as_ref().map_or(1, |p| p.sequence + 1);
            *slot = Some(PublishedPose { sequence, sample });
        });
    }

    /// Hand out a new reader.
    pub fn reader(&self) -> PoseReader {
        PoseReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for LatestPose {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side for display consumers.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct PoseReader {
    rx: watch::Receiver<Option<PublishedPose>>,
}

impl PoseReader {
    /// Copy of the latest sample, `None` before the first capture.
    pub fn snapshot(&self) -> Option<PoseSample> {
        self.latest().map(|p| p.sample)
    }

    /// Copy of the latest sample with its sequence number.
    pub fn latest(&self) -> Option<PublishedPose> {
        *self.rx.borrow()
    }

    /// Number of updates published so far.
    pub fn update_count(&self) -> u64 {
        self.latest().map_or(0, |p| p.sequence)
    }

    /// Wait until a value newer than the last one seen by this reader is
    /// published.
    ///
    /// Returns `None` once the writer has been dropped.
    pub async fn changed(&mut self) -> Option<PublishedPose> {
        self.rx.changed().await.ok()?;
        *self.rx.borrow_and_update()
    }
}
