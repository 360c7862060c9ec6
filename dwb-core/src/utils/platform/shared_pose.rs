//! Shared RPS pose slot.
//!
//! The RPS receiver runs outside the controllers and overwrites the slot
//! whenever a beacon packet arrives. Controllers poll it through
//! `PoseSource`, so they may see the same (stale) reading several times or a
//! momentary `None`.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use super::{Pose, PoseSource};

/// Latest pose behind a critical-section mutex.
pub struct SharedPose {
    slot: Mutex<CriticalSectionRawMutex, Cell<Option<Pose>>>,
}

impl SharedPose {
    /// Create an empty slot (no signal).
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Replace the stored pose. `None` marks the signal as lost.
    pub fn publish(
        &self,
        pose: Option<Pose>,
    ) {
        self.slot.lock(|cell| cell.set(pose));
    }

    /// Store a raw RPS reading, mapping sentinels to `None`.
    pub fn publish_rps(
        &self,
        x: f32,
        y: f32,
        heading: f32,
    ) {
        let pose = Pose::from_rps(x, y, heading);
        if pose.is_none() {
            tracing::debug!(x, y, heading, "RPS reported no signal");
        }
        self.publish(pose);
    }

    pub fn latest(&self) -> Option<Pose> {
        self.slot.lock(|cell| cell.get())
    }
}

impl Default for SharedPose {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSource for &SharedPose {
    fn current_pose(&mut self) -> Option<Pose> {
        self.latest()
    }
}
