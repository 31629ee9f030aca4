//! Engine wide set of channels whose outbound queue is under pressure.
//!
//! The tracker is shared by every channel of an [`Engine`](crate::Engine).
//! Each channel reports its queue occupancy before writing a message, and the
//! tracker decides whether the channel is in the normal band, in the high band
//! (tracked) or overflowing (to be closed).
use std::{collections::HashSet, sync::Mutex};

use socketwire_core::Sid;

/// The band a queue occupancy falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pressure {
    /// At most half of the capacity is used.
    Normal,
    /// More than half of the capacity is used.
    High,
    /// The queue holds `capacity - 1` messages or more.
    Overflow,
}

impl Pressure {
    pub fn of(occupancy: usize, capacity: usize) -> Self {
        if occupancy >= capacity.saturating_sub(1) {
            Pressure::Overflow
        } else if occupancy > capacity / 2 {
            Pressure::High
        } else {
            Pressure::Normal
        }
    }
}

/// The set of "overflooded" channels.
#[derive(Debug, Default)]
pub struct BackpressureTracker {
    overflooded: Mutex<HashSet<Sid>>,
}

impl BackpressureTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies the occupancy of a channel queue and updates its membership.
    ///
    /// Channels in the high band are added, channels in the normal band are
    /// removed. Overflowing channels are left as is, they are about to close.
    pub(crate) fn observe(&self, id: Sid, occupancy: usize, capacity: usize) -> Pressure {
        let pressure = Pressure::of(occupancy, capacity);
        match pressure {
            Pressure::High => {
                if self.overflooded.lock().unwrap().insert(id) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("[sid={id}] outbound queue above half capacity");
                }
            }
            Pressure::Normal => self.remove(&id),
            Pressure::Overflow => (),
        }
        pressure
    }

    pub(crate) fn remove(&self, id: &Sid) {
        self.overflooded.lock().unwrap().remove(id);
    }

    /// Whether the channel with this local id is currently tracked.
    pub fn contains(&self, id: &Sid) -> bool {
        self.overflooded.lock().unwrap().contains(id)
    }

    /// The number of tracked channels.
    pub fn len(&self) -> usize {
        self.overflooded.lock().unwrap().len()
    }

    /// Whether no channel is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
