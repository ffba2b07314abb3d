// Shared types and traits for the contention simulator

use std::fmt;

use serde::{Deserialize, Serialize};

/// Device identifier, unique within one simulation run (ascending from 0)
pub type DeviceId = usize;

/// Frame counter (one frame = one contention decision per active device)
pub type Frame = usize;

/// Slot index within a frame
pub type SlotIndex = usize;

/// Energy in Joules
pub type Joules = f64;

/// Uniform and Bernoulli draws consumed by the access policy.
///
/// Implementations must be a single ordered stream: the simulator consumes
/// draws in ascending device order every frame, so the same stream always
/// reproduces the same run.
pub trait RandomSource {
    /// Uniform integer in `[0, exclusive_upper)`
    fn next_uniform(&mut self, exclusive_upper: usize) -> usize;

    /// `true` with the given probability (in `[0, 1]`)
    fn next_bernoulli(&mut self, probability: f64) -> bool;
}

/// Immutable device-class descriptor handed to the cost model.
///
/// The contention logic never reads it; it only prices a device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Images the device would send without prompt selection
    pub images_available: u32,

    /// Prompts the device has to deliver
    pub images_to_transmit: u32,

    /// Per-image priority values (not used by the contention logic)
    #[serde(default)]
    pub importance_scores: Vec<u32>,
}

/// Prices on-device processing and radio activity.
pub trait CostModel {
    /// Energy spent on inference/compression for this device class
    fn processing_cost(&self, profile: &DeviceProfile) -> Joules;

    /// Energy spent on `attempts` transmissions
    fn transmission_cost(&self, attempts: u32, profile: &DeviceProfile) -> Joules;
}

/// Why a device stopped contending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Reached its target number of successful deliveries
    Delivered,

    /// Ran out of attempts (retransmission disabled)
    AttemptCap,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Delivered => write!(f, "delivered"),
            FinishReason::AttemptCap => write!(f, "attempt-cap"),
        }
    }
}

/// Events emitted by the simulator while a frame is processed
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A device contended in `slot`
    Attempt { slot: SlotIndex, attempts: u32 },

    /// A device was the only claimant of `slot`
    Delivered { slot: SlotIndex, successes: u32 },

    /// Two or more devices claimed `slot`
    Collision { slot: SlotIndex, claimants: usize },

    /// A device stopped contending
    Finished { reason: FinishReason },
}

/// Receives simulator events.
///
/// `device` is `None` for channel-level events (collisions).
pub trait EventSink {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event);
}

/// No-op event sink (zero overhead)
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline(always)]
    fn log(&mut self, _frame: Frame, _device: Option<DeviceId>, _event: Event) {}
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event) {
        (**self).log(frame, device, event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event) {
        (**self).log(frame, device, event);
    }
}
