//! Per-device contention state
//!
//! A `DeviceState` is a value: the simulator never mutates one in place but
//! replaces it with the result of a transition (`with_attempt`,
//! `with_success`). Within a frame every device's choice is made from the
//! snapshot taken at the start of the frame, and outcomes are applied only
//! once all choices are in.

use std::rc::Rc;

use crate::pe_interface::{DeviceId, DeviceProfile, FinishReason};

/// Contention progress of one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    id: DeviceId,
    profile: Rc<DeviceProfile>,
    target_deliveries: u32,
    retransmission: bool,
    attempts: u32,
    successes: u32,
    finished: bool,
}

impl DeviceState {
    /// Fresh device with all counters at zero.
    ///
    /// `target_deliveries` is validated by the simulator configuration, not here.
    pub fn new(
        id: DeviceId,
        profile: Rc<DeviceProfile>,
        target_deliveries: u32,
        retransmission: bool,
    ) -> Self {
        Self {
            id,
            profile,
            target_deliveries,
            retransmission,
            attempts: 0,
            successes: 0,
            finished: false,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn images_available(&self) -> u32 {
        self.profile.images_available
    }

    pub fn importance_scores(&self) -> &[u32] {
        &self.profile.importance_scores
    }

    pub fn target_deliveries(&self) -> u32 {
        self.target_deliveries
    }

    pub fn retransmission(&self) -> bool {
        self.retransmission
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// State after contending once.
    ///
    /// Without retransmission the attempt cap is checked right here, before
    /// the outcome of this attempt is known.
    #[must_use]
    pub fn with_attempt(&self) -> Self {
        debug_assert!(!self.finished, "finished device contended");

        let mut next = self.clone();
        next.attempts += 1;
        if !next.retransmission && next.attempts == next.target_deliveries {
            next.finished = true;
        }
        next
    }

    /// State after winning an uncontested slot
    #[must_use]
    pub fn with_success(&self) -> Self {
        debug_assert!(self.successes < self.attempts, "success without attempt");

        let mut next = self.clone();
        next.successes += 1;
        if next.successes == next.target_deliveries {
            next.finished = true;
        }
        next
    }

    /// Why the device stopped contending, `None` while still active
    pub fn finish_reason(&self) -> Option<FinishReason> {
        if !self.finished {
            None
        } else if self.successes == self.target_deliveries {
            Some(FinishReason::Delivered)
        } else {
            Some(FinishReason::AttemptCap)
        }
    }
}
