//! Channel access policy
//!
//! Slotted mode: every active device picks one of `slots_per_frame` slots
//! uniformly at random. Single-slot mode: every active device transmits on
//! the one shared slot with a fixed probability.

use crate::pe_device::DeviceState;
use crate::pe_error::ConfigurationError;
use crate::pe_interface::{RandomSource, SlotIndex};

/// How devices get onto the shared medium
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelAccess {
    /// Uniform slot choice among `slots_per_frame >= 2` slots
    Slotted { slots_per_frame: usize },

    /// One shared slot, transmit with `transmission_probability`
    Probabilistic { transmission_probability: f64 },
}

/// Outcome of one access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The device claims this slot
    Claim(SlotIndex),

    /// The device stays silent this frame
    Idle,
}

/// Decides per device per frame whether and where it transmits
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    access: ChannelAccess,
}

impl AccessPolicy {
    /// Build the policy from raw parameters.
    ///
    /// The probability is validated even in slotted mode, where it is unused.
    pub fn new(
        slots_per_frame: usize,
        transmission_probability: f64,
    ) -> Result<Self, ConfigurationError> {
        if slots_per_frame < 1 {
            return Err(ConfigurationError::InvalidSlotCount(slots_per_frame));
        }
        if !(0.0..=1.0).contains(&transmission_probability) {
            // NaN fails `contains` too
            return Err(ConfigurationError::InvalidProbability(
                transmission_probability,
            ));
        }

        let access = if slots_per_frame > 1 {
            ChannelAccess::Slotted { slots_per_frame }
        } else {
            ChannelAccess::Probabilistic {
                transmission_probability,
            }
        };

        Ok(Self { access })
    }

    pub fn access(&self) -> ChannelAccess {
        self.access
    }

    /// Number of entries in the per-frame claim table
    pub fn slot_count(&self) -> usize {
        match self.access {
            ChannelAccess::Slotted { slots_per_frame } => slots_per_frame,
            ChannelAccess::Probabilistic { .. } => 1,
        }
    }

    /// Make the access decision for one unfinished device.
    ///
    /// Returns the decision and the device's next state: a claim counts as an
    /// attempt (and may trip the attempt cap), staying idle leaves the state
    /// unchanged. Exactly one draw is consumed.
    pub fn decide<R: RandomSource + ?Sized>(
        &self,
        device: &DeviceState,
        rng: &mut R,
    ) -> (AccessDecision, DeviceState) {
        match self.access {
            ChannelAccess::Slotted { slots_per_frame } => {
                let next = device.with_attempt();
                let slot = rng.next_uniform(slots_per_frame);
                (AccessDecision::Claim(slot), next)
            }
            ChannelAccess::Probabilistic {
                transmission_probability,
            } => {
                if rng.next_bernoulli(transmission_probability) {
                    (AccessDecision::Claim(0), device.with_attempt())
                } else {
                    (AccessDecision::Idle, device.clone())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe_interface::DeviceProfile;
    use crate::pe_random::ScriptedRandom;
    use std::rc::Rc;

    fn device(target: u32, retransmission: bool) -> DeviceState {
        DeviceState::new(0, Rc::new(DeviceProfile::default()), target, retransmission)
    }

    #[test]
    fn test_mode_selection() {
        let slotted = AccessPolicy::new(10, 0.1).unwrap();
        assert_eq!(
            slotted.access(),
            ChannelAccess::Slotted { slots_per_frame: 10 }
        );
        assert_eq!(slotted.slot_count(), 10);

        let single = AccessPolicy::new(1, 0.25).unwrap();
        assert_eq!(
            single.access(),
            ChannelAccess::Probabilistic {
                transmission_probability: 0.25
            }
        );
        assert_eq!(single.slot_count(), 1);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert_eq!(
            AccessPolicy::new(0, 0.5).unwrap_err(),
            ConfigurationError::InvalidSlotCount(0)
        );
        assert!(matches!(
            AccessPolicy::new(4, 1.5),
            Err(ConfigurationError::InvalidProbability(_))
        ));
        assert!(matches!(
            AccessPolicy::new(1, -0.1),
            Err(ConfigurationError::InvalidProbability(_))
        ));
        assert!(matches!(
            AccessPolicy::new(1, f64::NAN),
            Err(ConfigurationError::InvalidProbability(_))
        ));
    }

    #[test]
    fn test_slotted_claim_counts_attempt() {
        let policy = AccessPolicy::new(4, 0.0).unwrap();
        let mut rng = ScriptedRandom::slots(&[2]);

        let (decision, next) = policy.decide(&device(5, true), &mut rng);

        assert_eq!(decision, AccessDecision::Claim(2));
        assert_eq!(next.attempts(), 1);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn test_idle_leaves_state_unchanged() {
        let policy = AccessPolicy::new(1, 0.5).unwrap();
        let mut rng = ScriptedRandom::coins(&[false, true]);
        let d = device(5, true);

        let (decision, next) = policy.decide(&d, &mut rng);
        assert_eq!(decision, AccessDecision::Idle);
        assert_eq!(next, d);

        let (decision, next) = policy.decide(&next, &mut rng);
        assert_eq!(decision, AccessDecision::Claim(0));
        assert_eq!(next.attempts(), 1);
    }

    #[test]
    fn test_cap_applies_at_attempt_time() {
        let policy = AccessPolicy::new(3, 0.0).unwrap();
        let mut rng = ScriptedRandom::slots(&[0, 1]);

        let (_, d) = policy.decide(&device(2, false), &mut rng);
        assert!(!d.is_finished());

        let (decision, d) = policy.decide(&d, &mut rng);
        // Finished before the claim is resolved, but the claim stands
        assert_eq!(decision, AccessDecision::Claim(1));
        assert!(d.is_finished());
        assert_eq!(d.successes(), 0);
    }
}
