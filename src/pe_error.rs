//! Error types
//!
//! Only two things can go wrong in a contention run: the configuration is
//! invalid (caught before the first frame), or the frame guard trips.

use thiserror::Error;

use crate::pe_interface::{DeviceId, Frame};
use crate::pe_results::SimulationReport;

/// Invalid simulation parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("slots per frame must be at least 1 (got {0})")]
    InvalidSlotCount(usize),

    #[error("transmission probability must be within [0, 1] (got {0})")]
    InvalidProbability(f64),

    #[error("device {device}: target deliveries must be at least 1 (got {target})")]
    InvalidTargetDeliveries { device: DeviceId, target: u32 },

    #[error("frame guard must be at least 1 (got {0})")]
    InvalidFrameGuard(Frame),

    #[error("override for device {device} but only {num_devices} devices configured")]
    UnknownDevice { device: DeviceId, num_devices: usize },
}

/// Errors reported by a simulation run
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The frame guard was exceeded. The partial report is attached with
    /// `completed == false`.
    #[error(
        "simulation did not terminate within {} frames ({} devices unfinished)",
        .0.frames,
        .0.unfinished()
    )]
    NonTermination(Box<SimulationReport>),
}

impl SimError {
    /// Partial report of an aborted run
    pub fn partial_report(&self) -> Option<&SimulationReport> {
        match self {
            SimError::NonTermination(report) => Some(report),
            SimError::Configuration(_) => None,
        }
    }
}

/// Errors loading a scenario file
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid seed: {0}")]
    Seed(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
