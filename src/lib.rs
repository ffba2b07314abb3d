//! # peRust - Prompt Energy Evaluation
//!
//! Evaluates whether a wireless camera saves energy by transmitting a compact
//! learned "prompt" instead of the raw image, under several channel and
//! deployment assumptions.
//!
//! ## Core Components
//!
//! - **ContentionSimulator**: discrete-time model of several devices competing
//!   for slots on a shared medium until each has delivered its prompts
//! - **AccessPolicy**: slotted (uniform slot choice) or single-slot
//!   (probabilistic) channel access, plus the retransmission stop rule
//! - **ResultAggregator**: per-device attempts, successes and energy
//! - **Energy model**: closed-form inference, memory and radio energy, and the
//!   prompt-versus-image savings analyses
//!
//! ## Usage
//!
//! ```no_run
//! use pe_rust::{ContentionConfig, ContentionSimulator, PromptCostModel, SeededRandom};
//!
//! let config = ContentionConfig {
//!     num_devices: 3,
//!     slots_per_frame: 10,
//!     ..Default::default()
//! };
//! let rng = SeededRandom::new([42u8; 32]);
//!
//! let mut sim = ContentionSimulator::new(&config, rng)?;
//! let report = sim.run(&PromptCostModel::default())?;
//! report.print_summary();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Scenario files and the sweep tools live in `simulator/`.

// Contention core
pub mod pe_access;
pub mod pe_contention;
pub mod pe_device;
pub mod pe_interface;
pub mod pe_random;
pub mod pe_results;

// Energy model
pub mod pe_energy;

// Configuration, errors, observation
pub mod pe_error;
pub mod pe_event_sinks;
pub mod pe_scenario;

// Re-export commonly used types
pub use pe_access::{AccessDecision, AccessPolicy, ChannelAccess};
pub use pe_contention::{ContentionConfig, ContentionSimulator, DeviceOverride, FrameSummary, SimState};
pub use pe_device::DeviceState;
pub use pe_energy::{EnergyParams, FrameSize, ModelOps, PromptCostModel, Savings};
pub use pe_error::{ConfigurationError, ScenarioError, SimError};
pub use pe_interface::{
    CostModel, DeviceId, DeviceProfile, Event, EventSink, FinishReason, Frame, Joules, NoOpSink,
    RandomSource, SlotIndex,
};
pub use pe_random::{Seed, SeededRandom};
pub use pe_results::{DeviceResult, ResultAggregator, SimulationReport};
pub use pe_scenario::Scenario;
