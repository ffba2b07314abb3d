//! Result aggregation
//!
//! Reduces the final device states of a run into per-device attempt/success
//! counts and energy totals.

use serde::{Deserialize, Serialize};

use crate::pe_device::DeviceState;
use crate::pe_interface::{CostModel, DeviceId, FinishReason, Frame, Joules};
use crate::pe_random::{seed_to_hex, Seed};

/// Outcome for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResult {
    pub device: DeviceId,
    pub attempts: u32,
    pub successes: u32,
    pub target_deliveries: u32,

    /// Processing plus transmission energy
    pub total_cost: Joules,

    /// `None` if the run was aborted before the device finished
    pub finish_reason: Option<FinishReason>,
}

/// Complete simulation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Per-device results in ascending device id
    pub devices: Vec<DeviceResult>,

    /// Frames executed
    pub frames: Frame,

    /// False if the frame guard aborted the run
    pub completed: bool,

    /// Hex seed of the random stream, when known
    pub seed: Option<String>,
}

impl SimulationReport {
    pub fn total_attempts(&self) -> u64 {
        self.devices.iter().map(|d| d.attempts as u64).sum()
    }

    pub fn total_successes(&self) -> u64 {
        self.devices.iter().map(|d| d.successes as u64).sum()
    }

    pub fn total_cost(&self) -> Joules {
        self.devices.iter().map(|d| d.total_cost).sum()
    }

    pub fn mean_cost(&self) -> Joules {
        if self.devices.is_empty() {
            0.0
        } else {
            self.total_cost() / self.devices.len() as f64
        }
    }

    /// Successful deliveries per transmission attempt (1.0 when nobody transmitted)
    pub fn delivery_ratio(&self) -> f64 {
        let attempts = self.total_attempts();
        if attempts == 0 {
            1.0
        } else {
            self.total_successes() as f64 / attempts as f64
        }
    }

    /// Devices that have not finished (only non-zero for aborted runs)
    pub fn unfinished(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| d.finish_reason.is_none())
            .count()
    }

    /// Devices that stopped on the attempt cap short of their target
    pub fn undelivered(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| d.finish_reason == Some(FinishReason::AttemptCap))
            .count()
    }

    pub fn with_seed(mut self, seed: &Seed) -> Self {
        self.seed = Some(seed_to_hex(seed));
        self
    }

    /// Print a summary of the simulation results
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Contention Simulation Results                  ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        if let Some(ref seed) = self.seed {
            println!("  Seed: {}", seed);
        }
        println!("  Frames: {}", self.frames);
        println!(
            "  Status: {}",
            if self.completed { "done" } else { "ABORTED (frame guard)" }
        );
        println!();

        println!("  {:>6} {:>9} {:>10} {:>8} {:>14}  {}", "device", "attempts", "successes", "target", "energy [J]", "finish");
        for d in &self.devices {
            let reason = d
                .finish_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:>6} {:>9} {:>10} {:>8} {:>14.6}  {}",
                d.device, d.attempts, d.successes, d.target_deliveries, d.total_cost, reason
            );
        }
        println!();

        println!("Totals:");
        println!("  Attempts: {}", self.total_attempts());
        println!("  Successes: {}", self.total_successes());
        println!("  Delivery ratio: {:.3}", self.delivery_ratio());
        println!("  Energy: total={:.6} J, mean={:.6} J", self.total_cost(), self.mean_cost());
        if self.undelivered() > 0 {
            println!("  Devices short of target: {}", self.undelivered());
        }
        println!();
    }
}

/// Prices final device states with a cost model
pub struct ResultAggregator<'a, C: CostModel + ?Sized> {
    cost_model: &'a C,
}

impl<'a, C: CostModel + ?Sized> ResultAggregator<'a, C> {
    pub fn new(cost_model: &'a C) -> Self {
        Self { cost_model }
    }

    pub fn device_result(&self, device: &DeviceState) -> DeviceResult {
        let profile = device.profile();
        let total_cost = self.cost_model.processing_cost(profile)
            + self.cost_model.transmission_cost(device.attempts(), profile);

        DeviceResult {
            device: device.id(),
            attempts: device.attempts(),
            successes: device.successes(),
            target_deliveries: device.target_deliveries(),
            total_cost,
            finish_reason: device.finish_reason(),
        }
    }

    /// Reduce all devices; `completed` is true if every device finished
    pub fn aggregate(&self, devices: &[DeviceState], frames: Frame) -> SimulationReport {
        SimulationReport {
            devices: devices.iter().map(|d| self.device_result(d)).collect(),
            frames,
            completed: devices.iter().all(DeviceState::is_finished),
            seed: None,
        }
    }
}
