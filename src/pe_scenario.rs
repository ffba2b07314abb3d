//! YAML scenario files
//!
//! ```yaml
//! meta:
//!   name: Dense deployment
//!   description: 20 cameras on a 10-slot frame
//! config:
//!   num_devices: 20
//!   slots_per_frame: 10
//!   retransmission: true
//!   target_deliveries: 5
//!   seed: "0x2a"
//! devices:
//!   3: { retransmission: false }
//! energy:
//!   data_rate_bps: 600.0
//! ```
//!
//! Everything except `config` is optional; missing `config` keys take the
//! `ContentionConfig` defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::pe_access::AccessPolicy;
use crate::pe_contention::{ContentionConfig, ContentionSimulator, DeviceOverride};
use crate::pe_energy::{EnergyParams, PromptCostModel};
use crate::pe_error::{ScenarioError, SimError};
use crate::pe_interface::{DeviceId, EventSink, Frame};
use crate::pe_random::{parse_seed_hex, Seed, SeededRandom};
use crate::pe_results::SimulationReport;

/// Scenario metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub hypothesis: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    #[serde(default)]
    meta: ScenarioMeta,

    config: ScenarioConfig,

    #[serde(default)]
    devices: BTreeMap<DeviceId, DeviceOverride>,

    #[serde(default)]
    energy: EnergyParams,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScenarioConfig {
    num_devices: usize,
    slots_per_frame: usize,
    transmission_probability: f64,
    retransmission: bool,
    target_deliveries: u32,
    images_available: u32,
    max_frames: Frame,
    seed: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let defaults = ContentionConfig::default();
        Self {
            num_devices: defaults.num_devices,
            slots_per_frame: defaults.slots_per_frame,
            transmission_probability: defaults.transmission_probability,
            retransmission: defaults.retransmission,
            target_deliveries: defaults.target_deliveries,
            images_available: defaults.images_available,
            max_frames: defaults.max_frames,
            seed: None,
        }
    }
}

/// A validated scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub meta: ScenarioMeta,
    pub contention: ContentionConfig,
    pub seed: Option<Seed>,
    pub energy: EnergyParams,
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Parse and validate a scenario
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = serde_yaml::from_str(yaml)?;

        let seed = file
            .config
            .seed
            .as_deref()
            .map(parse_seed_hex)
            .transpose()
            .map_err(ScenarioError::Seed)?;

        let contention = ContentionConfig {
            num_devices: file.config.num_devices,
            slots_per_frame: file.config.slots_per_frame,
            transmission_probability: file.config.transmission_probability,
            retransmission: file.config.retransmission,
            target_deliveries: file.config.target_deliveries,
            images_available: file.config.images_available,
            max_frames: file.config.max_frames,
            overrides: file.devices,
        };

        // Fail on bad parameters at load time, not halfway through a batch
        AccessPolicy::new(contention.slots_per_frame, contention.transmission_probability)?;
        contention.build_devices()?;

        Ok(Self {
            meta: file.meta,
            contention,
            seed,
            energy: file.energy,
        })
    }

    /// Display name: `meta.name`, else the given fallback
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.meta.name.as_deref().unwrap_or(fallback)
    }

    /// Run the scenario, priced with [`PromptCostModel`].
    ///
    /// `seed_override` wins over the file's seed; with neither, a fresh seed
    /// is drawn and recorded in the report.
    pub fn run<S: EventSink>(
        &self,
        seed_override: Option<Seed>,
        sink: S,
    ) -> Result<SimulationReport, SimError> {
        let rng = SeededRandom::from_optional_seed(seed_override.or(self.seed));
        let seed = rng.seed();
        let cost_model = PromptCostModel::with_params(self.energy);

        info!(
            "running {} devices, {} slots/frame, retransmission={}",
            self.contention.num_devices,
            self.contention.slots_per_frame,
            self.contention.retransmission
        );

        let mut sim = ContentionSimulator::with_sink(&self.contention, rng, sink)?;
        match sim.run(&cost_model) {
            Ok(report) => Ok(report.with_seed(&seed)),
            Err(SimError::NonTermination(partial)) => {
                Err(SimError::NonTermination(Box::new(partial.with_seed(&seed))))
            }
            Err(e) => Err(e),
        }
    }
}
