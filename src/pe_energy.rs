//! Closed-form energy model
//!
//! Prices on-device inference/compression from operation counts and radio
//! transmission from payload size, and answers the question the whole crate
//! exists for: does sending a learned prompt instead of the raw image save
//! energy?
//!
//! All per-operation energies are in picojoules; every function returns
//! Joules.

use serde::{Deserialize, Serialize};

use crate::pe_interface::{CostModel, DeviceProfile, Joules};

const PICO: f64 = 1e-12;

/// Technology and radio parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnergyParams {
    /// One multiply-accumulate
    pub e_muac_pj: f64,

    /// Local (register file) memory access
    pub e_local_pj: f64,

    /// DRAM access
    pub e_dram_pj: f64,

    /// SRAM access
    pub e_sram_pj: f64,

    /// Processing elements in the accelerator array
    pub pe_array: f64,

    /// Radio transmit power [W]
    pub transmit_power_w: f64,

    /// Radio data rate [bit/s]
    pub data_rate_bps: f64,

    /// Raw image encoding
    pub image_bits_per_pixel: f64,

    /// Prompt encoding
    pub prompt_bits_per_pixel: f64,
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            e_muac_pj: 3.7,
            e_local_pj: 2.0 * 3.7,
            e_dram_pj: 128.0 * 3.7,
            e_sram_pj: 3.7,
            pe_array: 64.0,
            transmit_power_w: 0.108,
            data_rate_bps: 1e5,
            image_bits_per_pixel: 4.86,
            prompt_bits_per_pixel: 0.072,
        }
    }
}

/// Operation counts of a neural network for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelOps {
    pub muacs: u64,
    pub activations: u64,
    pub weights: u64,
}

/// HiFiC learned image compression
pub const HIFIC_COMPRESSION: ModelOps = ModelOps {
    muacs: 5_678_366_720,
    activations: 7_782_400,
    weights: 13_172_180,
};

/// Small learned compression model
pub const SMALL_COMPRESSION: ModelOps = ModelOps {
    muacs: 477_388_800,
    activations: 3_542_400,
    weights: 18_456,
};

/// Behaviour inference model used to filter images
pub const BEHAVIOUR_INFERENCE: ModelOps = ModelOps {
    muacs: 117_000_000,
    activations: 4_309_000,
    weights: 976_000,
};

/// Where the model's weights and activations live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPlacement {
    Sram,
    Dram,
}

/// Image dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const VGA: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    pub fn pixels(&self) -> f64 {
        self.width as f64 * self.height as f64
    }
}

/// Energy saved by sending prompts instead of images
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Savings {
    /// Image-path energy minus prompt-path energy (negative = prompts cost more)
    pub absolute: Joules,

    /// Prompt-path energy as a fraction of image-path energy
    pub relative_cost: f64,
}

impl EnergyParams {
    /// Energy of running `model` once
    pub fn inference_energy(&self, model: &ModelOps, placement: MemoryPlacement) -> Joules {
        let e_mem = match placement {
            MemoryPlacement::Sram => self.e_sram_pj,
            MemoryPlacement::Dram => self.e_dram_pj,
        };
        let n_c = model.muacs as f64;
        let a_s = model.activations as f64;
        let n_s = model.weights as f64;
        let sqrt_p = self.pe_array.sqrt();

        let activations = 2.0 * self.e_local_pj * a_s + (e_mem * n_c) / sqrt_p;
        let weights = self.e_local_pj * n_s + (e_mem * n_c) / sqrt_p;
        let compute = self.e_muac_pj * (n_c + 3.0 * a_s);

        (compute + weights + activations) * PICO
    }

    pub fn image_bits(&self, size: FrameSize) -> f64 {
        size.pixels() * self.image_bits_per_pixel
    }

    pub fn prompt_bits(&self, size: FrameSize) -> f64 {
        size.pixels() * self.prompt_bits_per_pixel
    }

    /// Radio energy for `bits`
    pub fn link_energy(&self, bits: f64) -> Joules {
        bits / self.data_rate_bps * self.transmit_power_w
    }

    /// Energy of reading `bits` from DRAM
    pub fn dram_read_energy(&self, bits: f64) -> Joules {
        self.e_dram_pj * PICO * bits
    }

    /// Sending one prompt (model in DRAM) versus one raw image
    pub fn prompt_savings(&self, size: FrameSize, model: &ModelOps) -> Savings {
        self.erasure_scaled(size, model, 1.0)
    }

    /// [`EnergyParams::prompt_savings`] at a different data rate
    pub fn rate_savings(&self, size: FrameSize, model: &ModelOps, data_rate_bps: f64) -> Savings {
        EnergyParams {
            data_rate_bps,
            ..*self
        }
        .prompt_savings(size, model)
    }

    /// Savings over an erasure channel where each transmission fails with
    /// `p_fail`, so every payload is sent `1 / (1 - p_fail)` times on average.
    ///
    /// `None` unless `p_fail` is in `[0, 1)`.
    pub fn erasure_savings(&self, size: FrameSize, model: &ModelOps, p_fail: f64) -> Option<Savings> {
        if !(0.0..1.0).contains(&p_fail) {
            return None;
        }
        Some(self.erasure_scaled(size, model, 1.0 / (1.0 - p_fail)))
    }

    fn erasure_scaled(&self, size: FrameSize, model: &ModelOps, transmissions: f64) -> Savings {
        let image_bits = self.image_bits(size);
        let image_link = self.link_energy(image_bits) * transmissions;
        let prompt_link = self.link_energy(self.prompt_bits(size)) * transmissions;
        let image_read = self.dram_read_energy(image_bits);
        let model_energy = self.inference_energy(model, MemoryPlacement::Dram);

        Savings {
            absolute: image_link - prompt_link - image_read - model_energy,
            relative_cost: (prompt_link + image_read + model_energy) / image_link,
        }
    }

    /// Savings when an inference model filters out a fraction `p_filtered`
    /// of the prompts before they are compressed and sent.
    pub fn selective_savings(
        &self,
        size: FrameSize,
        inference: &ModelOps,
        compression: &ModelOps,
        p_filtered: f64,
    ) -> Savings {
        let per_prompt = self.link_energy(self.prompt_bits(size))
            + self.inference_energy(compression, MemoryPlacement::Dram);
        let filtered = per_prompt * (1.0 - p_filtered);
        let filter_energy = self.inference_energy(inference, MemoryPlacement::Dram);

        Savings {
            absolute: per_prompt - filtered - filter_energy,
            relative_cost: (filtered + filter_energy) / per_prompt,
        }
    }

    /// Savings when the link cost is given directly as energy per bit
    pub fn power_threshold_savings(
        &self,
        size: FrameSize,
        model: &ModelOps,
        joules_per_bit: f64,
    ) -> Savings {
        let image_bits = self.image_bits(size);
        let image_link = image_bits * joules_per_bit;
        let prompt_link = self.prompt_bits(size) * joules_per_bit;
        let image_read = self.dram_read_energy(image_bits);
        let model_energy = self.inference_energy(model, MemoryPlacement::Dram);

        Savings {
            absolute: image_link - prompt_link - image_read - model_energy,
            relative_cost: (prompt_link + image_read + model_energy) / image_link,
        }
    }
}

/// The sample whose absolute saving is closest to zero
pub fn break_even(points: &[(f64, Savings)]) -> Option<(f64, Savings)> {
    points
        .iter()
        .copied()
        .min_by(|a, b| a.1.absolute.abs().total_cmp(&b.1.absolute.abs()))
}

/// Prices a camera device that filters with an inference model, compresses
/// the selected images into prompts and transmits the prompts.
#[derive(Debug, Clone)]
pub struct PromptCostModel {
    pub params: EnergyParams,
    pub frame: FrameSize,
    pub compression: ModelOps,
    pub inference: ModelOps,
}

impl Default for PromptCostModel {
    fn default() -> Self {
        Self {
            params: EnergyParams::default(),
            frame: FrameSize::VGA,
            compression: SMALL_COMPRESSION,
            inference: BEHAVIOUR_INFERENCE,
        }
    }
}

impl PromptCostModel {
    pub fn with_params(params: EnergyParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Radio energy of one prompt transmission attempt
    pub fn prompt_transmission(&self) -> Joules {
        self.params.link_energy(self.params.prompt_bits(self.frame))
    }

    fn per_image(&self, model: &ModelOps) -> Joules {
        self.params.inference_energy(model, MemoryPlacement::Dram)
            + self.params.dram_read_energy(self.params.image_bits(self.frame))
    }
}

impl CostModel for PromptCostModel {
    fn processing_cost(&self, profile: &DeviceProfile) -> Joules {
        self.per_image(&self.compression) * profile.images_to_transmit as f64
            + self.per_image(&self.inference) * profile.images_available as f64
    }

    fn transmission_cost(&self, attempts: u32, _profile: &DeviceProfile) -> Joules {
        self.prompt_transmission() * attempts as f64
    }
}
