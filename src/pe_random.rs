//! Seedable random source
//!
//! Every run owns its own stream. A run started without a seed draws one from
//! OS entropy and reports it, so any run can be reproduced afterwards.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::pe_interface::RandomSource;

/// 32-byte seed, the `StdRng` seed format
pub type Seed = [u8; 32];

/// `RandomSource` backed by `StdRng`
pub struct SeededRandom {
    rng: StdRng,
    seed: Seed,
}

impl SeededRandom {
    pub fn new(seed: Seed) -> Self {
        Self {
            rng: StdRng::from_seed(seed),
            seed,
        }
    }

    /// Use the given seed or generate a fresh one
    pub fn from_optional_seed(seed: Option<Seed>) -> Self {
        Self::new(resolve_seed(seed))
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_uniform(&mut self, exclusive_upper: usize) -> usize {
        self.rng.gen_range(0..exclusive_upper)
    }

    fn next_bernoulli(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }
}

/// Get or generate seed
pub fn resolve_seed(seed: Option<Seed>) -> Seed {
    seed.unwrap_or_else(|| {
        let mut temp_rng = StdRng::from_entropy();
        let mut seed = [0u8; 32];
        temp_rng.fill_bytes(&mut seed);
        seed
    })
}

/// Parse a hex seed (optional `0x` prefix). Short seeds are zero-padded,
/// anything beyond 32 bytes is ignored.
pub fn parse_seed_hex(hex: &str) -> Result<Seed, String> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.is_empty() {
        return Err("empty seed".to_string());
    }

    let mut seed = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        if i >= 32 {
            break;
        }
        let byte_str = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
        seed[i] = u8::from_str_radix(byte_str, 16)
            .map_err(|e| format!("invalid hex byte '{}': {}", byte_str, e))?;
    }

    Ok(seed)
}

/// Format a seed as the hex string accepted by [`parse_seed_hex`]
pub fn seed_to_hex(seed: &Seed) -> String {
    let mut out = String::with_capacity(66);
    out.push_str("0x");
    for byte in seed {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Random source replaying scripted draws, for exact draw-to-outcome fixtures
#[cfg(test)]
pub(crate) struct ScriptedRandom {
    uniform: std::collections::VecDeque<usize>,
    bernoulli: std::collections::VecDeque<bool>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub(crate) fn slots(draws: &[usize]) -> Self {
        Self {
            uniform: draws.iter().copied().collect(),
            bernoulli: Default::default(),
        }
    }

    pub(crate) fn coins(draws: &[bool]) -> Self {
        Self {
            uniform: Default::default(),
            bernoulli: draws.iter().copied().collect(),
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.uniform.len() + self.bernoulli.len()
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn next_uniform(&mut self, exclusive_upper: usize) -> usize {
        let draw = self.uniform.pop_front().expect("uniform script exhausted");
        assert!(draw < exclusive_upper, "scripted slot out of range");
        draw
    }

    fn next_bernoulli(&mut self, _probability: f64) -> bool {
        self.bernoulli.pop_front().expect("bernoulli script exhausted")
    }
}
