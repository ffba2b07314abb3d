//! Multi-device contention simulation with the default deployment
//!
//! Ten cameras, each holding ten images of which five prompts must be
//! delivered, share a ten-slot frame with retransmission enabled.
//!
//! Run with: cargo run --bin contention_sim

use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simple_logger::SimpleLogger;

use pe_rust::pe_random::{resolve_seed, seed_to_hex};
use pe_rust::{ContentionConfig, ContentionSimulator, DeviceOverride, PromptCostModel, SeededRandom};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║        Shared-Channel Contention Simulator             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let seed = resolve_seed(None);

    let mut config = ContentionConfig {
        num_devices: 10,
        slots_per_frame: 10,
        transmission_probability: 0.1, // only used with one slot per frame
        retransmission: true,
        target_deliveries: 5,
        images_available: 10,
        ..Default::default()
    };

    // Per-image importance scores are carried along for selection policies.
    // Drawn from a separate stream so they never shift the contention draws.
    let mut profile_rng = StdRng::from_seed(seed);
    for id in 0..config.num_devices {
        let scores = (0..config.images_available)
            .map(|_| profile_rng.gen_range(0..100))
            .collect();
        config.overrides.insert(
            id,
            DeviceOverride {
                importance_scores: Some(scores),
                ..Default::default()
            },
        );
    }

    info!("Configuration:");
    info!("  Devices: {}", config.num_devices);
    info!("  Slots per frame: {}", config.slots_per_frame);
    info!("  Retransmission: {}", config.retransmission);
    info!("  Prompts per device: {}", config.target_deliveries);
    info!("  Seed: {}", seed_to_hex(&seed));

    let cost_model = PromptCostModel::default();
    let result = ContentionSimulator::new(&config, SeededRandom::new(seed))
        .and_then(|mut sim| sim.run(&cost_model));

    match result {
        Ok(report) => {
            report.with_seed(&seed).print_summary();
            info!("✓ Simulation complete!");
        }
        Err(e) => {
            error!("{}", e);
            if let Some(partial) = e.partial_report() {
                partial.print_summary();
            }
            std::process::exit(1);
        }
    }
}
