// Contention Sweep
//
// Sweeps device count against slot count and reports, averaged over several
// seeded runs, how long the channel takes to clear and what each device pays
// in energy. Single-slot rows use probabilistic access.
//
// Usage:
//   cargo run --bin contention_sweep [--runs N] [--no-retransmission]

use std::env;

use log::{info, warn};
use simple_logger::SimpleLogger;

use pe_rust::pe_random::seed_to_hex;
use pe_rust::{ContentionConfig, ContentionSimulator, PromptCostModel, SeededRandom, SimError};

const DEVICE_COUNTS: [usize; 6] = [1, 2, 5, 10, 20, 50];
const SLOT_COUNTS: [usize; 4] = [1, 5, 10, 20];
const SINGLE_SLOT_PROBABILITY: f64 = 0.1;

#[derive(Default)]
struct Cell {
    frames: f64,
    energy_per_device: f64,
    delivery_ratio: f64,
    runs: usize,
    aborted: usize,
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();
    let mut runs = 10usize;
    let mut retransmission = true;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                runs = args
                    .get(i + 1)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--runs needs a positive integer");
                        std::process::exit(1);
                    });
                i += 1;
            }
            "--no-retransmission" => retransmission = false,
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║  SWEEP: Devices x Slots per Frame                      ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Runs per cell: {}", runs);
    println!("Retransmission: {}", retransmission);
    println!("Single-slot transmission probability: {}\n", SINGLE_SLOT_PROBABILITY);

    let cost_model = PromptCostModel::default();

    println!(
        "{:>8} {:>6} {:>10} {:>14} {:>10} {:>8}",
        "devices", "slots", "frames", "energy/dev [J]", "delivery", "aborted"
    );

    for &num_devices in &DEVICE_COUNTS {
        for &slots in &SLOT_COUNTS {
            let config = ContentionConfig {
                num_devices,
                slots_per_frame: slots,
                transmission_probability: SINGLE_SLOT_PROBABILITY,
                retransmission,
                ..Default::default()
            };

            let mut cell = Cell::default();
            for run in 0..runs {
                let mut seed = [0u8; 32];
                seed[0] = run as u8;
                seed[1] = (run >> 8) as u8;
                seed[2] = num_devices as u8;
                seed[3] = slots as u8;

                let outcome = ContentionSimulator::new(&config, SeededRandom::new(seed))
                    .and_then(|mut sim| sim.run(&cost_model));

                let report = match outcome {
                    Ok(report) => report,
                    Err(SimError::NonTermination(partial)) => {
                        warn!("aborted run, seed {}", seed_to_hex(&seed));
                        cell.aborted += 1;
                        *partial
                    }
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(1);
                    }
                };

                cell.frames += report.frames as f64;
                cell.energy_per_device += report.mean_cost();
                cell.delivery_ratio += report.delivery_ratio();
                cell.runs += 1;
            }

            let n = cell.runs.max(1) as f64;
            println!(
                "{:>8} {:>6} {:>10.1} {:>14.6} {:>10.3} {:>8}",
                num_devices,
                slots,
                cell.frames / n,
                cell.energy_per_device / n,
                cell.delivery_ratio / n,
                cell.aborted
            );
        }
    }

    info!("✓ Sweep complete!");
}
