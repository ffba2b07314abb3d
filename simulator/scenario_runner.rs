// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/dense_slotted.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/dense_slotted.yaml --seed 0x1234...
//   cargo run --bin scenario_runner scenarios/dense_slotted.yaml --csv events.csv

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use simple_logger::SimpleLogger;

use pe_rust::pe_event_sinks::{ConsoleEventSink, CsvEventSink, MultiEventSink};
use pe_rust::pe_random::parse_seed_hex;
use pe_rust::{Scenario, Seed, SimError};

struct Args {
    path: PathBuf,
    seed: Option<Seed>,
    csv: Option<PathBuf>,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX] [--csv EVENTS.csv]", program);
    eprintln!("\nExamples:");
    eprintln!("  {} scenarios/dense_slotted.yaml", program);
    eprintln!("  {} scenarios/", program);
    eprintln!("  {} scenarios/dense_slotted.yaml --seed 0x123456...", program);
    std::process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("scenario_runner");

    if args.len() < 2 {
        usage(program);
    }

    let mut parsed = Args {
        path: PathBuf::from(&args[1]),
        seed: None,
        csv: None,
    };

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match (flag.as_str(), rest.next()) {
            ("--seed", Some(hex)) => match parse_seed_hex(hex) {
                Ok(seed) => parsed.seed = Some(seed),
                Err(e) => {
                    eprintln!("Invalid hex seed: {}", e);
                    std::process::exit(1);
                }
            },
            ("--csv", Some(path)) => parsed.csv = Some(PathBuf::from(path)),
            _ => usage(program),
        }
    }

    parsed
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .unwrap();

    let args = parse_args();

    let ok = if args.path.is_file() {
        run_scenario_file(&args.path, args.seed, args.csv.as_deref())
    } else if args.path.is_dir() {
        run_scenario_directory(&args.path, args.seed)
    } else {
        eprintln!("Error: Path does not exist: {}", args.path.display());
        false
    };

    if !ok {
        std::process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<Seed>) -> bool {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        return false;
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                 ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    let mut all_ok = true;
    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        all_ok &= run_scenario_file(scenario_path, seed, None);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    all_ok
}

fn run_scenario_file(path: &Path, seed: Option<Seed>, csv: Option<&Path>) -> bool {
    println!("Loading scenario from: {}", path.display());

    let scenario = match Scenario::load(path) {
        Ok(s) => s,
        Err(e) => {
            error!("{}: {}", path.display(), e);
            return false;
        }
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenario");

    // Print scenario header
    println!("\n╔════════════════════════════════════════════════════════╗");
    let name = scenario.name_or(stem);
    println!("║  {}{}║", name, " ".repeat(54_usize.saturating_sub(name.len())));
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let config = &scenario.contention;
    println!("Configuration:");
    println!("  Devices: {}", config.num_devices);
    println!("  Slots per frame: {}", config.slots_per_frame);
    if config.slots_per_frame == 1 {
        println!("  Transmission probability: {}", config.transmission_probability);
    }
    println!("  Retransmission: {}", config.retransmission);
    println!("  Target deliveries: {}", config.target_deliveries);
    println!("  Device overrides: {}", config.overrides.len());
    println!("  Frame guard: {}", config.max_frames);
    println!("\nStarting simulation...\n");

    let mut sink = MultiEventSink::new();
    sink.add_sink(Box::new(ConsoleEventSink::new(log::log_enabled!(log::Level::Trace))));
    if let Some(csv_path) = csv {
        match CsvEventSink::new(csv_path) {
            Ok(csv_sink) => sink.add_sink(Box::new(csv_sink)),
            Err(e) => {
                error!("cannot create {}: {}", csv_path.display(), e);
                return false;
            }
        }
    }

    match scenario.run(seed, sink) {
        Ok(report) => {
            report.print_summary();
            info!("✓ Scenario complete!");
            true
        }
        Err(SimError::NonTermination(partial)) => {
            partial.print_summary();
            error!(
                "scenario aborted after {} frames with {} devices unfinished",
                partial.frames,
                partial.unfinished()
            );
            false
        }
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}
