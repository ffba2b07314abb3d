// Energy Sweep - break-even analysis of prompts versus raw images
//
// Evaluates the closed-form energy model over the deployment parameters of
// interest, prints the break-even point of each sweep and writes one CSV
// table per sweep.
//
// Usage:
//   cargo run --bin energy_sweep [--out results/]

use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{error, info};
use simple_logger::SimpleLogger;

use pe_rust::pe_energy::{
    break_even, BEHAVIOUR_INFERENCE, HIFIC_COMPRESSION, SMALL_COMPRESSION,
};
use pe_rust::{EnergyParams, FrameSize, Savings};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();
    let out_dir = match args.get(1).map(String::as_str) {
        None => PathBuf::from("results"),
        Some("--out") => match args.get(2) {
            Some(dir) => PathBuf::from(dir),
            None => {
                eprintln!("Usage: {} [--out DIR]", args[0]);
                std::process::exit(1);
            }
        },
        Some(_) => {
            eprintln!("Usage: {} [--out DIR]", args[0]);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&out_dir) {
        error!("energy sweep failed: {}", e);
        std::process::exit(1);
    }

    info!("✓ Tables written to {}", out_dir.display());
}

fn run(out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    // Compression study: HiFiC model, 0.3 bit/pixel prompts, square images
    let hific = EnergyParams {
        prompt_bits_per_pixel: 0.3,
        ..Default::default()
    };
    // IoT study: small compression model, 0.072 bit/pixel prompts, VGA frames
    let iot = EnergyParams::default();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║        Prompt vs Image Energy Break-Even               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let image_size: Vec<(f64, Savings)> = (1..1024u32)
        .map(|side| {
            (
                side as f64,
                hific.prompt_savings(FrameSize::square(side), &HIFIC_COMPRESSION),
            )
        })
        .collect();
    report("Image size [pixels per dimension]", &image_size);
    write_table(&out_dir.join("image_size.csv"), "pixels_per_dimension", &image_size)?;

    let selective: Vec<(f64, Savings)> = (1..20_000u32)
        .map(|i| {
            let p_filtered = i as f64 / 20_000.0;
            (
                100.0 * (1.0 - p_filtered),
                hific.selective_savings(
                    FrameSize::square(256),
                    &BEHAVIOUR_INFERENCE,
                    &HIFIC_COMPRESSION,
                    p_filtered,
                ),
            )
        })
        .collect();
    report("Prompts transmitted [%]", &selective);
    write_table(&out_dir.join("selective.csv"), "percent_transmitted", &selective)?;

    let erasure: Vec<(f64, Savings)> = (1..8_000u32)
        .filter_map(|i| {
            let p_fail = i as f64 / 10_000.0;
            hific
                .erasure_savings(FrameSize::square(256), &HIFIC_COMPRESSION, p_fail)
                .map(|s| (p_fail, s))
        })
        .collect();
    report("Erasure probability", &erasure);
    write_table(&out_dir.join("erasure.csv"), "erasure_probability", &erasure)?;

    let rate: Vec<(f64, Savings)> = (100..3_000u32)
        .map(|kbps| {
            let bps = kbps as f64 * 1e3;
            (bps, iot.rate_savings(FrameSize::VGA, &SMALL_COMPRESSION, bps))
        })
        .collect();
    report("Data rate [bit/s]", &rate);
    write_table(&out_dir.join("data_rate.csv"), "data_rate_bps", &rate)?;

    // Transmit power [mW] x data rate [bit/s] grid, link cost given per bit
    let path = out_dir.join("power_rate.csv");
    let mut writer = BufWriter::new(File::create(&path)?);
    writeln!(writer, "transmit_power_mw,data_rate_bps,saving_j")?;
    let mut profitable = 0usize;
    let mut cells = 0usize;
    for rate_step in 500..3_000u32 {
        let bps = rate_step as f64 * 100.0;
        for power_mw in 100..500u32 {
            let joules_per_bit = (power_mw as f64 * 1e-3) / bps;
            let savings = hific.power_threshold_savings(
                FrameSize::square(256),
                &HIFIC_COMPRESSION,
                joules_per_bit,
            );
            writeln!(writer, "{},{},{}", power_mw, bps, savings.absolute)?;
            cells += 1;
            if savings.absolute > 0.0 {
                profitable += 1;
            }
        }
    }
    writer.flush()?;
    println!(
        "Power x rate grid: prompts save energy in {}/{} cells ({:.1}%)\n",
        profitable,
        cells,
        100.0 * profitable as f64 / cells as f64
    );

    Ok(())
}

fn report(label: &str, points: &[(f64, Savings)]) {
    match break_even(points) {
        Some((x, s)) => println!(
            "{:<38} break-even at {:>10.4}  (saving {:+.6} J, relative cost {:.1}%)",
            label,
            x,
            s.absolute,
            100.0 * s.relative_cost
        ),
        None => println!("{:<38} no samples", label),
    }
}

fn write_table(path: &Path, x_label: &str, points: &[(f64, Savings)]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{},saving_j,relative_cost", x_label)?;
    for (x, s) in points {
        writeln!(writer, "{},{},{}", x, s.absolute, s.relative_cost)?;
    }
    writer.flush()
}
