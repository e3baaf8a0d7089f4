use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const BOROUGHS: [&str; 6] = ["BRONX", "BROOKLYN", "MANHATTAN", "QUEENS", "STATEN ISLAND", ""];
const VEHICLES: [&str; 7] = [
    "Sedan",
    "Station Wagon/Sport Utility Vehicle",
    "Taxi",
    "Bike",
    "Box Truck",
    "Bus",
    "",
];

/// Writes a synthetic motor vehicle collisions CSV
#[derive(Parser, Debug)]
struct Args {
    /// Number of collision records
    #[arg(short, long, default_value_t = 1_000_000)]
    rows: usize,

    #[arg(short, long, default_value = "data/collisions.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "CRASH DATE,CRASH TIME,BOROUGH,NUMBER OF PERSONS INJURED,NUMBER OF PERSONS KILLED,\
         NUMBER OF PEDESTRIANS INJURED,NUMBER OF CYCLIST INJURED,NUMBER OF MOTORIST INJURED,\
         VEHICLE TYPE CODE 1,VEHICLE TYPE CODE 2"
    )?;

    let mut rng = rand::rng();
    for _ in 0..args.rows {
        let (year, month, day) = (
            rng.random_range(2012..=2020),
            rng.random_range(1..=12),
            rng.random_range(1..=28),
        );
        let (hour, minute) = (rng.random_range(0..24), rng.random_range(0..60));
        let borough = BOROUGHS[rng.random_range(0..BOROUGHS.len())];

        let pedestrians: u32 = rng.random_range(0..=1);
        let cyclists: u32 = rng.random_range(0..=1);
        let motorists: u32 = rng.random_range(0..=3);
        let injured = pedestrians + cyclists + motorists;
        let killed = u32::from(rng.random_bool(0.002));

        let vehicle_1 = VEHICLES[rng.random_range(0..VEHICLES.len())];
        let vehicle_2 = VEHICLES[rng.random_range(0..VEHICLES.len())];

        writeln!(
            writer,
            "{month:02}/{day:02}/{year},{hour}:{minute:02},{borough},{injured},{killed},\
             {pedestrians},{cyclists},{motorists},{vehicle_1},{vehicle_2}"
        )?;
    }
    writer.flush()?;

    println!("Sample CSV generated: {}", args.output.display());
    Ok(())
}
