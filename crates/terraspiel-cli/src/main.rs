//! Headless Terraspiel runner.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use terraspiel_core::{ElementRegistry, RuleBook, World, WorldConfig, assets};
use terraspiel_terrain::NoiseTerrain;

#[derive(Parser, Debug)]
#[command(
    name = "terraspiel",
    version,
    about = "Run a Terraspiel world without a renderer and report what lives in it"
)]
struct Cli {
    /// Grid width in cells.
    #[arg(long, default_value_t = 160)]
    width: u32,

    /// Grid height in cells.
    #[arg(long, default_value_t = 96)]
    height: u32,

    /// World seed; also feeds the terrain generator.
    #[arg(long, default_value_t = 0xBEEF)]
    seed: u64,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 512)]
    ticks: u64,

    /// Element registry JSON; the built-in pack when omitted.
    #[arg(long)]
    elements: Option<PathBuf>,

    /// Rule registry JSON; the built-in pack when omitted.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Skip terrain generation and start from an empty grid.
    #[arg(long)]
    flat: bool,

    /// Print a stats line every N ticks (0 = only the final table).
    #[arg(long, default_value_t = 128)]
    report_every: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let registry = load_registry(cli.elements.as_deref())?;
    let rules = load_rules(cli.rules.as_deref(), &registry)?;

    let config = WorldConfig {
        width: cli.width,
        height: cli.height,
        rng_seed: Some(cli.seed),
    };
    let mut world =
        World::new(config, registry, rules)?.with_terrain(Box::new(NoiseTerrain::default()));
    if !cli.flat {
        world.randomize(cli.seed);
    }
    info!(
        width = cli.width,
        height = cli.height,
        seed = cli.seed,
        occupied = world.stats().occupied_cells(),
        "world ready"
    );

    let started = Instant::now();
    for _ in 0..cli.ticks {
        let summary = world.tick();
        if cli.report_every > 0 && summary.frame % cli.report_every == 0 {
            println!(
                "tick {:>6}  cells {:>7}  particles {:>5}",
                summary.frame, summary.occupied_cells, summary.particles
            );
        }
    }
    let elapsed = started.elapsed();

    println!(
        "\n{} ticks in {:.2?} ({:.1} ticks/s)\n",
        cli.ticks,
        elapsed,
        cli.ticks as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    print_census(&world);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_registry(path: Option<&std::path::Path>) -> Result<ElementRegistry> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading element pack {}", path.display()))?;
            assets::load_elements(&text)
                .with_context(|| format!("parsing element pack {}", path.display()))
        }
        None => assets::default_elements().context("loading the built-in element pack"),
    }
}

fn load_rules(path: Option<&std::path::Path>, registry: &ElementRegistry) -> Result<RuleBook> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading rule pack {}", path.display()))?;
            let (book, dropped) = assets::load_rules(&text, registry)
                .with_context(|| format!("parsing rule pack {}", path.display()))?;
            if dropped > 0 {
                eprintln!("warning: {dropped} rules named unknown elements and were dropped");
            }
            Ok(book)
        }
        None => assets::default_rules(registry).context("loading the built-in rule pack"),
    }
}

fn print_census(world: &World) {
    println!("{:<14} {:>9} {:>10}", "ELEMENT", "CELLS", "PARTICLES");
    println!("{}", "-".repeat(36));
    for (id, def) in world.registry().iter() {
        let cells = world.stats().cell_count(id);
        let particles = world.stats().particle_count(id);
        if def.name == "EMPTY" || (cells == 0 && particles == 0) {
            continue;
        }
        println!("{:<14} {:>9} {:>10}", def.name, cells, particles);
    }
}
