use anyhow::Context;
use carriage_common::{CreatureEntry, EntityHandle, Pose};
use carriage_data::{StaticTemplates, TemplateStore, demo_templates};
use carriage_kernel::{World, WorldEvent};
use carriage_vehicle::{
    PendingDestination, SharedVehicleMap, VehicleConfig, VehicleInspector, VehicleMap,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const TANK: CreatureEntry = CreatureEntry(28000);
const CATAPULT: CreatureEntry = CreatureEntry(28100);
const FOOTMAN: CreatureEntry = CreatureEntry(30000);

#[derive(Parser)]
#[command(name = "carriage-cli", about = "CLI tool for vehicle seat operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Load a template file and report dangling references
    Validate {
        /// JSON template file
        templates: PathBuf,
    },
    /// Board, drive, relocate and eject on the built-in demo vehicles
    Scenario {
        /// JSON template file; defaults to the built-in set
        #[arg(short, long)]
        templates: Option<PathBuf>,
        /// YAML vehicle config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// RNG seed for dismount landings
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("carriage-cli v{}", env!("CARGO_PKG_VERSION"));
            let templates = demo_templates();
            println!(
                "demo templates: creatures={} vehicles={} seats={}",
                templates.creature_count(),
                templates.vehicle_count(),
                templates.seat_count()
            );
            let config = VehicleConfig::default();
            println!(
                "defaults: charge_speed={} gravity={} exempt={:?}",
                config.base_charge_speed, config.gravity, config.protection_exempt
            );
        }
        Commands::Validate { templates } => {
            let store = StaticTemplates::load(&templates)
                .with_context(|| format!("loading {}", templates.display()))?;
            let dangling = store.dangling_references();
            println!(
                "{}: creatures={} vehicles={} seats={}",
                templates.display(),
                store.creature_count(),
                store.vehicle_count(),
                store.seat_count()
            );
            if !dangling.is_empty() {
                for d in &dangling {
                    println!("  dangling: {d}");
                }
                anyhow::bail!("{} dangling reference(s)", dangling.len());
            }
            println!("OK");
        }
        Commands::Scenario {
            templates,
            config,
            seed,
        } => {
            let store = match templates {
                Some(path) => StaticTemplates::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => demo_templates(),
            };
            let config = match config {
                Some(path) => VehicleConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => VehicleConfig::default(),
            };
            run_scenario(store, config, seed)?;
        }
    }

    Ok(())
}

fn run_scenario(store: StaticTemplates, config: VehicleConfig, seed: u64) -> anyhow::Result<()> {
    for entry in [TANK, CATAPULT, FOOTMAN] {
        anyhow::ensure!(
            store.creature(entry).is_some(),
            "template set lacks creature {entry}"
        );
    }
    let shared = SharedVehicleMap::new(VehicleMap::new(
        World::with_seed(seed),
        Arc::new(store),
        config,
    ));

    let (tank, catapult, driver, footman, stowaway) = {
        let mut map = shared.write();
        let tank = map.spawn_creature(TANK, Pose::from_xyz(0.0, 0.0, 0.0, 0.0))?;
        let catapult = map.spawn_creature(CATAPULT, Pose::from_xyz(20.0, 0.0, 0.0, 0.0))?;
        let driver = map.spawn_player(Pose::from_xyz(1.0, 0.0, 1.0, 0.0));
        let footman = map.spawn_creature(FOOTMAN, Pose::from_xyz(-1.0, 0.0, 0.0, 0.0))?;
        let stowaway = map.spawn_player(Pose::from_xyz(2.0, 0.0, -1.0, 0.0));
        (tank, catapult, driver, footman, stowaway)
    };

    let seat = shared.add_passenger(tank, driver, None)?;
    info!(%driver, seat, "driver boarded");
    let seat = shared.add_passenger(tank, footman, None)?;
    info!(%footman, seat, "gunner boarded");
    match shared.add_passenger(tank, stowaway, None) {
        Ok(seat) => info!(%stowaway, seat, "stowaway boarded"),
        Err(e) => println!("stowaway turned away: {e}"),
    }
    print_summary(&shared, tank);

    shared
        .write()
        .relocate(tank, Pose::from_xyz(10.0, 0.0, 5.0, std::f32::consts::FRAC_PI_2));
    if let Some(u) = shared.read().world().unit(driver) {
        println!(
            "after relocation driver at ({:.2}, {:.2}, {:.2})",
            u.pose.position.x, u.pose.position.y, u.pose.position.z
        );
    }

    shared.exit_vehicle(driver, true);
    shared.exit_vehicle(footman, true);
    print_summary(&shared, tank);

    shared.write().set_destination(
        catapult,
        PendingDestination::new(Pose::from_xyz(20.0, 0.0, 60.0, 0.0), 0.0, 0.7),
    );
    shared.add_passenger(catapult, stowaway, None)?;
    let mut fired = 0;
    for _ in 0..30 {
        fired += shared.update(100);
    }
    println!("forced ejects fired: {fired}");

    let map = shared.read();
    for event in map.world().events() {
        if let WorldEvent::Motion { id, command } = event {
            println!("motion {id}: {command:?}");
        }
    }
    println!(
        "world: seed={} tick={} now={}ms entities={}",
        map.world().seed(),
        map.world().tick(),
        map.world().now_ms(),
        map.world().entity_count()
    );
    Ok(())
}

fn print_summary(shared: &SharedVehicleMap, vehicle: EntityHandle) {
    if let Some(summary) = VehicleInspector::summary(&shared.read(), vehicle) {
        println!("{summary}");
    }
}
