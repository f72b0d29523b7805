mod autopilot;

use anyhow::{Context, Result};
use autopilot::Autopilot;
use clap::{Parser, Subcommand};
use stellar_core::{Event, EventEnvelope, GameContent, ShipState, StarId, StarProfile};
use stellar_world::{build_initial_state, load_content, load_stars, StarCatalog};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "stellar_cli", about = "Stellar simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fly a scripted voyage on a simulated clock.
    Run {
        #[arg(long)]
        ticks: u64,
        /// Generation seed. Random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Simulated milliseconds per tick.
        #[arg(long, default_value_t = 1000)]
        tick_interval_ms: u64,
        #[arg(long, default_value_t = 60)]
        print_every: u64,
    },
    /// Print a star's resource allocation as JSON.
    Allocate {
        #[arg(long)]
        star: String,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
    /// Print the proximity graph and hop counts from a star.
    Connections {
        /// Defaults to the catalog's home star.
        #[arg(long)]
        origin: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn run(
    ticks: u64,
    seed: Option<u64>,
    content_dir: &str,
    tick_interval_ms: u64,
    print_every: u64,
) -> Result<()> {
    let content = load_content(content_dir)?;
    let catalog = load_stars(content_dir)?;
    let home = catalog.home_star().context("home star missing from catalog")?;
    let seed = seed.unwrap_or_else(rand::random);

    let mut state = build_initial_state(&content, seed, home, 0);
    state.connectivity.pending_origin = Some(home.id.clone());
    let mut autopilot = Autopilot::default();

    println!(
        "Starting voyage: ticks={ticks} seed={seed} home={} stars={} content_version={}",
        home.id,
        catalog.stars.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    for step in 1..=ticks {
        let now = step * tick_interval_ms;
        for command in autopilot.plan(&state, &content, &catalog.stars) {
            match stellar_core::apply_command(&mut state, &command, &content, now) {
                Ok(events) => print_notable(&events, &content),
                Err(err) => tracing::debug!(?command, %err, "autopilot command rejected"),
            }
        }
        let events = stellar_core::tick(&mut state, &content, now);
        print_notable(&events, &content);

        if print_every > 0 && step % print_every == 0 {
            print_status(&state);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at t={}ms:", state.meta.last_tick_at);
    print_status(&state);
    let report = stellar_core::diagnose(&state, &content);
    println!(
        "Diagnostics: {:?} efficiency={:.1}%",
        report.overall_status, report.efficiency
    );
    for issue in report.critical_issues.iter().chain(&report.recommendations) {
        println!("  - {issue}");
    }
    Ok(())
}

fn print_notable(events: &[EventEnvelope], content: &GameContent) {
    for envelope in events {
        let at = envelope.at;
        match &envelope.event {
            Event::ResearchCompleted { tech_id, unlocks } => {
                let name = content
                    .tech(tech_id)
                    .map_or(tech_id.0.as_str(), |t| t.name.as_str());
                println!("*** RESEARCH COMPLETE: {name} at t={at} unlocks={unlocks:?} ***");
            }
            Event::NavigationCompleted { star_id } => {
                println!("*** ARRIVED: {star_id} at t={at} ***");
            }
            Event::ExtractionCompleted {
                star_id,
                resource,
                stored,
            } => {
                println!("  extracted {stored:.2} {resource} at {star_id} (t={at})");
            }
            Event::UpgradeCompleted { from, to } => {
                println!("*** UPGRADED: {from} -> {to} at t={at} ***");
            }
            Event::EnergyShortage {
                starved_modules,
                unmet_demand,
            } => {
                println!(
                    "!!! ENERGY SHORTAGE at t={at}: {starved_modules:?} unmet={unmet_demand:.2}"
                );
            }
            _ => {}
        }
    }
}

fn print_status(state: &ShipState) {
    let secs = state.meta.last_tick_at / 1000;
    let location = state
        .location
        .current_star_id
        .as_ref()
        .map_or_else(|| "deep space".to_string(), ToString::to_string);
    let travel = state.navigation.as_ref().map_or_else(String::new, |nav| {
        format!("  -> {} {:.0}%", nav.target_star_id, nav.travel_progress)
    });
    let research = state.research.active.as_ref().map_or_else(
        || "idle".to_string(),
        |active| {
            format!(
                "{} {:.0}/{:.0}",
                active.tech_id, active.current_points, active.total_points
            )
        },
    );

    println!(
        "[t={secs:>6}s]  at={location}{travel}  \
         energy={stored:.0}/{storage:.0} ({net:+.1}/s)  \
         cargo={used:.0}/{max:.0}  research={research}  points={points:.1}  \
         completed={completed}",
        stored = state.energy.current_stored,
        storage = state.energy.total_storage,
        net = state.energy.total_generation - state.energy.total_consumption,
        used = state.inventory.current_capacity,
        max = state.inventory.max_capacity,
        points = state.research.points,
        completed = state.research.completed.len(),
    );
}

// ---------------------------------------------------------------------------
// One-shot queries
// ---------------------------------------------------------------------------

fn find_star<'a>(catalog: &'a StarCatalog, id: &str) -> Result<&'a StarProfile> {
    catalog
        .get(&StarId(id.to_string()))
        .with_context(|| format!("star '{id}' is not in the catalog"))
}

fn allocate(star: &str, seed: u64, content_dir: &str) -> Result<()> {
    let content = load_content(content_dir)?;
    let catalog = load_stars(content_dir)?;
    let profile = find_star(&catalog, star)?;
    let allocation = stellar_core::generate(profile, &content, seed);
    let json = serde_json::to_string_pretty(&allocation).context("serializing allocation")?;
    println!("{json}");
    Ok(())
}

fn connections(origin: Option<&str>, content_dir: &str) -> Result<()> {
    let content = load_content(content_dir)?;
    let catalog = load_stars(content_dir)?;
    let origin = match origin {
        Some(id) => find_star(&catalog, id)?.id.clone(),
        None => catalog.home.clone(),
    };
    let graph = stellar_core::compute_connections(&catalog.stars, &origin, &content.constants);

    println!(
        "{} stars, {} connections within {} units",
        catalog.stars.len(),
        graph.edges.len(),
        content.constants.connection_threshold
    );
    for edge in &graph.edges {
        println!("  {} <-> {}  {:.2}", edge.from, edge.to, edge.distance);
    }
    println!("Hops from {origin}:");
    for star in &catalog.stars {
        let hops = stellar_core::hop_count(&origin, &star.id, &graph.edges)
            .map_or_else(|| "unreachable".to_string(), |h| h.to_string());
        println!("  {:<20} {hops}", star.id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            ticks,
            seed,
            content_dir,
            tick_interval_ms,
            print_every,
        } => run(ticks, seed, &content_dir, tick_interval_ms, print_every)?,
        Commands::Allocate {
            star,
            seed,
            content_dir,
        } => allocate(&star, seed, &content_dir)?,
        Commands::Connections {
            origin,
            content_dir,
        } => connections(origin.as_deref(), &content_dir)?,
    }
    Ok(())
}
