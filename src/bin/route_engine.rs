// Loads an inventory file, runs one rebuild and prints the ranked itineraries as JSON.
//
// usage: route_engine <inventory.json> <SOURCE> <DESTINATION> [config.json]

use std::sync::Arc;

use anyhow::{bail, Context};
use flight_route_engine::{
    EngineConfig, JsonFileInventory, RebuildCoordinator, RebuildReason, RouteEngine,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_route_engine=info,route_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: route_engine <inventory.json> <SOURCE> <DESTINATION> [config.json]");
    }

    let config = match args.get(3) {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => EngineConfig::default(),
    };

    let engine = Arc::new(RouteEngine::new(config).context("invalid engine configuration")?);
    let inventory = Arc::new(JsonFileInventory::new(&args[0]));
    let coordinator = RebuildCoordinator::new(engine.clone(), inventory);

    let summary = coordinator
        .rebuild_now(RebuildReason::Startup)
        .await
        .context("initial rebuild failed")?;
    tracing::info!(
        locations = summary.location_count,
        flights = summary.flight_count,
        "inventory loaded"
    );

    let routes = engine
        .search_routes(&args[1], &args[2], None)
        .context("route search failed")?;
    println!("{}", serde_json::to_string_pretty(&*routes)?);

    Ok(())
}
