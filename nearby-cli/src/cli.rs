use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, Select};
use nearby_core::{Config, Place, RequestOrchestrator, ServiceId, StateStore, StoreRuntime};

use crate::render;

const DONE: &str = "Done";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nearby", version, about = "Find a place, its weather and what is around it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key of a service.
    Configure {
        /// Service name: "geocoding", "weather" or "places".
        service: String,
    },

    /// Search a place by name, then explore weather and nearby sights.
    Explore {
        /// Place name to search for.
        query: String,

        /// Pick the n-th candidate (1-based) instead of asking.
        #[arg(long)]
        pick: Option<usize>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { service } => configure(&service),
            Command::Explore { query, pick } => explore(&query, pick).await,
        }
    }
}

fn configure(service: &str) -> anyhow::Result<()> {
    let service = ServiceId::try_from(service)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {service}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.upsert_api_key(service, api_key.trim().to_string());
    config.save()?;

    println!(
        "Saved {service} key to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

async fn explore(query: &str, pick: Option<usize>) -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;

    let mut store = StateStore::new();
    store.subscribe(render::printer());
    let (handle, _task) = StoreRuntime::spawn(store);
    let orch = RequestOrchestrator::from_settings(settings, handle)?;

    println!("Places matching \"{query}\":");
    let candidates = orch.search_places(query).await?;
    if candidates.is_empty() {
        println!("No places found.");
        return Ok(());
    }

    let Some(place) = choose_place(&candidates, pick)? else {
        return Ok(());
    };

    println!("\n{place}");
    orch.select_place(&place).await?.join().await;
    explore_pois(&orch).await
}

/// Labels repeat (several "Paris" hits without a city), so the choice is
/// mapped back by position, never by label.
fn choose_place(candidates: &[Place], pick: Option<usize>) -> anyhow::Result<Option<Place>> {
    if let Some(n) = pick {
        return candidates
            .get(n.wrapping_sub(1))
            .cloned()
            .map(Some)
            .ok_or_else(|| anyhow!("--pick must be between 1 and {}", candidates.len()));
    }

    let labels: Vec<String> = candidates.iter().map(Place::label).collect();
    let choice = match Select::new("Choose a place:", labels).raw_prompt() {
        Ok(choice) => choice,
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(candidates.get(choice.index).cloned())
}

async fn explore_pois(orch: &RequestOrchestrator) -> anyhow::Result<()> {
    loop {
        let snapshot = orch.store().snapshot().await?;
        if snapshot.pois.is_empty() {
            println!("Nothing interesting nearby.");
            return Ok(());
        }

        let mut options: Vec<String> = snapshot
            .pois
            .iter()
            .map(|poi| match (poi.detail_attempted(), poi.is_resolved()) {
                (_, true) => format!("{} (read)", poi.name),
                (true, false) => format!("{} (no info)", poi.name),
                (false, false) => poi.name.clone(),
            })
            .collect();
        options.push(DONE.to_string());

        let choice = match Select::new("Show details for:", options).raw_prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let Some(poi) = snapshot.pois.get(choice.index) else {
            return Ok(());
        };

        let request = orch.fetch_detail(poi).await?;
        if request.is_dispatched() {
            request.join().await;
            let refreshed = orch.store().snapshot().await?;
            if refreshed.poi(&poi.xid).is_some_and(|p| !p.is_resolved()) {
                println!("Name: {}\nNo description available.", poi.name);
            }
        } else {
            println!("{poi}");
        }
    }
}
