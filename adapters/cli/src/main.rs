#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Reef Clash campaign headlessly.

mod autopilot;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reef_clash_system_shop::Sampling;
use reef_clash_world::GameState;
use tracing_subscriber::EnvFilter;

use crate::settings::{load_catalog, Settings, DEFAULT_SEED};

/// Runs an autopiloted Reef Clash campaign against the drafting opponent.
#[derive(Debug, Parser)]
#[command(name = "reef-clash", version)]
struct Args {
    /// TOML file with a seed and `[world]` campaign parameters.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// TOML file with a replacement piece catalog.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    /// Seed for the campaign's random source.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of rounds before the campaign resets.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    rounds: Option<u32>,
    /// Draw shop offers weighted by rarity instead of uniformly.
    #[arg(long)]
    weighted: bool,
    /// Print the campaign summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Reef Clash command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(rounds) = args.rounds {
        settings.world.campaign_rounds = rounds;
    }
    if args.weighted {
        settings.world.sampling = Sampling::Weighted;
    }
    let seed = args.seed.or(settings.seed).unwrap_or(DEFAULT_SEED);
    let catalog = load_catalog(args.catalog.as_deref())?;
    tracing::info!(seed, templates = catalog.len(), config = ?settings.world, "starting campaign");

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let state = GameState::new(settings.world, catalog, &mut rng);
    let (_, summary) = autopilot::play_campaign(state, &mut rng);
    if summary.rejected > 0 {
        tracing::warn!(rejected = summary.rejected, "autopilot issued rejected commands");
    }

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("failed to encode summary")?;
        println!("{json}");
    } else {
        for record in &summary.rounds {
            println!(
                "round {:>2}: {:?} after {} battle rounds, {} bought, gold {} vs {}",
                record.round,
                record.outcome,
                record.battle_rounds,
                record.purchases,
                record.player_gold,
                record.opponent_gold,
            );
        }
        println!(
            "campaign finished: player {} wins, opponent {} wins",
            summary.player_wins, summary.opponent_wins
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_parse() {
        let args = Args::try_parse_from(["reef-clash", "--seed", "9", "--rounds", "3", "--weighted"])
            .expect("valid arguments");
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.rounds, Some(3));
        assert!(args.weighted);
        assert!(!args.json);
    }

    #[test]
    fn zero_rounds_are_refused() {
        assert!(Args::try_parse_from(["reef-clash", "--rounds", "0"]).is_err());
    }
}
