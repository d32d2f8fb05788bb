use std::{env, time::Instant};

use anyhow::{Context, Result};
use rand::{SeedableRng, rngs::StdRng};
use single_stock_gym::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a uniformly random policy over a few episodes of a CSV price series.
///
/// Usage: `cargo run --example random_policy -- <prices.csv> [episodes]`
fn main() -> Result<()> {
    init_tracing();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/prices.csv".to_string());
    let episodes = args
        .next()
        .map(|s| s.parse::<usize>())
        .transpose()
        .context("episodes must be a positive integer")?
        .unwrap_or(3);

    let build_start = Instant::now();
    let series = PriceSeries::from_csv(&path)?;
    let cfg = EnvConfig::default()
        .with_episode_len(series.len().saturating_sub(1).min(600))
        .with_seed(42);
    let mut env = Environment::new(&series, cfg)?;
    info!(rows = series.len(), elapsed = ?build_start.elapsed(), "Environment built");

    let mut rng = StdRng::seed_from_u64(7);
    let space = env.action_space();

    for episode in 0..episodes {
        env.reset()?;
        let mut rewards = Vec::new();
        loop {
            let (_, reward, done, info) = env.step(space.sample(&mut rng))?;
            rewards.push(reward);
            if done {
                let total: Reward = rewards.iter().copied().sum();
                println!(
                    "episode {episode}: start {} | reward {:.3} | model {:.4} | HODL {:.4} | SHORT {:.4} | mom {:.4}",
                    env.episode_start(),
                    f64::from(total),
                    info.model_returns,
                    info.hodl_returns,
                    info.short_returns,
                    info.mom_returns,
                );
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
