//! Query the catalog and print the normalized result as JSON.
//! Usage:
//!   cargo run --bin catalog_probe -- details <movie|tv> <id>
//!   cargo run --bin catalog_probe -- cast <movie|tv> <id>
//!   cargo run --bin catalog_probe -- director <movie|tv> <id>
//!   cargo run --bin catalog_probe -- seasons <tv_id>
//!   cargo run --bin catalog_probe -- search <query...>
//!   cargo run --bin catalog_probe -- people <query...>
//!   cargo run --bin catalog_probe -- trending
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use reelmark::catalog::{CatalogApi, TmdbClient};
use reelmark::config::Config;
use reelmark::models::MediaType;
use serde_json::Value;
use std::env;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn title_args(args: &[String]) -> Result<(MediaType, String)> {
    let kind: MediaType = args
        .first()
        .context("missing media type")?
        .parse()?;
    let id = args.get(1).context("missing id")?.clone();
    Ok((kind, id))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("usage: catalog_probe <details|cast|director|seasons|search|people|trending> ..."))?;

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;

    let output: Value = match command.as_str() {
        "details" => {
            let (kind, id) = title_args(rest)?;
            serde_json::to_value(client.media_details(&id, kind).await)?
        }
        "cast" => {
            let (kind, id) = title_args(rest)?;
            serde_json::to_value(client.top_cast(&id, kind).await)?
        }
        "director" => {
            let (kind, id) = title_args(rest)?;
            serde_json::to_value(client.director(&id, kind).await)?
        }
        "seasons" => {
            let id = rest.first().context("missing tv id")?;
            serde_json::to_value(client.series_seasons(id).await)?
        }
        "search" => serde_json::to_value(client.search(&rest.join(" "), 1).await)?,
        "people" => serde_json::to_value(client.search_people(&rest.join(" "), 1).await)?,
        "trending" => serde_json::to_value(client.trending(1).await)?,
        other => return Err(anyhow!("unknown command '{}'", other)),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
