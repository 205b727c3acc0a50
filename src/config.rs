use crate::catalog::TMDB_BASE;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3146;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ASSISTANT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub data_dir: PathBuf,
    pub port: u16,
    pub assistant: Option<AssistantConfig>,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tmdb_api_key = get("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        let tmdb_base_url = get("TMDB_BASE_URL").unwrap_or_else(|| TMDB_BASE.to_string());
        let data_dir = get("REELMARK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let port = match get("REELMARK_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| anyhow!("REELMARK_PORT '{}' is not a port: {}", raw, e))?,
            None => DEFAULT_PORT,
        };
        let assistant = get("ASSISTANT_API_URL").map(|api_url| AssistantConfig {
            api_url,
            api_key: get("ASSISTANT_API_KEY"),
            model: get("ASSISTANT_MODEL").unwrap_or_else(|| DEFAULT_ASSISTANT_MODEL.to_string()),
        });

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            data_dir,
            port,
            assistant,
        })
    }
}
