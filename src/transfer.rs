//! Moving a profile between installs: both lists plus username and avatar, as Base64 JSON.

use crate::models::{ListName, Media};
use crate::storage::Storage;
use crate::store::ListStore;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const USERNAME_KEY: &str = "username";
pub const AVATAR_KEY: &str = "userAvatar";

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("export data is not valid Base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("export data is not a valid envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export data is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub to_watch: Vec<Media>,
    #[serde(default)]
    pub watched: Vec<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub to_watch: usize,
    pub watched: usize,
}

pub fn encode(envelope: &ExportEnvelope) -> Result<String, TransferError> {
    let json = serde_json::to_vec(envelope)?;
    Ok(STANDARD.encode(json))
}

pub fn decode(data: &str) -> Result<ExportEnvelope, TransferError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(TransferError::Empty);
    }
    let bytes = STANDARD.decode(data)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn read_profile(storage: &dyn Storage, key: &str) -> Option<String> {
    storage.get(key).unwrap_or_else(|e| {
        warn!("Failed to read profile key '{}': {}", key, e);
        None
    })
}

pub async fn export(store: &ListStore, storage: &dyn Storage) -> Result<String, TransferError> {
    store.load().await;
    let envelope = ExportEnvelope {
        username: read_profile(storage, USERNAME_KEY),
        avatar: read_profile(storage, AVATAR_KEY),
        to_watch: store.list(ListName::ToWatch).await,
        watched: store.list(ListName::Watched).await,
        exported_at: Some(Utc::now().to_rfc3339()),
    };
    encode(&envelope)
}

/// Nothing is written unless `data` decodes completely.
pub async fn import(
    store: &ListStore,
    storage: &dyn Storage,
    data: &str,
) -> Result<ImportSummary, TransferError> {
    let envelope = decode(data)?;
    for (key, value) in [(USERNAME_KEY, &envelope.username), (AVATAR_KEY, &envelope.avatar)] {
        if let Some(value) = value {
            if let Err(e) = storage.set(key, value) {
                warn!("Failed to write profile key '{}': {}", key, e);
            }
        }
    }

    let summary = ImportSummary {
        to_watch: envelope.to_watch.len(),
        watched: envelope.watched.len(),
    };
    store.replace_all(envelope.to_watch, envelope.watched).await;
    info!(
        "Imported profile ({} to watch, {} watched)",
        summary.to_watch, summary.watched
    );
    Ok(summary)
}
