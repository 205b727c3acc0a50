//! The two persisted collections ("to watch" and "watched").
//!
//! Both lists live in memory behind one lock and are mirrored to their storage slot after every
//! change. An item is never in both lists at once.

use crate::catalog::CatalogApi;
use crate::models::{ListName, Media, MediaKey};
use crate::storage::Storage;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loaded,
}

#[derive(Debug, Default)]
struct Lists {
    load: LoadState,
    to_watch: Vec<Media>,
    watched: Vec<Media>,
}

impl Lists {
    fn get(&self, name: ListName) -> &Vec<Media> {
        match name {
            ListName::ToWatch => &self.to_watch,
            ListName::Watched => &self.watched,
        }
    }

    fn get_mut(&mut self, name: ListName) -> &mut Vec<Media> {
        match name {
            ListName::ToWatch => &mut self.to_watch,
            ListName::Watched => &mut self.watched,
        }
    }
}

pub struct ListStore {
    storage: Arc<dyn Storage>,
    catalog: Arc<dyn CatalogApi>,
    lists: Mutex<Lists>,
}

impl ListStore {
    pub fn new(storage: Arc<dyn Storage>, catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            storage,
            catalog,
            lists: Mutex::new(Lists::default()),
        }
    }

    /// Reads both slots once. Later calls do nothing.
    pub async fn load(&self) {
        let mut lists = self.lists.lock().await;
        self.ensure_loaded(&mut lists);
    }

    pub async fn load_state(&self) -> LoadState {
        self.lists.lock().await.load
    }

    pub async fn is_loaded(&self) -> bool {
        self.load_state().await == LoadState::Loaded
    }

    /// Always false until the store is loaded.
    pub async fn is_in_list(&self, key: &MediaKey, name: ListName) -> bool {
        let lists = self.lists.lock().await;
        if lists.load != LoadState::Loaded {
            return false;
        }
        lists.get(name).iter().any(|m| key.matches(m))
    }

    pub async fn list(&self, name: ListName) -> Vec<Media> {
        self.lists.lock().await.get(name).clone()
    }

    /// Adds a snapshot to `name` and drops the same title from the other list.
    ///
    /// Thin snapshots headed for "watched" are swapped for the catalog's full details first. A
    /// title already on "to watch" is left as is; one already on "watched" is overwritten.
    pub async fn add_to_list(&self, media: Media, name: ListName) {
        let media = if name == ListName::Watched && media.needs_enrichment() {
            self.enrich(media).await
        } else {
            media
        };
        let key = media.key();

        let mut lists = self.lists.lock().await;
        self.ensure_loaded(&mut lists);

        let target = lists.get_mut(name);
        match target.iter().position(|m| key.matches(m)) {
            Some(_) if name == ListName::ToWatch => {
                debug!("'{}' already in {}, skipping", media.title, name);
                return;
            }
            Some(index) => target[index] = media,
            None => target.insert(0, media),
        }
        self.persist(&lists, name);

        let other = name.other();
        let before = lists.get(other).len();
        lists.get_mut(other).retain(|m| !key.matches(m));
        if lists.get(other).len() != before {
            self.persist(&lists, other);
        }
    }

    /// Returns whether anything was removed. Storage is only written when it was.
    pub async fn remove_from_list(&self, key: &MediaKey, name: ListName) -> bool {
        let mut lists = self.lists.lock().await;
        self.ensure_loaded(&mut lists);

        let target = lists.get_mut(name);
        let before = target.len();
        target.retain(|m| !key.matches(m));
        if target.len() == before {
            return false;
        }
        self.persist(&lists, name);
        true
    }

    /// Overwrites both lists and both slots. Titles present in both inputs stay only in
    /// "watched".
    pub async fn replace_all(&self, to_watch: Vec<Media>, watched: Vec<Media>) {
        let mut lists = self.lists.lock().await;
        let to_watch = to_watch
            .into_iter()
            .filter(|t| !watched.iter().any(|w| t.key() == w.key()))
            .collect();
        lists.to_watch = to_watch;
        lists.watched = watched;
        lists.load = LoadState::Loaded;
        self.persist(&lists, ListName::ToWatch);
        self.persist(&lists, ListName::Watched);
        info!(
            "Replaced lists ({} to watch, {} watched)",
            lists.to_watch.len(),
            lists.watched.len()
        );
    }

    /// Full wipe of both lists and their slots.
    pub async fn clear(&self) {
        let mut lists = self.lists.lock().await;
        lists.to_watch.clear();
        lists.watched.clear();
        lists.load = LoadState::Loaded;
        for name in [ListName::ToWatch, ListName::Watched] {
            if let Err(e) = self.storage.remove(name.storage_key()) {
                warn!("Failed to clear {} list: {}", name, e);
            }
        }
    }

    async fn enrich(&self, media: Media) -> Media {
        match self.catalog.media_details(&media.id, media.media_type).await {
            Some(full) => {
                debug!("Enriched '{}' before marking watched", full.title);
                full
            }
            None => {
                warn!(
                    "Could not enrich {} {}, storing snapshot as given",
                    media.media_type, media.id
                );
                media
            }
        }
    }

    fn ensure_loaded(&self, lists: &mut Lists) {
        if lists.load == LoadState::Loaded {
            return;
        }
        lists.to_watch = self.read_slot(ListName::ToWatch);
        lists.watched = self.read_slot(ListName::Watched);
        lists.load = LoadState::Loaded;
        info!(
            "Loaded lists ({} to watch, {} watched)",
            lists.to_watch.len(),
            lists.watched.len()
        );
    }

    fn read_slot(&self, name: ListName) -> Vec<Media> {
        let raw = match self.storage.get(name.storage_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read {} list: {}", name, e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Failed to parse {} list, starting empty: {}", name, e);
            Vec::new()
        })
    }

    fn persist(&self, lists: &Lists, name: ListName) {
        let json = match serde_json::to_string(lists.get(name)) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {} list: {}", name, e);
                return;
            }
        };
        if let Err(e) = self.storage.set(name.storage_key(), &json) {
            warn!("Failed to persist {} list: {}", name, e);
        }
    }
}
