//! Settings persistence keyed by `book_key`.

use std::rc::Rc;

use log::{debug, error, info};

use super::{Settings, SettingsPatch, book_key};
use crate::config::Config;
use crate::storage::Storage;

pub struct SettingsStore {
    settings: Settings,
    storage: Rc<dyn Storage>,
}

impl SettingsStore {
    /// Build the session settings for `book_path`.
    ///
    /// Layers, first value wins: `overrides` (caller), `query`, the persisted
    /// record (only when `restore` ends up true), then built-in defaults.
    /// The book key is fixed before the persisted record is consulted.
    pub fn initialize(
        book_path: &str,
        overrides: SettingsPatch,
        query: SettingsPatch,
        config: &Config,
        storage: Rc<dyn Storage>,
    ) -> Self {
        let mut patch = overrides;
        patch.book_path = Some(book_path.to_string());
        patch.fill_gaps(query);
        let key = patch
            .book_key
            .get_or_insert_with(|| book_key(&config.namespace, book_path))
            .clone();
        debug!("settings: book_key={key} for {book_path}");

        if patch.restore.unwrap_or(false) {
            match load_record(storage.as_ref(), &key) {
                Some(saved) => {
                    info!("settings: restoring saved settings for {key}");
                    patch.fill_gaps(saved);
                }
                None => debug!("settings: nothing saved under {key}"),
            }
        }

        let default_size = format!("{}%", config.font.default_size);
        patch.fill_gaps(SettingsPatch::defaults(config.history, &default_size));
        let settings = patch.resolve(book_path, &config.namespace);
        Self { settings, storage }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn book_key(&self) -> &str {
        &self.settings.book_key
    }

    /// Whether a record exists under the current key. Backend failures read
    /// as `false`.
    pub fn is_persisted(&self) -> bool {
        match self.storage.get(&self.settings.book_key) {
            Ok(record) => record.is_some(),
            Err(e) => {
                debug!("settings: storage unavailable: {e:#}");
                false
            }
        }
    }

    /// Record `current_location` (when known) as the previous location and
    /// write the full settings under the book key. Returns whether the
    /// record was written.
    pub fn persist(&mut self, current_location: Option<String>) -> bool {
        if let Some(cfi) = current_location {
            self.settings.previous_location_cfi = Some(cfi);
        }
        let text = match serde_json::to_string(&self.settings) {
            Ok(t) => t,
            Err(e) => {
                error!("settings: failed to serialize: {e}");
                return false;
            }
        };
        match self.storage.set(&self.settings.book_key, &text) {
            Ok(()) => {
                debug!(
                    "settings: persisted {} bytes under {}",
                    text.len(),
                    self.settings.book_key
                );
                true
            }
            Err(e) => {
                debug!("settings: persist skipped: {e:#}");
                false
            }
        }
    }

    /// Remove the record under the book key. Returns whether one existed.
    pub fn clear_persisted(&mut self) -> bool {
        match self.storage.remove(&self.settings.book_key) {
            Ok(existed) => existed,
            Err(e) => {
                debug!("settings: clear skipped: {e:#}");
                false
            }
        }
    }
}

/// Read and parse the record under `key`. Absence, backend failure and
/// malformed JSON all yield `None`.
fn load_record(storage: &dyn Storage, key: &str) -> Option<SettingsPatch> {
    let text = match storage.get(key) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            debug!("settings: storage unavailable: {e:#}");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(patch) => Some(patch),
        Err(e) => {
            error!("settings: discarding malformed record under {key}: {e}");
            None
        }
    }
}
