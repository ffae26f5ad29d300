//! Reader settings: patch layers, gap-filling merge, and the resolved value.
//!
//! Every source of settings (caller overrides, URL query, persisted record,
//! built-in defaults) is a `SettingsPatch` with all fields optional. Layers
//! are folded with `fill_gaps`, which only ever fills `None` fields, so the
//! first layer to provide a value wins:
//!
//!   caller > query > persisted > defaults
//!
//! `resolve()` then turns the folded patch into a concrete `Settings`.

mod query;
mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use query::parse_query;
pub use store::SettingsStore;

pub const DEFAULT_FONT_SIZE: &str = "100%";

/// A user note anchored at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub cfi: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Settings — resolved
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styles {
    pub font_size: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub book_path: String,
    pub book_key: String,
    pub restore: bool,
    pub reload: bool,
    pub history: bool,
    pub bookmarks: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub styles: Styles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_location_cfi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub generate_pagination: bool,
    pub sidebar_reflow: bool,
    /// Unrecognized query parameters, stored verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// SettingsPatch — one layer, all fields optional
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StylesPatch {
    pub font_size: Option<String>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub book_path: Option<String>,
    pub book_key: Option<String>,
    pub restore: Option<bool>,
    pub reload: Option<bool>,
    pub history: Option<bool>,
    pub bookmarks: Option<Vec<String>>,
    pub annotations: Option<Vec<Annotation>>,
    pub styles: Option<StylesPatch>,
    pub previous_location_cfi: Option<String>,
    pub language: Option<String>,
    pub generate_pagination: Option<bool>,
    pub sidebar_reflow: Option<bool>,
    pub extra: BTreeMap<String, String>,
}

fn fill<T>(slot: &mut Option<T>, fallback: Option<T>) {
    if slot.is_none() {
        *slot = fallback;
    }
}

fn fill_map(map: &mut BTreeMap<String, String>, fallback: BTreeMap<String, String>) {
    for (k, v) in fallback {
        map.entry(k).or_insert(v);
    }
}

impl StylesPatch {
    pub fn fill_gaps(&mut self, fallback: StylesPatch) {
        fill(&mut self.font_size, fallback.font_size);
        fill_map(&mut self.extra, fallback.extra);
    }
}

impl SettingsPatch {
    /// Fill every field that is still `None` from `fallback`.
    ///
    /// Values already present are never replaced. `styles` and `extra` are
    /// merged entry by entry.
    pub fn fill_gaps(&mut self, fallback: SettingsPatch) {
        fill(&mut self.book_path, fallback.book_path);
        fill(&mut self.book_key, fallback.book_key);
        fill(&mut self.restore, fallback.restore);
        fill(&mut self.reload, fallback.reload);
        fill(&mut self.history, fallback.history);
        fill(&mut self.bookmarks, fallback.bookmarks);
        fill(&mut self.annotations, fallback.annotations);
        fill(&mut self.previous_location_cfi, fallback.previous_location_cfi);
        fill(&mut self.language, fallback.language);
        fill(&mut self.generate_pagination, fallback.generate_pagination);
        fill(&mut self.sidebar_reflow, fallback.sidebar_reflow);
        fill_map(&mut self.extra, fallback.extra);
        if let Some(theirs) = fallback.styles {
            if let Some(mine) = self.styles.as_mut() {
                mine.fill_gaps(theirs);
            } else {
                self.styles = Some(theirs);
            }
        }
    }

    /// Built-in defaults layer.
    pub fn defaults(history: bool, font_size: &str) -> Self {
        SettingsPatch {
            restore: Some(false),
            reload: Some(false),
            history: Some(history),
            bookmarks: Some(Vec::new()),
            annotations: Some(Vec::new()),
            styles: Some(StylesPatch {
                font_size: Some(font_size.to_string()),
                extra: BTreeMap::new(),
            }),
            generate_pagination: Some(false),
            sidebar_reflow: Some(false),
            ..Default::default()
        }
    }

    /// Resolve into concrete settings. Fields with no layer providing them
    /// fall back to the built-in defaults; the key is derived from the path
    /// under `namespace` when absent.
    pub fn resolve(mut self, book_path: &str, namespace: &str) -> Settings {
        self.fill_gaps(SettingsPatch::defaults(true, DEFAULT_FONT_SIZE));
        let styles = self.styles.unwrap_or_default();
        Settings {
            book_key: self
                .book_key
                .unwrap_or_else(|| book_key(namespace, book_path)),
            book_path: self.book_path.unwrap_or_else(|| book_path.to_string()),
            restore: self.restore.unwrap_or(false),
            reload: self.reload.unwrap_or(false),
            history: self.history.unwrap_or(true),
            bookmarks: self.bookmarks.unwrap_or_default(),
            annotations: self.annotations.unwrap_or_default(),
            styles: Styles {
                font_size: styles
                    .font_size
                    .unwrap_or_else(|| DEFAULT_FONT_SIZE.to_string()),
                extra: styles.extra,
            },
            previous_location_cfi: self.previous_location_cfi,
            language: self.language,
            generate_pagination: self.generate_pagination.unwrap_or(false),
            sidebar_reflow: self.sidebar_reflow.unwrap_or(false),
            extra: self.extra,
        }
    }
}

/// Persistence key for a book: `"<namespace>:"` followed by the CRC-32 of
/// the book path as 8 lowercase hex digits.
pub fn book_key(namespace: &str, book_path: &str) -> String {
    format!("{namespace}:{:08x}", crc32fast::hash(book_path.as_bytes()))
}

/// Parse a `"102%"`-style font size into whole percent.
pub fn parse_percent(size: &str) -> Option<u32> {
    size.trim().trim_end_matches('%').trim().parse().ok()
}
