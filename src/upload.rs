//! Open a book from a locally selected file.
//!
//! The whole file is read into memory and handed to a brand-new session
//! with `restore: true`. The caller replaces whatever session it held
//! before; nothing here cancels or reuses it.

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;

use crate::engine::BookSource;
use crate::session::location::History;
use crate::session::{Reader, Session};
use crate::settings::SettingsPatch;

/// What the host environment can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    pub file_reading: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self { file_reading: true }
    }
}

pub const UNSUPPORTED_MESSAGE: &str =
    "Reading local files is not supported in this environment. Open the book by path or URL instead.";

pub fn open_upload(
    reader: &mut Reader,
    capabilities: HostCapabilities,
    path: &Path,
    history: Box<dyn History>,
) -> Result<Session> {
    if !capabilities.file_reading {
        bail!(UNSUPPORTED_MESSAGE);
    }
    let data =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    info!("upload: read {} ({} bytes)", name, data.len());

    let overrides = SettingsPatch {
        restore: Some(true),
        ..Default::default()
    };
    reader.open(BookSource::Bytes { name, data }, overrides, history)
}
