use std::path::PathBuf;

use log::{debug, info};
use serde::Deserialize;

const APP_DIR: &str = "epub-reader";

// ---------------------------------------------------------------------------
// ConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub namespace: Option<String>,
    pub viewport: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub history: Option<bool>,
    #[serde(default)]
    pub font: FontConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct FontConfigFile {
    pub step: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub default_size: Option<u32>,
}

// ---------------------------------------------------------------------------
// Config — resolved (all fields concrete)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix of every persistence key (`"<namespace>:<hash>"`).
    pub namespace: String,
    /// Name of the viewport renditions are bound to.
    pub viewport: String,
    /// Directory for persisted records. `None` when no data dir can be found.
    pub storage_dir: Option<PathBuf>,
    /// Default for the `history` setting.
    pub history: bool,
    pub font: FontConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontConfig {
    /// Percentage points per modifier+`=` / modifier+`-`.
    pub step: u32,
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// Size restored by modifier+`0`, in percent.
    pub default_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default().resolve()
    }
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, namespace: Option<String>, storage_dir: Option<PathBuf>) {
        if let Some(ref v) = namespace {
            debug!("config: CLI override namespace={v}");
            self.namespace = namespace;
        }
        if let Some(ref v) = storage_dir {
            debug!("config: CLI override storage_dir={}", v.display());
            self.storage_dir = storage_dir;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields.
    pub fn resolve(self) -> Config {
        let config = Config {
            namespace: self.namespace.unwrap_or_else(|| "epubjs-reader".into()),
            viewport: self.viewport.unwrap_or_else(|| "viewer".into()),
            storage_dir: self.storage_dir.or_else(default_storage_dir),
            history: self.history.unwrap_or(true),
            font: FontConfig {
                step: self.font.step.unwrap_or(2),
                min: self.font.min,
                max: self.font.max,
                default_size: self.font.default_size.unwrap_or(100),
            },
        };
        info!(
            "config: resolved namespace={}, viewport={}, storage_dir={:?}, history={}, \
             font_step={}, font_min={:?}, font_max={:?}, font_default={}",
            config.namespace,
            config.viewport,
            config.storage_dir,
            config.history,
            config.font.step,
            config.font.min,
            config.font.max,
            config.font.default_size,
        );
        config
    }
}

fn home_relative(xdg_var: &str, fallback: &[&str]) -> Option<PathBuf> {
    std::env::var_os(xdg_var).map(PathBuf::from).or_else(|| {
        std::env::var_os("HOME").map(|h| fallback.iter().fold(PathBuf::from(h), |p, c| p.join(c)))
    })
}

/// Resolve the XDG config path.
fn config_path() -> Option<PathBuf> {
    Some(home_relative("XDG_CONFIG_HOME", &[".config"])?.join(APP_DIR).join("config.toml"))
}

/// Resolve the XDG data directory where persisted settings live.
fn default_storage_dir() -> Option<PathBuf> {
    Some(home_relative("XDG_DATA_HOME", &[".local", "share"])?.join(APP_DIR))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        let resolved = cfg.resolve();
        assert_eq!(resolved.namespace, "epubjs-reader");
        assert_eq!(resolved.viewport, "viewer");
        assert!(resolved.history);
        assert_eq!(resolved.font.step, 2);
        assert_eq!(resolved.font.default_size, 100);
        assert_eq!(resolved.font.min, None);
        assert_eq!(resolved.font.max, None);
    }

    #[test]
    fn partial_toml() {
        let text = r#"
            history = false
            [font]
            step = 10
            max = 300
        "#;
        let cfg: ConfigFile = toml::from_str(text).unwrap();
        let resolved = cfg.resolve();
        assert!(!resolved.history);
        assert_eq!(resolved.font.step, 10);
        assert_eq!(resolved.font.max, Some(300));
        // Defaults for unspecified fields
        assert_eq!(resolved.font.min, None);
        assert_eq!(resolved.namespace, "epubjs-reader");
    }

    #[test]
    fn invalid_toml() {
        let text = "this is not valid toml [[[";
        let result = toml::from_str::<ConfigFile>(text);
        assert!(result.is_err());
    }

    #[test]
    fn cli_overrides() {
        let mut cfg: ConfigFile =
            toml::from_str("namespace = \"from-file\"\nstorage_dir = \"/a\"").unwrap();
        cfg.merge_cli(Some("from-cli".into()), None);
        let resolved = cfg.resolve();
        assert_eq!(resolved.namespace, "from-cli"); // CLI wins
        assert_eq!(resolved.storage_dir, Some(PathBuf::from("/a"))); // file (no CLI value)
        assert_eq!(resolved.viewport, "viewer"); // default
    }
}
