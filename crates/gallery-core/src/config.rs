use crate::naming::TimestampSource;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_MEDIA: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".heic", ".heif", ".tif", ".tiff", ".raw",
    ".dng", ".cr2", ".cr3", ".nef", ".arw", ".orf", ".rw2", ".mp4", ".mov", ".m4v", ".avi",
    ".mkv", ".3gp", ".mts", ".m2ts", ".wmv", ".mpg", ".mpeg",
];

const DEFAULT_USELESS: &[&str] = &[
    ".aae", ".xmp", ".thm", ".ini", ".db", ".tmp", ".lnk", ".url", ".ctg", ".lrv",
];

const DEFAULT_DEFERRED: &[&str] = &[".zip", ".rar", ".7z", ".tar", ".gz", ".iso", ".dmg"];

const DEFAULT_SKIP_DIRS: &[&str] = &[
    "lost+found",
    ".Trashes",
    ".Spotlight-V100",
    ".fseventsd",
    "$RECYCLE.BIN",
    "System Volume Information",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Extension lists backing the classifier. Entries may be written with or
/// without the leading dot and in any case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub media: Vec<String>,
    pub useless: Vec<String>,
    pub deferred: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            media: to_strings(DEFAULT_MEDIA),
            useless: to_strings(DEFAULT_USELESS),
            deferred: to_strings(DEFAULT_DEFERRED),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory names never entered during traversal.
    pub skip_dir_names: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub timestamp_source: TimestampSource,
    /// Placement worker count; 0 lets rayon decide.
    pub workers: usize,
    pub progress_interval: usize,
    pub catalog_path: String,
    pub classification: ClassificationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            skip_dir_names: to_strings(DEFAULT_SKIP_DIRS),
            ignore_patterns: Vec::new(),
            timestamp_source: TimestampSource::default(),
            workers: 0,
            progress_interval: 100,
            catalog_path: "gallery.db".to_string(),
            classification: ClassificationConfig::default(),
        }
    }
}

/// Load `Config.toml` from the working directory (optional), then apply
/// `GALLERY_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("GALLERY").try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(path))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
