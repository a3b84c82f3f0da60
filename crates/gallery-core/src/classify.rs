use crate::config::ClassificationConfig;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// What to do with a file, decided from its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Organize into the destination tree.
    Media,
    /// Expected noise (sidecars, thumbnails); skipped silently.
    Useless,
    /// Needs manual handling, e.g. archives.
    Deferred,
    /// Not in any table.
    Unknown,
}

impl Disposition {
    /// Deferred and Unknown files are listed for the operator.
    pub fn is_reported(self) -> bool {
        matches!(self, Disposition::Deferred | Disposition::Unknown)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Disposition::Media => "media",
            Disposition::Useless => "useless",
            Disposition::Deferred => "deferred",
            Disposition::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Lower-case and ensure a leading dot; the empty extension stays empty.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    table: HashMap<String, Disposition>,
}

impl Classifier {
    /// Build the lookup table. An extension listed more than once resolves
    /// as Media over Deferred over Useless, so overlap never hides a file.
    pub fn from_config(config: &ClassificationConfig) -> Self {
        let mut table: HashMap<String, Disposition> = HashMap::new();

        let layers = [
            (&config.useless, Disposition::Useless),
            (&config.deferred, Disposition::Deferred),
            (&config.media, Disposition::Media),
        ];
        for (extensions, disposition) in layers {
            for ext in extensions {
                let key = normalize_extension(ext);
                if let Some(previous) = table.insert(key.clone(), disposition) {
                    if previous != disposition {
                        warn!(
                            "Extension '{}' listed as both {} and {}; using {}",
                            key, previous, disposition, disposition
                        );
                    }
                }
            }
        }

        Self { table }
    }

    pub fn classify(&self, extension: &str) -> Disposition {
        self.table
            .get(&normalize_extension(extension))
            .copied()
            .unwrap_or(Disposition::Unknown)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassificationConfig::default())
    }
}
