use crate::hasher::{self, Fingerprint};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const FOLDER_FORMAT: &str = "%Y-%m";
const BASE_NAME_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Which filesystem timestamp stands in for the capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    #[default]
    Modified,
    /// Platform birth time, falling back to modification time.
    Created,
}

/// Destination subdirectory for a capture instant, e.g. `2023-07`.
pub fn folder_name<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format(FOLDER_FORMAT).to_string()
}

/// Destination file stem, e.g. `20230714_102233_123456`.
pub fn base_name<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format(BASE_NAME_FORMAT).to_string()
}

/// `base.ext` for index 0, `base_N.ext` after N collisions.
pub fn candidate_file_name(base_name: &str, index: u64, extension: &str) -> String {
    if index == 0 {
        format!("{}{}", base_name, extension)
    } else {
        format!("{}_{}{}", base_name, index, extension)
    }
}

/// Lower-cased extension with its leading dot, or empty.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn creation_time(metadata: &Metadata, source: TimestampSource) -> io::Result<DateTime<Local>> {
    let time = match source {
        TimestampSource::Modified => metadata.modified()?,
        TimestampSource::Created => match metadata.created() {
            Ok(time) => time,
            Err(e) => {
                debug!("Birth time unavailable ({}), using modification time", e);
                metadata.modified()?
            }
        },
    };
    Ok(DateTime::<Local>::from(time))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationPath {
    pub folder: PathBuf,
    pub base_name: String,
    pub extension: String,
}

impl DestinationPath {
    pub fn candidate(&self, index: u64) -> PathBuf {
        self.folder
            .join(candidate_file_name(&self.base_name, index, &self.extension))
    }
}

/// A file seen during traversal. The fingerprint is computed on first use
/// and cached for the life of the record.
#[derive(Debug)]
pub struct FileRecord {
    pub path: PathBuf,
    pub extension: String,
    pub created: DateTime<Local>,
    fingerprint: OnceLock<Fingerprint>,
}

impl FileRecord {
    pub fn from_path(path: &Path, source: TimestampSource) -> io::Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| {
            io::Error::new(e.kind(), format!("Error getting metadata for {}: {}", path.display(), e))
        })?;
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        Ok(Self {
            extension: extension_of(&absolute),
            created: creation_time(&metadata, source)?,
            path: absolute,
            fingerprint: OnceLock::new(),
        })
    }

    pub fn fingerprint(&self) -> io::Result<Fingerprint> {
        if let Some(fp) = self.fingerprint.get() {
            return Ok(*fp);
        }
        let fp = hasher::fingerprint(&self.path)?;
        Ok(*self.fingerprint.get_or_init(|| fp))
    }

    pub fn destination(&self, root: &Path) -> DestinationPath {
        DestinationPath {
            folder: root.join(folder_name(&self.created)),
            base_name: base_name(&self.created),
            extension: self.extension.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn sample_time() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2023, 7, 4)
            .unwrap()
            .and_hms_micro_opt(9, 5, 3, 42)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_folder_and_base_name_formats() {
        let time = sample_time();
        assert_eq!(folder_name(&time), "2023-07");
        assert_eq!(base_name(&time), "20230704_090503_000042");
    }

    #[test]
    fn test_sub_second_instants_get_distinct_names() {
        let a = sample_time();
        let b = a + chrono::Duration::microseconds(1);
        assert_eq!(folder_name(&a), folder_name(&b));
        assert_ne!(base_name(&a), base_name(&b));
    }

    #[test]
    fn test_candidate_file_name_suffixes() {
        assert_eq!(candidate_file_name("20230704_090503_000042", 0, ".jpg"), "20230704_090503_000042.jpg");
        assert_eq!(candidate_file_name("20230704_090503_000042", 1, ".jpg"), "20230704_090503_000042_1.jpg");
        assert_eq!(candidate_file_name("stem", 12, ""), "stem_12");
    }

    #[test]
    fn test_extension_of_lowercases_with_dot() {
        assert_eq!(extension_of(Path::new("/a/IMG_0001.JPG")), ".jpg");
        assert_eq!(extension_of(Path::new("/a/archive.tar.GZ")), ".gz");
        assert_eq!(extension_of(Path::new("/a/README")), "");
        assert_eq!(extension_of(Path::new("/a/.hidden")), "");
    }

    #[test]
    fn test_file_record_uses_modification_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Photo.JPEG");
        fs::write(&path, b"pixels").unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::new(1_600_000_000, 123_456_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let record = FileRecord::from_path(&path, TimestampSource::Modified).unwrap();
        assert_eq!(record.extension, ".jpeg");
        assert_eq!(record.created, DateTime::<Local>::from(mtime));

        let dest = record.destination(Path::new("/out"));
        let local = DateTime::<Local>::from(mtime);
        assert_eq!(dest.folder, Path::new("/out").join(folder_name(&local)));
        assert!(dest.base_name.ends_with("_123456"));
        assert_eq!(
            dest.candidate(2),
            dest.folder.join(format!("{}_2.jpeg", dest.base_name))
        );
    }

    #[test]
    fn test_created_source_never_fails_on_regular_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        fs::write(&path, b"frames").unwrap();
        assert!(FileRecord::from_path(&path, TimestampSource::Created).is_ok());
    }

    #[test]
    fn test_fingerprint_is_cached() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"first").unwrap();
        let record = FileRecord::from_path(&path, TimestampSource::Modified).unwrap();
        let first = record.fingerprint().unwrap();

        fs::write(&path, b"second").unwrap();
        assert_eq!(record.fingerprint().unwrap(), first);
    }
}
