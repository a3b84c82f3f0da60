use crate::naming::FileRecord;
use std::io;

/// A catalogued file, one row of the `media` table.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: i64,
    pub path: String,
    /// Hex BLAKE3 digest of the file content.
    pub hash: String,
    pub extension: Option<String>,
    /// RFC 3339, local offset.
    pub creation_time: String,
    pub remark: Option<String>,
    pub record_creation_time: String,
}

/// Values for a row about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMediaRecord {
    pub path: String,
    pub hash: String,
    pub extension: Option<String>,
    pub creation_time: String,
}

impl NewMediaRecord {
    /// Fingerprints the file if that has not happened yet.
    pub fn from_file_record(record: &FileRecord) -> io::Result<Self> {
        let fingerprint = record.fingerprint()?;
        Ok(Self {
            path: record.path.to_string_lossy().into_owned(),
            hash: fingerprint.to_hex(),
            extension: if record.extension.is_empty() {
                None
            } else {
                Some(record.extension.clone())
            },
            creation_time: record.created.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Added(i64),
    /// The same (path, hash) pair was already catalogued.
    AlreadyPresent,
}
