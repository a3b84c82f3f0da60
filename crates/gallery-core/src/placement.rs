use crate::error::Error;
use crate::hasher::{self, Fingerprint};
use crate::naming::DestinationPath;
use dashmap::DashMap;
use std::fs::{self, File, FileTimes};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// Name prefix of in-flight copies inside a destination folder.
pub const STAGING_PREFIX: &str = ".gallery-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Copied,
    /// Identical content already sits at the target; nothing written.
    SkippedIdentical,
    /// Copied under `base_N` after N distinct-content collisions.
    CopiedWithSuffix(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub outcome: PlaceOutcome,
    pub destination: PathBuf,
}

/// Copies files into computed destinations without ever overwriting
/// distinct content or duplicating identical content.
///
/// Each candidate path is guarded by its own lock while it is in use, so
/// concurrent callers aiming at the same name resolve the slot one at a
/// time. Bytes are staged in a hidden temp file next to the target and only
/// linked under the final name once complete, so a name in the destination
/// always holds a whole file, even across processes or after a crash.
#[derive(Debug, Default)]
pub struct Placer {
    slot_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

enum Slot {
    Placed(Placement),
    /// Held by different content or by something that is not a regular file.
    Taken,
    /// The occupant disappeared before it could be compared.
    Vacated,
}

impl Placer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place_at(&self, source: &Path, destination: &DestinationPath) -> Result<Placement, Error> {
        self.place(
            source,
            &destination.folder,
            &destination.base_name,
            &destination.extension,
        )
    }

    pub fn place(
        &self,
        source: &Path,
        folder: &Path,
        base_name: &str,
        extension: &str,
    ) -> Result<Placement, Error> {
        fs::create_dir_all(folder).map_err(|e| {
            io::Error::new(e.kind(), format!("Error creating {}: {}", folder.display(), e))
        })?;

        let target = DestinationPath {
            folder: folder.to_path_buf(),
            base_name: base_name.to_string(),
            extension: extension.to_string(),
        };
        let mut source_fp: Option<Fingerprint> = None;
        let mut index: u64 = 0;

        loop {
            let candidate = target.candidate(index);
            let slot = self.with_slot(&candidate, || {
                try_slot(source, &candidate, index, &mut source_fp)
            })?;

            match slot {
                Slot::Placed(placement) => return Ok(placement),
                Slot::Vacated => continue,
                Slot::Taken => {
                    trace!("Collision at {}, trying next index", candidate.display());
                    index = index
                        .checked_add(1)
                        .ok_or_else(|| Error::CollisionOverflow(candidate.clone()))?;
                }
            }
        }
    }

    /// Run `f` while holding the lock for `candidate`. The map entry is
    /// dropped again once no other caller holds it.
    fn with_slot<T>(&self, candidate: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self
            .slot_locks
            .entry(candidate.to_path_buf())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        drop(lock);
        self.slot_locks
            .remove_if(candidate, |_, lock| Arc::strong_count(lock) == 1);
        result
    }
}

fn try_slot(
    source: &Path,
    candidate: &Path,
    index: u64,
    source_fp: &mut Option<Fingerprint>,
) -> Result<Slot, Error> {
    if copy_into_free_slot(source, candidate)? {
        let outcome = if index == 0 {
            PlaceOutcome::Copied
        } else {
            PlaceOutcome::CopiedWithSuffix(index)
        };
        debug!("{} -> {} ({:?})", source.display(), candidate.display(), outcome);
        return Ok(Slot::Placed(Placement {
            outcome,
            destination: candidate.to_path_buf(),
        }));
    }

    match fs::symlink_metadata(candidate) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            debug!("{} is not a regular file", candidate.display());
            return Ok(Slot::Taken);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Slot::Vacated),
        Err(e) => return Err(e.into()),
    }

    let src = match *source_fp {
        Some(fp) => fp,
        None => *source_fp.insert(hasher::fingerprint(source)?),
    };
    let existing = match hasher::fingerprint(candidate) {
        Ok(fp) => fp,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Slot::Vacated),
        Err(e) => return Err(e.into()),
    };

    if src == existing {
        debug!(
            "{} already present at {}",
            source.display(),
            candidate.display()
        );
        return Ok(Slot::Placed(Placement {
            outcome: PlaceOutcome::SkippedIdentical,
            destination: candidate.to_path_buf(),
        }));
    }
    Ok(Slot::Taken)
}

/// Returns `Ok(false)` when the slot is already occupied.
fn copy_into_free_slot(source: &Path, candidate: &Path) -> io::Result<bool> {
    if fs::symlink_metadata(candidate).is_ok() {
        return Ok(false);
    }

    let mut reader = File::open(source).map_err(|e| {
        io::Error::new(e.kind(), format!("Error opening {}: {}", source.display(), e))
    })?;
    let staged = stage_copy(&mut reader, candidate).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!(
                "Error copying {} to {}: {}",
                source.display(),
                candidate.display(),
                e
            ),
        )
    })?;
    drop(reader);
    claim_slot(staged, candidate)
}

/// Copy `reader` into a hidden temp file in the candidate's folder, carrying
/// over its times and permissions. The temp file is removed if dropped.
fn stage_copy(reader: &mut File, candidate: &Path) -> io::Result<NamedTempFile> {
    let folder = candidate.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".part")
        .tempfile_in(folder)?;

    io::copy(reader, staged.as_file_mut())?;
    let metadata = reader.metadata()?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    let file = staged.as_file();
    file.set_times(times)?;
    file.set_permissions(metadata.permissions())?;
    file.sync_all()?;
    Ok(staged)
}

/// Link a finished temp file under `candidate` unless something got there
/// first. On `Ok(false)` the temp file is discarded.
fn claim_slot(staged: NamedTempFile, candidate: &Path) -> io::Result<bool> {
    match staged.persist_noclobber(candidate) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(io::Error::new(
            e.error.kind(),
            format!("Error creating {}: {}", candidate.display(), e.error),
        )),
    }
}
