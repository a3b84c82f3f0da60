use crate::classify::{Classifier, Disposition};
use crate::config::AppConfig;
use crate::error::Error;
use crate::naming::{DestinationPath, FileRecord};
use crate::placement::{PlaceOutcome, Placer};
use crate::progress::ProgressReporter;
use crate::scanner::{self, TraverseOptions};
use crate::storage::{AppendOutcome, Catalog, NewMediaRecord};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Traverse,
    Inspect,
    Place,
    Catalog,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Traverse => "traverse",
            FailureStage::Inspect => "inspect",
            FailureStage::Place => "place",
            FailureStage::Catalog => "catalog",
        };
        f.write_str(name)
    }
}

/// A single path that could not be processed. Never aborts the run.
#[derive(Debug, Clone)]
pub struct FailedItem {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

impl FailedItem {
    fn new(path: &Path, stage: FailureStage, message: impl ToString) -> Self {
        Self {
            path: path.to_path_buf(),
            stage,
            message: message.to_string(),
        }
    }
}

/// Outcome of a rearrange run. `copied` includes the `renamed` files that
/// needed a numeric suffix.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub copied: usize,
    pub renamed: usize,
    pub skipped_identical: usize,
    pub useless: usize,
    pub deferred: usize,
    pub unknown: usize,
    pub failed: usize,
    /// Media files left untouched because the run was cancelled.
    pub not_scheduled: usize,
    pub cancelled: bool,
    pub deferred_paths: Vec<PathBuf>,
    pub unknown_paths: Vec<PathBuf>,
    pub failures: Vec<FailedItem>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogSummary {
    pub total: usize,
    pub added: usize,
    pub already_present: usize,
    pub failed: usize,
    pub not_scheduled: usize,
    pub cancelled: bool,
    pub failures: Vec<FailedItem>,
    pub duration: Duration,
}

/// Copies the media of a source tree into a `YYYY-MM/timestamp` layout.
pub struct Rearranger {
    config: AppConfig,
    classifier: Classifier,
    cancel_token: Arc<AtomicBool>,
}

impl Rearranger {
    pub fn new(config: AppConfig) -> Self {
        Self {
            classifier: Classifier::from_config(&config.classification),
            config,
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the token stops new files from being scheduled; placements
    /// already running finish normally.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    /// Run the full rearrange pipeline:
    /// 1. Validate directories (fatal on failure)
    /// 2. Traverse the source tree once
    /// 3. Classify, then place media grouped by destination name
    pub fn run(
        &self,
        source: &Path,
        destination: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary, Error> {
        let start = Instant::now();
        let (source, destination) = prepare_directories(source, destination)?;
        info!(
            "Rearranging {} into {}",
            source.display(),
            destination.display()
        );

        let mut options = TraverseOptions::from_config(&self.config);
        if destination.starts_with(&source) {
            options = options.with_exclude(destination.clone());
        }

        // Phase 1: Traverse
        reporter.on_traverse_start(&source.to_string_lossy());
        let traverse_start = Instant::now();
        let traversal = scanner::traverse(&source, &options);
        reporter.on_traverse_complete(
            traversal.files.len(),
            traversal.failures.len(),
            traverse_start.elapsed().as_secs_f64(),
        );

        let mut summary = RunSummary {
            total: traversal.files.len(),
            ..RunSummary::default()
        };
        summary.failures.extend(
            traversal
                .failures
                .iter()
                .map(|f| FailedItem::new(&f.path, FailureStage::Traverse, &f.message)),
        );

        // Phase 2: Classify
        let mut groups: Vec<Vec<FileRecord>> = Vec::new();
        let mut group_index: HashMap<DestinationPath, usize> = HashMap::new();
        let mut media_count = 0usize;

        for path in &traversal.files {
            let extension = crate::naming::extension_of(path);
            match self.classifier.classify(&extension) {
                Disposition::Useless => {
                    debug!("Skipping {}", path.display());
                    summary.useless += 1;
                }
                Disposition::Deferred => {
                    warn!("Deferred, needs manual handling: {}", path.display());
                    summary.deferred_paths.push(path.clone());
                }
                Disposition::Unknown => {
                    warn!("Unknown extension '{}': {}", extension, path.display());
                    summary.unknown_paths.push(path.clone());
                }
                Disposition::Media => {
                    match FileRecord::from_path(path, self.config.timestamp_source) {
                        Ok(record) => {
                            let key = record.destination(&destination);
                            let next = groups.len();
                            let slot = *group_index.entry(key).or_insert(next);
                            if slot == next {
                                groups.push(Vec::new());
                            }
                            groups[slot].push(record);
                            media_count += 1;
                        }
                        Err(e) => {
                            error!("Error inspecting {}: {}", path.display(), e);
                            summary
                                .failures
                                .push(FailedItem::new(path, FailureStage::Inspect, e));
                        }
                    }
                }
            }
        }
        summary.deferred = summary.deferred_paths.len();
        summary.unknown = summary.unknown_paths.len();
        debug!(
            "{} media files in {} destination groups",
            media_count,
            groups.len()
        );

        // Phase 3: Place. Groups run in parallel; files sharing a
        // destination name are placed in traversal order.
        info!("Placing {} media files...", media_count);
        reporter.on_place_start(media_count);
        let place_start = Instant::now();

        let placer = Placer::new();
        let done = AtomicUsize::new(0);
        let copied = AtomicUsize::new(0);
        let renamed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let not_scheduled = AtomicUsize::new(0);
        let failures: Mutex<Vec<FailedItem>> = Mutex::new(Vec::new());
        let interval = self.config.progress_interval;

        let place_group = |group: &Vec<FileRecord>| {
            for record in group {
                if self.cancel_token.load(Ordering::Relaxed) {
                    not_scheduled.fetch_add(1, Ordering::Relaxed);
                    continue;
                }

                let target = record.destination(&destination);
                match placer.place_at(&record.path, &target) {
                    Ok(placement) => match placement.outcome {
                        PlaceOutcome::Copied => {
                            copied.fetch_add(1, Ordering::Relaxed);
                        }
                        PlaceOutcome::CopiedWithSuffix(_) => {
                            copied.fetch_add(1, Ordering::Relaxed);
                            renamed.fetch_add(1, Ordering::Relaxed);
                        }
                        PlaceOutcome::SkippedIdentical => {
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    Err(e) => {
                        error!("Error placing {}: {}", record.path.display(), e);
                        failures
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .push(FailedItem::new(&record.path, FailureStage::Place, e));
                    }
                }

                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if interval > 0 && n % interval == 0 {
                    reporter.on_place_progress(n, media_count);
                    info!("Processed {}/{} media files", n, media_count);
                }
            }
        };
        run_in_pool(self.config.workers, || groups.par_iter().for_each(place_group))?;

        let placed = done.load(Ordering::Relaxed);
        reporter.on_place_progress(placed, media_count);
        reporter.on_place_complete(placed, place_start.elapsed().as_secs_f64());

        summary.copied = copied.into_inner();
        summary.renamed = renamed.into_inner();
        summary.skipped_identical = skipped.into_inner();
        summary.not_scheduled = not_scheduled.into_inner();
        summary.cancelled = self.cancel_token.load(Ordering::Relaxed);
        summary
            .failures
            .extend(failures.into_inner().unwrap_or_else(|p| p.into_inner()));
        summary.failed = summary.failures.len();

        summary.deferred_paths.sort();
        summary.unknown_paths.sort();
        summary.failures.sort_by(|a, b| a.path.cmp(&b.path));
        summary.duration = start.elapsed();

        info!(
            "Rearrange finished in {:.2}s: {} copied ({} renamed), {} identical, {} failed",
            summary.duration.as_secs_f64(),
            summary.copied,
            summary.renamed,
            summary.skipped_identical,
            summary.failed,
        );
        Ok(summary)
    }
}

/// Records every file of a source tree, with its fingerprint, in a catalog.
pub struct Cataloger {
    config: AppConfig,
    cancel_token: Arc<AtomicBool>,
}

impl Cataloger {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    /// Fingerprints in parallel, then appends sequentially on the calling
    /// thread, which owns the catalog handle.
    pub fn run(
        &self,
        source: &Path,
        catalog: &dyn Catalog,
        reporter: &dyn ProgressReporter,
    ) -> Result<CatalogSummary, Error> {
        let start = Instant::now();
        let source = validate_source(source)?;
        info!("Cataloguing {}", source.display());

        reporter.on_traverse_start(&source.to_string_lossy());
        let traverse_start = Instant::now();
        let traversal = scanner::traverse(&source, &TraverseOptions::from_config(&self.config));
        reporter.on_traverse_complete(
            traversal.files.len(),
            traversal.failures.len(),
            traverse_start.elapsed().as_secs_f64(),
        );

        let mut summary = CatalogSummary {
            total: traversal.files.len(),
            ..CatalogSummary::default()
        };
        summary.failures.extend(
            traversal
                .failures
                .iter()
                .map(|f| FailedItem::new(&f.path, FailureStage::Traverse, &f.message)),
        );

        let total = traversal.files.len();
        reporter.on_catalog_start(total);
        let done = AtomicUsize::new(0);
        let interval = self.config.progress_interval;
        let timestamp_source = self.config.timestamp_source;

        let prepared: Vec<Option<Result<NewMediaRecord, FailedItem>>> =
            run_in_pool(self.config.workers, || {
                traversal
                    .files
                    .par_iter()
                    .map(|path| {
                        if self.cancel_token.load(Ordering::Relaxed) {
                            return None;
                        }
                        let prepared = FileRecord::from_path(path, timestamp_source)
                            .and_then(|record| NewMediaRecord::from_file_record(&record))
                            .map_err(|e| {
                                error!("Error fingerprinting {}: {}", path.display(), e);
                                FailedItem::new(path, FailureStage::Inspect, e)
                            });

                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if interval > 0 && n % interval == 0 {
                            reporter.on_catalog_progress(n, total);
                            info!("Fingerprinted {}/{} files", n, total);
                        }
                        Some(prepared)
                    })
                    .collect()
            })?;
        reporter.on_catalog_progress(done.load(Ordering::Relaxed), total);

        for (path, item) in traversal.files.iter().zip(prepared) {
            match item {
                None => summary.not_scheduled += 1,
                Some(Err(failed)) => summary.failures.push(failed),
                Some(Ok(record)) => match catalog.append(&record) {
                    Ok(AppendOutcome::Added(id)) => {
                        debug!("Catalogued {} as #{}", record.path, id);
                        summary.added += 1;
                    }
                    Ok(AppendOutcome::AlreadyPresent) => summary.already_present += 1,
                    Err(e) => {
                        error!("Error cataloguing {}: {}", path.display(), e);
                        summary
                            .failures
                            .push(FailedItem::new(path, FailureStage::Catalog, e));
                    }
                },
            }
        }
        reporter.on_catalog_complete(summary.added, start.elapsed().as_secs_f64());

        summary.cancelled = self.cancel_token.load(Ordering::Relaxed);
        summary.failed = summary.failures.len();
        summary.failures.sort_by(|a, b| a.path.cmp(&b.path));
        summary.duration = start.elapsed();

        info!(
            "Catalog finished in {:.2}s: {} added, {} already present, {} failed",
            summary.duration.as_secs_f64(),
            summary.added,
            summary.already_present,
            summary.failed,
        );
        Ok(summary)
    }
}

fn validate_source(source: &Path) -> Result<PathBuf, Error> {
    let canonical = fs::canonicalize(source).map_err(|e| Error::InvalidDirectory {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !canonical.is_dir() {
        return Err(Error::InvalidDirectory {
            path: source.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

fn prepare_directories(source: &Path, destination: &Path) -> Result<(PathBuf, PathBuf), Error> {
    let source = validate_source(source)?;

    let invalid_destination = |reason: String| Error::InvalidDirectory {
        path: destination.to_path_buf(),
        reason,
    };
    fs::create_dir_all(destination).map_err(|e| invalid_destination(e.to_string()))?;
    let destination =
        fs::canonicalize(destination).map_err(|e| invalid_destination(e.to_string()))?;
    if !destination.is_dir() {
        return Err(invalid_destination("not a directory".to_string()));
    }
    if destination == source {
        return Err(invalid_destination(
            "destination is the source directory".to_string(),
        ));
    }

    Ok((source, destination))
}

/// Run `f` on a dedicated pool of `workers` threads, or on rayon's global
/// pool when `workers` is 0.
fn run_in_pool<R, F>(workers: usize, f: F) -> Result<R, Error>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if workers == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;
    Ok(pool.install(f))
}
