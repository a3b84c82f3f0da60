/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif bars; tests use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_traverse_start(&self, _root: &str) {}
    fn on_traverse_complete(&self, _files: usize, _failures: usize, _duration_secs: f64) {}
    fn on_place_start(&self, _total: usize) {}
    fn on_place_progress(&self, _done: usize, _total: usize) {}
    fn on_place_complete(&self, _placed: usize, _duration_secs: f64) {}
    fn on_catalog_start(&self, _total: usize) {}
    fn on_catalog_progress(&self, _done: usize, _total: usize) {}
    fn on_catalog_complete(&self, _added: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
