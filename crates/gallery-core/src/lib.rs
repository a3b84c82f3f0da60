pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod naming;
pub mod placement;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use classify::{Classifier, Disposition};
pub use config::AppConfig;
pub use engine::{CatalogSummary, Cataloger, FailedItem, FailureStage, Rearranger, RunSummary};
pub use error::Error;
pub use hasher::Fingerprint;
pub use naming::{FileRecord, TimestampSource};
pub use placement::{PlaceOutcome, Placement, Placer};
pub use progress::{ProgressReporter, SilentReporter};
