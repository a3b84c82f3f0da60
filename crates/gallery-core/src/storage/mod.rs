pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{AppendOutcome, MediaRecord, NewMediaRecord};
pub use sqlite::Database;

use crate::error::Error;
use crate::hasher::Fingerprint;

/// The narrow interface the engine needs from a file catalog.
pub trait Catalog {
    /// Insert unless the same path and content are already recorded.
    fn append(&self, record: &NewMediaRecord) -> Result<AppendOutcome, Error>;
    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<MediaRecord>, Error>;
    fn find_by_id(&self, id: i64) -> Result<Option<MediaRecord>, Error>;
    fn count(&self) -> Result<i64, Error>;
}

impl Catalog for Database {
    fn append(&self, record: &NewMediaRecord) -> Result<AppendOutcome, Error> {
        Ok(self.insert_media(record)?)
    }

    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<MediaRecord>, Error> {
        Ok(self.find_media_by_hash(&fingerprint.to_hex())?)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<MediaRecord>, Error> {
        Ok(self.find_media_by_id(id)?)
    }

    fn count(&self) -> Result<i64, Error> {
        Ok(self.count_media()?)
    }
}
