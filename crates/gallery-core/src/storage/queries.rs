use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, params_from_iter, Row};
use tracing::warn;

const MEDIA_COLUMNS: &str =
    "id, path, hash, extension, creation_time, remark, record_creation_time";

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        hash: row.get(2)?,
        extension: row.get(3)?,
        creation_time: row.get(4)?,
        remark: row.get(5)?,
        record_creation_time: row.get(6)?,
    })
}

fn optional<T>(result: rusqlite::Result<T>) -> rusqlite::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Database {
    /// Insert a media row. A row with the same path and hash is left alone
    /// and reported as `AlreadyPresent`.
    pub fn insert_media(&self, record: &NewMediaRecord) -> rusqlite::Result<AppendOutcome> {
        let now = chrono::Local::now().to_rfc3339();
        let inserted = self.connection().execute(
            "INSERT OR IGNORE INTO media \
             (path, hash, extension, creation_time, record_creation_time) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.path,
                record.hash,
                record.extension,
                record.creation_time,
                now
            ],
        )?;

        if inserted == 0 {
            warn!("Already catalogued: {} ({})", record.path, record.hash);
            return Ok(AppendOutcome::AlreadyPresent);
        }
        Ok(AppendOutcome::Added(self.connection().last_insert_rowid()))
    }

    pub fn find_media_by_id(&self, id: i64) -> rusqlite::Result<Option<MediaRecord>> {
        optional(self.connection().query_row(
            &format!("SELECT {} FROM media WHERE id = ?1", MEDIA_COLUMNS),
            params![id],
            media_from_row,
        ))
    }

    pub fn find_media_by_ids(&self, ids: &[i64]) -> rusqlite::Result<Vec<MediaRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM media WHERE id IN ({}) ORDER BY id",
            MEDIA_COLUMNS, placeholders
        ))?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), media_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Oldest row holding this content.
    pub fn find_media_by_hash(&self, hash: &str) -> rusqlite::Result<Option<MediaRecord>> {
        optional(self.connection().query_row(
            &format!(
                "SELECT {} FROM media WHERE hash = ?1 ORDER BY id LIMIT 1",
                MEDIA_COLUMNS
            ),
            params![hash],
            media_from_row,
        ))
    }

    pub fn find_last_media(&self) -> rusqlite::Result<Option<MediaRecord>> {
        optional(self.connection().query_row(
            &format!("SELECT {} FROM media ORDER BY id DESC LIMIT 1", MEDIA_COLUMNS),
            [],
            media_from_row,
        ))
    }

    pub fn count_media(&self) -> rusqlite::Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))
    }

    /// Returns false when no row has this id.
    pub fn update_media_remark(&self, id: i64, remark: Option<&str>) -> rusqlite::Result<bool> {
        let updated = self.connection().execute(
            "UPDATE media SET remark = ?1 WHERE id = ?2",
            params![remark, id],
        )?;
        Ok(updated > 0)
    }

    pub fn delete_media(&self, id: i64) -> rusqlite::Result<bool> {
        let deleted = self
            .connection()
            .execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
