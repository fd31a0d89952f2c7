//! Song metadata files: one song row and one artist row per file.

use std::path::Path;

use tracing::{debug, warn};

use super::error::LoadError;
use super::records::SongRecord;
use super::report::{FileOutcome, Stage};
use crate::db::DatabaseBackend;

/// Parse the song record held in `content`. The first JSON value wins;
/// anything after it is ignored.
pub fn parse_song_record(path: &Path, content: &str) -> Result<SongRecord, LoadError> {
    serde_json::Deserializer::from_str(content)
        .into_iter::<SongRecord>()
        .next()
        .ok_or_else(|| LoadError::Empty { path: path.to_path_buf() })?
        .map_err(|source| LoadError::Json { path: path.to_path_buf(), source })
}

/// Load one song file.
///
/// A failed artist insert does not undo the song insert: each insert is
/// reported on its own and both share the caller's per-file transaction.
pub fn load_song_file<D: DatabaseBackend + ?Sized>(
    db: &mut D,
    path: &Path,
) -> Result<FileOutcome, LoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Read { path: path.to_path_buf(), source })?;
    let record = parse_song_record(path, &content)?;

    let mut outcome = FileOutcome::new(path);
    outcome.records = 1;

    let song = record.song_row();
    match db.insert_song(&song) {
        Ok(()) => outcome.rows_written += 1,
        Err(e) => {
            warn!("Cannot insert song data {:?}: {:#}", song, e);
            outcome.fail(Stage::Song, None, format!("{:#}", e));
        }
    }

    let artist = record.artist_row();
    match db.insert_artist(&artist) {
        Ok(()) => outcome.rows_written += 1,
        Err(e) => {
            warn!("Cannot insert artist data {:?}: {:#}", artist, e);
            outcome.fail(Stage::Artist, None, format!("{:#}", e));
        }
    }

    debug!("Loaded song {} from {}", record.song_id, path.display());
    Ok(outcome)
}
