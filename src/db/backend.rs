//! Database backend abstraction.
//!
//! Every loader takes an explicit `&mut impl DatabaseBackend` instead of a
//! shared global connection, so SQLite, PostgreSQL and test doubles are
//! interchangeable.

use anyhow::Result;

use super::schema::Table;
use super::{ArtistRow, SongMatch, SongRow, SongplayRow, TimeRow, UserRow};

/// Trait for database backend implementations.
pub trait DatabaseBackend {
    // === Schema ===

    /// Issue `CREATE TABLE IF NOT EXISTS` for one table, auto-committed.
    fn create_table(&mut self, table: Table) -> Result<()>;

    /// Issue `DROP TABLE IF EXISTS` for one table, auto-committed.
    fn drop_table(&mut self, table: Table) -> Result<()>;

    // === Transactions ===

    /// Open the transaction that groups all rows of one input file.
    fn begin(&mut self) -> Result<()>;

    /// Commit whatever succeeded since `begin`.
    fn commit(&mut self) -> Result<()>;

    // === Dimension upserts ===

    /// Insert a song; no-op when `song_id` already exists.
    fn insert_song(&mut self, song: &SongRow) -> Result<()>;

    /// Insert an artist; no-op when `artist_id` already exists.
    fn insert_artist(&mut self, artist: &ArtistRow) -> Result<()>;

    /// Insert a time row; no-op when `start_time` already exists.
    fn insert_time(&mut self, time: &TimeRow) -> Result<()>;

    /// Insert a user, or update only `level` when `user_id` exists.
    fn upsert_user(&mut self, user: &UserRow) -> Result<()>;

    // === Facts ===

    /// Resolve song and artist ids by exact title, artist name and duration.
    fn find_song(&mut self, title: &str, artist: &str, duration: f64) -> Result<Option<SongMatch>>;

    /// Append a songplay row. Never deduplicated.
    fn insert_songplay(&mut self, play: &SongplayRow) -> Result<()>;

    // === Inspection ===

    fn count_rows(&mut self, table: Table) -> Result<i64>;
}
