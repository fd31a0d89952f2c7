//! SQLite backend implementation.

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

use super::backend::DatabaseBackend;
use super::schema::{
    Table, ARTIST_TABLE_INSERT, SONGPLAY_TABLE_INSERT, SONG_SELECT, SONG_TABLE_INSERT,
    TIME_TABLE_INSERT, USER_TABLE_INSERT,
};
use super::{ArtistRow, SongMatch, SongRow, SongplayRow, TimeRow, UserRow};

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }
}

impl DatabaseBackend for SqliteDb {
    fn create_table(&mut self, table: Table) -> Result<()> {
        self.conn.execute_batch(table.create_sql())?;
        Ok(())
    }

    fn drop_table(&mut self, table: Table) -> Result<()> {
        self.conn.execute_batch(&table.drop_sql())?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn insert_song(&mut self, song: &SongRow) -> Result<()> {
        self.conn.execute(
            SONG_TABLE_INSERT,
            rusqlite::params![song.song_id, song.title, song.artist_id, song.year, song.duration],
        )?;
        Ok(())
    }

    fn insert_artist(&mut self, artist: &ArtistRow) -> Result<()> {
        self.conn.execute(
            ARTIST_TABLE_INSERT,
            rusqlite::params![
                artist.artist_id,
                artist.name,
                artist.location,
                artist.latitude,
                artist.longitude,
            ],
        )?;
        Ok(())
    }

    fn insert_time(&mut self, time: &TimeRow) -> Result<()> {
        self.conn.execute(
            TIME_TABLE_INSERT,
            rusqlite::params![
                time.start_time,
                time.hour,
                time.day,
                time.week,
                time.month,
                time.year,
                time.weekday,
            ],
        )?;
        Ok(())
    }

    fn upsert_user(&mut self, user: &UserRow) -> Result<()> {
        self.conn.execute(
            USER_TABLE_INSERT,
            rusqlite::params![
                user.user_id,
                user.first_name,
                user.last_name,
                user.gender,
                user.level,
            ],
        )?;
        Ok(())
    }

    fn find_song(&mut self, title: &str, artist: &str, duration: f64) -> Result<Option<SongMatch>> {
        let result = self.conn.query_row(
            SONG_SELECT,
            rusqlite::params![title, artist, duration],
            |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            },
        );
        match result {
            Ok(found) => Ok(Some(found)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn insert_songplay(&mut self, play: &SongplayRow) -> Result<()> {
        self.conn.execute(
            SONGPLAY_TABLE_INSERT,
            rusqlite::params![
                play.start_time,
                play.user_id,
                play.level,
                play.song_id,
                play.artist_id,
                play.session_id,
                play.location,
                play.user_agent,
            ],
        )?;
        Ok(())
    }

    fn count_rows(&mut self, table: Table) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
