pub mod backend;
pub mod schema;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod postgres_schema;

use anyhow::Result;

pub use backend::DatabaseBackend;
pub use schema::{create_tables, drop_tables, reset_tables, SchemaReport, Table};

use crate::config::DatabaseConfig;
#[cfg(feature = "postgres")]
use crate::config::DatabaseType;

/// Row for the `songs` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i32>,
    pub duration: Option<f64>,
}

/// Row for the `artists` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Row for the `users` dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
}

/// Row for the `time` dimension, keyed by the millisecond epoch timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRow {
    pub start_time: i64,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// Monday = 0
    pub weekday: i32,
}

/// Row for the `songplays` fact table. The surrogate id is assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongplayRow {
    pub start_time: i64,
    pub user_id: i64,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of resolving a played track against songs and artists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Macro to dispatch a method call to the active backend variant.
macro_rules! dispatch {
    // No arguments beyond self
    ($self:expr, $method:ident()) => {
        match &mut $self.inner {
            DatabaseInner::Sqlite(db) => db.$method(),
            #[cfg(feature = "postgres")]
            DatabaseInner::Postgres(db) => db.$method(),
        }
    };
    // With arguments
    ($self:expr, $method:ident($($arg:expr),+ $(,)?)) => {
        match &mut $self.inner {
            DatabaseInner::Sqlite(db) => db.$method($($arg),+),
            #[cfg(feature = "postgres")]
            DatabaseInner::Postgres(db) => db.$method($($arg),+),
        }
    };
}

enum DatabaseInner {
    Sqlite(sqlite::SqliteDb),
    #[cfg(feature = "postgres")]
    Postgres(postgres::PgDb),
}

/// The single connection handle used for a whole run.
pub struct Database {
    inner: DatabaseInner,
}

impl Database {
    /// Open a database connection based on the provided configuration.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        #[cfg(feature = "postgres")]
        {
            if config.backend == DatabaseType::Postgresql {
                let url = config.postgresql_url.as_deref()
                    .ok_or_else(|| anyhow::anyhow!("PostgreSQL URL not configured"))?;
                let pg = postgres::PgDb::connect(url)?;
                return Ok(Self { inner: DatabaseInner::Postgres(pg) });
            }
        }
        #[cfg(not(feature = "postgres"))]
        {
            if config.backend != crate::config::DatabaseType::Sqlite {
                anyhow::bail!("PostgreSQL backend requested but this build lacks the `postgres` feature");
            }
        }

        let db = sqlite::SqliteDb::open(&config.sqlite_path)?;
        Ok(Self { inner: DatabaseInner::Sqlite(db) })
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.inner {
            DatabaseInner::Sqlite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            DatabaseInner::Postgres(_) => "postgresql",
        }
    }
}

impl DatabaseBackend for Database {
    fn create_table(&mut self, table: Table) -> Result<()> {
        dispatch!(self, create_table(table))
    }

    fn drop_table(&mut self, table: Table) -> Result<()> {
        dispatch!(self, drop_table(table))
    }

    fn begin(&mut self) -> Result<()> {
        dispatch!(self, begin())
    }

    fn commit(&mut self) -> Result<()> {
        dispatch!(self, commit())
    }

    fn insert_song(&mut self, song: &SongRow) -> Result<()> {
        dispatch!(self, insert_song(song))
    }

    fn insert_artist(&mut self, artist: &ArtistRow) -> Result<()> {
        dispatch!(self, insert_artist(artist))
    }

    fn insert_time(&mut self, time: &TimeRow) -> Result<()> {
        dispatch!(self, insert_time(time))
    }

    fn upsert_user(&mut self, user: &UserRow) -> Result<()> {
        dispatch!(self, upsert_user(user))
    }

    fn find_song(&mut self, title: &str, artist: &str, duration: f64) -> Result<Option<SongMatch>> {
        dispatch!(self, find_song(title, artist, duration))
    }

    fn insert_songplay(&mut self, play: &SongplayRow) -> Result<()> {
        dispatch!(self, insert_songplay(play))
    }

    fn count_rows(&mut self, table: Table) -> Result<i64> {
        dispatch!(self, count_rows(table))
    }
}
