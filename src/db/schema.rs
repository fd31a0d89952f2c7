//! Star schema definition and the create/drop operations over it.

use std::fmt;

use tracing::{error, info};

use super::DatabaseBackend;

/// The five warehouse tables, in DDL order: fact table first, then dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Songplays,
    Users,
    Songs,
    Artists,
    Time,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Songplays,
        Table::Users,
        Table::Songs,
        Table::Artists,
        Table::Time,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Songplays => "songplays",
            Table::Users => "users",
            Table::Songs => "songs",
            Table::Artists => "artists",
            Table::Time => "time",
        }
    }

    /// SQLite DDL for this table
    pub fn create_sql(&self) -> &'static str {
        match self {
            Table::Songplays => SONGPLAY_TABLE_CREATE,
            Table::Users => USER_TABLE_CREATE,
            Table::Songs => SONG_TABLE_CREATE,
            Table::Artists => ARTIST_TABLE_CREATE,
            Table::Time => TIME_TABLE_CREATE,
        }
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Fact table: one row per playback event, no natural key.
const SONGPLAY_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    level TEXT NOT NULL,
    song_id TEXT,
    artist_id TEXT,
    session_id INTEGER NOT NULL,
    location TEXT,
    user_agent TEXT
)
"#;

const USER_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gender TEXT NOT NULL,
    level TEXT NOT NULL
)
"#;

const SONG_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS songs (
    song_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    artist_id TEXT,
    year INTEGER,
    duration REAL
)
"#;

const ARTIST_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS artists (
    artist_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT,
    latitude REAL,
    longitude REAL
)
"#;

const TIME_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS time (
    start_time INTEGER PRIMARY KEY,
    hour INTEGER NOT NULL,
    day INTEGER NOT NULL,
    week INTEGER NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    weekday INTEGER NOT NULL
)
"#;

pub const SONGPLAY_TABLE_INSERT: &str = r#"
INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

pub const USER_TABLE_INSERT: &str = r#"
INSERT INTO users (user_id, first_name, last_name, gender, level)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (user_id) DO UPDATE SET level = excluded.level
"#;

pub const SONG_TABLE_INSERT: &str = r#"
INSERT INTO songs (song_id, title, artist_id, year, duration)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (song_id) DO NOTHING
"#;

pub const ARTIST_TABLE_INSERT: &str = r#"
INSERT INTO artists (artist_id, name, location, latitude, longitude)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (artist_id) DO NOTHING
"#;

pub const TIME_TABLE_INSERT: &str = r#"
INSERT INTO time (start_time, hour, day, week, month, year, weekday)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (start_time) DO NOTHING
"#;

pub const SONG_SELECT: &str = r#"
SELECT songs.song_id, songs.artist_id
FROM songs JOIN artists ON songs.artist_id = artists.artist_id
WHERE songs.title = ?1 AND artists.name = ?2 AND songs.duration = ?3
ORDER BY songs.song_id
LIMIT 1
"#;

/// Outcome of running DDL over every table
#[derive(Debug, Clone, Default)]
pub struct SchemaReport {
    /// Tables whose statement succeeded
    pub succeeded: Vec<Table>,
    /// Tables whose statement failed, with the error message
    pub failed: Vec<(Table, String)>,
}

impl SchemaReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: SchemaReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

/// Create all tables. A failing statement is logged and skipped.
pub fn create_tables<D: DatabaseBackend + ?Sized>(db: &mut D) -> SchemaReport {
    let mut report = SchemaReport::default();
    for table in Table::ALL {
        match db.create_table(table) {
            Ok(()) => {
                info!("Created table {}", table);
                report.succeeded.push(table);
            }
            Err(e) => {
                error!("Cannot create table {}: {:#}", table, e);
                report.failed.push((table, format!("{:#}", e)));
            }
        }
    }
    report
}

/// Drop all tables. A failing statement is logged and skipped.
pub fn drop_tables<D: DatabaseBackend + ?Sized>(db: &mut D) -> SchemaReport {
    let mut report = SchemaReport::default();
    for table in Table::ALL {
        match db.drop_table(table) {
            Ok(()) => {
                info!("Dropped table {}", table);
                report.succeeded.push(table);
            }
            Err(e) => {
                error!("Cannot drop table {}: {:#}", table, e);
                report.failed.push((table, format!("{:#}", e)));
            }
        }
    }
    report
}

/// Drop then recreate every table, leaving an empty schema.
pub fn reset_tables<D: DatabaseBackend + ?Sized>(db: &mut D) -> SchemaReport {
    let mut report = drop_tables(&mut *db);
    report.merge(create_tables(db));
    report
}
