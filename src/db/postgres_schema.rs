//! PostgreSQL flavour of the star schema and its statements.

use super::schema::Table;

pub fn create_sql(table: Table) -> &'static str {
    match table {
        Table::Songplays => SONGPLAY_TABLE_CREATE,
        Table::Users => USER_TABLE_CREATE,
        Table::Songs => SONG_TABLE_CREATE,
        Table::Artists => ARTIST_TABLE_CREATE,
        Table::Time => TIME_TABLE_CREATE,
    }
}

const SONGPLAY_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id BIGSERIAL PRIMARY KEY,
    start_time BIGINT NOT NULL,
    user_id BIGINT NOT NULL,
    level VARCHAR NOT NULL,
    song_id VARCHAR,
    artist_id VARCHAR,
    session_id BIGINT NOT NULL,
    location VARCHAR,
    user_agent VARCHAR
)
"#;

const USER_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id BIGINT PRIMARY KEY,
    first_name VARCHAR NOT NULL,
    last_name VARCHAR NOT NULL,
    gender VARCHAR NOT NULL,
    level VARCHAR NOT NULL
)
"#;

// duration stays DOUBLE PRECISION so equality lookups against f64 lengths match
const SONG_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS songs (
    song_id VARCHAR PRIMARY KEY,
    title VARCHAR NOT NULL,
    artist_id VARCHAR,
    year INTEGER,
    duration DOUBLE PRECISION
)
"#;

const ARTIST_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS artists (
    artist_id VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    location VARCHAR,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION
)
"#;

const TIME_TABLE_CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS time (
    start_time BIGINT PRIMARY KEY,
    hour INTEGER NOT NULL,
    day INTEGER NOT NULL,
    week INTEGER NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    weekday INTEGER NOT NULL
)
"#;

pub const SONGPLAY_TABLE_INSERT: &str = "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

pub const USER_TABLE_INSERT: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (user_id) DO UPDATE SET level = EXCLUDED.level";

pub const SONG_TABLE_INSERT: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (song_id) DO NOTHING";

pub const ARTIST_TABLE_INSERT: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (artist_id) DO NOTHING";

pub const TIME_TABLE_INSERT: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
     VALUES ($1, $2, $3, $4, $5, $6, $7)
     ON CONFLICT (start_time) DO NOTHING";

pub const SONG_SELECT: &str = "SELECT songs.song_id, songs.artist_id
     FROM songs JOIN artists ON songs.artist_id = artists.artist_id
     WHERE songs.title = $1 AND artists.name = $2 AND songs.duration = $3
     ORDER BY songs.song_id
     LIMIT 1";
