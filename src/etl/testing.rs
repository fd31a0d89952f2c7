//! Fixtures and a failure-injecting backend shared by the loader tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::db::sqlite::SqliteDb;
use crate::db::{
    create_tables, ArtistRow, DatabaseBackend, SongMatch, SongRow, SongplayRow, Table, TimeRow,
    UserRow,
};

pub fn song_json(
    song_id: &str,
    title: &str,
    artist_id: &str,
    artist_name: &str,
    duration: f64,
) -> String {
    format!(
        r#"{{"num_songs": 1, "artist_id": "{artist_id}", "artist_latitude": 1.0, "artist_longitude": 2.0, "artist_location": "L", "artist_name": "{artist_name}", "song_id": "{song_id}", "title": "{title}", "duration": {duration:?}, "year": 2000}}"#
    )
}

pub fn play_json(
    ts: i64,
    user_id: i64,
    level: &str,
    song: &str,
    artist: &str,
    length: f64,
) -> String {
    format!(
        r#"{{"artist":"{artist}","auth":"Logged In","firstName":"F","gender":"M","itemInSession":0,"lastName":"La","length":{length:?},"level":"{level}","location":"Loc","method":"PUT","page":"NextSong","registration":1540919166796.0,"sessionId":9,"song":"{song}","status":200,"ts":{ts},"userAgent":"UA","userId":"{user_id}"}}"#
    )
}

pub fn home_json(ts: i64) -> String {
    format!(
        r#"{{"artist":null,"auth":"Logged In","firstName":"F","gender":"M","itemInSession":1,"lastName":"La","length":null,"level":"free","location":"Loc","method":"GET","page":"Home","registration":1540919166796.0,"sessionId":9,"song":null,"status":200,"ts":{ts},"userAgent":"UA","userId":"7"}}"#
    )
}

pub fn write_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

pub fn empty_warehouse() -> SqliteDb {
    let mut db = SqliteDb::open_in_memory().unwrap();
    assert!(create_tables(&mut db).is_success());
    db
}

/// SQLite-backed store that fails selected operations on demand.
pub struct FlakyDb {
    pub inner: SqliteDb,
    pub fail_tables: HashSet<Table>,
    pub fail_artists: bool,
    pub fail_songs: bool,
    pub fail_users: HashSet<i64>,
    pub fail_time: HashSet<i64>,
    pub fail_lookups: bool,
    pub fail_songplays_for: HashSet<i64>,
    pub commits: usize,
}

impl FlakyDb {
    pub fn new() -> Self {
        Self {
            inner: empty_warehouse(),
            fail_tables: HashSet::new(),
            fail_artists: false,
            fail_songs: false,
            fail_users: HashSet::new(),
            fail_time: HashSet::new(),
            fail_lookups: false,
            fail_songplays_for: HashSet::new(),
            commits: 0,
        }
    }
}

impl DatabaseBackend for FlakyDb {
    fn create_table(&mut self, table: Table) -> Result<()> {
        if self.fail_tables.contains(&table) {
            bail!("permission denied for table {}", table);
        }
        self.inner.create_table(table)
    }

    fn drop_table(&mut self, table: Table) -> Result<()> {
        if self.fail_tables.contains(&table) {
            bail!("permission denied for table {}", table);
        }
        self.inner.drop_table(table)
    }

    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        self.inner.commit()
    }

    fn insert_song(&mut self, song: &SongRow) -> Result<()> {
        if self.fail_songs {
            bail!("song insert rejected");
        }
        self.inner.insert_song(song)
    }

    fn insert_artist(&mut self, artist: &ArtistRow) -> Result<()> {
        if self.fail_artists {
            bail!("artist insert rejected");
        }
        self.inner.insert_artist(artist)
    }

    fn insert_time(&mut self, time: &TimeRow) -> Result<()> {
        if self.fail_time.contains(&time.start_time) {
            bail!("time insert rejected");
        }
        self.inner.insert_time(time)
    }

    fn upsert_user(&mut self, user: &UserRow) -> Result<()> {
        if self.fail_users.contains(&user.user_id) {
            bail!("user insert rejected");
        }
        self.inner.upsert_user(user)
    }

    fn find_song(&mut self, title: &str, artist: &str, duration: f64) -> Result<Option<SongMatch>> {
        if self.fail_lookups {
            bail!("lookup failed");
        }
        self.inner.find_song(title, artist, duration)
    }

    fn insert_songplay(&mut self, play: &SongplayRow) -> Result<()> {
        if self.fail_songplays_for.contains(&play.start_time) {
            bail!("songplay insert rejected");
        }
        self.inner.insert_songplay(play)
    }

    fn count_rows(&mut self, table: Table) -> Result<i64> {
        self.inner.count_rows(table)
    }
}
