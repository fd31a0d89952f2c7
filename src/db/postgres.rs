//! PostgreSQL backend implementation.

use anyhow::{Context, Result};
use postgres::types::ToSql;
use postgres::{Client, NoTls};

use super::backend::DatabaseBackend;
use super::postgres_schema::{
    create_sql, ARTIST_TABLE_INSERT, SONGPLAY_TABLE_INSERT, SONG_SELECT, SONG_TABLE_INSERT,
    TIME_TABLE_INSERT, USER_TABLE_INSERT,
};
use super::schema::Table;
use super::{ArtistRow, SongMatch, SongRow, SongplayRow, TimeRow, UserRow};

pub struct PgDb {
    client: Client,
    in_transaction: bool,
}

impl PgDb {
    pub fn connect(url: &str) -> Result<Self> {
        let client = Client::connect(url, NoTls)
            .with_context(|| "Failed to connect to PostgreSQL")?;
        Ok(Self { client, in_transaction: false })
    }

    /// Drop and recreate the warehouse database through a maintenance
    /// connection on the same server.
    pub fn recreate_database(admin_url: &str, dbname: &str) -> Result<()> {
        if dbname.is_empty() || !dbname.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            anyhow::bail!("Refusing to recreate database with unusual name: {:?}", dbname);
        }

        let mut admin = Client::connect(admin_url, NoTls)
            .with_context(|| "Failed to connect to PostgreSQL maintenance database")?;
        admin.batch_execute(&format!("DROP DATABASE IF EXISTS {}", dbname))
            .with_context(|| format!("Cannot drop database {}", dbname))?;
        admin.batch_execute(&format!(
            "CREATE DATABASE {} WITH ENCODING 'utf8' TEMPLATE template0",
            dbname
        ))
        .with_context(|| format!("Cannot create database {}", dbname))?;
        Ok(())
    }

    /// Run one row operation. Inside a file transaction the operation is
    /// wrapped in a savepoint so a failure leaves the transaction usable.
    fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut Client) -> Result<T, postgres::Error>,
    ) -> Result<T> {
        if !self.in_transaction {
            return Ok(op(&mut self.client)?);
        }

        self.client.batch_execute("SAVEPOINT etl_row")?;
        match op(&mut self.client) {
            Ok(value) => {
                self.client.batch_execute("RELEASE SAVEPOINT etl_row")?;
                Ok(value)
            }
            Err(e) => {
                self.client.batch_execute("ROLLBACK TO SAVEPOINT etl_row")?;
                Err(e.into())
            }
        }
    }

    fn guarded_execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        self.guarded(|client| client.execute(sql, params))
    }
}

/// Extract the database name from a key/value or URL connection string.
pub fn dbname_from_url(url: &str) -> Option<String> {
    let config: postgres::Config = url.parse().ok()?;
    config.get_dbname().map(|s| s.to_string())
}

impl DatabaseBackend for PgDb {
    fn create_table(&mut self, table: Table) -> Result<()> {
        self.client.batch_execute(create_sql(table))?;
        Ok(())
    }

    fn drop_table(&mut self, table: Table) -> Result<()> {
        self.client.batch_execute(&table.drop_sql())?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.client.batch_execute("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.in_transaction = false;
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn insert_song(&mut self, song: &SongRow) -> Result<()> {
        self.guarded_execute(
            SONG_TABLE_INSERT,
            &[&song.song_id, &song.title, &song.artist_id, &song.year, &song.duration],
        )?;
        Ok(())
    }

    fn insert_artist(&mut self, artist: &ArtistRow) -> Result<()> {
        self.guarded_execute(
            ARTIST_TABLE_INSERT,
            &[
                &artist.artist_id,
                &artist.name,
                &artist.location,
                &artist.latitude,
                &artist.longitude,
            ],
        )?;
        Ok(())
    }

    fn insert_time(&mut self, time: &TimeRow) -> Result<()> {
        self.guarded_execute(
            TIME_TABLE_INSERT,
            &[
                &time.start_time,
                &time.hour,
                &time.day,
                &time.week,
                &time.month,
                &time.year,
                &time.weekday,
            ],
        )?;
        Ok(())
    }

    fn upsert_user(&mut self, user: &UserRow) -> Result<()> {
        self.guarded_execute(
            USER_TABLE_INSERT,
            &[&user.user_id, &user.first_name, &user.last_name, &user.gender, &user.level],
        )?;
        Ok(())
    }

    fn find_song(&mut self, title: &str, artist: &str, duration: f64) -> Result<Option<SongMatch>> {
        let row = self.guarded(|client| {
            client.query_opt(SONG_SELECT, &[&title, &artist, &duration])
        })?;
        Ok(row.map(|row| SongMatch {
            song_id: row.get(0),
            artist_id: row.get(1),
        }))
    }

    fn insert_songplay(&mut self, play: &SongplayRow) -> Result<()> {
        self.guarded_execute(
            SONGPLAY_TABLE_INSERT,
            &[
                &play.start_time,
                &play.user_id,
                &play.level,
                &play.song_id,
                &play.artist_id,
                &play.session_id,
                &play.location,
                &play.user_agent,
            ],
        )?;
        Ok(())
    }

    fn count_rows(&mut self, table: Table) -> Result<i64> {
        let row = self.client.query_one(&format!("SELECT COUNT(*) FROM {}", table.name()), &[])?;
        Ok(row.get(0))
    }
}
