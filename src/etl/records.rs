//! Input record shapes and their conversion into warehouse rows.

use chrono::{Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer};

use super::error::RecordError;
use crate::db::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};

/// Page value that marks an actual track playback in the event log
pub const NEXT_SONG: &str = "NextSong";

/// One song metadata record. Each song file holds exactly one.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongRecord {
    pub fn song_row(&self) -> SongRow {
        SongRow {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    pub fn artist_row(&self) -> ArtistRow {
        ArtistRow {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// One line of an event log. Only `NextSong` events carry the full field
/// set, so everything is optional at this stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Accepts ids written as JSON numbers or numeric strings. Logged-out
/// events carry an empty string, which maps to `None`.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Int(v)) => Ok(Some(v)),
        Some(RawId::Float(v)) if v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(RawId::Float(v)) => Err(serde::de::Error::custom(format!("non-integer id {}", v))),
        Some(RawId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawId::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid id {:?}", s))),
    }
}

impl LogEvent {
    pub fn is_next_song(&self) -> bool {
        self.page.as_deref() == Some(NEXT_SONG)
    }

    /// Validate that every field needed for the time, user and songplay rows
    /// is present.
    pub fn into_play(self) -> Result<PlayEvent, RecordError> {
        Ok(PlayEvent {
            ts: self.ts.ok_or(RecordError::MissingField("ts"))?,
            user_id: self.user_id.ok_or(RecordError::MissingField("userId"))?,
            first_name: self.first_name.ok_or(RecordError::MissingField("firstName"))?,
            last_name: self.last_name.ok_or(RecordError::MissingField("lastName"))?,
            gender: self.gender.ok_or(RecordError::MissingField("gender"))?,
            level: self.level.ok_or(RecordError::MissingField("level"))?,
            session_id: self.session_id.ok_or(RecordError::MissingField("sessionId"))?,
            song: self.song,
            artist: self.artist,
            length: self.length,
            location: self.location,
            user_agent: self.user_agent,
        })
    }
}

/// A validated `NextSong` event
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    pub ts: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl PlayEvent {
    pub fn time_row(&self) -> Result<TimeRow, RecordError> {
        time_row_from_millis(self.ts)
    }

    pub fn user_row(&self) -> UserRow {
        UserRow {
            user_id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level.clone(),
        }
    }

    /// The `(title, artist, duration)` triple used to resolve song identity
    pub fn lookup_key(&self) -> Option<(&str, &str, f64)> {
        Some((self.song.as_deref()?, self.artist.as_deref()?, self.length?))
    }

    pub fn songplay_row(&self, song_id: Option<String>, artist_id: Option<String>) -> SongplayRow {
        SongplayRow {
            start_time: self.ts,
            user_id: self.user_id,
            level: self.level.clone(),
            song_id,
            artist_id,
            session_id: self.session_id,
            location: self.location.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Decompose a millisecond epoch timestamp in UTC. Week is the ISO week of
/// the year and weekday counts from Monday = 0.
pub fn time_row_from_millis(ts: i64) -> Result<TimeRow, RecordError> {
    let dt = Utc
        .timestamp_millis_opt(ts)
        .single()
        .ok_or(RecordError::InvalidTimestamp(ts))?;

    Ok(TimeRow {
        start_time: ts,
        hour: dt.hour() as i32,
        day: dt.day() as i32,
        week: dt.iso_week().week() as i32,
        month: dt.month() as i32,
        year: dt.year(),
        weekday: dt.weekday().num_days_from_monday() as i32,
    })
}
