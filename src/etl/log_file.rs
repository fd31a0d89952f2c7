//! Event log files: newline-delimited listening events feeding the time,
//! users and songplays tables.

use std::path::Path;

use tracing::{debug, warn};

use super::error::LoadError;
use super::records::{LogEvent, PlayEvent};
use super::report::{FileOutcome, Stage};
use crate::db::DatabaseBackend;

/// Parse every non-blank line. Lines that are not valid events and
/// `NextSong` events lacking required fields are recorded as parse failures.
/// Returns the retained plays together with their 1-based line numbers.
pub fn parse_plays(content: &str, outcome: &mut FileOutcome) -> Vec<(usize, PlayEvent)> {
    let mut plays = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: LogEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Cannot parse log record at {}:{}: {}", outcome.path.display(), line_no, e);
                outcome.fail(Stage::Parse, Some(line_no), e.to_string());
                continue;
            }
        };

        if !event.is_next_song() {
            continue;
        }

        match event.into_play() {
            Ok(play) => plays.push((line_no, play)),
            Err(e) => {
                warn!("Skipping log record at {}:{}: {}", outcome.path.display(), line_no, e);
                outcome.fail(Stage::Parse, Some(line_no), e.to_string());
            }
        }
    }

    plays
}

/// Load one event log file: time rows, then users, then songplays.
pub fn load_log_file<D: DatabaseBackend + ?Sized>(
    db: &mut D,
    path: &Path,
) -> Result<FileOutcome, LoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Read { path: path.to_path_buf(), source })?;

    let mut outcome = FileOutcome::new(path);
    let plays = parse_plays(&content, &mut outcome);
    outcome.records = plays.len();

    for (line_no, play) in &plays {
        let row = match play.time_row() {
            Ok(row) => row,
            Err(e) => {
                warn!("Cannot derive time data for ts {}: {}", play.ts, e);
                outcome.fail(Stage::Time, Some(*line_no), e.to_string());
                continue;
            }
        };
        match db.insert_time(&row) {
            Ok(()) => outcome.rows_written += 1,
            Err(e) => {
                warn!("Cannot insert time data {:?}: {:#}", row, e);
                outcome.fail(Stage::Time, Some(*line_no), format!("{:#}", e));
            }
        }
    }

    for (line_no, play) in &plays {
        let user = play.user_row();
        match db.upsert_user(&user) {
            Ok(()) => outcome.rows_written += 1,
            Err(e) => {
                warn!("Cannot insert user data {:?}: {:#}", user, e);
                outcome.fail(Stage::User, Some(*line_no), format!("{:#}", e));
            }
        }
    }

    for (line_no, play) in &plays {
        let found = match play.lookup_key() {
            Some((title, artist, length)) => match db.find_song(title, artist, length) {
                Ok(found) => found,
                Err(e) => {
                    warn!("Cannot look up song {:?} by {:?}: {:#}", title, artist, e);
                    outcome.fail(Stage::Lookup, Some(*line_no), format!("{:#}", e));
                    continue;
                }
            },
            None => None,
        };

        let (song_id, artist_id) = match found {
            Some(m) => (Some(m.song_id), Some(m.artist_id)),
            None => (None, None),
        };

        let row = play.songplay_row(song_id, artist_id);
        match db.insert_songplay(&row) {
            Ok(()) => outcome.rows_written += 1,
            Err(e) => {
                warn!("Cannot insert songplay data {:?}: {:#}", row, e);
                outcome.fail(Stage::Songplay, Some(*line_no), format!("{:#}", e));
            }
        }
    }

    debug!(
        "Loaded {} plays from {} ({} skipped)",
        outcome.records,
        path.display(),
        outcome.failures.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Table;
    use crate::etl::song_file::load_song_file;
    use crate::etl::testing::{
        empty_warehouse, home_json, play_json, song_json, write_file, FlakyDb,
    };
    use tempfile::tempdir;

    fn log_content(lines: &[String]) -> String {
        let mut content = lines.join("\n");
        content.push('\n');
        content
    }

    #[test]
    fn test_reloading_log_duplicates_only_facts() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "2018/11/2018-11-01-events.json",
            &log_content(&[
                play_json(1541105830796, 39, "free", "Mercy", "Nobody", 230.1),
                play_json(1541106106796, 39, "free", "Fade", "Somebody", 199.0),
                play_json(1541106106796, 8, "free", "Fade", "Somebody", 199.0),
            ]),
        );
        let mut db = empty_warehouse();

        let first = load_log_file(&mut db, &path).unwrap();
        assert_eq!(first.records, 3);
        assert!(first.failures.is_empty());
        load_log_file(&mut db, &path).unwrap();

        assert_eq!(db.count_rows(Table::Time).unwrap(), 2);
        assert_eq!(db.count_rows(Table::Users).unwrap(), 2);
        assert_eq!(db.count_rows(Table::Songplays).unwrap(), 6);
    }

    #[test]
    fn test_non_next_song_events_are_ignored() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "events.json",
            &log_content(&[home_json(1541105830796), home_json(1541105830999)]),
        );
        let mut db = empty_warehouse();

        let outcome = load_log_file(&mut db, &path).unwrap();
        assert_eq!(outcome.records, 0);
        assert!(outcome.failures.is_empty());
        assert_eq!(db.count_rows(Table::Time).unwrap(), 0);
        assert_eq!(db.count_rows(Table::Users).unwrap(), 0);
        assert_eq!(db.count_rows(Table::Songplays).unwrap(), 0);
    }

    #[test]
    fn test_unmatched_play_is_kept_with_null_ids() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "events.json",
            &log_content(&[play_json(1000000, 7, "free", "Unknown", "Nobody", 12.5)]),
        );
        let mut db = empty_warehouse();
        load_log_file(&mut db, &path).unwrap();

        let (song_id, artist_id): (Option<String>, Option<String>) = db
            .conn
            .query_row("SELECT song_id, artist_id FROM songplays", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert!(song_id.is_none());
        assert!(artist_id.is_none());
    }

    #[test]
    fn test_matched_play_resolves_ids() {
        let dir = tempdir().unwrap();
        let song = write_file(dir.path(), "song.json", &song_json("S1", "T", "A1", "N", 180.0));
        let log = write_file(
            dir.path(),
            "events.json",
            &log_content(&[play_json(1000000, 7, "free", "T", "N", 180.0)]),
        );
        let mut db = empty_warehouse();
        load_song_file(&mut db, &song).unwrap();
        load_log_file(&mut db, &log).unwrap();

        let (song_id, artist_id, session_id, user_agent): (String, String, i64, String) = db
            .conn
            .query_row(
                "SELECT song_id, artist_id, session_id, user_agent FROM songplays",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(song_id, "S1");
        assert_eq!(artist_id, "A1");
        assert_eq!(session_id, 9);
        assert_eq!(user_agent, "UA");
    }

    #[test]
    fn test_ambiguous_match_keeps_play() {
        let dir = tempdir().unwrap();
        let second = write_file(dir.path(), "b.json", &song_json("S2", "T", "A2", "N", 180.0));
        let first = write_file(dir.path(), "a.json", &song_json("S1", "T", "A1", "N", 180.0));
        let log = write_file(
            dir.path(),
            "events.json",
            &log_content(&[play_json(1000000, 7, "free", "T", "N", 180.0)]),
        );
        let mut db = empty_warehouse();
        load_song_file(&mut db, &second).unwrap();
        load_song_file(&mut db, &first).unwrap();

        let outcome = load_log_file(&mut db, &log).unwrap();
        assert!(outcome.failures.is_empty());
        assert_eq!(db.count_rows(Table::Songplays).unwrap(), 1);

        let (song_id, artist_id): (String, String) = db
            .conn
            .query_row("SELECT song_id, artist_id FROM songplays", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(song_id, "S1");
        assert_eq!(artist_id, "A1");
    }

    #[test]
    fn test_level_change_across_events() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "events.json",
            &log_content(&[
                play_json(1000000, 7, "free", "T", "N", 180.0),
                play_json(2000000, 7, "paid", "T", "N", 180.0),
            ]),
        );
        let mut db = empty_warehouse();
        load_log_file(&mut db, &path).unwrap();

        let (first_name, level): (String, String) = db
            .conn
            .query_row("SELECT first_name, level FROM users WHERE user_id = 7", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(first_name, "F");
        assert_eq!(level, "paid");

        let levels: Vec<String> = db
            .conn
            .prepare("SELECT level FROM songplays ORDER BY start_time")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(levels, vec!["free", "paid"]);
    }

    #[test]
    fn test_bad_lines_are_skipped_individually() {
        let dir = tempdir().unwrap();
        let content = format!(
            "{}\nnot json at all\n\n{}\n{}\n",
            play_json(1000000, 7, "free", "T", "N", 180.0),
            r#"{"page":"NextSong","ts":3000000,"userId":"9","sessionId":1}"#,
            play_json(2000000, 8, "free", "T", "N", 180.0),
        );
        let path = write_file(dir.path(), "events.json", &content);
        let mut db = empty_warehouse();

        let outcome = load_log_file(&mut db, &path).unwrap();
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.failures_in(Stage::Parse), 2);
        let lines: Vec<Option<usize>> = outcome.failures.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![Some(2), Some(4)]);
        assert_eq!(db.count_rows(Table::Songplays).unwrap(), 2);
    }

    #[test]
    fn test_insert_failures_skip_single_records() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "events.json",
            &log_content(&[
                play_json(1000000, 7, "free", "T", "N", 180.0),
                play_json(2000000, 8, "free", "T", "N", 180.0),
                play_json(3000000, 9, "paid", "T", "N", 180.0),
            ]),
        );
        let mut db = FlakyDb::new();
        db.fail_time.insert(1000000);
        db.fail_users.insert(8);
        db.fail_songplays_for.insert(3000000);

        let outcome = load_log_file(&mut db, &path).unwrap();
        assert_eq!(outcome.failures_in(Stage::Time), 1);
        assert_eq!(outcome.failures_in(Stage::User), 1);
        assert_eq!(outcome.failures_in(Stage::Songplay), 1);
        assert_eq!(outcome.rows_written, 6);

        assert_eq!(db.count_rows(Table::Time).unwrap(), 2);
        assert_eq!(db.count_rows(Table::Users).unwrap(), 2);
        assert_eq!(db.count_rows(Table::Songplays).unwrap(), 2);
    }

    #[test]
    fn test_lookup_failure_skips_fact_row() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "events.json",
            &log_content(&[play_json(1000000, 7, "free", "T", "N", 180.0)]),
        );
        let mut db = FlakyDb::new();
        db.fail_lookups = true;

        let outcome = load_log_file(&mut db, &path).unwrap();
        assert_eq!(outcome.failures_in(Stage::Lookup), 1);
        assert_eq!(db.count_rows(Table::Users).unwrap(), 1);
        assert_eq!(db.count_rows(Table::Songplays).unwrap(), 0);
    }

    #[test]
    fn test_unreadable_log_file() {
        let dir = tempdir().unwrap();
        let mut db = empty_warehouse();
        let result = load_log_file(&mut db, &dir.path().join("missing.json"));
        assert!(matches!(result, Err(LoadError::Read { .. })));
    }
}
