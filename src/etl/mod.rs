//! Extract, transform and load of song metadata and listening logs.
//!
//! Song files populate the `songs` and `artists` dimensions. Log files
//! populate `time` and `users`, then append one `songplays` fact per
//! `NextSong` event, resolving song identity against what is already loaded.

pub mod discovery;
pub mod driver;
pub mod error;
pub mod log_file;
pub mod records;
pub mod report;
pub mod song_file;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::discover_files;
pub use driver::{process_data, run, LoadProgress};
pub use error::{LoadError, RecordError};
pub use log_file::load_log_file;
pub use records::{time_row_from_millis, LogEvent, PlayEvent, SongRecord, NEXT_SONG};
pub use report::{FileOutcome, Phase, PhaseReport, RecordFailure, RunReport, Stage};
pub use song_file::load_song_file;
