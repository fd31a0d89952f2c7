//! Structured results of a load, from single records up to the whole run.

use std::fmt;
use std::path::{Path, PathBuf};

/// Which step a record failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parse,
    Song,
    Artist,
    Time,
    User,
    Lookup,
    Songplay,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Song => "song",
            Stage::Artist => "artist",
            Stage::Time => "time",
            Stage::User => "user",
            Stage::Lookup => "lookup",
            Stage::Songplay => "songplay",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub stage: Stage,
    /// 1-based line in the input file, when known
    pub line: Option<usize>,
    pub message: String,
}

/// Result of loading one file that could at least be read
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Records considered for loading (song records, or NextSong events)
    pub records: usize,
    /// Row statements that succeeded
    pub rows_written: usize,
    pub failures: Vec<RecordFailure>,
}

impl FileOutcome {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn fail(&mut self, stage: Stage, line: Option<usize>, message: impl Into<String>) {
        self.failures.push(RecordFailure {
            stage,
            line,
            message: message.into(),
        });
    }

    pub fn failures_in(&self, stage: Stage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }
}

/// Which tree is being loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Songs,
    Logs,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Songs => f.write_str("song files"),
            Phase::Logs => f.write_str("log files"),
        }
    }
}

/// Result of walking one directory tree
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub root: PathBuf,
    pub files_found: usize,
    /// Files whose loader returned an outcome
    pub processed: Vec<FileOutcome>,
    /// Files that could not be loaded at all
    pub failed: Vec<(PathBuf, String)>,
}

impl PhaseReport {
    pub fn new(phase: Phase, root: &Path) -> Self {
        Self {
            phase,
            root: root.to_path_buf(),
            files_found: 0,
            processed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn files_processed(&self) -> usize {
        self.processed.len()
    }

    pub fn record_failures(&self) -> usize {
        self.processed.iter().map(|f| f.failures.len()).sum()
    }

    pub fn rows_written(&self) -> usize {
        self.processed.iter().map(|f| f.rows_written).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || self.record_failures() > 0
    }
}

/// Result of the two-phase load
#[derive(Debug, Clone)]
pub struct RunReport {
    pub songs: PhaseReport,
    pub logs: PhaseReport,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.songs.has_failures() || self.logs.has_failures()
    }
}
