//! Walks an input tree and feeds each file to a loader, one transaction per file.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use super::discovery::discover_files;
use super::error::LoadError;
use super::log_file::load_log_file;
use super::report::{FileOutcome, Phase, PhaseReport, RunReport};
use super::song_file::load_song_file;
use crate::config::DataConfig;
use crate::db::DatabaseBackend;

#[derive(Debug, Clone)]
pub enum LoadProgress {
    Started { phase: Phase, total_files: usize },
    FileDone { phase: Phase, current: usize, total: usize, path: PathBuf, processed: bool },
    Completed { phase: Phase, processed: usize, failed: usize },
}

/// Run `handler` over every matching file under `root`.
///
/// The transaction is committed after each file whether or not the handler
/// succeeded, so partial work from a failing file is kept. Transaction
/// errors are fatal and abort the phase.
pub fn process_data<D, F>(
    db: &mut D,
    phase: Phase,
    root: &Path,
    extension: &str,
    mut handler: F,
    progress_tx: Option<&mpsc::Sender<LoadProgress>>,
) -> Result<PhaseReport>
where
    D: DatabaseBackend + ?Sized,
    F: FnMut(&mut D, &Path) -> Result<FileOutcome, LoadError>,
{
    if !root.is_dir() {
        warn!("{} is not a directory, no {} to load", root.display(), phase);
    }

    let files = discover_files(root, extension);
    let total = files.len();
    info!("{} files found in {}", total, root.display());

    if let Some(tx) = progress_tx {
        let _ = tx.send(LoadProgress::Started { phase, total_files: total });
    }

    let mut report = PhaseReport::new(phase, root);
    report.files_found = total;

    for (index, path) in files.into_iter().enumerate() {
        let current = index + 1;

        db.begin()
            .with_context(|| format!("Cannot start transaction for {}", path.display()))?;
        let result = handler(&mut *db, &path);
        db.commit()
            .with_context(|| format!("Cannot commit {}", path.display()))?;

        let processed = match result {
            Ok(outcome) => {
                info!("{}/{} files processed.", current, total);
                report.processed.push(outcome);
                true
            }
            Err(e) => {
                error!("{}/{} files not processed: {}", current, total, e);
                report.failed.push((path.clone(), e.to_string()));
                false
            }
        };

        if let Some(tx) = progress_tx {
            let _ = tx.send(LoadProgress::FileDone { phase, current, total, path, processed });
        }
    }

    if let Some(tx) = progress_tx {
        let _ = tx.send(LoadProgress::Completed {
            phase,
            processed: report.files_processed(),
            failed: report.failed.len(),
        });
    }

    Ok(report)
}

/// Load every song file, then every log file. The schema must already exist.
pub fn run<D: DatabaseBackend + ?Sized>(
    db: &mut D,
    data: &DataConfig,
    progress_tx: Option<&mpsc::Sender<LoadProgress>>,
) -> Result<RunReport> {
    let songs = process_data(
        &mut *db,
        Phase::Songs,
        &data.song_data,
        &data.extension,
        |db: &mut D, path: &Path| load_song_file(db, path),
        progress_tx,
    )?;
    let logs = process_data(
        db,
        Phase::Logs,
        &data.log_data,
        &data.extension,
        |db: &mut D, path: &Path| load_log_file(db, path),
        progress_tx,
    )?;

    Ok(RunReport { songs, logs })
}
