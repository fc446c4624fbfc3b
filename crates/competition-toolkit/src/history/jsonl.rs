use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, warn};

use crate::evaluation::{CalculationMode, EvaluationResult};

use super::{HistoryError, HistoryRecord, HistoryStore};

/// One JSON object per line in `{dir}/{calculator}_history.jsonl`. Records are
/// only ever appended; a write lock keeps concurrent appends from interleaving.
#[derive(Debug)]
pub struct JsonlHistoryStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| HistoryError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, mode: CalculationMode) -> PathBuf {
        self.dir
            .join(format!("{}_history.jsonl", mode.history_key()))
    }

    fn read_records(&self, path: &Path) -> Result<Vec<HistoryRecord>, HistoryError> {
        let io_error = |source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(err)),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(io_error)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %err,
                    "skipping unreadable history record"
                ),
            }
        }
        Ok(records)
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn append(&self, result: &EvaluationResult) -> Result<HistoryRecord, HistoryError> {
        let record = HistoryRecord::new(result.clone(), Utc::now());
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let path = self.path_for(record.mode);
        let io_error = |source| HistoryError::Io {
            path: path.clone(),
            source,
        };

        let _guard = self.write_lock.lock().expect("history mutex poisoned");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)?;

        debug!(id = %record.id, path = %path.display(), "history record appended");
        Ok(record)
    }

    fn load(&self, mode: CalculationMode) -> Result<Vec<HistoryRecord>, HistoryError> {
        self.read_records(&self.path_for(mode))
    }

    fn clear(&self, mode: CalculationMode) -> Result<usize, HistoryError> {
        let path = self.path_for(mode);
        let _guard = self.write_lock.lock().expect("history mutex poisoned");
        let removed = self.read_records(&path)?.len();

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(HistoryError::Io { path, source }),
        }
        Ok(removed)
    }
}
