use crate::error::MotionError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One time-step's complete set of per-joint target angles, degrees.
pub type Frame = HashMap<String, f64>;

/// A named, immutable, ordered sequence of [`Frame`]s.
#[derive(Debug, Clone)]
pub struct Recording {
    pub name: String,
    pub frames: Vec<Frame>,
}

impl Recording {
    pub fn new(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Resolves recording names to files and loads them, caching each
/// recording for the lifetime of the store. A user-override directory
/// is consulted before the built-in directory, so users can shadow
/// shipped choreography with their own.
pub struct RecordingStore {
    user_dir: Option<PathBuf>,
    builtin_dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<Recording>>>,
}

impl RecordingStore {
    pub fn new(builtin_dir: impl Into<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            user_dir,
            builtin_dir: builtin_dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Locate the file backing `name`, preferring the user directory.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.csv");
        self.user_dir
            .iter()
            .chain(std::iter::once(&self.builtin_dir))
            .map(|dir| dir.join(&file))
            .find(|path| path.is_file())
    }

    /// Load and cache the recording called `name`.
    pub fn get(&self, name: &str) -> Result<Arc<Recording>, MotionError> {
        if let Some(hit) = self.cache.lock().unwrap().get(name) {
            return Ok(hit.clone());
        }
        let path = self
            .resolve(name)
            .ok_or_else(|| MotionError::RecordingNotFound(name.to_string()))?;
        let frames = load(&path)?;
        debug!(%name, frames = frames.len(), path = %path.display(), "loaded recording");
        let recording = Arc::new(Recording::new(name, frames));
        self.cache
            .lock()
            .unwrap()
            .insert(recording.name.clone(), recording.clone());
        Ok(recording)
    }

    /// Place a recording directly into the cache, bypassing the
    /// filesystem. Used by the demo binary and tests.
    pub fn insert(&self, recording: Recording) -> Arc<Recording> {
        let recording = Arc::new(recording);
        self.cache
            .lock()
            .unwrap()
            .insert(recording.name.clone(), recording.clone());
        recording
    }
}

/// Parse a tabular recording file: a header row of joint keys (plus a
/// `timestamp` column, ignored at playback) and one data row per
/// frame.
pub fn load(path: &Path) -> Result<Vec<Frame>, MotionError> {
    let load_err = |reason: String| MotionError::RecordingLoad {
        path: path.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| load_err("empty file".into()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let mut frames = Vec::new();
    for (row, line) in lines.enumerate() {
        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        if values.len() != columns.len() {
            return Err(load_err(format!(
                "row {} has {} values, expected {}",
                row + 1,
                values.len(),
                columns.len()
            )));
        }
        let mut frame = Frame::new();
        for (column, raw) in columns.iter().zip(&values) {
            if *column == "timestamp" {
                continue;
            }
            let angle: f64 = raw
                .parse()
                .map_err(|_| load_err(format!("row {}: bad angle `{raw}`", row + 1)))?;
            frame.insert((*column).to_string(), angle);
        }
        frames.push(frame);
    }
    if frames.is_empty() {
        return Err(load_err("no frames".into()));
    }
    Ok(frames)
}
