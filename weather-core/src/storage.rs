//! Key-value persistence for the location list and unit preference.
//!
//! Values are plain strings; callers decide how to encode them. There are no
//! transactions: each `set` is a full overwrite and the last writer wins.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::warn;

pub const LOCATIONS_KEY: &str = "weather-app-locations";
pub const UNIT_KEY: &str = "weather-app-unit";

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents, or `None` when nothing has been saved yet.
    fn read_contents(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read state file: {}", self.path.display())),
        }
    }

    fn parse(&self, contents: &str) -> Result<HashMap<String, String>> {
        serde_json::from_str(contents)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.read_contents()? {
            Some(contents) => Ok(self.parse(&contents)?.remove(key)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = match self.read_contents()? {
            // A corrupt file is replaced rather than blocking every future write.
            Some(contents) => self.parse(&contents).unwrap_or_else(|err| {
                warn!(error = %err, "replacing unreadable state file");
                HashMap::new()
            }),
            None => HashMap::new(),
        };
        entries.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize state")?;

        write_atomically(&self.path, |file| {
            file.write_all(json.as_bytes()).context("Failed to write state")
        })
    }
}

/// Write through a temp file in the target directory, then rename it over `path`.
///
/// `path` either keeps its old contents or gets the complete new ones.
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut NamedTempFile) -> Result<()>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in: {}", dir.display()))?;

    write(&mut file)?;
    file.as_file().sync_all().context("Failed to flush state")?;

    file.persist(path)
        .with_context(|| format!("Failed to write state file: {}", path.display()))?;

    Ok(())
}
