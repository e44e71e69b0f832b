//! Blob Store - persistence medium for round-trip artifacts
//!
//! `put`/`get`/`delete` by key, backed by memory or by one file per key.
//! [`ScopedBlobs`] tracks the keys a benchmark writes and deletes them when it
//! goes out of scope, whether the benchmark finished, failed or panicked.

use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub trait BlobStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()>;

    fn get(&self, key: &str) -> io::Result<Vec<u8>>;

    /// Removing a missing key is not an error.
    fn delete(&mut self, key: &str) -> io::Result<()>;
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("No blob stored under '{}'", key))
}

// ============================================================
// Memory Store
// ============================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: FxHashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

impl BlobStore for MemoryStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        self.blobs.get(key).cloned().ok_or_else(|| not_found(key))
    }

    fn delete(&mut self, key: &str) -> io::Result<()> {
        self.blobs.remove(key);
        Ok(())
    }
}

// ============================================================
// File Store
// ============================================================

/// One file per key, `<dir>/<key>.blob`.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    /// Directories `open` had to create, deepest first.
    created: Vec<PathBuf>,
}

impl FileStore {
    /// Create the directory and any missing parents.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let created = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, created })
    }

    /// Remove the directories `open` created. Fails if blobs are left behind.
    pub fn close(self) -> io::Result<()> {
        for dir in &self.created {
            match fs::remove_dir(dir) {
                Ok(()) => debug!(dir = %dir.display(), "Removed store directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid || key.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid blob key: '{}'", key),
            ));
        }
        Ok(self.dir.join(format!("{}.blob", key)))
    }
}

impl BlobStore for FileStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let file = File::create(self.path_for(key)?)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()
    }

    fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        let path = self.path_for(key)?;
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found(key)),
            Err(e) => return Err(e),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn delete(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// ============================================================
// Scoped Cleanup
// ============================================================

/// Borrows a store for the length of one benchmark and deletes every key
/// written through it on drop.
pub struct ScopedBlobs<'a, S: BlobStore + ?Sized> {
    store: &'a mut S,
    keys: Vec<String>,
}

impl<'a, S: BlobStore + ?Sized> ScopedBlobs<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            keys: Vec::new(),
        }
    }

    pub fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(key.to_string());
        }
        self.store.put(key, bytes)
    }

    pub fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        self.store.get(key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl<S: BlobStore + ?Sized> Drop for ScopedBlobs<'_, S> {
    fn drop(&mut self) {
        for key in self.keys.drain(..) {
            match self.store.delete(&key) {
                Ok(()) => debug!(key = %key, "Removed round-trip artifact"),
                Err(e) => warn!(key = %key, error = %e, "Failed to remove round-trip artifact"),
            }
        }
    }
}
