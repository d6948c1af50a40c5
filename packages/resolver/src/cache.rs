use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Shared cache of directory listings, keyed by absolute directory path.
///
/// Listings are sorted by name. Readers share the lock; a miss reads the
/// directory outside the lock and then inserts.
#[derive(Debug, Default)]
pub struct DirCache {
    enabled: bool,
    listings: RwLock<HashMap<PathBuf, Arc<[DirEntry]>>>,
}

impl DirCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            listings: RwLock::new(HashMap::new()),
        }
    }

    /// List `dir`, from the cache when possible.
    pub fn list(&self, dir: &Path) -> io::Result<Arc<[DirEntry]>> {
        if self.enabled {
            let listings = self.listings.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entries) = listings.get(dir) {
                return Ok(Arc::clone(entries));
            }
        }

        let entries: Arc<[DirEntry]> = read_listing(dir)?.into();
        if self.enabled {
            self.listings
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(dir.to_path_buf(), Arc::clone(&entries));
        }
        Ok(entries)
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) {
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached listings.
    pub fn len(&self) -> usize {
        self.listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_listing(dir: &Path) -> io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // follow symlinks so a linked directory lists as a directory
        let is_dir = fs::metadata(entry.path())
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(DirEntry { name, is_dir });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
