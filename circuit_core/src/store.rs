//! Catalog persistence with file locking.
//!
//! The catalog lives in a single JSON file. Reads take a shared lock and
//! writes go through a locked temp file that is renamed over the original.

use crate::{Catalog, Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl Catalog {
    /// Load the catalog from a file with shared locking
    ///
    /// A missing file yields a fresh catalog, seeded with the built-in
    /// exercises when `seed_defaults` is set. A file that cannot be parsed is
    /// an error: it is never replaced behind the user's back.
    pub fn load(path: &Path, seed_defaults: bool) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No catalog file found at {:?}, starting fresh", path);
            return Ok(if seed_defaults {
                Self::with_defaults()
            } else {
                Self::default()
            });
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let catalog: Catalog = serde_json::from_str(&contents).map_err(|e| {
            Error::Catalog(format!("Catalog file {:?} is corrupt: {}", path, e))
        })?;

        for problem in catalog.validate() {
            tracing::warn!("Catalog {:?}: {}", path, problem);
        }

        tracing::debug!(
            "Loaded catalog from {:?} ({} exercises, {} routines)",
            path,
            catalog.exercises.len(),
            catalog.routines.len()
        );
        Ok(catalog)
    }

    /// Save the catalog to a file with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "catalog path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            // Pretty JSON: the catalog is small and users may edit it by hand
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved catalog to {:?}", path);
        Ok(())
    }

    /// Load the catalog, modify it, and save it back
    pub fn update<F, T>(path: &Path, seed_defaults: bool, f: F) -> Result<T>
    where
        F: FnOnce(&mut Catalog) -> Result<T>,
    {
        let mut catalog = Self::load(path, seed_defaults)?;
        let value = f(&mut catalog)?;
        catalog.save(path)?;
        Ok(value)
    }
}
