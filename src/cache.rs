//! Load-once access to the prepared table, refreshed when the source file changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::csv_reader::read_data;
use crate::dataset::{prepare, PreparedTable};
use crate::error::{InsightsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Fingerprint> {
        let metadata = fs::metadata(path).map_err(|source| InsightsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Fingerprint {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    entry: Option<(Fingerprint, Arc<PreparedTable>)>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entry: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepared table for the current contents of the source file.
    pub fn get(&mut self) -> Result<Arc<PreparedTable>> {
        let fingerprint = Fingerprint::of(&self.path)?;
        if let Some((cached, table)) = &self.entry {
            if *cached == fingerprint {
                tracing::trace!("Dataset cache hit for {}", self.path.display());
                return Ok(Arc::clone(table));
            }
            tracing::info!("{} changed on disk; reloading", self.path.display());
        }

        let table = Arc::new(prepare(read_data(&self.path)?));
        self.entry = Some((fingerprint, Arc::clone(&table)));
        Ok(table)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::COLUMNS;
    use std::io::Write;

    fn write_csv(path: &Path, rows: &[&str]) {
        let mut file = fs::File::create(path).unwrap();
        writeln!(file, "{}", COLUMNS.join(",")).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
    }

    #[test]
    fn repeated_access_shares_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        write_csv(&path, &["25,F,SP,Sim,Sim,Sim,Sim,,1,1,1,Startup,2,CLT"]);

        let mut cache = DatasetCache::new(&path);
        assert!(!cache.is_loaded());
        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn reloads_after_source_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        write_csv(&path, &["25,F,SP,Sim,Sim,Sim,Sim,,1,1,1,Startup,2,CLT"]);

        let mut cache = DatasetCache::new(&path);
        let first = cache.get().unwrap();

        write_csv(
            &path,
            &[
                "25,F,SP,Sim,Sim,Sim,Sim,,1,1,1,Startup,2,CLT",
                "31,M,RJ,Não,Não,Não,Não,,0,0,0,Governo,8,PJ",
            ],
        );
        let second = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        write_csv(&path, &["25,F,SP,Sim,Sim,Sim,Sim,,1,1,1,Startup,2,CLT"]);

        let mut cache = DatasetCache::new(&path);
        let first = cache.get().unwrap();
        cache.invalidate();
        let second = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
