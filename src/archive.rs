//! Random-access view over an uncompressed tar archive.
//!
//! Opening the archive walks its headers once, recording where every entry's
//! data starts. Entries are then served by seeking the underlying file, so any
//! entry can be read repeatedly without rescanning the archive.

use crate::error::{PackError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tar_rs as tar;

#[derive(Debug, Clone)]
struct EntryLocation {
    path: String,
    offset: u64,
    size: u64,
}

#[derive(Debug)]
pub struct ArchiveReader {
    archive_path: PathBuf,
    entries: Vec<EntryLocation>,
}

impl ArchiveReader {
    /// Indexes the archive at `archive_path`.
    ///
    /// A container that is not a well-formed tar stream is reported as
    /// [`PackError::Validation`].
    pub fn open<P: AsRef<Path>>(archive_path: P) -> Result<Self> {
        let archive_path = archive_path.as_ref().to_path_buf();
        let file = File::open(&archive_path)?;
        let mut archive = tar::Archive::new(BufReader::new(file));

        let invalid = |e: std::io::Error| {
            PackError::Validation(format!(
                "{} is not a valid tar archive: {}",
                archive_path.display(),
                e
            ))
        };

        let mut entries = Vec::new();
        for entry in archive.entries().map_err(invalid)? {
            let entry = entry.map_err(invalid)?;
            let path = entry.path().map_err(invalid)?;
            entries.push(EntryLocation {
                path: path.to_string_lossy().into_owned(),
                offset: entry.raw_file_position(),
                size: entry.size(),
            });
        }

        log::debug!(
            "Indexed {} entries in {}",
            entries.len(),
            archive_path.display()
        );

        Ok(Self {
            archive_path,
            entries,
        })
    }

    /// Paths ending with `suffix`, in archive order.
    pub fn search(&self, suffix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.path.ends_with(suffix))
            .map(|e| e.path.clone())
            .collect()
    }

    /// Opens a forward-only stream over one entry's bytes.
    pub fn input_stream(&self, path: &str) -> Result<impl Read> {
        let location = self.locate(path)?;
        let mut file = File::open(&self.archive_path)?;
        file.seek(SeekFrom::Start(location.offset))?;
        Ok(BufReader::new(file).take(location.size))
    }

    /// Reads one entry fully into memory.
    pub fn content(&self, path: &str) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.locate(path)?.size as usize);
        self.input_stream(path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn locate(&self, path: &str) -> Result<&EntryLocation> {
        // Later entries shadow earlier ones with the same name.
        self.entries
            .iter()
            .rev()
            .find(|e| e.path == path)
            .ok_or_else(|| {
                PackError::NotFound(format!(
                    "entry '{}' in {}",
                    path,
                    self.archive_path.display()
                ))
            })
    }
}
