//! Atomic file replacement
//!
//! A trace is written to a temporary sibling file first. Only after the whole
//! trace is flushed and synced is the temporary file renamed over the target,
//! so an interrupted or cancelled save never leaves a truncated trace behind.
//!
//! 1. [`AtomicFile::create`] opens `<target>.<ext>`
//! 2. Caller writes through [`AtomicFile::file`]
//! 3. [`AtomicFile::commit`] syncs and renames, [`AtomicFile::discard`]
//!    removes the temporary file

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// A file being written in place of `target`
#[derive(Debug)]
pub struct AtomicFile {
    file: File,
    temp_path: PathBuf,
    target: PathBuf,
}

impl AtomicFile {
    /// Open `temp_path` for writing; `target` is replaced on commit
    pub fn create<P1, P2>(target: P1, temp_path: P2) -> io::Result<Self>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let target = target.as_ref().to_path_buf();
        let temp_path = temp_path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&temp_path)?;
        Ok(Self {
            file,
            temp_path,
            target,
        })
    }

    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Sync the temporary file and rename it over the target
    pub fn commit(self) -> io::Result<()> {
        self.file.sync_all()?;
        drop(self.file);
        fs::rename(&self.temp_path, &self.target)
    }

    /// Drop the temporary file, leaving the target untouched
    pub fn discard(self) -> io::Result<()> {
        drop(self.file);
        match fs::remove_file(&self.temp_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
