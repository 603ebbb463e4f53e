//! Pseudo-file access for sysfs attributes.
//!
//! sysfs attributes are read and written as short ASCII strings from offset
//! zero. A [`PseudoFile`] keeps one attribute open for the lifetime of the
//! daemon and rewinds before every access; [`write_attribute`] covers the
//! one-shot writes used while configuring pins.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    os::fd::{AsRawFd, RawFd},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Largest attribute value the daemon ever reads.
const READ_CHUNK: usize = 16;

/// Access mode requested when opening a [`PseudoFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// An open sysfs attribute.
///
/// The descriptor is closed when the handle is dropped, so every exit path of
/// the daemon releases it.
#[derive(Debug)]
pub struct PseudoFile {
    path: PathBuf,
    file: File,
}

impl PseudoFile {
    /// Opens `path` with the requested access. The file must already exist.
    pub fn open(path: impl AsRef<Path>, access: Access) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(matches!(access, Access::ReadOnly | Access::ReadWrite))
            .write(matches!(access, Access::WriteOnly | Access::ReadWrite))
            .open(&path)
            .with_context(|| format!("open failed: {}", path.display()))?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewinds and reads the current value.
    ///
    /// Short reads are tolerated: whatever was returned is decoded lossily and
    /// trailing whitespace is stripped.
    pub fn read_value(&self) -> Result<String> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))
            .with_context(|| format!("seek failed: {}", self.path.display()))?;

        let mut buf = [0u8; READ_CHUNK];
        let len = file
            .read(&mut buf)
            .with_context(|| format!("read failed: {}", self.path.display()))?;

        Ok(String::from_utf8_lossy(&buf[..len]).trim_end().to_string())
    }

    /// Rewinds and writes `value`.
    ///
    /// The file is not truncated: a sysfs attribute takes each write as a
    /// whole new value. On a regular file a shorter value leaves the tail of
    /// the previous one in place.
    pub fn write_value(&self, value: &str) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(value.as_bytes()))
            .with_context(|| format!("write of '{value}' failed: {}", self.path.display()))
    }

    /// Duplicates the underlying descriptor.
    ///
    /// Used to hand a button's `value` attribute to the readiness reactor while
    /// the handler keeps its own copy for sampling.
    pub fn try_clone_file(&self) -> Result<File> {
        self.file
            .try_clone()
            .with_context(|| format!("dup failed: {}", self.path.display()))
    }
}

impl AsRawFd for PseudoFile {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Opens `path`, writes `value` once, and closes it again.
pub fn write_attribute(path: impl AsRef<Path>, value: &str) -> Result<()> {
    let path = path.as_ref();
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .and_then(|mut f| f.write_all(value.as_bytes()))
        .with_context(|| format!("write of '{value}' failed: {}", path.display()))
}
