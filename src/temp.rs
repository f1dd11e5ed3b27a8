//! Owned temporary files for image storage.
//!
//! Every [`Image`](crate::image::Image) built from raw bytes (rather than
//! wrapping a caller-supplied path) materializes those bytes in a temp file
//! it owns exclusively. Ownership is scoped and deterministic:
//!
//! - [`TempFile::allocate`] creates a uniquely named file in the platform
//!   temp directory with a caller-chosen extension.
//! - [`TempFile::release`] deletes the backing file immediately and is
//!   idempotent — releasing twice, or releasing a file something else already
//!   removed, is a no-op.
//! - Dropping a `TempFile` releases it.
//!
//! There is no `Clone`: at most one owner exists at a time. Format conversion
//! transfers ownership by binding a fresh `TempFile` first and releasing the
//! old one only after the new one is fully populated, so there is never a
//! window with zero live copies of the image data.

use crate::error::Result;
use std::io;
use std::path::{Path, PathBuf};

/// A uniquely named temporary file, deleted on [`release`](Self::release) or
/// drop.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    released: bool,
}

impl TempFile {
    /// Create a new uniquely named file in the platform temp directory.
    ///
    /// `extension` is appended as `.{extension}`; an empty extension yields a
    /// bare name. The file exists (empty) when this returns.
    pub fn allocate(extension: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("simple-magick-");
        let suffix = if extension.is_empty() {
            String::new()
        } else {
            format!(".{extension}")
        };
        builder.suffix(&suffix);
        // keep() detaches deletion from tempfile's own drop guard; lifetime
        // is managed by release()/Drop below.
        let (_file, path) = builder.tempfile()?.keep().map_err(|e| e.error)?;
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Take ownership of an existing file, typically one the external tool
    /// just wrote. Released on [`release`](Self::release) or drop exactly
    /// like an allocated temp file.
    pub(crate) fn adopt(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// The current on-disk location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file now. Idempotent: a second call, or a call
    /// after the file was removed out from under us (format conversion
    /// deletes the old path itself), succeeds silently.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
