//! The closed set of failure kinds surfaced by this crate.
//!
//! Every fallible operation returns one of four tagged variants, so callers
//! can pattern-match on the failure category instead of string-matching
//! messages:
//!
//! - [`Error::Io`] — the filesystem refused a temp-file allocation, read,
//!   copy, or delete.
//! - [`Error::ExternalTool`] — the external tool exited non-zero. Carries the
//!   rendered invocation, the exit code, and the combined stdout+stderr so
//!   the failure is diagnosable without re-running anything.
//! - [`Error::InvalidImage`] — a file that should be a decodable image failed
//!   the identify check (at construction, or re-checking a [`write_to`]
//!   copy).
//! - [`Error::Conversion`] — a format conversion produced neither the
//!   expected output path nor a recoverable paged variant.
//!
//! [`write_to`]: crate::image::Image::write_to

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{invocation}` exited with code {code}: {output}")]
    ExternalTool {
        /// The command line, rendered with the documented quoting rule.
        invocation: String,
        /// Exit code of the child; -1 when the process died to a signal.
        code: i32,
        /// Combined stdout + stderr captured from the child.
        output: String,
    },

    #[error("{path} is not a valid image: {output}")]
    InvalidImage { path: PathBuf, output: String },

    #[error("conversion produced no output at {path}")]
    Conversion { path: PathBuf },
}

/// Result type for all crate operations.
pub type Result<T> = std::result::Result<T, Error>;
