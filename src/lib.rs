//! # Simple Magick
//!
//! A thin, typed façade over an external ImageMagick-style command-line
//! tool. It lets a host program manipulate an image — convert formats,
//! composite, resize, read metadata — without hand-assembling shell
//! invocations or babysitting temporary files. All pixel work is delegated
//! to the external tool; this crate does the three supporting jobs that are
//! easy to get subtly wrong:
//!
//! 1. **Command construction and execution** — structured arguments become a
//!    discrete argument vector (no shell), spawned synchronously, with
//!    combined stdout+stderr captured and the exit status as the sole
//!    success signal.
//! 2. **Temp-file lifecycle** — images built from raw bytes own uniquely
//!    named temp files that live exactly as long as the handle, with
//!    ownership rotated (never duplicated, never gapped) across
//!    format-changing operations.
//! 3. **Generic dispatch** — operations this crate has no dedicated method
//!    for forward to the tool's flag syntax through one explicit entry
//!    point, [`Image::operate`], batchable via [`Image::combine_options`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`image`] | The public [`Image`] handle: construction, queries, mutation, conversion, output |
//! | [`command`] | The [`ToolRunner`] seam and the process-spawning [`CommandRunner`] |
//! | [`args`] | Flag construction: one-shot option mapping and the [`CommandArgs`] accumulator |
//! | [`temp`] | Owned temp files: unique allocation, idempotent release, scoped lifetime |
//! | [`error`] | The closed set of tagged failure kinds |
//!
//! # Design Decisions
//!
//! ## Argument Vectors, Not Shell Strings
//!
//! Every invocation passes a discrete argument vector to the child process.
//! Nothing is interpreted by a shell, so paths with spaces or metacharacters
//! need no escaping to arrive intact. The classic quoting rule (quote
//! anything that doesn't start with `+`/`-`) survives only in
//! [`command::render_invocation`], which renders the human-readable command
//! line carried inside [`Error::ExternalTool`] for diagnostics.
//!
//! ## Deterministic Temp-File Ownership
//!
//! Temp files are owned resources attached to an [`Image`]'s lifetime:
//! deleted when the handle is dropped, or rotated during format conversion —
//! the new file is fully populated and bound before the old one is released,
//! so there is never a window with zero live copies of the data. Nothing
//! waits for nondeterministic collection.
//!
//! ## One Process Per Operation, Blocking, No Timeout
//!
//! Every operation spawns one child and blocks until it exits. Independent
//! [`Image`]s may be driven from separate threads; they share nothing but
//! the filesystem, and their temp paths never collide. Callers needing
//! bounded latency must supervise the child externally — this crate attempts
//! every invocation exactly once and never retries.
//!
//! # Example
//!
//! ```no_run
//! use simple_magick::Image;
//!
//! fn main() -> simple_magick::Result<()> {
//!     let bytes = std::fs::read("photo.gif")?;
//!     let mut image = Image::from_bytes(&bytes, "gif")?;
//!
//!     let (w, h) = image.dimensions()?;
//!     println!("{w}x{h}, {}", image.format()?);
//!
//!     image.operate("resize", &["50%"])?;
//!     image.convert_to("png")?;
//!     image.write_to("photo-small.png")?;
//!     Ok(())
//! }
//! ```
//!
//! [`Image`]: image::Image
//! [`Image::operate`]: image::Image::operate
//! [`Image::combine_options`]: image::Image::combine_options
//! [`ToolRunner`]: command::ToolRunner
//! [`CommandRunner`]: command::CommandRunner
//! [`CommandArgs`]: args::CommandArgs
//! [`Error::ExternalTool`]: error::Error::ExternalTool

pub mod args;
pub mod command;
pub mod error;
pub mod image;
pub mod temp;

pub use args::CommandArgs;
pub use command::{CommandRunner, ToolRunner};
pub use error::{Error, Result};
pub use image::Image;
pub use temp::TempFile;
