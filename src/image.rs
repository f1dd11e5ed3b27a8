//! The public image handle.
//!
//! An [`Image`] is one image resource currently materialized at a filesystem
//! path. It either wraps a caller-supplied path (no ownership) or owns a
//! [`TempFile`] holding bytes it was built from. Every operation shells out
//! to the external tool through the [`ToolRunner`] seam, synchronously, one
//! child process per call.
//!
//! Invariant: after construction and after every mutating operation, the
//! bound path identifies as a valid image. Construction verifies this and
//! fails with [`Error::InvalidImage`] otherwise.
//!
//! ## Operation surface
//!
//! | Kind | Methods |
//! |---|---|
//! | Construction | [`from_bytes`], [`from_path`], [`blank`] (+ `_with` runner variants) |
//! | Queries | [`format`], [`width`], [`height`], [`dimensions`], [`size`], [`original_at`], [`exif_field`], [`query`] |
//! | In-place mutation | [`mogrify`], [`operate`], [`combine_options`], [`composite`], [`clut`], [`fill`] |
//! | Format change | [`convert_to`], [`convert_to_page`] |
//! | Output | [`write_to`], [`to_bytes`] |
//!
//! Unrecognized operations have no reflection-style catch-all: [`operate`]
//! is the explicit generic dispatch (`-<name>`, positional args, path
//! appended last, in-place verb), and [`query`] is the generic metadata
//! fallback (raw format token to the identify verb).
//!
//! [`from_bytes`]: Image::from_bytes
//! [`from_path`]: Image::from_path
//! [`blank`]: Image::blank
//! [`format`]: Image::format
//! [`width`]: Image::width
//! [`height`]: Image::height
//! [`dimensions`]: Image::dimensions
//! [`size`]: Image::size
//! [`original_at`]: Image::original_at
//! [`exif_field`]: Image::exif_field
//! [`query`]: Image::query
//! [`mogrify`]: Image::mogrify
//! [`operate`]: Image::operate
//! [`combine_options`]: Image::combine_options
//! [`composite`]: Image::composite
//! [`clut`]: Image::clut
//! [`fill`]: Image::fill
//! [`convert_to`]: Image::convert_to
//! [`convert_to_page`]: Image::convert_to_page
//! [`write_to`]: Image::write_to
//! [`to_bytes`]: Image::to_bytes

use crate::args::{CommandArgs, from_options};
use crate::command::{CommandRunner, ToolRunner, first_line, line_separator};
use crate::error::{Error, Result};
use crate::temp::TempFile;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IDENTIFY: &str = "identify";
const CONVERT: &str = "convert";
const MOGRIFY: &str = "mogrify";
const COMPOSITE: &str = "composite";

/// EXIF original-capture timestamp layout (`2021:01:30 14:15:16`).
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// A handle to one on-disk image, driving the external tool.
///
/// Generic over the [`ToolRunner`] seam so tests (and hosts with custom tool
/// discovery) can substitute the process-spawning layer; defaults to the real
/// [`CommandRunner`].
#[derive(Debug)]
pub struct Image<R: ToolRunner = CommandRunner> {
    path: PathBuf,
    temp: Option<TempFile>,
    runner: R,
}

impl Image<CommandRunner> {
    /// Materialize raw bytes in an owned temp file and validate them.
    pub fn from_bytes(bytes: &[u8], extension: &str) -> Result<Self> {
        Self::from_bytes_with(CommandRunner::new(), bytes, extension)
    }

    /// Wrap an existing file without taking ownership of it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with(CommandRunner::new(), path)
    }

    /// Create a solid-colour canvas of the given geometry in an owned temp
    /// file.
    pub fn blank(size: &str, colour: &str, extension: &str) -> Result<Self> {
        Self::blank_with(CommandRunner::new(), size, colour, extension)
    }
}

impl<R: ToolRunner> Image<R> {
    /// [`from_bytes`](Image::from_bytes) with an explicit runner.
    pub fn from_bytes_with(runner: R, bytes: &[u8], extension: &str) -> Result<Self> {
        let temp = TempFile::allocate(extension)?;
        fs::write(temp.path(), bytes)?;
        let image = Self {
            path: temp.path().to_path_buf(),
            temp: Some(temp),
            runner,
        };
        image.validate(&image.path)?;
        Ok(image)
    }

    /// [`from_path`](Image::from_path) with an explicit runner.
    pub fn from_path_with(runner: R, path: impl AsRef<Path>) -> Result<Self> {
        let image = Self {
            path: path.as_ref().to_path_buf(),
            temp: None,
            runner,
        };
        image.validate(&image.path)?;
        Ok(image)
    }

    /// [`blank`](Image::blank) with an explicit runner.
    ///
    /// Allocates an empty temp image and immediately repaints it via
    /// [`fill`](Image::fill), skipping the validity check an empty file could
    /// never pass.
    pub fn blank_with(runner: R, size: &str, colour: &str, extension: &str) -> Result<Self> {
        let temp = TempFile::allocate(extension)?;
        let mut image = Self {
            path: temp.path().to_path_buf(),
            temp: Some(temp),
            runner,
        };
        image.fill(size, colour, &[])?;
        Ok(image)
    }

    /// Current on-disk location. Changes across format conversion.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The runner driving this image's tool invocations.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether this image owns its backing temp file.
    pub fn owns_temp(&self) -> bool {
        self.temp.is_some()
    }

    fn path_arg(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Check that `path` identifies as a decodable image.
    fn validate(&self, path: &Path) -> Result<()> {
        let arg = path.to_string_lossy().into_owned();
        match self.runner.run(IDENTIFY, &[arg]) {
            Ok(_) => Ok(()),
            Err(Error::ExternalTool { output, .. }) => Err(Error::InvalidImage {
                path: path.to_path_buf(),
                output,
            }),
            Err(e) => Err(e),
        }
    }

    // --- Attribute queries ---

    /// Run the identify verb with a `-format` token and return the first
    /// line of output. Multi-frame images emit one record per frame; scalar
    /// queries always take the first.
    fn identify_format(&self, token: &str) -> Result<String> {
        let format = format!("{token}{}", line_separator());
        let output = self
            .runner
            .run(IDENTIFY, &["-format".into(), format, self.path_arg()])?;
        Ok(first_line(&output).to_string())
    }

    /// The image format name as the tool reports it (e.g. `GIF`, `JPEG`).
    pub fn format(&self) -> Result<String> {
        self.identify_format("%m")
    }

    /// Width in pixels.
    pub fn width(&self) -> Result<u32> {
        let line = self.identify_format("%w")?;
        self.parse_scalar(line.split_whitespace().next().unwrap_or(""))
    }

    /// Height in pixels.
    pub fn height(&self) -> Result<u32> {
        let line = self.identify_format("%h")?;
        self.parse_scalar(line.split_whitespace().next().unwrap_or(""))
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let line = self.identify_format("%w %h")?;
        let mut parts = line.split_whitespace();
        let w = self.parse_scalar(parts.next().unwrap_or(""))?;
        let h = self.parse_scalar(parts.next().unwrap_or(""))?;
        Ok((w, h))
    }

    fn parse_scalar(&self, token: &str) -> Result<u32> {
        // The tool printed something non-numeric where a dimension belongs;
        // treat it like any other failed identify.
        token.parse().map_err(|_| Error::InvalidImage {
            path: self.path.clone(),
            output: token.to_string(),
        })
    }

    /// Byte length of the backing file.
    ///
    /// Read from the filesystem, not the tool: the tool's own `%b` query
    /// fails on multi-frame files.
    pub fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Best-effort EXIF original-capture timestamp.
    ///
    /// Returns `Ok(None)` when the field is absent or malformed — timestamp
    /// presence is optional metadata, so parse failures never surface as
    /// errors. Tool and IO failures still do.
    pub fn original_at(&self) -> Result<Option<NaiveDateTime>> {
        let raw = self.exif_field("DateTimeOriginal")?;
        Ok(NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT).ok())
    }

    /// A single EXIF metadata field.
    ///
    /// Exactly one trailing character (the tool's newline) is chopped from
    /// the raw output, not a full whitespace trim. Kept byte-for-byte as the
    /// long-standing behavior; if the tool ever stops terminating the record
    /// this will eat a real character.
    pub fn exif_field(&self, name: &str) -> Result<String> {
        let mut output = self.runner.run(
            IDENTIFY,
            &["-format".into(), format!("%[EXIF:{name}]"), self.path_arg()],
        )?;
        output.pop();
        Ok(output)
    }

    /// Generic metadata fallback: forward `token` verbatim as the identify
    /// format string and return the first line of output.
    pub fn query(&self, token: &str) -> Result<String> {
        self.identify_format(token)
    }

    // --- In-place mutation ---

    /// Raw passthrough: arbitrary flags to the in-place verb, with this
    /// image's path appended as the final argument.
    pub fn mogrify(&mut self, flags: &[&str]) -> Result<&mut Self> {
        let mut args: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        args.push(self.path_arg());
        self.runner.run(MOGRIFY, &args)?;
        Ok(self)
    }

    /// Generic dispatch for operations this crate has no dedicated method
    /// for: `name` becomes `-name`, `values` follow positionally, the path
    /// is appended last, and the in-place verb runs once.
    ///
    /// `operate("resize", &["50%"])` is exactly
    /// `mogrify(&["-resize", "50%"])`.
    pub fn operate(&mut self, name: &str, values: &[&str]) -> Result<&mut Self> {
        let mut args = vec![format!("-{name}")];
        args.extend(values.iter().map(|v| v.to_string()));
        args.push(self.path_arg());
        self.runner.run(MOGRIFY, &args)?;
        Ok(self)
    }

    /// Compose several flags via [`CommandArgs`] and issue one in-place
    /// invocation instead of one process spawn per flag.
    pub fn combine_options(&mut self, build: impl FnOnce(&mut CommandArgs)) -> Result<&mut Self> {
        let mut composed = CommandArgs::new();
        build(&mut composed);
        if composed.is_empty() {
            return Ok(self);
        }
        let mut args = composed.into_args();
        args.push(self.path_arg());
        self.runner.run(MOGRIFY, &args)?;
        Ok(self)
    }

    /// Blend `other` onto this image in place.
    ///
    /// `other` is any path-like source, including another [`Image`].
    /// Argument order: option flags, then `[other, self, self]`.
    pub fn composite(
        &mut self,
        other: impl AsRef<Path>,
        options: &[(&str, &str)],
    ) -> Result<&mut Self> {
        let mut args = from_options(options);
        args.push(other.as_ref().to_string_lossy().into_owned());
        args.push(self.path_arg());
        args.push(self.path_arg());
        self.runner.run(COMPOSITE, &args)?;
        Ok(self)
    }

    /// Apply `other` as a colour lookup table, in place.
    ///
    /// Argument order: `-clut`, option flags, then `[self, other, self]`.
    pub fn clut(&mut self, other: impl AsRef<Path>, options: &[(&str, &str)]) -> Result<&mut Self> {
        let mut args = vec!["-clut".to_string()];
        args.extend(from_options(options));
        args.push(self.path_arg());
        args.push(other.as_ref().to_string_lossy().into_owned());
        args.push(self.path_arg());
        self.runner.run(CONVERT, &args)?;
        Ok(self)
    }

    /// Repaint this image as a solid-colour canvas of the given geometry.
    ///
    /// `colour` passes through verbatim to the tool's `xc:` colour syntax,
    /// sentinel values like `"none"` included.
    pub fn fill(&mut self, size: &str, colour: &str, options: &[(&str, &str)]) -> Result<&mut Self> {
        let mut args = vec!["-size".to_string(), size.to_string(), format!("xc:{colour}")];
        args.extend(from_options(options));
        args.push(self.path_arg());
        self.runner.run(CONVERT, &args)?;
        Ok(self)
    }

    // --- Format conversion ---

    /// [`convert_to_page`](Image::convert_to_page) selecting page 0.
    pub fn convert_to(&mut self, format: &str) -> Result<&mut Self> {
        self.convert_to_page(format, 0)
    }

    /// Convert this image to another format, rebinding the path (and owned
    /// temp storage, if any) to the converted output.
    ///
    /// The new path is the old path with `.{format}` appended. When the tool
    /// emits paged outputs instead of the requested path (multi-frame
    /// sources), the requested `page` is recovered from
    /// `{old}-{page}.{format}`. Stray paged siblings
    /// (`{old}-0.{format}`, `{old}-1.{format}`, …) are removed
    /// unconditionally, on success and on failure, so a failed conversion
    /// never leaks intermediate artifacts.
    pub fn convert_to_page(&mut self, format: &str, page: u32) -> Result<&mut Self> {
        let old_path = self.path.clone();
        let new_path = PathBuf::from(format!("{}.{format}", old_path.display()));

        let converted = self.run_conversion(&old_path, &new_path, format, page);
        remove_paged_outputs(&old_path, format);
        converted?;

        self.path = new_path.clone();

        // Rotate owned temp storage. The converted output is adopted before
        // anything fallible runs, so the image owns exactly one live file at
        // every step: a failed allocation or rename leaves the adopted
        // output bound (and deleted on drop), and the fresh file is fully
        // populated and bound before either predecessor is released.
        if self.temp.is_some() {
            let previous = self.temp.replace(TempFile::adopt(new_path.clone()));
            let fresh = TempFile::allocate(format)?;
            fs::rename(&new_path, fresh.path())?;
            self.path = fresh.path().to_path_buf();
            if let Some(mut adopted) = self.temp.replace(fresh) {
                // Backing file already moved into the fresh temp.
                adopted.release()?;
            }
            if let Some(mut previous) = previous {
                previous.release()?;
            }
        }

        Ok(self)
    }

    fn run_conversion(
        &self,
        old_path: &Path,
        new_path: &Path,
        format: &str,
        page: u32,
    ) -> Result<()> {
        self.runner.run(
            CONVERT,
            &[
                "-format".into(),
                format.to_string(),
                old_path.to_string_lossy().into_owned(),
                new_path.to_string_lossy().into_owned(),
            ],
        )?;

        match fs::remove_file(old_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Multi-frame sources make the tool emit one file per frame instead
        // of the requested output; recover the requested page.
        if !new_path.exists() {
            let paged = PathBuf::from(format!("{}-{page}.{format}", old_path.display()));
            if paged.exists() {
                fs::copy(&paged, new_path)?;
            }
        }

        if new_path.exists() {
            Ok(())
        } else {
            Err(Error::Conversion {
                path: new_path.to_path_buf(),
            })
        }
    }

    // --- Output ---

    /// Copy the current bytes to `dest` and verify the copy identifies as a
    /// valid image there.
    pub fn write_to(&self, dest: impl AsRef<Path>) -> Result<()> {
        fs::copy(&self.path, dest.as_ref())?;
        self.validate(dest.as_ref())
    }

    /// The full current file contents.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }
}

impl<R: ToolRunner> AsRef<Path> for Image<R> {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Best-effort removal of `{old}-{digits}.{format}` siblings left by a paged
/// conversion. Always runs, including after a failed conversion.
fn remove_paged_outputs(old_path: &Path, format: &str) {
    let Some(parent) = old_path.parent() else {
        return;
    };
    let Some(name) = old_path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let prefix = format!("{name}-");
    let suffix = format!(".{format}");

    let Ok(entries) = fs::read_dir(parent) else {
        return;
    };
    for entry in entries.flatten() {
        let candidate = entry.file_name();
        let Some(candidate) = candidate.to_str() else {
            continue;
        };
        let Some(middle) = candidate
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        if !middle.is_empty() && middle.bytes().all(|b| b.is_ascii_digit()) {
            let _ = fs::remove_file(entry.path());
        }
    }
}
