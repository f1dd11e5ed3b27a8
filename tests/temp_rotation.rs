//! Owned temp storage must survive a failed rotation.
//!
//! Format conversion rotates an owned image onto a fresh temp file. If that
//! rotation fails partway (here: temp allocation refused because the temp
//! directory is unusable), the already-converted output must stay owned by
//! the image and be deleted when the image drops — never left orphaned on
//! disk. This runs as its own integration binary because it repoints TMPDIR,
//! which would disturb concurrently running temp allocations in the unit
//! test binary.

#![cfg(unix)]

use simple_magick::{Error, Image, Result, ToolRunner};
use std::path::PathBuf;

/// Stands in for the external tool: the convert verb writes its output
/// path, everything else (identify validation) succeeds silently.
struct ConvertWritingRunner;

impl ToolRunner for ConvertWritingRunner {
    fn run(&self, verb: &str, args: &[String]) -> Result<String> {
        if verb == "convert" {
            if let [_, _, _source, dest] = args {
                std::fs::write(dest, b"converted bytes")?;
            }
        }
        Ok(String::new())
    }
}

#[test]
fn failed_temp_rotation_keeps_converted_output_owned() {
    let mut image = Image::from_bytes_with(ConvertWritingRunner, b"gif bytes", "gif").unwrap();
    let old_path = image.path().to_path_buf();
    let converted = PathBuf::from(format!("{}.png", old_path.display()));

    // Make the fresh-temp allocation inside the rotation fail while the
    // conversion itself succeeds.
    let saved_tmpdir = std::env::var_os("TMPDIR");
    unsafe { std::env::set_var("TMPDIR", "/nonexistent/simple-magick-tmp") };
    let outcome = image.convert_to("png").map(|_| ());
    unsafe {
        match &saved_tmpdir {
            Some(dir) => std::env::set_var("TMPDIR", dir),
            None => std::env::remove_var("TMPDIR"),
        }
    }

    assert!(matches!(outcome, Err(Error::Io(_))));

    // The converted output is adopted, not orphaned: still owned, still
    // bound, still on disk.
    assert!(image.owns_temp());
    assert_eq!(image.path(), converted);
    assert!(converted.exists());
    assert!(!old_path.exists());

    drop(image);
    assert!(!converted.exists());
}
