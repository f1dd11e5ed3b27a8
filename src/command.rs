//! External tool invocation.
//!
//! The [`ToolRunner`] trait is the single seam between this crate and the
//! outside world: everything above it (argument building, the [`Image`]
//! handle) is pure logic, everything below it is one synchronous child
//! process per call.
//!
//! The production implementation is [`CommandRunner`] — it spawns the verb
//! with a discrete argument vector (no shell), so arguments with spaces or
//! shell metacharacters need no escaping to reach the child intact. The
//! historical quoting rule survives in [`render_invocation`], which produces
//! the human-readable command line carried by
//! [`Error::ExternalTool`](crate::error::Error::ExternalTool).
//!
//! [`Image`]: crate::image::Image

use crate::error::{Error, Result};
use std::process::{Command, Stdio};

/// Seam trait for invoking the external tool.
///
/// `verb` is the tool subcommand (`identify`, `convert`, `mogrify`,
/// `composite`); `args` is the ordered argument vector. Implementations
/// return the combined stdout+stderr on a zero exit status and
/// [`Error::ExternalTool`] otherwise.
pub trait ToolRunner {
    fn run(&self, verb: &str, args: &[String]) -> Result<String>;
}

/// Spawns one blocking child process per call.
///
/// No timeout and no cancellation: a hang in the external tool hangs the
/// calling operation. Callers needing bounded latency must supervise the
/// process externally.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for CommandRunner {
    fn run(&self, verb: &str, args: &[String]) -> Result<String> {
        let child = Command::new(verb)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let mut output = String::from_utf8_lossy(&child.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&child.stderr));

        if child.status.success() {
            Ok(output)
        } else {
            Err(Error::ExternalTool {
                invocation: render_invocation(verb, args),
                code: child.status.code().unwrap_or(-1),
                output,
            })
        }
    }
}

/// Render a command line for display.
///
/// The quoting rule: any argument that does *not* start with `+` or `-` is
/// wrapped in double quotes; flag-like arguments pass through raw. This keeps
/// flag tokens unambiguous while protecting path-like and value arguments
/// that may contain spaces. Spawning itself uses the argument vector
/// directly, so this affects error messages only.
pub fn render_invocation(verb: &str, args: &[String]) -> String {
    let mut line = String::from(verb);
    for arg in args {
        line.push(' ');
        if arg.starts_with('+') || arg.starts_with('-') {
            line.push_str(arg);
        } else {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        }
    }
    line
}

/// The line terminator to append to identify `-format` strings.
///
/// Multi-frame images make the tool emit one line per frame, so scalar
/// queries must terminate each record and take only the first line. Windows
/// builds of the tool interpret the two-character escape `\n` in the format
/// string; elsewhere a literal newline works.
pub fn line_separator() -> &'static str {
    if cfg!(windows) { "\\n" } else { "\n" }
}

/// First line of tool output, with any trailing `\r` removed.
pub fn first_line(output: &str) -> &str {
    output.lines().next().unwrap_or("")
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Scripted reply for one [`MockRunner`] call.
    #[derive(Debug)]
    pub enum MockResponse {
        /// Succeed with this combined output.
        Ok(String),
        /// Succeed with this output, first writing the given files — used to
        /// simulate a convert verb materializing its output path.
        OkCreating(String, Vec<(PathBuf, Vec<u8>)>),
        /// Fail with this exit code and output.
        Fail { code: i32, output: String },
    }

    /// Mock runner that records invocations without spawning anything.
    ///
    /// Replies are consumed front-to-back; when the script runs dry every
    /// further call succeeds with empty output (which satisfies identify
    /// validation checks).
    #[derive(Debug, Default)]
    pub struct MockRunner {
        pub responses: Mutex<VecDeque<MockResponse>>,
        pub calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn scripted(responses: Vec<MockResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn push(&self, response: MockResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn last_call(&self) -> (String, Vec<String>) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl ToolRunner for MockRunner {
        fn run(&self, verb: &str, args: &[String]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((verb.to_string(), args.to_vec()));

            match self.responses.lock().unwrap().pop_front() {
                None => Ok(String::new()),
                Some(MockResponse::Ok(output)) => Ok(output),
                Some(MockResponse::OkCreating(output, files)) => {
                    for (path, bytes) in files {
                        std::fs::write(path, bytes)?;
                    }
                    Ok(output)
                }
                Some(MockResponse::Fail { code, output }) => Err(Error::ExternalTool {
                    invocation: render_invocation(verb, args),
                    code,
                    output,
                }),
            }
        }
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn render_quotes_non_flag_arguments() {
        let line = render_invocation("identify", &s(&["-format", "%m", "/tmp/a photo.jpg"]));
        assert_eq!(line, r#"identify -format "%m" "/tmp/a photo.jpg""#);
    }

    #[test]
    fn render_passes_plus_and_minus_flags_raw() {
        let line = render_invocation("mogrify", &s(&["+antialias", "-resize", "50%"]));
        assert_eq!(line, r#"mogrify +antialias -resize "50%""#);
    }

    #[test]
    fn render_verb_alone() {
        assert_eq!(render_invocation("identify", &[]), "identify");
    }

    #[test]
    fn first_line_takes_one_record() {
        assert_eq!(first_line("GIF\nGIF\nGIF\n"), "GIF");
        assert_eq!(first_line("PNG\r\n"), "PNG");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn runner_reports_missing_executable_as_io() {
        let runner = CommandRunner::new();
        let result = runner.run("simple-magick-no-such-verb", &[]);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn mock_records_calls_in_order() {
        let mock = MockRunner::new();
        mock.run("identify", &s(&["a.png"])).unwrap();
        mock.run("mogrify", &s(&["-resize", "50%", "a.png"])).unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "identify");
        assert_eq!(calls[1].1, s(&["-resize", "50%", "a.png"]));
    }

    #[test]
    fn mock_fail_carries_invocation() {
        let mock = MockRunner::scripted(vec![MockResponse::Fail {
            code: 1,
            output: "no decode delegate".into(),
        }]);
        let err = mock.run("identify", &s(&["bad.xyz"])).unwrap_err();
        match err {
            Error::ExternalTool {
                invocation, code, ..
            } => {
                assert_eq!(invocation, r#"identify "bad.xyz""#);
                assert_eq!(code, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
