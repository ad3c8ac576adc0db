//! External programmer tool execution
//!
//! The tool's stdout and stderr share one pipe, so lines arrive in the order
//! the tool wrote them. Two ways of running it:
//!
//! - [`ProcessRunner::run_streaming`]: lines are classified as progress or
//!   log lines and forwarded to the reporter while the tool runs.
//! - [`ProcessRunner::run_blocking`]: output is collected until the tool
//!   exits and only the verdict matters.
//!
//! The tool does not report success consistently, so a run counts as
//! successful when it exits with 0 *or* prints one of the expected markers.

use crate::error::{Error, Result};
use crate::reporter::ReporterHandle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, BufRead, BufReader, PipeReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;

/// Default sentinel for streamed runs
pub const DEFAULT_SENTINEL: &str = "Upload successful";

/// Number of command tokens shown in the "starting" line
const PREVIEW_TOKENS: usize = 3;

/// Exit code reported when the process could not be started or was killed
pub const NO_EXIT_CODE: i32 = -1;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3})(?:\.\d+)?%").expect("valid percent regex"));

/// Classification of one output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Line containing a completion percentage
    Progress {
        /// Percentage in 0..=100
        percent: u8,
        /// The full line
        line: String,
    },
    /// Any other line
    Log {
        /// The full line
        line: String,
    },
}

impl StreamEvent {
    /// Classify a line of tool output
    ///
    /// Percentages above 100 are not progress.
    pub fn classify(line: &str) -> Self {
        let percent = PERCENT_RE
            .captures(line)
            .and_then(|c| c[1].parse::<u8>().ok())
            .filter(|p| *p <= 100);

        match percent {
            Some(percent) => StreamEvent::Progress {
                percent,
                line: line.to_string(),
            },
            None => StreamEvent::Log {
                line: line.to_string(),
            },
        }
    }

    /// The raw line
    pub fn line(&self) -> &str {
        match self {
            StreamEvent::Progress { line, .. } | StreamEvent::Log { line } => line,
        }
    }
}

/// What counts as success besides a zero exit code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessCriteria {
    markers: Vec<String>,
}

impl SuccessCriteria {
    /// Success on any of `markers` appearing in the output
    pub fn markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `text` contains one of the markers
    pub fn matches(&self, text: &str) -> bool {
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// Configured markers
    pub fn marker_list(&self) -> &[String] {
        &self.markers
    }
}

/// Outcome of one tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Process exit code ([`NO_EXIT_CODE`] when killed by a signal)
    pub exit_code: i32,
    /// Whether a success marker appeared in the output
    pub sentinel_seen: bool,
}

impl RunResult {
    /// Result used when nothing was run
    pub fn dry_run() -> Self {
        Self {
            exit_code: 0,
            sentinel_seen: false,
        }
    }

    /// Zero exit code or a success marker
    pub fn success(&self) -> bool {
        self.exit_code == 0 || self.sentinel_seen
    }

    /// Exit code with the sentinel override applied
    pub fn effective_code(&self) -> i32 {
        if self.sentinel_seen {
            0
        } else {
            self.exit_code
        }
    }
}

/// Runs the external programmer tool
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    dry_run: bool,
    sentinel: SuccessCriteria,
}

impl ProcessRunner {
    /// Create a runner; with `dry_run` no process is ever started
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            sentinel: SuccessCriteria::markers([DEFAULT_SENTINEL]),
        }
    }

    /// Replace the sentinel used by [`run_streaming`](Self::run_streaming)
    pub fn with_sentinel(mut self, sentinel: SuccessCriteria) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Whether dry-run mode is active
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `args`, streaming output to `reporter`, and return the exit code
    ///
    /// Returns 0 if the sentinel was seen, otherwise the process exit code.
    /// Start failures are reported as an `Error:` line and yield
    /// [`NO_EXIT_CODE`].
    pub fn run_streaming(&self, args: &[String], label: &str, reporter: &ReporterHandle) -> i32 {
        match self.stream(args, label, &self.sentinel, reporter) {
            Ok(result) => result.effective_code(),
            Err(e) => {
                reporter.append_line(&format!("Error: {}", e));
                NO_EXIT_CODE
            }
        }
    }

    /// Streaming run with caller-supplied success markers
    pub fn stream(
        &self,
        args: &[String],
        label: &str,
        criteria: &SuccessCriteria,
        reporter: &ReporterHandle,
    ) -> Result<RunResult> {
        let label = if label.is_empty() { "Running" } else { label };

        if self.dry_run {
            log::info!("DRY RUN: {}", args.join(" "));
            reporter.append_line(&format!("DRY RUN: {} {}", label, args.join(" ")));
            return Ok(RunResult::dry_run());
        }

        let preview = args
            .iter()
            .take(PREVIEW_TOKENS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        reporter.append_line(&format!("{}: {} ...", label, preview));

        let (mut child, output) = spawn_merged(args)?;

        let (tx, rx) = mpsc::channel::<io::Result<String>>();
        let reader = thread::Builder::new()
            .name("tool-output".into())
            .spawn(move || {
                let mut lines = LineReader::new(output);
                loop {
                    match lines.next_line() {
                        Ok(Some(line)) => {
                            if tx.send(Ok(line)).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;

        let mut sentinel_seen = false;
        for message in rx {
            match message {
                Ok(line) => {
                    log::debug!("tool: {}", line);
                    if criteria.matches(&line) {
                        sentinel_seen = true;
                    }
                    match StreamEvent::classify(&line) {
                        StreamEvent::Progress { percent, line } => {
                            reporter.show_progress(&line, Some(percent))
                        }
                        StreamEvent::Log { line } => reporter.append_line(&line),
                    }
                }
                Err(e) => reporter.append_line(&format!("Error: {}", e)),
            }
        }
        if reader.join().is_err() {
            reporter.append_line("Error: output reader panicked");
        }

        let exit_code = wait_exit_code(&mut child)?;
        reporter.append_line(&format!("Exit {}", exit_code));
        log::info!(
            "{} exited with {} (sentinel seen: {})",
            args[0],
            exit_code,
            sentinel_seen
        );

        Ok(RunResult {
            exit_code,
            sentinel_seen,
        })
    }

    /// Run `args` to completion and judge success on exit code or markers
    pub fn run_blocking(&self, args: &[String], criteria: &SuccessCriteria) -> Result<RunResult> {
        if self.dry_run {
            log::info!("DRY RUN: {}", args.join(" "));
            return Ok(RunResult::dry_run());
        }

        let (mut child, mut output) = spawn_merged(args)?;

        let mut raw = Vec::new();
        let read_result = output.read_to_end(&mut raw);
        drop(output);
        let exit_code = wait_exit_code(&mut child)?;
        read_result?;

        let text = String::from_utf8_lossy(&raw);
        for line in text.lines() {
            log::debug!("tool: {}", line);
        }

        let result = RunResult {
            exit_code,
            sentinel_seen: criteria.matches(&text),
        };
        log::info!(
            "{} exited with {} (marker seen: {})",
            args[0],
            exit_code,
            result.sentinel_seen
        );
        Ok(result)
    }
}

/// Start `args` with stdout and stderr on one pipe
fn spawn_merged(args: &[String]) -> Result<(Child, PipeReader)> {
    let (program, rest) = args.split_first().ok_or(Error::EmptyCommand)?;

    let (reader, writer) = io::pipe()?;
    let writer_err = writer.try_clone()?;

    let mut command = Command::new(program);
    command
        .args(rest)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_err);

    log::debug!("Spawning: {}", args.join(" "));
    let child = command.spawn().map_err(|source| Error::Spawn {
        program: program.clone(),
        source,
    })?;
    // Our copies of the write end must go, or the reader never sees EOF
    drop(command);

    Ok((child, reader))
}

fn wait_exit_code(child: &mut Child) -> Result<i32> {
    let status = child.wait()?;
    Ok(status.code().unwrap_or(NO_EXIT_CODE))
}

/// Splits a byte stream into lines on `\n`, `\r` or `\r\n`
///
/// Programmer tools redraw progress with bare carriage returns; treating
/// those as line ends lets each update through as soon as it is printed.
/// Empty lines are skipped.
struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if buf.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return Ok(Some(line));
            }

            match buf.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    self.pending.extend_from_slice(&buf[..end]);
                    self.inner.consume(end + 1);
                    if self.pending.is_empty() {
                        continue;
                    }
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    return Ok(Some(line));
                }
                None => {
                    let len = buf.len();
                    self.pending.extend_from_slice(buf);
                    self.inner.consume(len);
                }
            }
        }
    }
}
