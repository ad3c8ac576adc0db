//! Status display
//!
//! The display is a small text screen. [`Reporter`] is what a display
//! backend implements; the concrete backend is picked once at startup.
//! [`ReporterHandle`] is the shared, lock-protected sink that the
//! controller and the process runner write to, plus the fixed screens the
//! controller shows.

use crate::profile::Profile;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lines that fit on a 128x64 display
pub const DISPLAY_LINES: usize = 64 / 8;

/// A text display backend
///
/// All methods are fire-and-forget; backends swallow their own errors.
pub trait Reporter: Send {
    /// Replace the screen contents with `lines`
    fn show_lines(&mut self, lines: &[String]);

    /// Append one line to the scrolling history
    fn append_line(&mut self, line: &str);

    /// Show a transient progress line, replacing the previous one
    fn show_progress(&mut self, text: &str, percent: Option<u8>);

    /// Blank the screen and forget the history
    fn clear(&mut self);

    /// Release the display
    fn close(&mut self) {}
}

/// Bounded history of display lines
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LineBuffer {
    /// Create an empty buffer holding at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, dropping the oldest if full
    pub fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// Replace contents, keeping the last `capacity` lines
    pub fn replace(&mut self, lines: &[String]) {
        self.lines.clear();
        let skip = lines.len().saturating_sub(self.capacity);
        for line in &lines[skip..] {
            self.lines.push_back(line.clone());
        }
    }

    /// Remove all lines
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Current lines, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Lines joined with ` | `
    pub fn joined(&self) -> String {
        self.lines().collect::<Vec<_>>().join(" | ")
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DISPLAY_LINES)
    }
}

/// Display backend that only writes to the log
#[derive(Debug, Default)]
pub struct LogReporter {
    buffer: LineBuffer,
}

impl LogReporter {
    /// Create a log-only reporter
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for LogReporter {
    fn show_lines(&mut self, lines: &[String]) {
        self.buffer.replace(lines);
        log::info!("[display] {}", self.buffer.joined());
    }

    fn append_line(&mut self, line: &str) {
        self.buffer.push(line);
        log::info!("[display] {}", line);
    }

    fn show_progress(&mut self, text: &str, _percent: Option<u8>) {
        log::info!("[display-progress] {}", text);
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Shared display sink
///
/// Every call locks the backend for the duration of one compose-and-emit,
/// so output from concurrent button actions never interleaves.
pub struct ReporterHandle {
    inner: Mutex<Box<dyn Reporter>>,
}

impl ReporterHandle {
    /// Wrap a backend
    pub fn new(reporter: Box<dyn Reporter>) -> Self {
        Self {
            inner: Mutex::new(reporter),
        }
    }

    /// Handle backed by [`LogReporter`]
    pub fn log_only() -> Self {
        Self::new(Box::new(LogReporter::new()))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Reporter>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the screen contents
    pub fn show_lines(&self, lines: &[String]) {
        self.lock().show_lines(lines);
    }

    /// Append a history line
    pub fn append_line(&self, line: &str) {
        self.lock().append_line(line);
    }

    /// Show a transient progress line
    pub fn show_progress(&self, text: &str, percent: Option<u8>) {
        self.lock().show_progress(text, percent);
    }

    /// Blank the screen
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Release the display
    pub fn close(&self) {
        self.lock().close();
    }

    /// Single status message
    pub fn show_status(&self, message: &str) {
        self.show_lines(&[message.to_string()]);
    }

    /// The selected-profile screen
    pub fn show_selected(&self, profile: &Profile) {
        self.show_lines(&selected_lines(profile));
    }

    /// Title / detail / radio screen shown while an operation runs
    pub fn show_report(&self, title: &str, detail: &str, radio: &str) {
        self.show_lines(&[title.to_string(), detail.to_string(), radio.to_string()]);
    }

    /// Screen shown once the controller is ready
    pub fn show_banner(&self) {
        self.show_report("Pocket: CHIRP", "1-Select", "2-Upld 3-Dwnld");
    }

    /// Clear, then show a status line above the selected-profile lines
    pub fn show_result(&self, status: &str, profile: &Profile) {
        let [name, model, file] = selected_lines(profile);
        let mut display = self.lock();
        display.clear();
        display.show_lines(&[status.to_string(), name, model, file]);
    }
}

fn selected_lines(profile: &Profile) -> [String; 3] {
    [
        format!("R: {}", profile.name),
        format!("M: {}", profile.device_model),
        format!("F: {}", profile.filename),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_bounded() {
        let mut buf = LineBuffer::new(3);
        for i in 0..5 {
            buf.push(&format!("l{}", i));
        }
        assert_eq!(buf.joined(), "l2 | l3 | l4");

        let lines: Vec<String> = (0..4).map(|i| format!("r{}", i)).collect();
        buf.replace(&lines);
        assert_eq!(buf.lines().collect::<Vec<_>>(), ["r1", "r2", "r3"]);

        buf.clear();
        assert_eq!(buf.joined(), "");
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut buf = LineBuffer::new(0);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.joined(), "b");
    }
}
