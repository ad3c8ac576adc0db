//! Terminal display
//!
//! Stands in for the box's small screen when running from a shell: screen
//! contents and history lines go to stderr, tool progress drives an
//! indicatif bar.

use indicatif::{ProgressBar, ProgressStyle};
use pocketprog_core::reporter::{LineBuffer, Reporter};

/// Reporter printing to the terminal
#[derive(Default)]
pub struct ConsoleReporter {
    buffer: LineBuffer,
    bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    /// Create a console reporter
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, line: &str) {
        let text = format!("[display] {}", line);
        match &self.bar {
            Some(pb) => pb.println(text),
            None => eprintln!("{}", text),
        }
    }

    fn bar(&mut self) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(100);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        })
    }

    fn finish_bar(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Reporter for ConsoleReporter {
    fn show_lines(&mut self, lines: &[String]) {
        self.finish_bar();
        self.buffer.replace(lines);
        eprintln!("[display] ----------------");
        for line in self.buffer.lines() {
            eprintln!("[display] {}", line);
        }
    }

    fn append_line(&mut self, line: &str) {
        self.buffer.push(line);
        self.print(line);
    }

    fn show_progress(&mut self, text: &str, percent: Option<u8>) {
        match percent {
            Some(p) => {
                let pb = self.bar();
                pb.set_position(u64::from(p));
                pb.set_message(text.to_string());
            }
            None => self.print(text),
        }
    }

    fn clear(&mut self) {
        self.finish_bar();
        self.buffer.clear();
    }

    fn close(&mut self) {
        self.finish_bar();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_lifecycle() {
        let mut console = ConsoleReporter::new();
        console.show_progress("Cloning 10%", Some(10));
        assert_eq!(console.bar.as_ref().map(|b| b.position()), Some(10));
        console.show_progress("Cloning 55%", Some(55));
        assert_eq!(console.bar.as_ref().map(|b| b.position()), Some(55));

        console.append_line("Exit 0");
        console.show_lines(&["Upload complete".to_string()]);
        assert!(console.bar.is_none());
        assert_eq!(
            console.buffer.lines().collect::<Vec<_>>(),
            ["Upload complete"]
        );
    }
}
