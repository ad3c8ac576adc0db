//! Text screens on a 128x64 monochrome panel
//!
//! Three layouts share the panel:
//!
//! - screens ([`Reporter::show_lines`]): up to four lines in a large font
//! - history ([`Reporter::append_line`]): the newest six lines in a small
//!   font, scrolling up as lines arrive
//! - progress ([`Reporter::show_progress`]): one small line, plus a bar when
//!   the tool reported a percentage

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_7X13};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use pocketprog_core::reporter::{LineBuffer, Reporter};

/// Panel width in pixels
pub const WIDTH: u32 = 128;

/// Panel height in pixels
pub const HEIGHT: u32 = 64;

const SCREEN_PITCH: i32 = 16;
const SCREEN_ROWS: usize = 4;
const HISTORY_PITCH: i32 = 10;
const HISTORY_ROWS: usize = 6;

const BAR_Y: i32 = 20;
const BAR_HEIGHT: u32 = 10;
const BAR_INNER: u32 = WIDTH - 4;

/// A monochrome frame buffer that can be pushed to the glass
pub trait Panel: DrawTarget<Color = BinaryColor> + Send {
    /// Clear the frame buffer
    fn blank(&mut self);

    /// Send the frame buffer to the panel
    fn present(&mut self) -> Result<(), String>;
}

/// [`Reporter`] drawing on an OLED panel
pub struct OledReporter<P: Panel> {
    panel: P,
    buffer: LineBuffer,
    failed: bool,
}

impl<P: Panel> OledReporter<P> {
    /// Wrap an initialised panel
    pub fn new(panel: P) -> Self {
        Self {
            panel,
            buffer: LineBuffer::default(),
            failed: false,
        }
    }

    /// The panel, for inspection
    pub fn panel(&self) -> &P {
        &self.panel
    }

    fn text(&mut self, line: &str, row: usize, pitch: i32, font: &'static MonoFont<'static>) {
        let style = MonoTextStyle::new(font, BinaryColor::On);
        let columns = (WIDTH / font.character_size.width) as usize;
        let line: String = line.chars().take(columns).collect();
        let y = row as i32 * pitch;
        let _ = Text::with_baseline(&line, Point::new(0, y), style, Baseline::Top)
            .draw(&mut self.panel);
    }

    fn bar(&mut self, percent: u8) {
        let _ = Rectangle::new(Point::new(0, BAR_Y), Size::new(WIDTH, BAR_HEIGHT))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut self.panel);

        let fill = BAR_INNER * u32::from(percent.min(100)) / 100;
        if fill > 0 {
            let _ = Rectangle::new(Point::new(2, BAR_Y + 2), Size::new(fill, BAR_HEIGHT - 4))
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(&mut self.panel);
        }
    }

    fn present(&mut self) {
        match self.panel.present() {
            Ok(()) => self.failed = false,
            Err(e) => {
                // Log once per outage, not on every redraw
                if !self.failed {
                    log::warn!("ssd1306: display update failed: {}", e);
                }
                self.failed = true;
            }
        }
    }

    fn draw_history(&mut self) {
        let lines: Vec<String> = self.buffer.lines().map(str::to_string).collect();
        let skip = lines.len().saturating_sub(HISTORY_ROWS);
        self.panel.blank();
        for (row, line) in lines[skip..].iter().enumerate() {
            self.text(line, row, HISTORY_PITCH, &FONT_6X10);
        }
        self.present();
    }
}

impl<P: Panel> Reporter for OledReporter<P> {
    fn show_lines(&mut self, lines: &[String]) {
        self.buffer.replace(lines);
        self.panel.blank();
        for (row, line) in lines.iter().take(SCREEN_ROWS).enumerate() {
            self.text(line, row, SCREEN_PITCH, &FONT_7X13);
        }
        self.present();
    }

    fn append_line(&mut self, line: &str) {
        self.buffer.push(line);
        self.draw_history();
    }

    fn show_progress(&mut self, text: &str, percent: Option<u8>) {
        self.panel.blank();
        self.text(text, 0, HISTORY_PITCH, &FONT_6X10);
        if let Some(percent) = percent {
            self.bar(percent);
        }
        self.present();
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.panel.blank();
        self.present();
    }

    fn close(&mut self) {
        self.panel.blank();
        self.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    /// In-memory panel
    struct Canvas {
        pixels: Vec<bool>,
        shown: Vec<bool>,
        presents: usize,
        broken: bool,
    }

    impl Canvas {
        fn new() -> Self {
            let size = (WIDTH * HEIGHT) as usize;
            Self {
                pixels: vec![false; size],
                shown: vec![false; size],
                presents: 0,
                broken: false,
            }
        }

        fn lit(&self, x: u32, y: u32) -> bool {
            self.shown[(y * WIDTH + x) as usize]
        }

        fn lit_rows(&self, top: u32, bottom: u32) -> usize {
            (top..bottom)
                .flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
                .filter(|&(x, y)| self.lit(x, y))
                .count()
        }
    }

    impl OriginDimensions for Canvas {
        fn size(&self) -> Size {
            Size::new(WIDTH, HEIGHT)
        }
    }

    impl DrawTarget for Canvas {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                    if x < WIDTH && y < HEIGHT {
                        self.pixels[(y * WIDTH + x) as usize] = color.is_on();
                    }
                }
            }
            Ok(())
        }
    }

    impl Panel for Canvas {
        fn blank(&mut self) {
            self.pixels.iter_mut().for_each(|p| *p = false);
        }

        fn present(&mut self) -> Result<(), String> {
            if self.broken {
                return Err("bus write failed".to_string());
            }
            self.shown.clone_from(&self.pixels);
            self.presents += 1;
            Ok(())
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_screen_draws_each_line_in_its_band() {
        let mut r = OledReporter::new(Canvas::new());
        r.show_lines(&lines(&["R: UV-5R", "M: Baofeng"]));
        assert_eq!(r.panel().presents, 1);
        assert!(r.panel().lit_rows(0, 16) > 0);
        assert!(r.panel().lit_rows(16, 32) > 0);
        assert_eq!(r.panel().lit_rows(32, 64), 0);
    }

    #[test]
    fn test_new_screen_replaces_old() {
        let mut r = OledReporter::new(Canvas::new());
        r.show_lines(&lines(&["one", "two", "three", "four"]));
        assert!(r.panel().lit_rows(48, 64) > 0);
        r.show_lines(&lines(&["only"]));
        assert_eq!(r.panel().lit_rows(16, 64), 0);
    }

    #[test]
    fn test_history_scrolls() {
        let mut r = OledReporter::new(Canvas::new());
        r.append_line("first");
        assert!(r.panel().lit_rows(0, 10) > 0);
        assert_eq!(r.panel().lit_rows(10, 64), 0);

        for i in 0..9 {
            r.append_line(&format!("line {}", i));
        }
        // Six rows of ten pixels are in use, nothing below
        assert!(r.panel().lit_rows(50, 60) > 0);
        assert_eq!(r.panel().lit_rows(60, 64), 0);
        assert_eq!(r.buffer.lines().count(), 8);
        assert_eq!(r.buffer.lines().last(), Some("line 8"));
    }

    #[test]
    fn test_progress_bar_fill() {
        let mut r = OledReporter::new(Canvas::new());
        r.show_progress("Cloning 50%", Some(50));
        let p = r.panel();
        // Outline
        assert!(p.lit(0, BAR_Y as u32));
        assert!(p.lit(WIDTH - 1, BAR_Y as u32 + BAR_HEIGHT - 1));
        // Half filled
        let mid = BAR_Y as u32 + BAR_HEIGHT / 2;
        assert!(p.lit(2, mid));
        assert!(p.lit(2 + BAR_INNER / 2 - 1, mid));
        assert!(!p.lit(2 + BAR_INNER / 2 + 1, mid));
        assert!(!p.lit(WIDTH - 3, mid));
    }

    #[test]
    fn test_progress_without_percent_has_no_bar() {
        let mut r = OledReporter::new(Canvas::new());
        r.show_progress("Reading radio", None);
        assert!(r.panel().lit_rows(0, 10) > 0);
        assert_eq!(r.panel().lit_rows(BAR_Y as u32, HEIGHT), 0);
    }

    #[test]
    fn test_clear_blanks_panel() {
        let mut r = OledReporter::new(Canvas::new());
        r.show_lines(&lines(&["something"]));
        r.clear();
        assert_eq!(r.panel().lit_rows(0, HEIGHT), 0);
        assert_eq!(r.buffer.lines().count(), 0);
    }

    #[test]
    fn test_failed_present_keeps_working() {
        let mut canvas = Canvas::new();
        canvas.broken = true;
        let mut r = OledReporter::new(canvas);
        r.show_lines(&lines(&["a"]));
        r.append_line("b");
        assert!(r.failed);
        assert_eq!(r.panel().presents, 0);

        r.panel.broken = false;
        r.append_line("c");
        assert!(!r.failed);
        assert_eq!(r.panel().presents, 1);
    }

    #[test]
    fn test_long_lines_are_cut_to_width() {
        let mut r = OledReporter::new(Canvas::new());
        r.show_lines(&lines(&[&"W".repeat(40)]));
        assert!(r.panel().lit_rows(0, 16) > 0);
        assert_eq!(r.panel().presents, 1);
    }
}
