//! 5x5 LED matrix feedback.
//!
//! [`LedMatrix`] renders glyphs as text lines on any writer (stdout for the
//! daemon), standing in for the physical display.

use crate::error::SinkError;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

pub const MATRIX_SIZE: usize = 5;
pub const MAX_BRIGHTNESS: u8 = 9;

/// Per-pixel brightness levels, 0 (off) ..= 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pixels: [[u8; MATRIX_SIZE]; MATRIX_SIZE],
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GlyphError {
    #[error("pattern must have 25 pixels, got {0}")]
    WrongLength(usize),
    #[error("invalid pixel {0:?}; expected a digit 0-9")]
    InvalidPixel(char),
}

/// Build a glyph from a `"rrrrr:rrrrr:rrrrr:rrrrr:rrrrr"` literal.
const fn pattern(p: &[u8; 29]) -> Glyph {
    let mut pixels = [[0u8; MATRIX_SIZE]; MATRIX_SIZE];
    let mut row = 0;
    while row < MATRIX_SIZE {
        let mut col = 0;
        while col < MATRIX_SIZE {
            pixels[row][col] = p[row * (MATRIX_SIZE + 1) + col] - b'0';
            col += 1;
        }
        row += 1;
    }
    Glyph { pixels }
}

pub const QUESTION: Glyph = pattern(b"09990:90009:00990:00000:00900");
pub const CHECK: Glyph = pattern(b"00000:00009:00090:90900:09000");
pub const CROSS: Glyph = pattern(b"90009:09090:00900:09090:90009");
pub const SAD: Glyph = pattern(b"00000:09090:00000:09990:90009");
pub const HEART: Glyph = pattern(b"09090:99999:99999:09990:00900");
pub const HEART_SMALL: Glyph = pattern(b"00000:09090:09990:00900:00000");
pub const SMILE: Glyph = pattern(b"00000:00000:00000:90009:09990");
pub const HAPPY: Glyph = pattern(b"00000:09090:00000:90009:09990");

pub const STARTUP_FRAMES: [Glyph; 4] = [HEART, HEART_SMALL, SMILE, HAPPY];

const DIGITS: [Glyph; 10] = [
    pattern(b"09900:90090:90090:90090:09900"),
    pattern(b"00900:09900:00900:00900:09990"),
    pattern(b"99900:00090:09900:90000:99990"),
    pattern(b"99990:00090:00900:90090:09900"),
    pattern(b"00990:09090:90090:99999:00090"),
    pattern(b"99999:90000:99990:00009:99990"),
    pattern(b"00090:00900:09990:90009:09990"),
    pattern(b"99999:00090:00900:09000:90000"),
    pattern(b"09990:90009:09990:90009:09990"),
    pattern(b"09990:90009:09990:00900:09000"),
];

impl Glyph {
    pub const BLANK: Glyph = Glyph {
        pixels: [[0; MATRIX_SIZE]; MATRIX_SIZE],
    };

    /// Glyph for a single decimal digit.
    pub fn digit(d: u8) -> Option<Glyph> {
        DIGITS.get(d as usize).copied()
    }

    /// Parse 25 pixel digits, optionally split into rows by `:`.
    pub fn parse(s: &str) -> Result<Glyph, GlyphError> {
        let levels: Vec<char> = s.chars().filter(|c| *c != ':').collect();
        if levels.len() != MATRIX_SIZE * MATRIX_SIZE {
            return Err(GlyphError::WrongLength(levels.len()));
        }

        let mut pixels = [[0u8; MATRIX_SIZE]; MATRIX_SIZE];
        for (i, c) in levels.into_iter().enumerate() {
            let level = c.to_digit(10).ok_or(GlyphError::InvalidPixel(c))?;
            pixels[i / MATRIX_SIZE][i % MATRIX_SIZE] = level as u8;
        }
        Ok(Glyph { pixels })
    }

    /// Brightness at column `x`, row `y`; `None` outside the 5x5 grid.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        self.pixels.get(y)?.get(x).copied()
    }

    /// Rows as text at the given display brightness; `.` is off.
    pub fn render(&self, brightness: u8) -> Vec<String> {
        let brightness = brightness.min(MAX_BRIGHTNESS) as u16;
        self.pixels
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&p| {
                        let level = (p as u16 * brightness) / MAX_BRIGHTNESS as u16;
                        if level == 0 {
                            '.'
                        } else {
                            char::from(b'0' + level as u8)
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Renders recognition feedback to the user.
pub trait FeedbackSink {
    fn show_digit(&mut self, digit: u8) -> Result<(), SinkError>;
    fn show_unknown(&mut self) -> Result<(), SinkError>;
    fn show_success(&mut self) -> Result<(), SinkError>;
    fn show_failure(&mut self) -> Result<(), SinkError>;
    fn show_error(&mut self) -> Result<(), SinkError>;
    fn show_startup(&mut self) -> Result<(), SinkError>;
    fn clear(&mut self) -> Result<(), SinkError>;
}

/// What the matrix currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Blank,
    Digit(u8),
    Unknown,
    Success,
    Failure,
    Error,
    Custom,
}

/// Text-rendered LED matrix.
pub struct LedMatrix<W: Write> {
    out: W,
    brightness: u8,
    /// Pause after transient glyphs and between animation frames.
    frame_hold: Duration,
    current: Shown,
}

impl<W: Write> LedMatrix<W> {
    pub fn new(out: W, brightness: u8) -> Self {
        Self {
            out,
            brightness: brightness.min(MAX_BRIGHTNESS),
            frame_hold: Duration::ZERO,
            current: Shown::Blank,
        }
    }

    pub fn with_frame_hold(mut self, hold: Duration) -> Self {
        self.frame_hold = hold;
        self
    }

    pub fn current(&self) -> Shown {
        self.current
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Show an arbitrary pattern.
    pub fn show_glyph(&mut self, glyph: &Glyph) -> Result<(), SinkError> {
        self.draw("custom", glyph, Shown::Custom)
    }

    fn draw(&mut self, label: &str, glyph: &Glyph, shown: Shown) -> Result<(), SinkError> {
        let rows = glyph.render(self.brightness);
        writeln!(self.out, "[matrix] {label:<8} {}", rows.join(" "))?;
        self.out.flush()?;
        self.current = shown;
        tracing::debug!(shown = ?shown, "matrix updated");
        Ok(())
    }

    fn hold(&self) {
        if !self.frame_hold.is_zero() {
            std::thread::sleep(self.frame_hold);
        }
    }
}

impl<W: Write> FeedbackSink for LedMatrix<W> {
    fn show_digit(&mut self, digit: u8) -> Result<(), SinkError> {
        match Glyph::digit(digit) {
            Some(glyph) => self.draw(&format!("digit {digit}"), &glyph, Shown::Digit(digit)),
            None => {
                tracing::warn!(digit, "digit out of range; showing question mark");
                self.show_unknown()
            }
        }
    }

    fn show_unknown(&mut self) -> Result<(), SinkError> {
        self.draw("unknown", &QUESTION, Shown::Unknown)
    }

    fn show_success(&mut self) -> Result<(), SinkError> {
        self.draw("success", &CHECK, Shown::Success)?;
        self.hold();
        Ok(())
    }

    fn show_failure(&mut self) -> Result<(), SinkError> {
        self.draw("failure", &CROSS, Shown::Failure)?;
        self.hold();
        Ok(())
    }

    fn show_error(&mut self) -> Result<(), SinkError> {
        self.draw("error", &SAD, Shown::Error)
    }

    fn show_startup(&mut self) -> Result<(), SinkError> {
        for frame in &STARTUP_FRAMES {
            self.draw("startup", frame, Shown::Custom)?;
            self.hold();
        }
        self.clear()
    }

    fn clear(&mut self) -> Result<(), SinkError> {
        self.draw("clear", &Glyph::BLANK, Shown::Blank)
    }
}
