//! Liveness indicator drawn while a completion call is outstanding.
//!
//! Purely cosmetic: draw errors are ignored and never change an outcome.
use std::io::Write;

use crossterm::{
    cursor::MoveToColumn,
    queue,
    terminal::{Clear, ClearType},
};
use tokio::time::Duration;

pub const GLYPHS: [char; 4] = ['-', '\\', '|', '/'];
pub const TICK: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct Spinner {
    enabled: bool,
    frame: usize,
    drawn: bool,
}

impl Spinner {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, frame: 0, drawn: false }
    }

    /// Overwrite the current line with the next glyph.
    pub fn tick(&mut self, w: &mut impl Write) {
        if !self.enabled {
            return;
        }
        let glyph = GLYPHS[self.frame % GLYPHS.len()];
        self.frame = self.frame.wrapping_add(1);
        let _ = write!(w, "\r{glyph}").and_then(|_| w.flush());
        self.drawn = true;
    }

    /// Wipe the spinner line, if anything was drawn.
    pub fn clear(&mut self, w: &mut impl Write) {
        self.frame = 0;
        if !std::mem::take(&mut self.drawn) {
            return;
        }
        let _ = queue!(w, MoveToColumn(0), Clear(ClearType::CurrentLine)).and_then(|_| w.flush());
    }
}
