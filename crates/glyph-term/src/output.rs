// SPDX-License-Identifier: MIT
//
// Frame output for the POSIX backend.
//
// `FrameWriter` encodes backend calls as ANSI bytes into one pending buffer,
// and `flush_to` hands the lot to the terminal in a single `write_all`. It
// also remembers the color pair the terminal last received, so repeated
// color selects between refreshes collapse into nothing. The pair is
// forgotten whenever a write fails, since the terminal may have seen a
// partial sequence.

use std::io::{self, Write};

use crate::ansi;
use crate::color::ColorPair;
use crate::grid::Coord;

/// A full 200×50 repaint with a color change per cell fits without growing.
const INITIAL_CAPACITY: usize = 16_384;

/// Pending terminal output plus the color state it leaves behind.
#[derive(Debug)]
pub struct FrameWriter {
    pending: Vec<u8>,
    /// Colors in effect once `pending` reaches the terminal; `None` = unknown.
    colors: Option<ColorPair>,
    bytes_flushed: u64,
}

impl FrameWriter {
    /// An empty writer with unknown color state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(INITIAL_CAPACITY),
            colors: None,
            bytes_flushed: 0,
        }
    }

    /// Bytes queued since the last flush.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Total bytes handed to the terminal so far.
    #[inline]
    #[must_use]
    pub const fn bytes_flushed(&self) -> u64 {
        self.bytes_flushed
    }

    /// Queue a cursor move.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature follows `io::Write`.
    pub fn move_to(&mut self, at: Coord) -> io::Result<()> {
        ansi::cursor_to(&mut self.pending, at.row, at.col)
    }

    /// Queue a color select, unless the terminal already has `colors`.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature follows `io::Write`.
    pub fn set_colors(&mut self, colors: ColorPair) -> io::Result<()> {
        if self.colors == Some(colors) {
            return Ok(());
        }
        if colors == ColorPair::DEFAULT {
            ansi::reset_colors(&mut self.pending)?;
        } else {
            ansi::colors(&mut self.pending, colors.fg, colors.bg)?;
        }
        self.colors = Some(colors);
        Ok(())
    }

    /// Queue one character byte.
    #[inline]
    pub fn put(&mut self, byte: u8) {
        self.pending.push(byte);
    }

    /// Queue an erase of the whole screen and a move home.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature follows `io::Write`.
    pub fn clear_screen(&mut self) -> io::Result<()> {
        ansi::clear_screen(&mut self.pending)?;
        ansi::cursor_to(&mut self.pending, 0, 0)
    }

    /// Forget the tracked color state so the next select is always sent.
    /// Needed once anything else may have written to the terminal.
    #[inline]
    pub const fn invalidate(&mut self) {
        self.colors = None;
    }

    /// Write pending output to `w`, flush `w`, and clear the buffer.
    ///
    /// On error the pending bytes are kept and the color state is forgotten.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to or flushing `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.pending.is_empty() {
            if let Err(e) = w.write_all(&self.pending) {
                self.colors = None;
                return Err(e);
            }
            self.bytes_flushed += self.pending.len() as u64;
            self.pending.clear();
        }
        w.flush()
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorId;
    use pretty_assertions::assert_eq;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const RED_ON_DEFAULT: ColorPair = ColorPair::new(ColorId::RED, ColorId::Default);

    #[test]
    fn encodes_calls_in_order() {
        let mut out = FrameWriter::new();
        out.move_to(Coord::new(2, 0)).unwrap();
        out.set_colors(RED_ON_DEFAULT).unwrap();
        out.put(b'x');
        assert_eq!(out.pending(), b"\x1b[1;3f\x1b[38;5;1m\x1b[49mx");
    }

    #[test]
    fn repeated_color_select_is_elided() {
        let mut out = FrameWriter::new();
        out.set_colors(RED_ON_DEFAULT).unwrap();
        let after_first = out.pending().len();
        out.set_colors(RED_ON_DEFAULT).unwrap();
        assert_eq!(out.pending().len(), after_first);
    }

    #[test]
    fn default_pair_uses_reset() {
        let mut out = FrameWriter::new();
        out.set_colors(ColorPair::DEFAULT).unwrap();
        assert_eq!(out.pending(), b"\x1b[39m\x1b[49m");
    }

    // ── Flushing ────────────────────────────────────────────────────────

    #[test]
    fn flush_hands_over_everything_once() {
        let mut out = FrameWriter::new();
        out.put(b'h');
        out.put(b'i');

        let mut sink = Vec::new();
        out.flush_to(&mut sink).unwrap();
        out.flush_to(&mut sink).unwrap();

        assert_eq!(sink, b"hi");
        assert!(out.pending().is_empty());
        assert_eq!(out.bytes_flushed(), 2);
    }

    #[test]
    fn failed_flush_keeps_bytes_and_forgets_colors() {
        let mut out = FrameWriter::new();
        out.set_colors(RED_ON_DEFAULT).unwrap();
        out.put(b'z');

        let err = out.flush_to(&mut ClosedPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(out.pending().ends_with(b"z"));
        assert_eq!(out.bytes_flushed(), 0);

        let before = out.pending().len();
        out.set_colors(RED_ON_DEFAULT).unwrap();
        assert!(out.pending().len() > before);
    }

    #[test]
    fn invalidate_forces_next_select() {
        let mut out = FrameWriter::new();
        out.set_colors(ColorPair::DEFAULT).unwrap();
        out.invalidate();
        out.set_colors(ColorPair::DEFAULT).unwrap();
        assert_eq!(out.pending(), b"\x1b[39m\x1b[49m\x1b[39m\x1b[49m");
    }

    #[test]
    fn clear_screen_moves_home() {
        let mut out = FrameWriter::new();
        out.clear_screen().unwrap();
        assert_eq!(out.pending(), b"\x1b[2J\x1b[1;1f");
    }
}
