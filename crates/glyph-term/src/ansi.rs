// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit; the frame renderer makes those. This
// module only knows the byte-level encoding of the handful of commands the
// POSIX backend needs.
//
// All positions are 0-indexed in our API and converted to 1-indexed for the
// terminal (ANSI coordinates are 1-based).
use std::io::{self, Write};

use crate::color::ColorId;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(row, col)` using HVP (`ESC [ row ; col f`).
#[inline]
pub fn cursor_to(w: &mut impl Write, row: u16, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}f", u32::from(row) + 1, u32::from(col) + 1)
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// Select the foreground color: `ESC [ 38;5;N m`, or `ESC [ 39 m` for the
/// terminal default.
pub fn fg(w: &mut impl Write, color: ColorId) -> io::Result<()> {
    match color {
        ColorId::Default => w.write_all(b"\x1b[39m"),
        ColorId::Indexed(idx) => write!(w, "\x1b[38;5;{idx}m"),
    }
}

/// Select the background color: `ESC [ 48;5;N m`, or `ESC [ 49 m` for the
/// terminal default.
pub fn bg(w: &mut impl Write, color: ColorId) -> io::Result<()> {
    match color {
        ColorId::Default => w.write_all(b"\x1b[49m"),
        ColorId::Indexed(idx) => write!(w, "\x1b[48;5;{idx}m"),
    }
}

/// Select both channels, foreground first.
#[inline]
pub fn colors(w: &mut impl Write, fg_color: ColorId, bg_color: ColorId) -> io::Result<()> {
    fg(w, fg_color)?;
    bg(w, bg_color)
}

/// Return both channels to the terminal defaults (`ESC [ 39 m ESC [ 49 m`).
#[inline]
pub fn reset_colors(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[39m\x1b[49m")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // ── Cursor ──────────────────────────────────────────────────────

    #[test]
    fn cursor_to_is_one_based() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1f");
        assert_eq!(emit(|w| cursor_to(w, 4, 9)), "\x1b[5;10f");
    }

    #[test]
    fn cursor_to_max_does_not_overflow() {
        assert_eq!(
            emit(|w| cursor_to(w, u16::MAX, u16::MAX)),
            "\x1b[65536;65536f"
        );
    }

    #[test]
    fn clear() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
    }

    // ── Color ───────────────────────────────────────────────────────

    #[test]
    fn fg_indexed_uses_256_form() {
        assert_eq!(emit(|w| fg(w, ColorId::RED)), "\x1b[38;5;1m");
        assert_eq!(emit(|w| fg(w, ColorId::Indexed(200))), "\x1b[38;5;200m");
    }

    #[test]
    fn bg_indexed_uses_256_form() {
        assert_eq!(emit(|w| bg(w, ColorId::BLUE)), "\x1b[48;5;4m");
    }

    #[test]
    fn default_channels_reset_independently() {
        assert_eq!(emit(|w| fg(w, ColorId::Default)), "\x1b[39m");
        assert_eq!(emit(|w| bg(w, ColorId::Default)), "\x1b[49m");
        assert_eq!(
            emit(|w| colors(w, ColorId::GREEN, ColorId::Default)),
            "\x1b[38;5;2m\x1b[49m"
        );
    }

    #[test]
    fn reset_both() {
        assert_eq!(emit(|w| reset_colors(w)), "\x1b[39m\x1b[49m");
    }
}
