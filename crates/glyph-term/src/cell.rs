// SPDX-License-Identifier: MIT
//
// Cell — one screen position's displayable state.
//
// A byte and two colors. That is the whole rendering model: the engine deals
// in single-byte characters only, so a cell is three bytes of payload, Copy,
// and compared with derived `PartialEq` in the diff loop.

use crate::color::{ColorId, ColorPair};

/// A single terminal cell.
///
/// # Examples
///
/// ```
/// use glyph_term::cell::Cell;
/// use glyph_term::color::ColorId;
///
/// let cell = Cell::new(b'@').with_fg(ColorId::RED);
/// assert_eq!(cell.ch, b'@');
/// assert_eq!(cell.fg, ColorId::RED);
/// assert!(cell.bg.is_default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// The byte written to the terminal for this position.
    pub ch: u8,
    /// Foreground (text) color.
    pub fg: ColorId,
    /// Background color.
    pub bg: ColorId,
}

impl Cell {
    /// A space in the terminal's default colors.
    pub const EMPTY: Self = Self {
        ch: b' ',
        fg: ColorId::Default,
        bg: ColorId::Default,
    };

    /// A character in default colors.
    #[inline]
    #[must_use]
    pub const fn new(ch: u8) -> Self {
        Self {
            ch,
            fg: ColorId::Default,
            bg: ColorId::Default,
        }
    }

    /// A character with explicit colors.
    #[inline]
    #[must_use]
    pub const fn styled(ch: u8, fg: ColorId, bg: ColorId) -> Self {
        Self { ch, fg, bg }
    }

    /// Same cell with a different foreground.
    #[inline]
    #[must_use]
    pub const fn with_fg(mut self, fg: ColorId) -> Self {
        self.fg = fg;
        self
    }

    /// Same cell with a different background.
    #[inline]
    #[must_use]
    pub const fn with_bg(mut self, bg: ColorId) -> Self {
        self.bg = bg;
        self
    }

    /// The cell's colors as a pair.
    #[inline]
    #[must_use]
    pub const fn colors(&self) -> ColorPair {
        ColorPair::new(self.fg, self.bg)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
