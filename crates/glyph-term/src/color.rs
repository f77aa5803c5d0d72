// SPDX-License-Identifier: MIT
//
// Color identifiers — 256-color palette indices plus a "terminal default"
// sentinel.
//
// The engine never mixes colors, so a color is just a name the backend knows
// how to select: a palette index on ANSI terminals, a 4-bit attribute nibble
// on the Windows console. `ColorId::Default` means "whatever the terminal was
// using before we started", selected per channel independently.
//
// Palette layout (xterm 256):
//
//   0..=7     standard colors
//   8..=15    bright variants
//   16..=231  6×6×6 RGB cube   (index = 16 + 36r + 6g + b, r/g/b in 0..=5)
//   232..=255 24-step grayscale ramp

/// A single color channel value.
///
/// # Examples
///
/// ```
/// use glyph_term::color::ColorId;
///
/// assert_eq!(ColorId::rgb(5, 0, 0), ColorId::Indexed(196));
/// assert_eq!(ColorId::gray(0), ColorId::Indexed(232));
/// assert_eq!(ColorId::default(), ColorId::Default);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorId {
    /// The terminal's own default for this channel.
    #[default]
    Default,
    /// A 256-color palette index.
    Indexed(u8),
}

impl ColorId {
    pub const BLACK: Self = Self::Indexed(0);
    pub const RED: Self = Self::Indexed(1);
    pub const GREEN: Self = Self::Indexed(2);
    pub const YELLOW: Self = Self::Indexed(3);
    pub const BLUE: Self = Self::Indexed(4);
    pub const MAGENTA: Self = Self::Indexed(5);
    pub const CYAN: Self = Self::Indexed(6);
    pub const WHITE: Self = Self::Indexed(7);
    pub const BRIGHT_BLACK: Self = Self::Indexed(8);
    pub const BRIGHT_RED: Self = Self::Indexed(9);
    pub const BRIGHT_GREEN: Self = Self::Indexed(10);
    pub const BRIGHT_YELLOW: Self = Self::Indexed(11);
    pub const BRIGHT_BLUE: Self = Self::Indexed(12);
    pub const BRIGHT_MAGENTA: Self = Self::Indexed(13);
    pub const BRIGHT_CYAN: Self = Self::Indexed(14);
    pub const BRIGHT_WHITE: Self = Self::Indexed(15);

    /// A color from the 6×6×6 cube. Components above 5 are clamped.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        let r = if r > 5 { 5 } else { r };
        let g = if g > 5 { 5 } else { g };
        let b = if b > 5 { 5 } else { b };
        Self::Indexed(16 + 36 * r + 6 * g + b)
    }

    /// A step on the grayscale ramp, 0 (darkest) to 23 (lightest).
    /// Steps above 23 are clamped.
    #[must_use]
    pub const fn gray(step: u8) -> Self {
        let step = if step > 23 { 23 } else { step };
        Self::Indexed(232 + step)
    }

    /// Whether this is the terminal-default sentinel.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// The palette index, or `None` for [`ColorId::Default`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> Option<u8> {
        match self {
            Self::Default => None,
            Self::Indexed(idx) => Some(idx),
        }
    }

    /// Reduce to a Windows console attribute nibble.
    ///
    /// The console orders its bits blue-green-red (bit 0 = blue), ANSI orders
    /// them red-green-blue, so bits 0 and 2 swap. Only the 16 base colors map
    /// exactly; higher indices keep their low nibble.
    #[must_use]
    pub const fn console_nibble(self) -> Option<u16> {
        let Some(idx) = self.index() else {
            return None;
        };
        let n = (idx & 0x0F) as u16;
        let red = n & 0b0001;
        let blue = n & 0b0100;
        Some((n & 0b1010) | (red << 2) | (blue >> 2))
    }
}

impl From<u8> for ColorId {
    fn from(idx: u8) -> Self {
        Self::Indexed(idx)
    }
}

// ─── ColorPair ──────────────────────────────────────────────────────────────

/// Foreground and background selected together.
///
/// The diff renderer tracks the pair the terminal currently has active and
/// only emits a color command when the next dirty cell needs a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorPair {
    pub fg: ColorId,
    pub bg: ColorId,
}

impl ColorPair {
    /// Both channels at the terminal default.
    pub const DEFAULT: Self = Self {
        fg: ColorId::Default,
        bg: ColorId::Default,
    };

    /// Foreground and background together.
    #[inline]
    #[must_use]
    pub const fn new(fg: ColorId, bg: ColorId) -> Self {
        Self { fg, bg }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Cube and ramp ────────────────────────────────────────────────

    #[test]
    fn rgb_cube_corners() {
        assert_eq!(ColorId::rgb(0, 0, 0), ColorId::Indexed(16));
        assert_eq!(ColorId::rgb(5, 5, 5), ColorId::Indexed(231));
        assert_eq!(ColorId::rgb(0, 0, 5), ColorId::Indexed(21));
        assert_eq!(ColorId::rgb(0, 5, 0), ColorId::Indexed(46));
    }

    #[test]
    fn rgb_clamps_components() {
        assert_eq!(ColorId::rgb(9, 9, 9), ColorId::rgb(5, 5, 5));
    }

    #[test]
    fn gray_ramp_bounds() {
        assert_eq!(ColorId::gray(0), ColorId::Indexed(232));
        assert_eq!(ColorId::gray(23), ColorId::Indexed(255));
        assert_eq!(ColorId::gray(200), ColorId::Indexed(255));
    }

    // ── Sentinel ─────────────────────────────────────────────────────

    #[test]
    fn default_is_sentinel() {
        assert!(ColorId::default().is_default());
        assert_eq!(ColorId::Default.index(), None);
        assert_eq!(ColorId::RED.index(), Some(1));
    }

    #[test]
    fn from_u8() {
        assert_eq!(ColorId::from(42), ColorId::Indexed(42));
    }

    // ── Console nibble ───────────────────────────────────────────────

    #[test]
    fn console_swaps_red_and_blue() {
        assert_eq!(ColorId::RED.console_nibble(), Some(0b0100));
        assert_eq!(ColorId::BLUE.console_nibble(), Some(0b0001));
        assert_eq!(ColorId::GREEN.console_nibble(), Some(0b0010));
        assert_eq!(ColorId::YELLOW.console_nibble(), Some(0b0110));
        assert_eq!(ColorId::BRIGHT_RED.console_nibble(), Some(0b1100));
        assert_eq!(ColorId::WHITE.console_nibble(), Some(0b0111));
        assert_eq!(ColorId::Default.console_nibble(), None);
    }

    #[test]
    fn pair_default() {
        assert_eq!(ColorPair::default(), ColorPair::DEFAULT);
        assert_eq!(
            ColorPair::new(ColorId::RED, ColorId::Default).fg,
            ColorId::RED
        );
    }
}
