// SPDX-License-Identifier: MIT
//
// Engine configuration.
//
// Everything the terminal needs to know before it touches the device: the
// buffering mode, the logical size (or "ask the terminal"), input limits, and
// which line-discipline features raw mode turns off. Defaults suit an
// interactive full-screen program; `from_env` lets a binary override them
// without a config file.
//
// Recognized environment variables:
//
//   GLYPH_SIZE            `<cols>x<rows>`, e.g. `80x24`
//   GLYPH_BUFFERS         0, 1, or 2
//   GLYPH_ESC_TIMEOUT_MS  milliseconds before a lone ESC is delivered
//   GLYPH_HISTORY         1/true to keep the drawn-cell history grid

use crate::error::{Error, Result};
use crate::grid::Size;
use crate::input;

bitflags::bitflags! {
    /// Line-discipline features disabled while the engine is active.
    ///
    /// ```
    /// use glyph_term::config::RawMode;
    ///
    /// let mode = RawMode::default();
    /// assert!(mode.contains(RawMode::NO_ECHO | RawMode::NO_CANONICAL));
    /// assert!(!mode.contains(RawMode::NO_SIGNALS));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RawMode: u8 {
        /// Typed characters are not echoed by the terminal.
        const NO_ECHO      = 1 << 0;
        /// Bytes are delivered as typed, not a line at a time.
        const NO_CANONICAL = 1 << 1;
        /// Ctrl-C and Ctrl-Z arrive as bytes instead of signals.
        const NO_SIGNALS   = 1 << 2;
    }
}

impl Default for RawMode {
    /// Echo and line buffering off; signals still work so Ctrl-C interrupts.
    fn default() -> Self {
        Self::NO_ECHO | Self::NO_CANONICAL
    }
}

/// Default delay before an unfinished escape sequence is decoded byte-wise.
pub const DEFAULT_ESC_TIMEOUT_MS: u64 = 25;

/// Settings for [`Terminal::init`](crate::terminal::Terminal::init).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Logical width; `None` uses the terminal's column count.
    pub width: Option<u16>,
    /// Logical height; `None` uses the terminal's row count.
    pub height: Option<u16>,
    /// 0 = unbuffered, 1 = single buffer, 2 = double buffer.
    pub buffers: u8,
    /// Queued, undecoded input bytes at which backend reads pause.
    pub input_capacity: usize,
    /// How long a partial escape sequence may wait for its remaining bytes.
    pub escape_timeout_ms: u64,
    /// Sleep between polls in blocking key reads.
    pub poll_interval_ms: u64,
    /// Keep a copy of every drawn cell for inspection.
    pub keep_history: bool,
    /// Clear the physical screen on init so it matches the empty grid.
    pub clear_on_init: bool,
    /// Line-discipline features to disable.
    pub raw_mode: RawMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            buffers: 2,
            input_capacity: input::DEFAULT_CAPACITY,
            escape_timeout_ms: DEFAULT_ESC_TIMEOUT_MS,
            poll_interval_ms: 1,
            keep_history: false,
            clear_on_init: true,
            raw_mode: RawMode::default(),
        }
    }
}

impl Config {
    /// Force the logical size instead of following the terminal.
    #[must_use]
    pub const fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.width = Some(cols);
        self.height = Some(rows);
        self
    }

    /// Initial buffering: 0, 1, or 2 grids.
    #[must_use]
    pub const fn with_buffers(mut self, buffers: u8) -> Self {
        self.buffers = buffers;
        self
    }

    /// Queue length at which input reads pause.
    #[must_use]
    pub const fn with_input_capacity(mut self, bytes: usize) -> Self {
        self.input_capacity = bytes;
        self
    }

    /// How long an unfinished escape sequence waits before decoding raw.
    #[must_use]
    pub const fn with_escape_timeout_ms(mut self, ms: u64) -> Self {
        self.escape_timeout_ms = ms;
        self
    }

    /// Keep a copy of every drawn cell, readable through the frame.
    #[must_use]
    pub const fn with_history(mut self, keep: bool) -> Self {
        self.keep_history = keep;
        self
    }

    /// Line-discipline features to switch off while active.
    #[must_use]
    pub const fn with_raw_mode(mut self, mode: RawMode) -> Self {
        self.raw_mode = mode;
        self
    }

    /// Whether `init` erases the screen before the first frame.
    #[must_use]
    pub const fn with_clear_on_init(mut self, clear: bool) -> Self {
        self.clear_on_init = clear;
        self
    }

    /// Defaults overridden by `GLYPH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for unparsable values and
    /// [`Error::InvalidBufferCount`] for a buffer count above 2.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("GLYPH_SIZE") {
            let size = parse_size(&raw)?;
            config.width = Some(size.cols);
            config.height = Some(size.rows);
        }
        if let Some(raw) = lookup("GLYPH_BUFFERS") {
            config.buffers = parse_number("GLYPH_BUFFERS", &raw)?;
        }
        if let Some(raw) = lookup("GLYPH_ESC_TIMEOUT_MS") {
            config.escape_timeout_ms = parse_number("GLYPH_ESC_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("GLYPH_HISTORY") {
            config.keep_history = matches!(raw.trim(), "1" | "true" | "yes" | "on");
        }

        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Check values that cannot be expressed in the types.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBufferCount`] above 2 buffers, [`Error::InvalidConfig`]
    /// for a zero dimension or zero input capacity.
    pub fn validate(&self) -> Result<()> {
        if self.buffers > 2 {
            return Err(Error::InvalidBufferCount(self.buffers));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(Error::InvalidConfig("width and height must be non-zero".into()));
        }
        if self.input_capacity == 0 {
            return Err(Error::InvalidConfig("input capacity must be non-zero".into()));
        }
        Ok(())
    }
}

fn parse_size(raw: &str) -> Result<Size> {
    let invalid = || Error::InvalidConfig(format!("GLYPH_SIZE: expected <cols>x<rows>, got {raw:?}"));
    let (cols, rows) = raw.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let cols = cols.trim().parse().map_err(|_| invalid())?;
    let rows = rows.trim().parse().map_err(|_| invalid())?;
    Ok(Size::new(cols, rows))
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{name}: not a number: {raw:?}")))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
