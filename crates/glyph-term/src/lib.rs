// SPDX-License-Identifier: MIT
//
// glyph-term — Terminal rendering and input-decoding engine for glyph.
//
// Two halves, one handle:
//
//   Output — the application writes bytes into a fixed-size grid of cells.
//   `refresh` diffs that grid against what the physical terminal last showed
//   and emits only the changed cells, predicting where the hardware cursor
//   lands after each write so horizontal runs need a single cursor move and
//   a single color change.
//
//   Input — raw bytes are pulled from the platform backend into a queue and
//   matched against a platform-selected escape-sequence table, so arrow and
//   function keys arrive as one logical key no matter how the bytes were
//   split across reads.
//
// Platform differences live behind the `Backend` trait: ANSI escape codes
// and termios on POSIX, the structured console API on Windows, and a
// deterministic in-memory backend for tests and headless embedding.

pub mod ansi;
pub mod backend;
pub mod cell;
pub mod color;
pub mod config;
#[cfg(windows)]
pub mod console;
pub mod error;
pub mod frame;
pub mod grid;
pub mod headless;
pub mod input;
pub mod keys;
pub mod output;
#[cfg(unix)]
pub mod posix;
pub mod registry;
pub mod terminal;

pub use backend::Backend;
pub use cell::Cell;
pub use color::ColorId;
pub use config::{Config, RawMode};
pub use error::{Error, Result};
pub use grid::{Coord, ScreenGrid, Size};
pub use keys::Key;
pub use terminal::{BufferMode, Terminal};
