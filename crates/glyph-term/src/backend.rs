// SPDX-License-Identifier: MIT
//
// Backend — the seam between the engine and a concrete terminal device.
//
// The engine never talks to a file descriptor or console handle directly. It
// asks a `Backend` to move the cursor, select colors, write a byte, and hand
// over whatever input bytes are ready. Three implementations exist:
//
//   PosixBackend    — ANSI escape sequences on stdout, termios, poll(2).
//   ConsoleBackend  — the Windows console API (cursor/attribute calls).
//   HeadlessBackend — in-memory screen, scripted input, virtual clock.
//
// Output may be buffered by the backend; nothing is guaranteed visible until
// `flush`. Input is strictly non-blocking: `read_available` returns 0 rather
// than waiting.

use std::io;

use crate::color::ColorPair;
use crate::config::RawMode;
use crate::frame::DrawOp;
use crate::grid::{Coord, Size};
use crate::keys::EscapeTable;

/// Platform terminal primitives.
pub trait Backend {
    // ─── Output ──────────────────────────────────────────────────────────

    /// Move the hardware cursor. Positions outside the bounds set by
    /// [`set_bounds`](Self::set_bounds) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn move_cursor(&mut self, pos: Coord) -> io::Result<()>;

    /// Select foreground and background colors for following writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn set_colors(&mut self, colors: ColorPair) -> io::Result<()>;

    /// Return both color channels to the terminal defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn reset_colors(&mut self) -> io::Result<()> {
        self.set_colors(ColorPair::DEFAULT)
    }

    /// Write one character at the cursor; the cursor advances one column.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn put_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Erase the whole screen to default-colored blanks.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn clear_screen(&mut self) -> io::Result<()>;

    /// Make everything written so far visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn flush(&mut self) -> io::Result<()>;

    /// Carry out one render operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    fn apply(&mut self, op: DrawOp) -> io::Result<()> {
        match op {
            DrawOp::MoveTo(at) | DrawOp::RestoreCursor(at) => self.move_cursor(at),
            DrawOp::SetColors(colors) => self.set_colors(colors),
            DrawOp::Put(byte) => self.put_byte(byte),
            DrawOp::ResetColors => self.reset_colors(),
        }
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Whether at least one input byte is ready, without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be polled.
    fn poll_input(&mut self) -> io::Result<bool>;

    /// Read one ready byte, or `None` if nothing is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the device read fails.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Read as many ready bytes as fit in `buf`, without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the device read fails.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() && self.poll_input()? {
            match self.read_byte()? {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    /// The escape-sequence table matching this device's key encoding.
    fn escape_table(&self) -> EscapeTable;

    // ─── Time ────────────────────────────────────────────────────────────

    /// Suspend the caller for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u64);

    /// Milliseconds since the backend was created.
    fn uptime_ms(&self) -> u64;

    // ─── Mode & geometry ─────────────────────────────────────────────────

    /// Turn off the line-discipline features in `mode`, saving the original
    /// settings for [`restore_mode`](Self::restore_mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the device settings cannot be read or changed.
    fn enable_raw_mode(&mut self, mode: RawMode) -> io::Result<()>;

    /// Restore the settings saved by [`enable_raw_mode`](Self::enable_raw_mode).
    /// A no-op if raw mode was never enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the device settings cannot be changed.
    fn restore_mode(&mut self) -> io::Result<()>;

    /// The device's size in cells, if it can be determined.
    fn physical_size(&self) -> Option<Size>;

    /// Limit cursor moves to `size`.
    fn set_bounds(&mut self, size: Size);
}

// Forwarding impls so a terminal can own a boxed backend or borrow one.
macro_rules! forward_backend {
    ($($ty:ty),*) => {$(
        impl<B: Backend + ?Sized> Backend for $ty {
            fn move_cursor(&mut self, pos: Coord) -> io::Result<()> {
                (**self).move_cursor(pos)
            }
            fn set_colors(&mut self, colors: ColorPair) -> io::Result<()> {
                (**self).set_colors(colors)
            }
            fn reset_colors(&mut self) -> io::Result<()> {
                (**self).reset_colors()
            }
            fn put_byte(&mut self, byte: u8) -> io::Result<()> {
                (**self).put_byte(byte)
            }
            fn clear_screen(&mut self) -> io::Result<()> {
                (**self).clear_screen()
            }
            fn flush(&mut self) -> io::Result<()> {
                (**self).flush()
            }
            fn apply(&mut self, op: DrawOp) -> io::Result<()> {
                (**self).apply(op)
            }
            fn poll_input(&mut self) -> io::Result<bool> {
                (**self).poll_input()
            }
            fn read_byte(&mut self) -> io::Result<Option<u8>> {
                (**self).read_byte()
            }
            fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                (**self).read_available(buf)
            }
            fn escape_table(&self) -> EscapeTable {
                (**self).escape_table()
            }
            fn sleep_ms(&mut self, ms: u64) {
                (**self).sleep_ms(ms);
            }
            fn uptime_ms(&self) -> u64 {
                (**self).uptime_ms()
            }
            fn enable_raw_mode(&mut self, mode: RawMode) -> io::Result<()> {
                (**self).enable_raw_mode(mode)
            }
            fn restore_mode(&mut self) -> io::Result<()> {
                (**self).restore_mode()
            }
            fn physical_size(&self) -> Option<Size> {
                (**self).physical_size()
            }
            fn set_bounds(&mut self, size: Size) {
                (**self).set_bounds(size);
            }
        }
    )*};
}

forward_backend!(Box<B>, &mut B);

/// The backend for the platform this crate was built for.
#[cfg(unix)]
pub type NativeBackend = crate::posix::PosixBackend;

/// The backend for the platform this crate was built for.
#[cfg(windows)]
pub type NativeBackend = crate::console::ConsoleBackend;

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorId;
    use crate::headless::{HeadlessBackend, Op};
    use pretty_assertions::assert_eq;

    #[test]
    fn apply_maps_ops_to_primitives() {
        let mut backend = HeadlessBackend::new(Size::new(4, 2));
        let red = ColorPair::new(ColorId::RED, ColorId::Default);

        for op in [
            DrawOp::MoveTo(Coord::new(1, 1)),
            DrawOp::SetColors(red),
            DrawOp::Put(b'x'),
            DrawOp::RestoreCursor(Coord::ORIGIN),
            DrawOp::ResetColors,
        ] {
            backend.apply(op).unwrap();
        }

        assert_eq!(
            backend.ops(),
            &[
                Op::MoveCursor(Coord::new(1, 1)),
                Op::SetColors(red),
                Op::Put(b'x'),
                Op::MoveCursor(Coord::ORIGIN),
                Op::ResetColors,
            ]
        );
    }

    #[test]
    fn default_read_available_stops_when_dry() {
        let mut backend = HeadlessBackend::new(Size::new(4, 2));
        backend.push_input(b"ab");
        let mut buf = [0u8; 8];
        assert_eq!(backend.read_available(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(backend.read_available(&mut buf).unwrap(), 0);
    }

    #[test]
    fn boxed_backend_delegates() {
        let mut boxed: Box<dyn Backend> = Box::new(HeadlessBackend::new(Size::new(4, 2)));
        boxed.put_byte(b'z').unwrap();
        boxed.sleep_ms(7);
        assert_eq!(boxed.uptime_ms(), 7);
        assert_eq!(boxed.physical_size(), Some(Size::new(4, 2)));
    }
}
