// SPDX-License-Identifier: MIT
//
// Windows console backend — cursor and attribute calls instead of escapes.
//
// Safety: every console operation is a Win32 call through `windows-sys`;
// each unsafe block wraps exactly one of them.
#![allow(unsafe_code)]
//
// The classic console does not interpret escape sequences, so positioning and
// coloring are API calls that take effect immediately. Character output is
// still batched: bytes collect in a pending buffer and are written with
// `WriteConsoleA` before the next cursor or attribute change, or on flush.
// That keeps each write landing where the preceding move put the cursor.
//
// Colors are console attribute nibbles (`fg | bg << 4`). The default pair is
// whatever attribute the console had when the backend attached.
//
// Input comes from the console input buffer as key events. Each key-down is
// converted to the byte form the console table expects: ASCII characters as
// themselves, navigation keys as `0xE0 scan`, F1–F10 as `0x00 scan`.

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::Console::{
    CONSOLE_SCREEN_BUFFER_INFO, COORD, ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT,
    ENABLE_PROCESSED_INPUT, FillConsoleOutputAttribute, FillConsoleOutputCharacterA,
    GetConsoleMode, GetConsoleScreenBufferInfo, GetNumberOfConsoleInputEvents, GetStdHandle,
    INPUT_RECORD, KEY_EVENT, ReadConsoleInputW, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
    SetConsoleCursorPosition, SetConsoleMode, SetConsoleTextAttribute, WriteConsoleA,
};

use crate::backend::Backend;
use crate::color::ColorPair;
use crate::config::RawMode;
use crate::error::{Error, Result};
use crate::grid::{Coord, Size};
use crate::keys::EscapeTable;

/// Input records fetched per `ReadConsoleInputW` call.
const RECORD_BATCH: usize = 32;

// ─── Key translation ─────────────────────────────────────────────────────────

const VK_PRIOR: u16 = 0x21;
const VK_DELETE: u16 = 0x2E;
const VK_F1: u16 = 0x70;
const VK_F10: u16 = 0x79;
const VK_F11: u16 = 0x7A;
const VK_F12: u16 = 0x7B;

/// Append the byte form of one key press to `out`.
///
/// Keys with no byte form (modifiers, non-ASCII text) append nothing.
pub fn key_bytes(virtual_key: u16, scan_code: u16, unicode: u16, out: &mut VecDeque<u8>) {
    #[allow(clippy::cast_possible_truncation)]
    let scan = scan_code as u8;
    match (unicode, virtual_key) {
        (1..=0x7F, _) => {
            #[allow(clippy::cast_possible_truncation)]
            out.push_back(unicode as u8);
        }
        (0, VK_F1..=VK_F10) => out.extend([0x00, scan]),
        (0, VK_F11) => out.extend([0xE0, 0x85]),
        (0, VK_F12) => out.extend([0xE0, 0x86]),
        (0, VK_PRIOR..=VK_DELETE) => out.extend([0xE0, scan]),
        _ => {}
    }
}

// ─── ConsoleBackend ──────────────────────────────────────────────────────────

/// Backend for the Windows console.
pub struct ConsoleBackend {
    output: HANDLE,
    input: HANDLE,
    default_attr: u16,
    original_mode: Option<u32>,
    pending_out: Vec<u8>,
    pending_in: VecDeque<u8>,
    bounds: Size,
    started: Instant,
}

impl ConsoleBackend {
    /// Attach to the process's console.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotATerminal`] if stdin or stdout is not a console.
    pub fn new() -> Result<Self> {
        let output = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
        let input = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
        if output.is_null() || output == INVALID_HANDLE_VALUE {
            return Err(Error::NotATerminal);
        }
        if input.is_null() || input == INVALID_HANDLE_VALUE {
            return Err(Error::NotATerminal);
        }

        let mut mode = 0u32;
        if unsafe { GetConsoleMode(input, &raw mut mode) } == 0 {
            return Err(Error::NotATerminal);
        }
        let info = screen_info(output).ok_or(Error::NotATerminal)?;

        Ok(Self {
            output,
            input,
            default_attr: info.wAttributes & 0xFF,
            original_mode: None,
            pending_out: Vec::with_capacity(4096),
            pending_in: VecDeque::new(),
            bounds: window_size(&info),
            started: Instant::now(),
        })
    }

    fn write_pending(&mut self) -> io::Result<()> {
        let mut rest: &[u8] = &self.pending_out;
        while !rest.is_empty() {
            let len = u32::try_from(rest.len()).unwrap_or(u32::MAX);
            let mut written = 0u32;
            let ok = unsafe {
                WriteConsoleA(
                    self.output,
                    rest.as_ptr(),
                    len,
                    &raw mut written,
                    std::ptr::null(),
                )
            };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            rest = &rest[(written as usize).min(rest.len())..];
        }
        self.pending_out.clear();
        Ok(())
    }

    fn attribute(&self, colors: ColorPair) -> u16 {
        let fg = colors.fg.console_nibble().unwrap_or(self.default_attr & 0x0F);
        let bg = colors
            .bg
            .console_nibble()
            .unwrap_or((self.default_attr >> 4) & 0x0F);
        fg | (bg << 4)
    }

    /// Move key events from the console into `pending_in`.
    fn pump_events(&mut self) -> io::Result<()> {
        loop {
            let mut count = 0u32;
            if unsafe { GetNumberOfConsoleInputEvents(self.input, &raw mut count) } == 0 {
                return Err(io::Error::last_os_error());
            }
            if count == 0 {
                return Ok(());
            }

            let mut records: [INPUT_RECORD; RECORD_BATCH] = unsafe { std::mem::zeroed() };
            let mut read = 0u32;
            #[allow(clippy::cast_possible_truncation)]
            let want = (count as usize).min(RECORD_BATCH) as u32;
            if unsafe { ReadConsoleInputW(self.input, records.as_mut_ptr(), want, &raw mut read) }
                == 0
            {
                return Err(io::Error::last_os_error());
            }

            for record in &records[..read as usize] {
                if u32::from(record.EventType) != u32::from(KEY_EVENT) {
                    continue;
                }
                let key = unsafe { record.Event.KeyEvent };
                if key.bKeyDown == 0 {
                    continue;
                }
                let unicode = unsafe { key.uChar.UnicodeChar };
                for _ in 0..key.wRepeatCount.max(1) {
                    key_bytes(
                        key.wVirtualKeyCode,
                        key.wVirtualScanCode,
                        unicode,
                        &mut self.pending_in,
                    );
                }
            }
        }
    }
}

fn screen_info(output: HANDLE) -> Option<CONSOLE_SCREEN_BUFFER_INFO> {
    let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
    (unsafe { GetConsoleScreenBufferInfo(output, &raw mut info) } != 0).then_some(info)
}

fn window_size(info: &CONSOLE_SCREEN_BUFFER_INFO) -> Size {
    let w = info.srWindow;
    #[allow(clippy::cast_sign_loss)]
    Size::new(
        (w.Right - w.Left + 1).max(0) as u16,
        (w.Bottom - w.Top + 1).max(0) as u16,
    )
}

impl Backend for ConsoleBackend {
    fn move_cursor(&mut self, pos: Coord) -> io::Result<()> {
        if !self.bounds.contains(pos) {
            return Ok(());
        }
        self.write_pending()?;
        #[allow(clippy::cast_possible_wrap)]
        let at = COORD {
            X: pos.col as i16,
            Y: pos.row as i16,
        };
        if unsafe { SetConsoleCursorPosition(self.output, at) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn set_colors(&mut self, colors: ColorPair) -> io::Result<()> {
        self.write_pending()?;
        if unsafe { SetConsoleTextAttribute(self.output, self.attribute(colors)) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        self.pending_out.push(byte);
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.write_pending()?;
        let info = screen_info(self.output).ok_or_else(io::Error::last_os_error)?;
        #[allow(clippy::cast_sign_loss)]
        let cells = (info.dwSize.X.max(0) as u32) * (info.dwSize.Y.max(0) as u32);
        let origin = COORD { X: 0, Y: 0 };
        let mut written = 0u32;
        unsafe {
            if FillConsoleOutputCharacterA(self.output, b' ' as _, cells, origin, &raw mut written) == 0
            {
                return Err(io::Error::last_os_error());
            }
            if FillConsoleOutputAttribute(
                self.output,
                self.default_attr,
                cells,
                origin,
                &raw mut written,
            ) == 0
            {
                return Err(io::Error::last_os_error());
            }
            if SetConsoleCursorPosition(self.output, origin) == 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_pending()
    }

    fn poll_input(&mut self) -> io::Result<bool> {
        if self.pending_in.is_empty() {
            self.pump_events()?;
        }
        Ok(!self.pending_in.is_empty())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pending_in.is_empty() {
            self.pump_events()?;
        }
        Ok(self.pending_in.pop_front())
    }

    fn escape_table(&self) -> EscapeTable {
        EscapeTable::CONSOLE
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    fn uptime_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn enable_raw_mode(&mut self, mode: RawMode) -> io::Result<()> {
        if self.original_mode.is_some() {
            return Ok(());
        }
        let mut current = 0u32;
        if unsafe { GetConsoleMode(self.input, &raw mut current) } == 0 {
            return Err(io::Error::last_os_error());
        }

        let mut raw = current;
        if mode.contains(RawMode::NO_ECHO) {
            raw &= !ENABLE_ECHO_INPUT;
        }
        if mode.contains(RawMode::NO_CANONICAL) {
            raw &= !ENABLE_LINE_INPUT;
        }
        if mode.contains(RawMode::NO_SIGNALS) {
            raw &= !ENABLE_PROCESSED_INPUT;
        }
        if unsafe { SetConsoleMode(self.input, raw) } == 0 {
            return Err(io::Error::last_os_error());
        }
        self.original_mode = Some(current);
        tracing::debug!(?mode, "console raw mode enabled");
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        let Some(original) = self.original_mode.take() else {
            return Ok(());
        };
        if unsafe { SetConsoleMode(self.input, original) } == 0 {
            return Err(io::Error::last_os_error());
        }
        tracing::debug!("console mode restored");
        Ok(())
    }

    fn physical_size(&self) -> Option<Size> {
        screen_info(self.output).map(|info| window_size(&info))
    }

    fn set_bounds(&mut self, size: Size) {
        self.bounds = size;
    }
}

impl Drop for ConsoleBackend {
    fn drop(&mut self) {
        let _ = self.flush();
        let _ = self.restore_mode();
    }
}

impl std::fmt::Debug for ConsoleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleBackend")
            .field("default_attr", &format_args!("{:#04x}", self.default_attr))
            .field("raw", &self.original_mode.is_some())
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputDecoder;
    use crate::keys::Key;

    fn bytes(vk: u16, scan: u16, unicode: u16) -> Vec<u8> {
        let mut out = VecDeque::new();
        key_bytes(vk, scan, unicode, &mut out);
        out.into()
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(bytes(0x41, 0x1E, u16::from(b'a')), b"a");
        assert_eq!(bytes(0x0D, 0x1C, 0x0D), b"\r");
    }

    #[test]
    fn navigation_keys_use_e0_prefix() {
        assert_eq!(bytes(0x26, 0x48, 0), [0xE0, b'H']);
        assert_eq!(bytes(VK_DELETE, 0x53, 0), [0xE0, b'S']);
    }

    #[test]
    fn function_keys() {
        assert_eq!(bytes(VK_F1, 0x3B, 0), [0x00, 0x3B]);
        assert_eq!(bytes(VK_F12, 0x58, 0), [0xE0, 0x86]);
    }

    #[test]
    fn modifiers_produce_nothing() {
        assert!(bytes(0x10, 0x2A, 0).is_empty());
        assert!(bytes(0x41, 0x1E, 0x00E9).is_empty());
    }

    #[test]
    fn translated_bytes_decode_with_console_table() {
        let mut dec = InputDecoder::new(EscapeTable::CONSOLE);
        dec.feed(&bytes(0x28, 0x50, 0));
        dec.feed(&bytes(VK_F11, 0x57, 0));
        assert_eq!(dec.decode_next(), Some(Key::Down));
        assert_eq!(dec.decode_next(), Some(Key::F(11)));
    }
}
