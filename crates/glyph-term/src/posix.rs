// SPDX-License-Identifier: MIT
//
// POSIX backend — ANSI output, termios raw mode, non-blocking stdin.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty, poll,
// and read are the POSIX terminal interfaces and have no safe wrappers in
// std. Each unsafe block covers one call.
#![allow(unsafe_code)]
//
// Output goes through a `FrameWriter` and reaches the terminal in one write
// per flush. Cursor moves use HVP (`ESC [ row ; col f`) and colors use the
// 256-color SGR forms, with 39/49 for the terminal's own default colors.
//
// Input never blocks: readiness is checked with `poll(2)` and a zero
// timeout, then `read(2)` takes whatever is there.
//
// A panic while raw mode is active would leave the shell without echo. The
// first successful `enable_raw_mode` installs a panic hook that restores the
// saved termios from a global backup and resets colors before the panic
// message prints.

use std::io;
use std::os::unix::io::AsRawFd;
use std::sync::{Mutex, Once};
use std::time::{Duration, Instant};

use crate::backend::Backend;
use crate::color::ColorPair;
use crate::config::RawMode;
use crate::error::{Error, Result};
use crate::grid::{Coord, Size};
use crate::keys::EscapeTable;
use crate::output::FrameWriter;

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Whether stdin is connected to a terminal.
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

/// The terminal size from `ioctl(TIOCGWINSZ)` on stdout, or `None` if stdout
/// is not a terminal.
#[must_use]
pub fn query_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then(|| Size::new(ws.ws_col, ws.ws_row))
}

// ─── Panic restore ───────────────────────────────────────────────────────────

/// Saved termios for the panic hook, which cannot reach the backend.
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Default colors, then a newline so the panic message starts on a fresh line.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[39m\x1b[49m\r\n";

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            // Raw fd write: the panic may have happened with stdout locked.
            unsafe {
                let _ = libc::write(
                    libc::STDOUT_FILENO,
                    EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                    EMERGENCY_RESTORE.len(),
                );
            }
            if let Ok(guard) = TERMIOS_BACKUP.lock() {
                if let Some(ref saved) = *guard {
                    unsafe {
                        let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, saved);
                    }
                }
            }
            original(info);
        }));
    });
}

// ─── PosixBackend ────────────────────────────────────────────────────────────

/// Backend for ANSI terminals on Unix.
pub struct PosixBackend {
    out: FrameWriter,
    stdin_fd: libc::c_int,
    original: Option<libc::termios>,
    bounds: Size,
    started: Instant,
}

impl PosixBackend {
    /// Attach to the process's terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotATerminal`] if stdin is not a TTY.
    pub fn new() -> Result<Self> {
        if !is_tty() {
            return Err(Error::NotATerminal);
        }
        Ok(Self {
            out: FrameWriter::new(),
            stdin_fd: io::stdin().as_raw_fd(),
            original: None,
            bounds: query_size().unwrap_or(Size::new(80, 24)),
            started: Instant::now(),
        })
    }

    fn poll(&self) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.stdin_fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let rc = unsafe { libc::poll(&raw mut pfd, 1, 0) };
        match rc {
            0 => Ok(false),
            n if n > 0 => Ok(pfd.revents & libc::POLLIN != 0),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn read_raw(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.stdin_fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return if matches!(err.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) {
                Ok(0)
            } else {
                Err(err)
            };
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }
}

impl Backend for PosixBackend {
    fn move_cursor(&mut self, pos: Coord) -> io::Result<()> {
        if self.bounds.contains(pos) {
            self.out.move_to(pos)?;
        }
        Ok(())
    }

    fn set_colors(&mut self, colors: ColorPair) -> io::Result<()> {
        self.out.set_colors(colors)
    }

    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        self.out.put(byte);
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.out.clear_screen()
    }

    fn flush(&mut self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.out.flush_to(&mut lock)
    }

    fn poll_input(&mut self) -> io::Result<bool> {
        self.poll()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.poll()? {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        Ok((self.read_raw(&mut byte)? == 1).then_some(byte[0]))
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || !self.poll()? {
            return Ok(0);
        }
        self.read_raw(buf)
    }

    fn escape_table(&self) -> EscapeTable {
        EscapeTable::POSIX
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    fn uptime_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn enable_raw_mode(&mut self, mode: RawMode) -> io::Result<()> {
        if self.original.is_some() {
            return Ok(());
        }

        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(self.stdin_fd, &raw mut original) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let termios = raw_termios(original, mode);
        if unsafe { libc::tcsetattr(self.stdin_fd, libc::TCSANOW, &raw const termios) } != 0 {
            return Err(io::Error::last_os_error());
        }

        // Recorded only once raw mode is really on, so a failed attempt can
        // be retried.
        install_panic_hook();
        self.original = Some(original);
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(original);
        }
        tracing::debug!(?mode, "raw mode enabled");
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        let Some(original) = self.original else {
            return Ok(());
        };
        // Kept on failure so the restore can be retried.
        if unsafe { libc::tcsetattr(self.stdin_fd, libc::TCSANOW, &raw const original) } != 0 {
            return Err(io::Error::last_os_error());
        }
        self.original = None;
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
        // Anything may write to the terminal until raw mode comes back.
        self.out.invalidate();
        tracing::debug!("terminal mode restored");
        Ok(())
    }

    fn physical_size(&self) -> Option<Size> {
        query_size()
    }

    fn set_bounds(&mut self, size: Size) {
        self.bounds = size;
    }
}

/// `termios` with the line-discipline features in `mode` switched off.
fn raw_termios(mut termios: libc::termios, mode: RawMode) -> libc::termios {
    if mode.contains(RawMode::NO_ECHO) {
        termios.c_lflag &= !libc::ECHO;
    }
    if mode.contains(RawMode::NO_CANONICAL) {
        termios.c_lflag &= !libc::ICANON;
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
    }
    if mode.contains(RawMode::NO_SIGNALS) {
        termios.c_lflag &= !libc::ISIG;
    }
    termios
}

impl Drop for PosixBackend {
    fn drop(&mut self) {
        let _ = self.flush();
        let _ = self.restore_mode();
    }
}

impl std::fmt::Debug for PosixBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosixBackend")
            .field("stdin_fd", &self.stdin_fd)
            .field("raw", &self.original.is_some())
            .field("bounds", &self.bounds)
            .field("pending_output", &self.out.pending().len())
            .field("bytes_flushed", &self.out.bytes_flushed())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
