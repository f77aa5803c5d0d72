// SPDX-License-Identifier: MIT
//
// Terminal — the engine's public handle.
//
// Binds a backend, an optional FrameBuffer, and an InputDecoder into one
// object with a small lifecycle:
//
//   init → Active ──release──▶ Released ──resume──▶ Active …
//
// While active, output runs in one of three buffer modes, switchable at any
// time with `set_buffer_count`:
//
//   0  Unbuffered — every write goes straight to the backend.
//   1  Single     — writes land in a grid; `refresh` repaints all of it.
//   2  Double     — writes land in a grid; `refresh` sends only the diff.
//
// Input is pulled from the backend on demand. `get_key` never blocks;
// `get_key_blocking` and `get_key_timeout` refresh the screen first, then
// poll with short sleeps until a key decodes. A partial escape sequence that
// stops growing for `escape_timeout_ms` is given up on and its lead byte is
// delivered raw, which is how a real Escape keypress gets through.
//
// Dropping an active terminal releases it; errors at that point are ignored.

use std::fmt;

use crate::backend::Backend;
use crate::cell::Cell;
use crate::color::{ColorId, ColorPair};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{FrameBuffer, RenderStats};
use crate::grid::{Coord, Size};
use crate::input::InputDecoder;
use crate::keys::Key;

/// Size used when neither the caller nor the device provides one.
const FALLBACK_SIZE: Size = Size::new(80, 24);

// ─── BufferMode ──────────────────────────────────────────────────────────────

/// How writes reach the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Writes go straight to the backend.
    Unbuffered,
    /// Writes are collected and fully repainted on refresh.
    Single,
    /// Writes are collected and diffed against the last frame on refresh.
    Double,
}

impl BufferMode {
    /// The mode for a buffer count of 0, 1, or 2.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBufferCount`] for any other count.
    pub const fn from_count(count: u8) -> Result<Self> {
        match count {
            0 => Ok(Self::Unbuffered),
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            n => Err(Error::InvalidBufferCount(n)),
        }
    }

    /// The number of grids this mode keeps.
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::Unbuffered => 0,
            Self::Single => 1,
            Self::Double => 2,
        }
    }
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// A rendering and input engine over one backend.
///
/// # Examples
///
/// ```
/// use glyph_term::headless::HeadlessBackend;
/// use glyph_term::{Config, Size, Terminal};
///
/// let backend = HeadlessBackend::new(Size::new(10, 2));
/// let mut term = Terminal::init(backend, Config::default())?;
///
/// term.puts(b"HELLO")?;
/// let stats = term.refresh()?;
/// assert_eq!(stats.cells_drawn, 5);
/// assert_eq!(term.backend().screen_text(), "HELLO     \n          \n");
/// # Ok::<(), glyph_term::Error>(())
/// ```
pub struct Terminal<B: Backend> {
    backend: B,
    config: Config,
    frame: Option<FrameBuffer>,
    requested: (Option<u16>, Option<u16>),
    size: Size,
    cursor: Coord,
    colors: ColorPair,
    input: InputDecoder,
    /// When the current partial escape sequence was first seen, and how long
    /// it was then.
    partial: Option<(u64, usize)>,
    active: bool,
}

impl<B: Backend> Terminal<B> {
    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Take over `backend`: enter raw mode, clear the screen if configured,
    /// and set up buffering and input decoding.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, or the backend's
    /// I/O error if raw mode or the initial clear fails. Raw mode is undone
    /// again if a later step fails.
    pub fn init(backend: B, config: Config) -> Result<Self> {
        config.validate()?;
        let mode = BufferMode::from_count(config.buffers)?;

        let requested = (config.width, config.height);
        let size = resolve_size(requested, backend.physical_size());

        let frame = (mode != BufferMode::Unbuffered).then(|| {
            let mut frame = FrameBuffer::new(size, mode.count());
            frame.set_history(config.keep_history);
            frame
        });
        let input = InputDecoder::with_capacity(backend.escape_table(), config.input_capacity);

        let mut term = Self {
            backend,
            config,
            frame,
            requested,
            size,
            cursor: Coord::ORIGIN,
            colors: ColorPair::DEFAULT,
            input,
            partial: None,
            active: false,
        };
        term.activate()?;
        tracing::info!(
            cols = size.cols,
            rows = size.rows,
            buffers = mode.count(),
            table = term.input.table().name(),
            "terminal initialized"
        );
        Ok(term)
    }

    fn activate(&mut self) -> Result<()> {
        self.backend.enable_raw_mode(self.config.raw_mode)?;
        if let Err(err) = self.prepare_screen() {
            let _ = self.backend.restore_mode();
            return Err(err);
        }
        self.active = true;
        Ok(())
    }

    fn prepare_screen(&mut self) -> Result<()> {
        self.backend.set_bounds(self.size);
        if self.config.clear_on_init {
            self.backend.clear_screen()?;
        }
        self.backend.reset_colors()?;
        self.backend.flush()?;
        Ok(())
    }

    /// Restore the backend's original mode. Colors are reset and a newline
    /// is written so the shell prompt starts on a fresh line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActive`] if already released, or the backend's
    /// I/O error. The terminal counts as released either way.
    pub fn release(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.active = false;

        let out = self.leave_screen();
        let restored = self.backend.restore_mode();
        tracing::info!("terminal released");

        out?;
        restored?;
        Ok(())
    }

    fn leave_screen(&mut self) -> Result<()> {
        self.backend.reset_colors()?;
        self.backend.put_byte(b'\n')?;
        self.backend.flush()?;
        Ok(())
    }

    /// Re-enter raw mode after [`release`](Self::release), keeping the
    /// grid content and settings. The next refresh repaints everything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyActive`] if the terminal was not released, or
    /// the backend's I/O error.
    pub fn resume(&mut self) -> Result<()> {
        if self.active {
            return Err(Error::AlreadyActive);
        }
        self.activate()?;
        if let Some(frame) = &mut self.frame {
            frame.invalidate();
        }
        tracing::info!("terminal resumed");
        Ok(())
    }

    /// Whether the terminal is between `init`/`resume` and `release`.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    const fn ensure_active(&self) -> Result<()> {
        if self.active { Ok(()) } else { Err(Error::NotActive) }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    /// The backend, for inspection.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct backend access. Output written here bypasses buffering.
    #[inline]
    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The configuration the terminal was created with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The frame buffer, when buffering is on.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> Option<&FrameBuffer> {
        self.frame.as_ref()
    }

    /// The input decoder (for inspecting queued bytes).
    #[inline]
    #[must_use]
    pub const fn input(&self) -> &InputDecoder {
        &self.input
    }

    // ─── Buffering ───────────────────────────────────────────────────────

    /// The active buffering mode.
    #[must_use]
    pub fn buffer_mode(&self) -> BufferMode {
        match self.frame.as_ref().map(FrameBuffer::buffer_count) {
            None => BufferMode::Unbuffered,
            Some(1) => BufferMode::Single,
            Some(_) => BufferMode::Double,
        }
    }

    /// 0, 1, or 2.
    #[must_use]
    pub fn buffer_count(&self) -> u8 {
        self.buffer_mode().count()
    }

    /// Switch buffer modes.
    ///
    /// Turning buffering off discards the grid without drawing it; the
    /// backend cursor and colors are set to continue where the grid's
    /// cursor was. Turning it on starts from an empty grid and repaints
    /// everything on the next refresh.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBufferCount`] for a count above 2,
    /// [`Error::NotActive`] after release, or the backend's I/O error.
    pub fn set_buffer_count(&mut self, count: u8) -> Result<()> {
        let mode = BufferMode::from_count(count)?;
        self.ensure_active()?;
        let from = self.buffer_mode();
        if mode == from {
            return Ok(());
        }

        if mode == BufferMode::Unbuffered {
            if let Some(frame) = self.frame.take() {
                self.cursor = frame.cursor();
            }
            self.backend.move_cursor(self.cursor)?;
            self.backend.set_colors(self.colors)?;
        } else if let Some(frame) = &mut self.frame {
            frame.set_buffer_count(count);
        } else {
            let mut frame = FrameBuffer::new(self.size, count);
            frame.set_history(self.config.keep_history);
            frame.move_to(self.cursor);
            frame.invalidate();
            self.frame = Some(frame);
            self.backend.reset_colors()?;
        }

        tracing::info!(from = from.count(), to = count, "buffer mode changed");
        Ok(())
    }

    /// Keep (or stop keeping) the drawn-cell history grid.
    pub fn set_history(&mut self, enabled: bool) {
        self.config.keep_history = enabled;
        if let Some(frame) = &mut self.frame {
            frame.set_history(enabled);
        }
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Logical size in cells.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Logical width in columns.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.size.cols
    }

    /// Logical height in rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.size.rows
    }

    /// Set the logical size. `None` for a dimension follows the device.
    ///
    /// Buffered content in the overlapping region is kept; the next refresh
    /// repaints everything.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for a zero dimension.
    pub fn set_size(&mut self, width: Option<u16>, height: Option<u16>) -> Result<()> {
        if width == Some(0) || height == Some(0) {
            return Err(Error::InvalidConfig("width and height must be non-zero".into()));
        }
        self.requested = (width, height);
        self.apply_size(resolve_size(self.requested, self.backend.physical_size()));
        Ok(())
    }

    /// Re-read the device size for dimensions that follow it.
    ///
    /// Returns `true` if the logical size changed.
    pub fn sync_size(&mut self) -> bool {
        let size = resolve_size(self.requested, self.backend.physical_size());
        let changed = size != self.size;
        self.apply_size(size);
        changed
    }

    fn apply_size(&mut self, size: Size) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.backend.set_bounds(size);
        if let Some(frame) = &mut self.frame {
            frame.resize(size);
        }
        if !size.contains(self.cursor) {
            self.cursor = Coord::ORIGIN;
        }
        tracing::debug!(cols = size.cols, rows = size.rows, "terminal resized");
    }

    // ─── Color ───────────────────────────────────────────────────────────

    /// The colors applied to following writes.
    #[inline]
    #[must_use]
    pub const fn colors(&self) -> ColorPair {
        self.colors
    }

    /// Select colors for following writes.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error when
    /// unbuffered.
    pub fn set_color(&mut self, fg: ColorId, bg: ColorId) -> Result<()> {
        self.ensure_active()?;
        self.colors = ColorPair::new(fg, bg);
        if self.frame.is_none() {
            self.backend.set_colors(self.colors)?;
        }
        Ok(())
    }

    /// Change only the foreground.
    ///
    /// # Errors
    ///
    /// Same as [`set_color`](Self::set_color).
    pub fn set_fg(&mut self, fg: ColorId) -> Result<()> {
        self.set_color(fg, self.colors.bg)
    }

    /// Change only the background.
    ///
    /// # Errors
    ///
    /// Same as [`set_color`](Self::set_color).
    pub fn set_bg(&mut self, bg: ColorId) -> Result<()> {
        self.set_color(self.colors.fg, bg)
    }

    /// Return to the terminal's default colors.
    ///
    /// # Errors
    ///
    /// Same as [`set_color`](Self::set_color).
    pub fn reset_color(&mut self) -> Result<()> {
        self.set_color(ColorId::Default, ColorId::Default)
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Where the next character lands.
    #[must_use]
    pub fn cursor(&self) -> Coord {
        self.frame.as_ref().map_or(self.cursor, FrameBuffer::cursor)
    }

    /// Move the write position. Out-of-range positions are ignored.
    ///
    /// Returns `true` if the cursor moved.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error when
    /// unbuffered.
    pub fn move_cursor(&mut self, col: u16, row: u16) -> Result<bool> {
        self.ensure_active()?;
        let at = Coord::new(col, row);
        if let Some(frame) = &mut self.frame {
            return Ok(frame.move_to(at));
        }
        if !self.size.contains(at) {
            tracing::debug!(col, row, "cursor move outside the screen ignored");
            return Ok(false);
        }
        self.cursor = at;
        self.backend.move_cursor(at)?;
        Ok(true)
    }

    /// Write one byte at the cursor in the current colors and advance.
    ///
    /// `\n` moves to the start of the next row, `\r` to the start of the
    /// current row. Writing past the last cell wraps to the top-left.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error when
    /// unbuffered.
    pub fn put_char(&mut self, byte: u8) -> Result<()> {
        self.ensure_active()?;
        if let Some(frame) = &mut self.frame {
            frame.put(byte, self.colors);
            return Ok(());
        }
        if self.size.area() == 0 {
            return Ok(());
        }

        let next = match byte {
            b'\n' => Coord::new(0, self.cursor.row.saturating_add(1)),
            b'\r' => Coord::new(0, self.cursor.row),
            _ => {
                self.backend.put_byte(byte)?;
                self.cursor.step(self.size.cols)
            }
        };
        let wrapped = next.row >= self.size.rows;
        self.cursor = if wrapped { Coord::ORIGIN } else { next };
        if wrapped || matches!(byte, b'\n' | b'\r') {
            self.backend.move_cursor(self.cursor)?;
        }
        Ok(())
    }

    /// Write each byte as [`put_char`](Self::put_char) would.
    ///
    /// # Errors
    ///
    /// Same as [`put_char`](Self::put_char); bytes before a failure are
    /// already written.
    pub fn puts(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.put_char(b)?;
        }
        Ok(())
    }

    /// Cover the whole screen with `byte` in the current colors. The cursor
    /// ends at the top-left.
    ///
    /// # Errors
    ///
    /// Same as [`put_char`](Self::put_char).
    pub fn fill_screen(&mut self, byte: u8) -> Result<()> {
        self.ensure_active()?;
        if let Some(frame) = &mut self.frame {
            frame.fill(Cell::styled(byte, self.colors.fg, self.colors.bg));
            frame.move_to(Coord::ORIGIN);
            return Ok(());
        }
        self.move_cursor(0, 0)?;
        for _ in 0..self.size.area() {
            self.put_char(byte)?;
        }
        Ok(())
    }

    /// Bring the physical screen up to date and flush the backend.
    ///
    /// Unbuffered terminals only flush and report empty statistics. If the
    /// backend fails part way, the screen content is unknown and the next
    /// refresh repaints every cell.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error.
    pub fn refresh(&mut self) -> Result<RenderStats> {
        self.ensure_active()?;
        let result = self.draw_frame();
        if result.is_err() {
            if let Some(frame) = &mut self.frame {
                frame.invalidate();
            }
            tracing::debug!("refresh failed, next refresh repaints everything");
        }
        result
    }

    fn draw_frame(&mut self) -> Result<RenderStats> {
        let mut stats = RenderStats::default();
        if let Some(frame) = &mut self.frame {
            let (ops, rendered) = frame.render();
            for &op in ops {
                self.backend.apply(op)?;
            }
            stats = rendered;
        }
        self.backend.flush()?;
        Ok(stats)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Whether a key may be ready: bytes are queued or the backend has input.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error.
    pub fn kbhit(&mut self) -> Result<bool> {
        self.ensure_active()?;
        self.input.fill_from(&mut self.backend)?;
        Ok(!self.input.is_empty() || self.backend.poll_input()?)
    }

    /// Decode one key if one is ready, without waiting.
    ///
    /// A partial escape sequence that has not grown for the escape timeout
    /// is decoded byte by byte.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error.
    pub fn get_key(&mut self) -> Result<Option<Key>> {
        self.ensure_active()?;
        self.input.fill_from(&mut self.backend)?;

        if let Some(key) = self.input.decode_next() {
            self.partial = None;
            return Ok(Some(key));
        }
        if !self.input.is_partial() {
            self.partial = None;
            return Ok(None);
        }

        let now = self.backend.uptime_ms();
        let len = self.input.len();
        let since = match self.partial {
            Some((since, seen)) if seen == len => since,
            _ => {
                self.partial = Some((now, len));
                now
            }
        };
        if now.saturating_sub(since) < self.config.escape_timeout_ms {
            return Ok(None);
        }

        self.partial = None;
        let key = self.input.decode_stalled();
        tracing::trace!(?key, "escape timeout");
        Ok(key)
    }

    /// Refresh, then wait until a key decodes.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error.
    pub fn get_key_blocking(&mut self) -> Result<Key> {
        self.refresh()?;
        loop {
            if let Some(key) = self.get_key()? {
                return Ok(key);
            }
            let nap = self.poll_interval();
            self.backend.sleep_ms(nap);
        }
    }

    /// Refresh, then wait up to `timeout_ms` for a key.
    ///
    /// Returns `None` if the time runs out first. A zero timeout checks once.
    ///
    /// # Errors
    ///
    /// [`Error::NotActive`] after release, or the backend's I/O error.
    pub fn get_key_timeout(&mut self, timeout_ms: u64) -> Result<Option<Key>> {
        self.refresh()?;
        let deadline = self.backend.uptime_ms().saturating_add(timeout_ms);
        loop {
            if let Some(key) = self.get_key()? {
                return Ok(Some(key));
            }
            let now = self.backend.uptime_ms();
            if now >= deadline {
                return Ok(None);
            }
            let nap = self.poll_interval().min(deadline - now);
            self.backend.sleep_ms(nap);
        }
    }

    /// Drop queued input bytes, including any partial sequence.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.partial = None;
    }

    const fn poll_interval(&self) -> u64 {
        if self.config.poll_interval_ms == 0 { 1 } else { self.config.poll_interval_ms }
    }

    // ─── Time ────────────────────────────────────────────────────────────

    /// Suspend for `ms` milliseconds.
    pub fn sleep(&mut self, ms: u64) {
        self.backend.sleep_ms(ms);
    }

    /// Milliseconds since the backend started.
    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        self.backend.uptime_ms()
    }
}

#[cfg(any(unix, windows))]
impl Terminal<crate::backend::NativeBackend> {
    /// Initialize on the process's own terminal.
    ///
    /// # Errors
    ///
    /// [`Error::NotATerminal`] without a controlling terminal; otherwise as
    /// [`init`](Self::init).
    pub fn native(config: Config) -> Result<Self> {
        Self::init(crate::backend::NativeBackend::new()?, config)
    }
}

fn resolve_size(requested: (Option<u16>, Option<u16>), physical: Option<Size>) -> Size {
    let physical = physical.unwrap_or(FALLBACK_SIZE);
    Size::new(
        requested.0.unwrap_or(physical.cols),
        requested.1.unwrap_or(physical.rows),
    )
}

impl<B: Backend> fmt::Write for Terminal<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.puts(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<B: Backend> Drop for Terminal<B> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.release();
        }
    }
}

impl<B: Backend + fmt::Debug> fmt::Debug for Terminal<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("backend", &self.backend)
            .field("mode", &self.buffer_mode())
            .field("size", &self.size)
            .field("colors", &self.colors)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
