// SPDX-License-Identifier: MIT
//
// HeadlessBackend — a terminal that exists only in memory.
//
// It records every primitive the engine issues, applies them to a simulated
// screen (so tests can assert on what a user would see), serves input from a
// script, and keeps a virtual clock that only moves when the engine sleeps.
// Tests run deterministically with no TTY and no wall-clock waits.
//
// Scripted input can be timed: `push_input_at(ms, bytes)` makes bytes
// invisible until the clock reaches `ms`, which is how escape-timeout
// behavior is exercised.

use std::collections::VecDeque;
use std::io;

use crate::backend::Backend;
use crate::cell::Cell;
use crate::color::ColorPair;
use crate::config::RawMode;
use crate::grid::{Coord, ScreenGrid, Size};
use crate::keys::EscapeTable;

/// One recorded backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    MoveCursor(Coord),
    SetColors(ColorPair),
    ResetColors,
    Put(u8),
    Clear,
    Flush,
}

/// In-memory backend for tests and embedding.
#[derive(Debug)]
pub struct HeadlessBackend {
    screen: ScreenGrid,
    bounds: Size,
    physical: Option<Size>,
    cursor: Coord,
    colors: ColorPair,
    ops: Vec<Op>,
    input: VecDeque<u8>,
    scheduled: Vec<(u64, Vec<u8>)>,
    clock_ms: u64,
    raw: Option<RawMode>,
    table: EscapeTable,
    failing: bool,
}

impl HeadlessBackend {
    /// A blank screen of `size` that decodes input with the POSIX table.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            screen: ScreenGrid::new(size),
            bounds: size,
            physical: Some(size),
            cursor: Coord::ORIGIN,
            colors: ColorPair::DEFAULT,
            ops: Vec::new(),
            input: VecDeque::new(),
            scheduled: Vec::new(),
            clock_ms: 0,
            raw: None,
            table: EscapeTable::POSIX,
            failing: false,
        }
    }

    /// Use a different key encoding (e.g. [`EscapeTable::CONSOLE`]).
    #[must_use]
    pub const fn with_table(mut self, table: EscapeTable) -> Self {
        self.table = table;
        self
    }

    /// Report `size` (or no size) from `physical_size`, as a terminal that
    /// was resized or cannot be queried would.
    pub const fn set_physical_size(&mut self, size: Option<Size>) {
        self.physical = size;
    }

    /// Make every output call fail with `BrokenPipe` until turned off.
    pub const fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    // ─── Input script ────────────────────────────────────────────────────

    /// Queue bytes for immediate reading.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Queue bytes that become readable once the clock reaches `at_ms`.
    pub fn push_input_at(&mut self, at_ms: u64, bytes: &[u8]) {
        self.scheduled.push((at_ms, bytes.to_vec()));
        self.scheduled.sort_by_key(|(at, _)| *at);
    }

    /// Bytes readable now that have not been read.
    #[must_use]
    pub fn unread_input(&self) -> usize {
        self.input.len()
    }

    /// Move the clock forward, as if the engine had slept.
    pub fn advance(&mut self, ms: u64) {
        self.clock_ms = self.clock_ms.saturating_add(ms);
        self.release_due();
    }

    fn release_due(&mut self) {
        let now = self.clock_ms;
        let due = self.scheduled.partition_point(|(at, _)| *at <= now);
        for (_, bytes) in self.scheduled.drain(..due) {
            self.input.extend(bytes);
        }
    }

    // ─── Inspection ──────────────────────────────────────────────────────

    /// Every call recorded since creation or the last [`take_ops`](Self::take_ops).
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Return and forget the recorded calls.
    pub fn take_ops(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.ops)
    }

    /// How many recorded calls satisfy `pred`.
    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Recorded character writes.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.count(|op| matches!(op, Op::Put(_)))
    }

    /// Recorded cursor moves.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.count(|op| matches!(op, Op::MoveCursor(_)))
    }

    /// Recorded color selections, excluding resets.
    #[must_use]
    pub fn color_count(&self) -> usize {
        self.count(|op| matches!(op, Op::SetColors(_)))
    }

    /// What the simulated screen shows.
    #[must_use]
    pub const fn screen(&self) -> &ScreenGrid {
        &self.screen
    }

    /// The simulated screen as text, one line per row.
    #[must_use]
    pub fn screen_text(&self) -> String {
        self.screen.to_text()
    }

    /// Where the simulated hardware cursor is.
    #[must_use]
    pub const fn cursor(&self) -> Coord {
        self.cursor
    }

    /// The currently selected colors.
    #[must_use]
    pub const fn colors(&self) -> ColorPair {
        self.colors
    }

    /// The raw-mode flags in effect, or `None` in cooked mode.
    #[must_use]
    pub const fn raw_mode(&self) -> Option<RawMode> {
        self.raw
    }

    fn check(&self) -> io::Result<()> {
        if self.failing {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "headless output closed"))
        } else {
            Ok(())
        }
    }
}

impl Backend for HeadlessBackend {
    fn move_cursor(&mut self, pos: Coord) -> io::Result<()> {
        self.check()?;
        self.ops.push(Op::MoveCursor(pos));
        if self.bounds.contains(pos) {
            self.cursor = pos;
        }
        Ok(())
    }

    fn set_colors(&mut self, colors: ColorPair) -> io::Result<()> {
        self.check()?;
        self.ops.push(Op::SetColors(colors));
        self.colors = colors;
        Ok(())
    }

    fn reset_colors(&mut self) -> io::Result<()> {
        self.check()?;
        self.ops.push(Op::ResetColors);
        self.colors = ColorPair::DEFAULT;
        Ok(())
    }

    fn put_byte(&mut self, byte: u8) -> io::Result<()> {
        self.check()?;
        self.ops.push(Op::Put(byte));
        let cell = Cell::styled(byte, self.colors.fg, self.colors.bg);
        if self.screen.try_set(self.cursor, cell) {
            let next = self.cursor.step(self.screen.width());
            self.cursor = if next.row < self.screen.height() { next } else { Coord::ORIGIN };
        }
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.check()?;
        self.ops.push(Op::Clear);
        self.screen.fill(Cell::EMPTY);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        self.ops.push(Op::Flush);
        Ok(())
    }

    fn poll_input(&mut self) -> io::Result<bool> {
        self.release_due();
        Ok(!self.input.is_empty())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.release_due();
        Ok(self.input.pop_front())
    }

    fn escape_table(&self) -> EscapeTable {
        self.table
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.advance(ms);
    }

    fn uptime_ms(&self) -> u64 {
        self.clock_ms
    }

    fn enable_raw_mode(&mut self, mode: RawMode) -> io::Result<()> {
        self.raw = Some(mode);
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        self.raw = None;
        Ok(())
    }

    fn physical_size(&self) -> Option<Size> {
        self.physical
    }

    fn set_bounds(&mut self, size: Size) {
        self.bounds = size;
        self.screen.resize(size);
        if !size.contains(self.cursor) {
            self.cursor = Coord::ORIGIN;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
