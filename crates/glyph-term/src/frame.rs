// SPDX-License-Identifier: MIT
//
// FrameBuffer — damage tracking and the differential renderer.
//
// The application writes into the `current` grid through a virtual cursor.
// `render` compares `current` against `last_drawn` (what the physical terminal
// shows) and produces an ordered list of draw operations for the changed
// cells only, copying each drawn cell into `last_drawn` as it goes.
//
// Two pieces of state keep the output small:
//
//   - Cursor prediction. After a character is written the hardware cursor
//     sits one column to the right (wrapping to the next row at the right
//     edge). A cursor move is emitted only when the next dirty cell is not
//     where the cursor already is, and always for the first dirty cell of a
//     frame since the starting position is unknown.
//
//   - Active color pair. A color command is emitted only when a dirty cell's
//     pair differs from the pair set by the previous command. Every render
//     ends by resetting to the default pair, so each frame starts from it.
//
// A horizontal run of same-colored dirty cells therefore costs one move, at
// most one color change, and one byte per cell. Unchanged rows are rejected
// with a single slice comparison before any per-cell work.
//
// Buffer counts:
//
//   1 — single buffer: no `last_drawn`; every render repaints every cell.
//   2 — double buffer: diffed as above.
//
// An optional history grid mirrors `last_drawn` cell for cell for debug
// overlays that want "what is on screen here". It never affects diffing.

use crate::cell::Cell;
use crate::color::ColorPair;
use crate::grid::{Coord, ScreenGrid, Size};

// ─── DrawOp ──────────────────────────────────────────────────────────────────

/// One terminal command produced by a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    /// Position the hardware cursor before a dirty cell.
    MoveTo(Coord),
    /// Select the colors for the following characters.
    SetColors(ColorPair),
    /// Write one character; the hardware cursor advances by one column.
    Put(u8),
    /// Park the hardware cursor at the logical cursor after the scan.
    RestoreCursor(Coord),
    /// Return to the default color pair after the scan.
    ResetColors,
}

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What a render pass did, for tests, profiling, and trace logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Dirty cells written.
    pub cells_drawn: usize,
    /// Clean cells skipped.
    pub cells_skipped: usize,
    /// `MoveTo` operations emitted.
    pub cursor_moves: usize,
    /// `SetColors` operations emitted.
    pub color_changes: usize,
    /// Whether every cell was treated as dirty.
    pub full_redraw: bool,
}

impl RenderStats {
    /// Total cells visited.
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_drawn + self.cells_skipped
    }
}

// ─── FrameBuffer ─────────────────────────────────────────────────────────────

/// Current and last-drawn grids plus the virtual cursor.
///
/// # Examples
///
/// ```
/// use glyph_term::color::ColorPair;
/// use glyph_term::frame::{DrawOp, FrameBuffer};
/// use glyph_term::grid::{Coord, Size};
///
/// let mut frame = FrameBuffer::new(Size::new(10, 2), 2);
/// frame.write(b"Hi", ColorPair::DEFAULT);
///
/// let (ops, stats) = frame.render();
/// assert_eq!(ops[0], DrawOp::MoveTo(Coord::new(0, 0)));
/// assert_eq!(stats.cells_drawn, 2);
///
/// // Nothing changed since: only the trailing cursor/color reset remains.
/// let (_, stats) = frame.render();
/// assert_eq!(stats.cells_drawn, 0);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    current: ScreenGrid,
    last_drawn: Option<ScreenGrid>,
    history: Option<ScreenGrid>,
    cursor: Coord,
    full_redraw: bool,
    ops: Vec<DrawOp>,
}

impl FrameBuffer {
    /// A frame of empty cells with 1 (single) or 2 (double) buffers.
    ///
    /// The last-drawn grid starts empty, matching a freshly cleared screen,
    /// so the first render draws only what was written.
    ///
    /// # Panics
    ///
    /// Panics if `buffers` is not 1 or 2.
    #[must_use]
    #[track_caller]
    pub fn new(size: Size, buffers: u8) -> Self {
        assert!(
            matches!(buffers, 1 | 2),
            "frame buffer count must be 1 or 2, got {buffers}"
        );
        Self {
            current: ScreenGrid::new(size),
            last_drawn: (buffers == 2).then(|| ScreenGrid::new(size)),
            history: None,
            cursor: Coord::ORIGIN,
            full_redraw: false,
            ops: Vec::with_capacity(256),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    /// Dimensions shared by every grid.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.current.size()
    }

    /// 1 for single buffering, 2 for double buffering.
    #[inline]
    #[must_use]
    pub const fn buffer_count(&self) -> u8 {
        if self.last_drawn.is_some() { 2 } else { 1 }
    }

    /// The grid being written to.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> &ScreenGrid {
        &self.current
    }

    /// Mutable access to the grid being written to.
    #[inline]
    pub const fn current_mut(&mut self) -> &mut ScreenGrid {
        &mut self.current
    }

    /// What the terminal showed after the last render (double buffer only).
    #[inline]
    #[must_use]
    pub const fn last_drawn(&self) -> Option<&ScreenGrid> {
        self.last_drawn.as_ref()
    }

    /// The inspection copy of drawn cells, if enabled.
    #[inline]
    #[must_use]
    pub const fn history(&self) -> Option<&ScreenGrid> {
        self.history.as_ref()
    }

    /// Where the next written character lands.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Coord {
        self.cursor
    }

    /// Whether the next render will repaint every cell.
    #[inline]
    #[must_use]
    pub const fn needs_full_redraw(&self) -> bool {
        self.full_redraw || self.last_drawn.is_none()
    }

    // ─── Configuration ───────────────────────────────────────────────────

    /// Switch between single (1) and double (2) buffering, keeping the
    /// current grid.
    ///
    /// Going to double buffering forces a full redraw: the screen content a
    /// single-buffered frame left behind is not known cell for cell.
    ///
    /// # Panics
    ///
    /// Panics if `buffers` is not 1 or 2.
    #[track_caller]
    pub fn set_buffer_count(&mut self, buffers: u8) {
        match buffers {
            1 => self.last_drawn = None,
            2 => {
                if self.last_drawn.is_none() {
                    self.last_drawn = Some(ScreenGrid::new(self.size()));
                    self.full_redraw = true;
                }
            }
            _ => panic!("frame buffer count must be 1 or 2, got {buffers}"),
        }
    }

    /// Keep (or stop keeping) the history grid.
    pub fn set_history(&mut self, enabled: bool) {
        if !enabled {
            self.history = None;
        } else if self.history.is_none() {
            self.history = Some(
                self.last_drawn
                    .clone()
                    .unwrap_or_else(|| ScreenGrid::new(self.size())),
            );
        }
    }

    /// Resize every grid together, keeping overlapping content, and force
    /// the next render to repaint everything.
    pub fn resize(&mut self, size: Size) {
        if size == self.size() {
            return;
        }
        self.current.resize(size);
        if let Some(last) = &mut self.last_drawn {
            last.resize(size);
        }
        if let Some(history) = &mut self.history {
            history.resize(size);
        }
        self.cursor = Coord::new(
            self.cursor.col.min(size.cols.saturating_sub(1)),
            self.cursor.row.min(size.rows.saturating_sub(1)),
        );
        self.full_redraw = true;
        tracing::debug!(cols = size.cols, rows = size.rows, "frame resized");
    }

    /// Force the next render to repaint everything.
    pub const fn invalidate(&mut self) {
        self.full_redraw = true;
    }

    // ─── Writing ─────────────────────────────────────────────────────────

    /// Move the virtual cursor. Out-of-range positions are ignored.
    ///
    /// Returns `true` if the cursor moved.
    pub fn move_to(&mut self, coord: Coord) -> bool {
        if self.size().contains(coord) {
            self.cursor = coord;
            true
        } else {
            false
        }
    }

    /// Write one byte at the virtual cursor and advance it.
    ///
    /// `\n` moves to the start of the next row and `\r` to the start of the
    /// current row. Advancing past the last cell wraps to the origin.
    pub fn put(&mut self, byte: u8, colors: ColorPair) {
        let size = self.size();
        if size.area() == 0 {
            return;
        }

        let next = match byte {
            b'\n' => Coord::new(0, self.cursor.row.saturating_add(1)),
            b'\r' => Coord::new(0, self.cursor.row),
            _ => {
                self.current
                    .set(self.cursor, Cell::styled(byte, colors.fg, colors.bg));
                self.cursor.step(size.cols)
            }
        };

        self.cursor = if next.row >= size.rows { Coord::ORIGIN } else { next };
    }

    /// Write each byte of `bytes` as [`put`](Self::put) would.
    pub fn write(&mut self, bytes: &[u8], colors: ColorPair) {
        for &b in bytes {
            self.put(b, colors);
        }
    }

    /// Overwrite every cell of the current grid.
    pub fn fill(&mut self, cell: Cell) {
        self.current.fill(cell);
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Compute the draw operations that bring the terminal in line with the
    /// current grid, and record the drawn cells as on screen.
    ///
    /// The returned slice is valid until the next call; the operations end
    /// with `RestoreCursor` and `ResetColors`, even when nothing was dirty.
    pub fn render(&mut self) -> (&[DrawOp], RenderStats) {
        let full = self.needs_full_redraw();
        let Self {
            current,
            last_drawn,
            history,
            cursor,
            ops,
            ..
        } = &mut *self;

        ops.clear();
        let mut stats = RenderStats {
            full_redraw: full,
            ..RenderStats::default()
        };

        let width = current.width();
        let mut predicted: Option<Coord> = None;
        let mut active = ColorPair::DEFAULT;

        for row in 0..current.height() {
            if !full {
                if let Some(last) = last_drawn.as_ref() {
                    if last.row(row) == current.row(row) {
                        stats.cells_skipped += usize::from(width);
                        continue;
                    }
                }
            }

            for col in 0..width {
                let at = Coord::new(col, row);
                let cell = current.get(at);

                let dirty = full || last_drawn.as_ref().is_none_or(|last| last.get(at) != cell);
                if !dirty {
                    stats.cells_skipped += 1;
                    continue;
                }

                if predicted != Some(at) {
                    ops.push(DrawOp::MoveTo(at));
                    stats.cursor_moves += 1;
                }

                let colors = cell.colors();
                if colors != active {
                    ops.push(DrawOp::SetColors(colors));
                    active = colors;
                    stats.color_changes += 1;
                }

                ops.push(DrawOp::Put(cell.ch));
                stats.cells_drawn += 1;

                if let Some(last) = last_drawn.as_mut() {
                    last.set(at, cell);
                }
                if let Some(history) = history.as_mut() {
                    history.set(at, cell);
                }

                predicted = Some(at.step(width));
            }
        }

        ops.push(DrawOp::RestoreCursor(*cursor));
        ops.push(DrawOp::ResetColors);
        self.full_redraw = false;

        tracing::trace!(
            drawn = stats.cells_drawn,
            skipped = stats.cells_skipped,
            moves = stats.cursor_moves,
            colors = stats.color_changes,
            full = stats.full_redraw,
            "frame rendered"
        );

        (&self.ops, stats)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
