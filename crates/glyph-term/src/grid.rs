// SPDX-License-Identifier: MIT
//
// ScreenGrid — one full frame of cells.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing (`index = row * width + col`).
//     A row is contiguous, so the diff scan walks memory linearly and an
//     unchanged row can be rejected with one slice comparison.
//
//   - `cells.len() == width * height` after every operation. `resize` is the
//     only way to change dimensions and it reallocates in one step.
//
//   - Out-of-range access panics with the offending coordinate. A clamped
//     write would hide the caller's arithmetic bug and put a character
//     somewhere the caller never asked for; this is the single policy in all
//     build profiles. Use `try_get` / `try_set` to probe.

use std::cmp::Ordering;
use std::fmt;

use crate::cell::Cell;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Grid dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl Size {
    /// `cols` columns by `rows` rows.
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Whether `coord` lies inside these dimensions.
    #[inline]
    #[must_use]
    pub const fn contains(self, coord: Coord) -> bool {
        coord.col < self.cols && coord.row < self.rows
    }
}

// ─── Coord ──────────────────────────────────────────────────────────────────

/// A zero-based screen position.
///
/// Ordering is row-major: every cell of row 0 sorts before any cell of row 1,
/// which is the order the diff renderer scans in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub col: u16,
    pub row: u16,
}

impl Coord {
    pub const ORIGIN: Self = Self { col: 0, row: 0 };

    /// Column `col` of row `row`.
    #[inline]
    #[must_use]
    pub const fn new(col: u16, row: u16) -> Self {
        Self { col, row }
    }

    /// The position one column to the right, wrapping to column 0 of the
    /// next row at `width`. The row is not bounded: stepping off the last
    /// row yields a coordinate outside the grid.
    #[inline]
    #[must_use]
    pub const fn step(self, width: u16) -> Self {
        if self.col.saturating_add(1) >= width {
            Self {
                col: 0,
                row: self.row.saturating_add(1),
            }
        } else {
            Self {
                col: self.col + 1,
                row: self.row,
            }
        }
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ─── ScreenGrid ─────────────────────────────────────────────────────────────

/// A `width × height` array of cells.
///
/// # Examples
///
/// ```
/// use glyph_term::cell::Cell;
/// use glyph_term::grid::{Coord, ScreenGrid, Size};
///
/// let mut grid = ScreenGrid::new(Size::new(10, 2));
/// grid.set(Coord::new(3, 1), Cell::new(b'X'));
/// assert_eq!(grid.get(Coord::new(3, 1)).ch, b'X');
///
/// grid.resize(Size::new(4, 4));
/// assert_eq!(grid.get(Coord::new(3, 1)).ch, b'X');
/// assert_eq!(grid.get(Coord::new(3, 3)), Cell::EMPTY);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ScreenGrid {
    size: Size,
    cells: Vec<Cell>,
}

impl ScreenGrid {
    /// A grid of empty cells.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::EMPTY; size.area()],
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    /// Dimensions in cells.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.size.cols
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.size.rows
    }

    /// The raw cell slice in row-major order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    const fn index(&self, coord: Coord) -> usize {
        coord.row as usize * self.size.cols as usize + coord.col as usize
    }

    /// Read the cell at `coord`.
    ///
    /// # Panics
    ///
    /// Panics if `coord` is outside the grid.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn get(&self, coord: Coord) -> Cell {
        self.check(coord);
        self.cells[self.index(coord)]
    }

    /// Overwrite the cell at `coord`.
    ///
    /// # Panics
    ///
    /// Panics if `coord` is outside the grid.
    #[inline]
    #[track_caller]
    pub fn set(&mut self, coord: Coord, cell: Cell) {
        self.check(coord);
        let idx = self.index(coord);
        self.cells[idx] = cell;
    }

    /// Read the cell at `coord`, or `None` if it is outside the grid.
    #[inline]
    #[must_use]
    pub fn try_get(&self, coord: Coord) -> Option<Cell> {
        self.size
            .contains(coord)
            .then(|| self.cells[self.index(coord)])
    }

    /// Overwrite the cell at `coord` if it is inside the grid.
    ///
    /// Returns `true` if the write happened.
    #[inline]
    pub fn try_set(&mut self, coord: Coord, cell: Cell) -> bool {
        if !self.size.contains(coord) {
            return false;
        }
        let idx = self.index(coord);
        self.cells[idx] = cell;
        true
    }

    /// One row as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row` is outside the grid.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn row(&self, row: u16) -> &[Cell] {
        assert!(
            row < self.size.rows,
            "row {row} out of bounds for {}x{} grid",
            self.size.cols,
            self.size.rows
        );
        let start = self.index(Coord::new(0, row));
        &self.cells[start..start + usize::from(self.size.cols)]
    }

    #[inline]
    #[track_caller]
    fn check(&self, coord: Coord) {
        assert!(
            self.size.contains(coord),
            "cell ({}, {}) out of bounds for {}x{} grid",
            coord.col,
            coord.row,
            self.size.cols,
            self.size.rows
        );
    }

    // ─── Bulk operations ─────────────────────────────────────────────────

    /// Overwrite every cell.
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Change dimensions, keeping every cell whose coordinate is valid in
    /// both the old and new bounds. Newly exposed cells are empty.
    ///
    /// Resizing to the current size is a no-op.
    pub fn resize(&mut self, size: Size) {
        if size == self.size {
            return;
        }

        let mut cells = vec![Cell::EMPTY; size.area()];
        let keep_cols = usize::from(self.size.cols.min(size.cols));
        let keep_rows = usize::from(self.size.rows.min(size.rows));
        let old_w = usize::from(self.size.cols);
        let new_w = usize::from(size.cols);

        for row in 0..keep_rows {
            let src = row * old_w;
            let dst = row * new_w;
            cells[dst..dst + keep_cols].copy_from_slice(&self.cells[src..src + keep_cols]);
        }

        self.size = size;
        self.cells = cells;
    }

    /// Iterate cells with their coordinates in row-major order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (Coord, Cell)> + '_ {
        let w = usize::from(self.size.cols).max(1);
        self.cells.iter().enumerate().map(move |(i, cell)| {
            // col < width and row < height, both u16.
            (Coord::new((i % w) as u16, (i / w) as u16), *cell)
        })
    }

    /// The grid's characters as text, one line per row (for tests and debug
    /// overlays).
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + usize::from(self.size.rows));
        for row in 0..self.size.rows {
            out.extend(self.row(row).iter().map(|c| char::from(c.ch)));
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for ScreenGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScreenGrid({}x{})", self.size.cols, self.size.rows)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
