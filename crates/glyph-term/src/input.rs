// SPDX-License-Identifier: MIT
//
// Input decoder — raw bytes in, logical keys out.
//
// The decoder owns a byte queue (front = oldest unread byte). Bytes are pulled
// from the backend without blocking and appended to the back; each
// `decode_next` call removes one logical key from the front:
//
//   1. The front matches a table entry in full and nothing longer could still
//      match → consume the entry's bytes, return its key.
//   2. The front is a strict prefix of some entry (a lone ESC, `ESC [`) →
//      return `None` and wait for the rest of the sequence.
//   3. Otherwise → consume one byte and return it raw.
//
// A sequence stuck in state 2 forever (the user really did press Escape) is
// resolved by the caller: after its escape timeout the terminal calls
// `decode_stalled`, which skips the wait.
//
// Capacity: `max_capacity` is a soft ceiling. `fill_from` stops reading from
// the backend once the queue reaches it, leaving the remainder in the OS
// buffer. `feed` always takes every byte it is given and grows the queue past
// the ceiling if it has to. Nothing is ever dropped: a half-received escape
// sequence with its lead byte discarded would decode as garbage keys.
//
// Consumed bytes are skipped with a read offset and compacted away in bulk,
// so draining a long paste one key at a time stays linear.

use std::io;

use crate::backend::Backend;
use crate::keys::{EscapeTable, Key};

/// Default queue ceiling. A keypress is 1–5 bytes; a pasted paragraph fits.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Bytes requested from the backend per read.
const READ_CHUNK: usize = 256;

/// Consumed bytes tolerated at the front before the queue is compacted.
const COMPACT_AFTER: usize = 64;

/// Byte queue plus escape-sequence matcher.
#[derive(Debug, Clone)]
pub struct InputDecoder {
    /// Unread bytes are `queue[head..]`.
    queue: Vec<u8>,
    head: usize,
    max_capacity: usize,
    table: EscapeTable,
}

impl InputDecoder {
    /// A decoder with the default capacity.
    #[must_use]
    pub fn new(table: EscapeTable) -> Self {
        Self::with_capacity(table, DEFAULT_CAPACITY)
    }

    /// A decoder that stops pulling from the backend at `max_capacity`
    /// queued bytes.
    ///
    /// The ceiling is raised to the table's longest sequence so every
    /// sequence can be recognized.
    #[must_use]
    pub fn with_capacity(table: EscapeTable, max_capacity: usize) -> Self {
        let max_capacity = max_capacity.max(table.longest()).max(1);
        Self {
            queue: Vec::with_capacity(max_capacity.min(64)),
            head: 0,
            max_capacity,
            table,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    /// The table sequences are matched against.
    #[inline]
    #[must_use]
    pub const fn table(&self) -> &EscapeTable {
        &self.table
    }

    /// Unread bytes, oldest first.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.queue[self.head..]
    }

    /// Number of unread bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len() - self.head
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The queue length at which `fill_from` stops reading.
    #[inline]
    #[must_use]
    pub const fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// How many more bytes `fill_from` will read before stopping.
    #[inline]
    #[must_use]
    pub fn room(&self) -> usize {
        self.max_capacity.saturating_sub(self.len())
    }

    /// Whether the front of the queue is an incomplete escape sequence.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.table.lookup(self.pending()).pending
    }

    // ─── Filling ─────────────────────────────────────────────────────────

    /// Append all of `bytes` to the back of the queue.
    ///
    /// The queue grows past `max_capacity` rather than refusing bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        let before = self.queue.capacity();
        self.queue.extend_from_slice(bytes);
        if self.queue.capacity() != before {
            tracing::debug!(
                from = before,
                to = self.queue.capacity(),
                limit = self.max_capacity,
                over = self.len() > self.max_capacity,
                "input queue grew"
            );
        }
    }

    /// Move every byte the backend has ready into the queue, without
    /// blocking, until the backend runs dry or the queue is full.
    ///
    /// # Errors
    ///
    /// Propagates the backend's read error. Bytes read before the error stay
    /// queued.
    pub fn fill_from<B: Backend + ?Sized>(&mut self, backend: &mut B) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let room = self.room().min(READ_CHUNK);
            if room == 0 {
                break;
            }
            let n = backend.read_available(&mut chunk[..room])?;
            if n == 0 {
                break;
            }
            self.feed(&chunk[..n]);
            total += n;
        }
        Ok(total)
    }

    // ─── Decoding ────────────────────────────────────────────────────────

    /// Decode one key from the front of the queue.
    ///
    /// Returns `None` when the queue is empty or holds only the beginning of
    /// an escape sequence.
    pub fn decode_next(&mut self) -> Option<Key> {
        self.decode(false)
    }

    /// Decode one key, treating an incomplete sequence as final.
    ///
    /// The longest complete entry at the front wins if there is one;
    /// otherwise the oldest byte is returned raw.
    pub fn decode_stalled(&mut self) -> Option<Key> {
        self.decode(true)
    }

    fn decode(&mut self, force: bool) -> Option<Key> {
        let window = self.pending();
        let Some(&front) = window.first() else {
            return None;
        };

        let found = self.table.lookup(window);
        if found.pending && !force {
            return None;
        }

        if let Some((key, len)) = found.full {
            self.consume(len);
            return Some(key);
        }

        self.consume(1);
        Some(Key::Byte(front))
    }

    /// Remove `n` bytes from the front, keeping the rest in order.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the queue length.
    #[track_caller]
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "consume({n}) with only {} bytes queued", self.len());
        self.head += n;
        if self.head == self.queue.len() {
            self.clear();
        } else if self.head >= COMPACT_AFTER && self.head * 2 >= self.queue.len() {
            self.queue.drain(..self.head);
            self.head = 0;
        }
    }

    /// Discard everything queued.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.head = 0;
    }
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new(EscapeTable::native())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
