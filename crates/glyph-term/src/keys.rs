// SPDX-License-Identifier: MIT
//
// Logical key codes and the escape-sequence tables that produce them.
//
// Special keys arrive as multi-byte sequences whose shape depends on the
// platform: CSI / SS3 sequences on ANSI terminals (`ESC [ A` is Up), and a
// two-byte prefix + scan code on the Windows console (`0xE0 0x48` is Up).
// Exactly one table is chosen at startup to match the backend.
//
// Matching rules:
//
//   - Every entry is checked; tables need not be sorted.
//   - Among entries that fully match the front of the queue, the longest
//     wins. Equal lengths resolve to the earlier entry.
//   - If the queue is a strict prefix of some longer entry, the match is
//     "pending": more bytes may still arrive. The decoder waits rather than
//     decoding the lead byte (usually ESC) as a raw key.

use std::fmt;

// ─── Key ────────────────────────────────────────────────────────────────────

/// A decoded keypress.
///
/// Anything that is not a recognized escape sequence arrives as a raw
/// [`Byte`](Key::Byte): printable characters, control codes, a lone ESC after
/// its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A raw input byte.
    Byte(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function keys F1 through F12.
    F(u8),
}

impl Key {
    /// The printable character for a raw byte, if it has one.
    #[must_use]
    pub const fn printable(self) -> Option<char> {
        match self {
            Self::Byte(b @ 0x20..=0x7E) => Some(b as char),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Byte(0x1B) => f.write_str("Esc"),
            Self::Byte(b'\r' | b'\n') => f.write_str("Enter"),
            Self::Byte(b'\t') => f.write_str("Tab"),
            Self::Byte(0x7F | 0x08) => f.write_str("Backspace"),
            Self::Byte(b @ 0x01..=0x1A) => write!(f, "Ctrl-{}", (b + b'A' - 1) as char),
            Self::Byte(b @ 0x20..=0x7E) => write!(f, "{}", b as char),
            Self::Byte(b) => write!(f, "0x{b:02X}"),
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
            Self::Home => f.write_str("Home"),
            Self::End => f.write_str("End"),
            Self::PageUp => f.write_str("PageUp"),
            Self::PageDown => f.write_str("PageDown"),
            Self::Insert => f.write_str("Insert"),
            Self::Delete => f.write_str("Delete"),
            Self::F(n) => write!(f, "F{n}"),
        }
    }
}

// ─── Tables ─────────────────────────────────────────────────────────────────

/// One `(byte sequence → key)` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeEntry {
    pub bytes: &'static [u8],
    pub key: Key,
}

const fn entry(bytes: &'static [u8], key: Key) -> EscapeEntry {
    EscapeEntry { bytes, key }
}

/// ANSI terminals: CSI (`ESC [`) and SS3 (`ESC O`) sequences.
const POSIX_ENTRIES: &[EscapeEntry] = &[
    entry(b"\x1bOH", Key::Home),
    entry(b"\x1bOF", Key::End),
    entry(b"\x1bOQ", Key::F(2)),
    entry(b"\x1bOR", Key::F(3)),
    entry(b"\x1bOS", Key::F(4)),
    entry(b"\x1b[15~", Key::F(5)),
    entry(b"\x1b[17~", Key::F(6)),
    entry(b"\x1b[18~", Key::F(7)),
    entry(b"\x1b[19~", Key::F(8)),
    entry(b"\x1b[A", Key::Up),
    entry(b"\x1b[B", Key::Down),
    entry(b"\x1b[C", Key::Right),
    entry(b"\x1b[D", Key::Left),
    entry(b"\x1b[2~", Key::Insert),
    entry(b"\x1b[20~", Key::F(9)),
    entry(b"\x1b[24~", Key::F(12)),
    entry(b"\x1b[3~", Key::Delete),
    entry(b"\x1b[5~", Key::PageUp),
    entry(b"\x1b[6~", Key::PageDown),
];

/// Windows console: `0x00` or `0xE0` followed by the key's scan code.
const CONSOLE_ENTRIES: &[EscapeEntry] = &[
    entry(b"\x00\x3B", Key::F(1)),
    entry(b"\x00\x3C", Key::F(2)),
    entry(b"\x00\x3D", Key::F(3)),
    entry(b"\x00\x3E", Key::F(4)),
    entry(b"\x00\x3F", Key::F(5)),
    entry(b"\x00\x40", Key::F(6)),
    entry(b"\x00\x41", Key::F(7)),
    entry(b"\x00\x42", Key::F(8)),
    entry(b"\x00\x43", Key::F(9)),
    entry(b"\x00\x44", Key::F(10)),
    entry(b"\x00G", Key::Home),
    entry(b"\x00H", Key::Up),
    entry(b"\x00I", Key::PageUp),
    entry(b"\x00K", Key::Left),
    entry(b"\x00M", Key::Right),
    entry(b"\x00O", Key::End),
    entry(b"\x00P", Key::Down),
    entry(b"\x00Q", Key::PageDown),
    entry(b"\xE0\x85", Key::F(11)),
    entry(b"\xE0\x86", Key::F(12)),
    entry(b"\xE0G", Key::Home),
    entry(b"\xE0H", Key::Up),
    entry(b"\xE0I", Key::PageUp),
    entry(b"\xE0K", Key::Left),
    entry(b"\xE0M", Key::Right),
    entry(b"\xE0O", Key::End),
    entry(b"\xE0P", Key::Down),
    entry(b"\xE0Q", Key::PageDown),
    entry(b"\xE0R", Key::Insert),
    entry(b"\xE0S", Key::Delete),
];

/// The outcome of matching the front of the input queue against a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lookup {
    /// Longest entry fully present at the front: `(key, byte length)`.
    pub full: Option<(Key, usize)>,
    /// Some longer entry begins with the whole window; more bytes could
    /// still complete it.
    pub pending: bool,
}

/// A platform's escape-sequence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeTable {
    name: &'static str,
    entries: &'static [EscapeEntry],
}

impl EscapeTable {
    /// CSI/SS3 sequences for ANSI terminals.
    pub const POSIX: Self = Self {
        name: "posix",
        entries: POSIX_ENTRIES,
    };

    /// Scan-code pairs for the Windows console.
    pub const CONSOLE: Self = Self {
        name: "console",
        entries: CONSOLE_ENTRIES,
    };

    /// The table for the platform this binary was built for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) { Self::CONSOLE } else { Self::POSIX }
    }

    /// A table over caller-supplied entries.
    #[must_use]
    pub const fn custom(name: &'static str, entries: &'static [EscapeEntry]) -> Self {
        Self { name, entries }
    }

    /// Short label for logs and status lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The raw `(sequence, key)` entries, in table order.
    #[must_use]
    pub const fn entries(&self) -> &'static [EscapeEntry] {
        self.entries
    }

    /// Length of the longest sequence in the table.
    #[must_use]
    pub fn longest(&self) -> usize {
        self.entries.iter().map(|e| e.bytes.len()).max().unwrap_or(0)
    }

    /// Match the front of `window` against every entry.
    #[must_use]
    pub fn lookup(&self, window: &[u8]) -> Lookup {
        let mut found = Lookup::default();
        if window.is_empty() {
            return found;
        }

        for e in self.entries {
            let len = e.bytes.len();
            if window.starts_with(e.bytes) {
                if found.full.is_none_or(|(_, best)| len > best) {
                    found.full = Some((e.key, len));
                }
            } else if len > window.len() && e.bytes.starts_with(window) {
                found.pending = true;
            }
        }

        // A pending entry shorter than the full match can't exist (it would
        // have matched), so `pending` only ever means "something longer".
        found
    }
}

impl Default for EscapeTable {
    fn default() -> Self {
        Self::native()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn full(table: EscapeTable, bytes: &[u8]) -> Option<(Key, usize)> {
        table.lookup(bytes).full
    }

    // ── POSIX ────────────────────────────────────────────────────────

    #[test]
    fn posix_arrows() {
        let t = EscapeTable::POSIX;
        assert_eq!(full(t, b"\x1b[A"), Some((Key::Up, 3)));
        assert_eq!(full(t, b"\x1b[B"), Some((Key::Down, 3)));
        assert_eq!(full(t, b"\x1b[C"), Some((Key::Right, 3)));
        assert_eq!(full(t, b"\x1b[D"), Some((Key::Left, 3)));
    }

    #[test]
    fn posix_editing_and_function_keys() {
        let t = EscapeTable::POSIX;
        assert_eq!(full(t, b"\x1b[3~"), Some((Key::Delete, 4)));
        assert_eq!(full(t, b"\x1b[5~"), Some((Key::PageUp, 4)));
        assert_eq!(full(t, b"\x1b[15~"), Some((Key::F(5), 5)));
        assert_eq!(full(t, b"\x1b[24~"), Some((Key::F(12), 5)));
        assert_eq!(full(t, b"\x1bOS"), Some((Key::F(4), 3)));
        assert_eq!(full(t, b"\x1bOH"), Some((Key::Home, 3)));
    }

    #[test]
    fn match_ignores_trailing_bytes() {
        let found = EscapeTable::POSIX.lookup(b"\x1b[Axyz");
        assert_eq!(found.full, Some((Key::Up, 3)));
        assert!(!found.pending);
    }

    #[test]
    fn lone_escape_is_pending() {
        let found = EscapeTable::POSIX.lookup(b"\x1b");
        assert_eq!(found.full, None);
        assert!(found.pending);
    }

    #[test]
    fn partial_csi_is_pending() {
        assert!(EscapeTable::POSIX.lookup(b"\x1b[").pending);
        assert!(EscapeTable::POSIX.lookup(b"\x1b[1").pending);
        assert!(EscapeTable::POSIX.lookup(b"\x1b[20").pending);
    }

    #[test]
    fn unknown_sequence_is_neither() {
        let found = EscapeTable::POSIX.lookup(b"\x1b[Z");
        assert_eq!(found, Lookup::default());
        assert_eq!(EscapeTable::POSIX.lookup(b"a"), Lookup::default());
        assert_eq!(EscapeTable::POSIX.lookup(b""), Lookup::default());
    }

    #[test]
    fn posix_longest_is_five() {
        assert_eq!(EscapeTable::POSIX.longest(), 5);
    }

    // ── Console ──────────────────────────────────────────────────────

    #[test]
    fn console_both_prefixes() {
        let t = EscapeTable::CONSOLE;
        assert_eq!(full(t, b"\x00H"), Some((Key::Up, 2)));
        assert_eq!(full(t, b"\xE0H"), Some((Key::Up, 2)));
        assert_eq!(full(t, b"\x00\x3B"), Some((Key::F(1), 2)));
        assert_eq!(full(t, b"\xE0\x86"), Some((Key::F(12), 2)));
        assert_eq!(full(t, b"\xE0S"), Some((Key::Delete, 2)));
    }

    #[test]
    fn console_prefix_alone_is_pending() {
        assert!(EscapeTable::CONSOLE.lookup(b"\xE0").pending);
        assert!(EscapeTable::CONSOLE.lookup(b"\x00").pending);
        assert!(!EscapeTable::CONSOLE.lookup(b"\x1b").pending);
    }

    // ── Ambiguity ────────────────────────────────────────────────────

    const OVERLAPPING: &[EscapeEntry] = &[
        entry(b"\x1b[", Key::Byte(b'!')),
        entry(b"\x1b[1;5A", Key::Up),
        entry(b"\x1b[1", Key::F(1)),
        entry(b"\x1b[1", Key::F(2)),
    ];

    #[test]
    fn longest_full_match_wins_regardless_of_order() {
        let t = EscapeTable::custom("overlap", OVERLAPPING);
        assert_eq!(full(t, b"\x1b[1;5A"), Some((Key::Up, 6)));
    }

    #[test]
    fn equal_lengths_resolve_to_first_entry() {
        let t = EscapeTable::custom("overlap", OVERLAPPING);
        assert_eq!(full(t, b"\x1b[1x"), Some((Key::F(1), 3)));
    }

    #[test]
    fn full_match_with_longer_candidate_is_pending() {
        let found = EscapeTable::custom("overlap", OVERLAPPING).lookup(b"\x1b[1");
        assert_eq!(found.full, Some((Key::F(1), 3)));
        assert!(found.pending);
    }

    #[test]
    fn no_builtin_entry_is_a_prefix_of_another() {
        for table in [EscapeTable::POSIX, EscapeTable::CONSOLE] {
            for a in table.entries() {
                for b in table.entries() {
                    if a.bytes.len() < b.bytes.len() {
                        assert!(!b.bytes.starts_with(a.bytes), "{:?} shadows {:?}", a, b);
                    }
                }
            }
        }
    }

    // ── Key ──────────────────────────────────────────────────────────

    #[test]
    fn key_display() {
        assert_eq!(Key::Byte(b'a').to_string(), "a");
        assert_eq!(Key::Byte(0x1B).to_string(), "Esc");
        assert_eq!(Key::Byte(0x03).to_string(), "Ctrl-C");
        assert_eq!(Key::Byte(0xFF).to_string(), "0xFF");
        assert_eq!(Key::F(11).to_string(), "F11");
        assert_eq!(Key::PageDown.to_string(), "PageDown");
    }

    #[test]
    fn key_printable() {
        assert_eq!(Key::Byte(b'z').printable(), Some('z'));
        assert_eq!(Key::Byte(0x1B).printable(), None);
        assert_eq!(Key::Up.printable(), None);
    }

    #[test]
    fn native_matches_platform() {
        if cfg!(windows) {
            assert_eq!(EscapeTable::native().name(), "console");
        } else {
            assert_eq!(EscapeTable::native().name(), "posix");
        }
    }
}
