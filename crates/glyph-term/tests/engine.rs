// SPDX-License-Identifier: MIT
//
// End-to-end behavior through the public API, on the headless backend.

use glyph_term::color::ColorPair;
use glyph_term::frame::RenderStats;
use glyph_term::headless::{HeadlessBackend, Op};
use glyph_term::registry::Registry;
use glyph_term::{BufferMode, ColorId, Config, Coord, Error, Key, Size, Terminal};
use pretty_assertions::assert_eq;

fn start(cols: u16, rows: u16, buffers: u8) -> Terminal<HeadlessBackend> {
    let config = Config::default().with_buffers(buffers);
    let mut term = Terminal::init(HeadlessBackend::new(Size::new(cols, rows)), config)
        .expect("headless init cannot fail");
    term.backend_mut().take_ops();
    term
}

// ── Rendering ───────────────────────────────────────────────────────

#[test]
fn hello_draws_five_cells_with_one_move() {
    let mut term = start(10, 2, 2);
    term.fill_screen(b' ').unwrap();
    term.move_cursor(0, 0).unwrap();
    term.puts(b"HELLO").unwrap();

    let stats = term.refresh().unwrap();

    assert_eq!(stats.cells_drawn, 5);
    assert_eq!(stats.cursor_moves, 1);
    assert_eq!(stats.color_changes, 0);
    assert_eq!(
        term.backend().ops(),
        &[
            Op::MoveCursor(Coord::new(0, 0)),
            Op::Put(b'H'),
            Op::Put(b'E'),
            Op::Put(b'L'),
            Op::Put(b'L'),
            Op::Put(b'O'),
            Op::MoveCursor(Coord::new(5, 0)),
            Op::ResetColors,
            Op::Flush,
        ]
    );
    assert_eq!(term.backend().cursor(), Coord::new(5, 0));
}

#[test]
fn second_refresh_draws_nothing() {
    let mut term = start(8, 3, 2);
    term.set_color(ColorId::rgb(5, 0, 0), ColorId::gray(3)).unwrap();
    term.puts(b"colored\nlines").unwrap();
    term.refresh().unwrap();
    term.backend_mut().take_ops();

    let stats = term.refresh().unwrap();

    assert_eq!(stats.cells_drawn, 0);
    assert_eq!(term.backend().put_count(), 0);
    assert_eq!(term.backend().color_count(), 0);
    let frame = term.frame().unwrap();
    assert_eq!(frame.last_drawn(), Some(frame.current()));
}

#[test]
fn adjacent_writes_share_a_move() {
    let mut term = start(10, 2, 2);
    term.move_cursor(4, 1).unwrap();
    term.put_char(b'A').unwrap();
    term.put_char(b'B').unwrap();
    term.refresh().unwrap();

    let ops = term.backend().ops();
    assert_eq!(ops[0], Op::MoveCursor(Coord::new(4, 1)));
    assert_eq!(ops[1], Op::Put(b'A'));
    assert_eq!(ops[2], Op::Put(b'B'));
    assert_eq!(term.backend().put_count(), 2);
}

#[test]
fn changed_colors_only_where_needed() {
    let mut term = start(6, 1, 2);
    term.puts(b"ab").unwrap();
    term.set_fg(ColorId::CYAN).unwrap();
    term.puts(b"cd").unwrap();
    term.reset_color().unwrap();
    term.puts(b"ef").unwrap();

    let stats = term.refresh().unwrap();

    assert_eq!(stats.cursor_moves, 1);
    assert_eq!(stats.color_changes, 2);
    assert_eq!(
        term.backend().screen().get(Coord::new(2, 0)).colors(),
        ColorPair::new(ColorId::CYAN, ColorId::Default)
    );
    assert_eq!(term.backend().colors(), ColorPair::DEFAULT);
}

#[test]
fn physical_screen_tracks_the_grid_across_frames() {
    let mut term = start(5, 2, 2);
    for frame in [&b"one"[..], b"two", b"three"] {
        term.move_cursor(0, 0).unwrap();
        term.puts(frame).unwrap();
        term.refresh().unwrap();
        assert_eq!(
            term.backend().screen(),
            term.frame().unwrap().current()
        );
    }
    assert_eq!(term.backend().screen_text(), "three\n     \n");
}

// ── Buffer modes ────────────────────────────────────────────────────

#[test]
fn unbuffered_refresh_only_flushes() {
    let mut term = start(4, 1, 2);
    term.set_buffer_count(0).unwrap();
    term.backend_mut().take_ops();

    let stats = term.refresh().unwrap();

    assert_eq!(stats, RenderStats::default());
    assert_eq!(term.backend().ops(), &[Op::Flush]);
}

#[test]
fn disabling_buffering_discards_pending_content() {
    let mut term = start(4, 1, 2);
    term.puts(b"lost").unwrap();
    term.set_buffer_count(0).unwrap();
    term.refresh().unwrap();

    assert_eq!(term.buffer_mode(), BufferMode::Unbuffered);
    assert_eq!(term.backend().screen_text(), "    \n");
}

#[test]
fn history_mirrors_what_was_drawn() {
    let config = Config::default().with_history(true);
    let mut term = Terminal::init(HeadlessBackend::new(Size::new(4, 2)), config).unwrap();
    term.puts(b"hist").unwrap();
    term.refresh().unwrap();

    let frame = term.frame().unwrap();
    assert_eq!(frame.history(), frame.last_drawn());
    assert_eq!(frame.history().unwrap().to_text(), "hist\n    \n");
}

#[test]
fn resize_keeps_overlap_and_repaints() {
    let mut term = start(4, 2, 2);
    term.puts(b"abcdefgh").unwrap();
    term.refresh().unwrap();

    term.set_size(Some(2), Some(2)).unwrap();
    term.set_size(Some(2), Some(2)).unwrap();
    let stats = term.refresh().unwrap();

    assert!(stats.full_redraw);
    assert_eq!(term.frame().unwrap().current().to_text(), "ab\nef\n");
}

// ── Input ───────────────────────────────────────────────────────────

#[test]
fn keys_decode_in_arrival_order() {
    let mut term = start(4, 1, 2);
    term.backend_mut().push_input(b"a\x1b[A\x1b[15~\x1bOQ\r");

    let mut keys = Vec::new();
    while let Some(key) = term.get_key().unwrap() {
        keys.push(key);
    }

    assert_eq!(
        keys,
        vec![Key::Byte(b'a'), Key::Up, Key::F(5), Key::F(2), Key::Byte(b'\r')]
    );
}

#[test]
fn sequence_split_across_reads() {
    let mut term = start(4, 1, 2);
    term.backend_mut().push_input(b"\x1b[");
    term.backend_mut().push_input_at(5, b"6~");

    assert_eq!(term.get_key().unwrap(), None);
    assert_eq!(term.get_key_timeout(100).unwrap(), Some(Key::PageDown));
    assert_eq!(term.uptime_ms(), 5);
}

#[test]
fn console_table_on_headless_backend() {
    let backend = HeadlessBackend::new(Size::new(4, 1))
        .with_table(glyph_term::keys::EscapeTable::CONSOLE);
    let mut term = Terminal::init(backend, Config::default()).unwrap();
    term.backend_mut().push_input(b"\xE0K\x00\x44");

    assert_eq!(term.get_key().unwrap(), Some(Key::Left));
    assert_eq!(term.get_key().unwrap(), Some(Key::F(10)));
}

#[test]
fn small_queue_still_delivers_everything() {
    let config = Config::default().with_input_capacity(4);
    let mut term = Terminal::init(HeadlessBackend::new(Size::new(4, 1)), config).unwrap();
    term.backend_mut().push_input(b"0123456789\x1b[C");

    let mut keys = Vec::new();
    while let Some(key) = term.get_key().unwrap() {
        keys.push(key);
    }

    assert_eq!(keys.len(), 11);
    assert_eq!(keys.last(), Some(&Key::Right));
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[test]
fn released_terminal_refuses_work() {
    let mut term = start(4, 1, 2);
    term.release().unwrap();

    assert!(matches!(term.refresh(), Err(Error::NotActive)));
    assert!(matches!(term.get_key(), Err(Error::NotActive)));
    assert!(matches!(term.set_buffer_count(1), Err(Error::NotActive)));
}

#[test]
fn output_failure_propagates() {
    let mut term = start(4, 1, 2);
    term.puts(b"x").unwrap();
    term.backend_mut().set_failing(true);

    let err = term.refresh().unwrap_err();
    assert!(matches!(err, Error::Io(ref io) if io.kind() == std::io::ErrorKind::BrokenPipe));
}

#[test]
fn refresh_after_output_failure_repaints_everything() {
    let mut term = start(4, 1, 2);
    term.puts(b"x").unwrap();
    term.backend_mut().set_failing(true);
    assert!(term.refresh().is_err());

    term.backend_mut().set_failing(false);
    let stats = term.refresh().unwrap();

    assert!(stats.full_redraw);
    assert_eq!(stats.cells_drawn, 4);
    assert_eq!(term.backend().screen_text(), "x   \n");
    assert_eq!(term.backend().screen(), term.frame().unwrap().current());
}

#[test]
fn registry_switches_between_panes() {
    let mut panes = Registry::new();
    let left = panes.insert(start(3, 1, 2));
    let right = panes.insert(start(3, 1, 2));

    panes.current_mut().unwrap().puts(b"L").unwrap();
    panes.set_current(right);
    panes.current_mut().unwrap().puts(b"R").unwrap();

    for id in [left, right] {
        panes.get_mut(id).unwrap().refresh().unwrap();
    }
    assert_eq!(panes.get(left).unwrap().backend().screen_text(), "L  \n");
    assert_eq!(panes.get(right).unwrap().backend().screen_text(), "R  \n");
}
