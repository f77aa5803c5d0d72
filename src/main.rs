// SPDX-License-Identifier: MIT
//
// glyph — an interactive key viewer for the glyph-term engine.
//
// Shows each decoded key as it arrives, with a short history, the current
// size, and the active buffer mode. Useful for checking what a terminal
// actually sends for a key and whether the escape tables recognize it.
//
//   q / Ctrl-C  quit
//   b           cycle buffer mode (double → unbuffered → single → double)
//   c           clear the history
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ title bar                    │  ← row 0
//   │ last key, count, uptime      │  ← rows 2–3
//   │ history, newest first        │  ← rows 5 … h-2
//   │ status: size, mode, table    │  ← row h-1
//   └──────────────────────────────┘
//
// Set GLYPH_LOG=<path> to write engine logs to a file (stdout is the UI).
// GLYPH_SIZE, GLYPH_BUFFERS, and GLYPH_ESC_TIMEOUT_MS are read at startup.

use std::collections::VecDeque;
use std::fs::File;
use std::process;
use std::sync::Arc;

use glyph_term::backend::Backend;
use glyph_term::{ColorId, Config, Key, RawMode, Terminal};
use tracing_subscriber::EnvFilter;

/// Keys remembered in the history list.
const HISTORY_LEN: usize = 64;

/// How long to wait for a key before redrawing the uptime.
const TICK_MS: u64 = 250;

const TITLE: &str = " glyph key viewer   q: quit   b: buffer mode   c: clear ";

// ─── Viewer ──────────────────────────────────────────────────────────────────

/// What happened to a key once the viewer saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
struct Viewer {
    history: VecDeque<Key>,
    presses: u64,
}

impl Viewer {
    fn handle<B: Backend>(&mut self, term: &mut Terminal<B>, key: Key) -> glyph_term::Result<Outcome> {
        match key {
            Key::Byte(b'q' | 0x03) => return Ok(Outcome::Quit),
            Key::Byte(b'b') => {
                let next = match term.buffer_count() {
                    2 => 0,
                    0 => 1,
                    _ => 2,
                };
                term.set_buffer_count(next)?;
            }
            Key::Byte(b'c') => {
                self.history.clear();
                self.presses = 0;
                return Ok(Outcome::Continue);
            }
            _ => {}
        }

        self.presses += 1;
        self.history.push_front(key);
        self.history.truncate(HISTORY_LEN);
        tracing::debug!(%key, "key");
        Ok(Outcome::Continue)
    }

    fn draw<B: Backend>(&self, term: &mut Terminal<B>) -> glyph_term::Result<()> {
        let width = usize::from(term.width());
        let height = term.height();

        term.reset_color()?;
        term.fill_screen(b' ')?;

        term.set_color(ColorId::BLACK, ColorId::CYAN)?;
        line(term, 0, &format!("{TITLE:<width$}"))?;
        term.reset_color()?;

        let last = self
            .history
            .front()
            .map_or_else(|| "(none)".to_owned(), ToString::to_string);
        term.set_fg(ColorId::BRIGHT_YELLOW)?;
        line(term, 2, &format!("last: {last}"))?;
        term.reset_color()?;
        line(
            term,
            3,
            &format!(
                "keys: {}   uptime: {}.{}s",
                self.presses,
                term.uptime_ms() / 1000,
                term.uptime_ms() % 1000 / 100
            ),
        )?;

        let first_row = 5;
        let last_row = height.saturating_sub(2);
        for (row, key) in (first_row..=last_row).zip(&self.history) {
            let shade = ColorId::gray(u8::try_from(23 - row.min(23)).unwrap_or(0));
            term.set_fg(shade)?;
            line(term, row, &format!("  {key}"))?;
        }
        term.reset_color()?;

        let status = format!(
            "{}x{}  buffers: {}  table: {}",
            term.width(),
            term.height(),
            term.buffer_count(),
            term.input().table().name()
        );
        term.set_color(ColorId::WHITE, ColorId::BLUE)?;
        line(term, height.saturating_sub(1), &format!("{status:<width$}"))?;
        term.reset_color()?;
        Ok(())
    }
}

/// Write `text` at the start of `row`, cut to the screen width.
fn line<B: Backend>(term: &mut Terminal<B>, row: u16, text: &str) -> glyph_term::Result<()> {
    if !term.move_cursor(0, row)? {
        return Ok(());
    }
    let width = usize::from(term.width());
    let bytes = text.as_bytes();
    term.puts(&bytes[..bytes.len().min(width)])
}

// ─── Main loop ───────────────────────────────────────────────────────────────

fn run<B: Backend>(term: &mut Terminal<B>) -> glyph_term::Result<()> {
    let mut viewer = Viewer::default();
    loop {
        viewer.draw(term)?;
        match term.get_key_timeout(TICK_MS)? {
            Some(key) => {
                if viewer.handle(term, key)? == Outcome::Quit {
                    return Ok(());
                }
            }
            None => {
                term.sync_size();
            }
        }
    }
}

fn init_logging() {
    let Ok(path) = std::env::var("GLYPH_LOG") else {
        return;
    };
    let file = match File::create(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("glyph: cannot open log file {path}: {e}");
            return;
        }
    };
    let filter = EnvFilter::try_from_env("GLYPH_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
}

fn main() {
    init_logging();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("glyph: {e}");
        process::exit(2);
    });
    let config = config.with_raw_mode(RawMode::default() | RawMode::NO_SIGNALS);

    let mut term = Terminal::native(config).unwrap_or_else(|e| {
        eprintln!("glyph: failed to initialize terminal: {e}");
        process::exit(1);
    });

    let result = run(&mut term);
    let released = term.release();

    if let Err(e) = result.and(released) {
        eprintln!("glyph: {e}");
        process::exit(1);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use glyph_term::Size;
    use glyph_term::headless::HeadlessBackend;

    fn term() -> Terminal<HeadlessBackend> {
        Terminal::init(HeadlessBackend::new(Size::new(40, 12)), Config::default()).unwrap()
    }

    fn screen_row(term: &Terminal<HeadlessBackend>, row: usize) -> String {
        term.backend()
            .screen_text()
            .lines()
            .nth(row)
            .unwrap_or_default()
            .trim_end()
            .to_owned()
    }

    #[test]
    fn draws_title_and_status() {
        let mut term = term();
        Viewer::default().draw(&mut term).unwrap();
        term.refresh().unwrap();

        assert!(screen_row(&term, 0).starts_with(" glyph key viewer"));
        assert_eq!(screen_row(&term, 2), "last: (none)");
        assert_eq!(screen_row(&term, 11), "40x12  buffers: 2  table: posix");
    }

    #[test]
    fn keys_show_newest_first() {
        let mut term = term();
        let mut viewer = Viewer::default();
        viewer.handle(&mut term, Key::Up).unwrap();
        viewer.handle(&mut term, Key::Byte(b'x')).unwrap();
        viewer.draw(&mut term).unwrap();
        term.refresh().unwrap();

        assert_eq!(screen_row(&term, 2), "last: x");
        assert_eq!(screen_row(&term, 5), "  x");
        assert_eq!(screen_row(&term, 6), "  Up");
    }

    #[test]
    fn quit_keys() {
        let mut term = term();
        let mut viewer = Viewer::default();
        assert_eq!(viewer.handle(&mut term, Key::Byte(b'q')).unwrap(), Outcome::Quit);
        assert_eq!(viewer.handle(&mut term, Key::Byte(0x03)).unwrap(), Outcome::Quit);
        assert_eq!(viewer.presses, 0);
    }

    #[test]
    fn b_cycles_buffer_modes() {
        let mut term = term();
        let mut viewer = Viewer::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            viewer.handle(&mut term, Key::Byte(b'b')).unwrap();
            seen.push(term.buffer_count());
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn history_is_bounded_and_clearable() {
        let mut term = term();
        let mut viewer = Viewer::default();
        for _ in 0..HISTORY_LEN + 10 {
            viewer.handle(&mut term, Key::Down).unwrap();
        }
        assert_eq!(viewer.history.len(), HISTORY_LEN);

        viewer.handle(&mut term, Key::Byte(b'c')).unwrap();
        assert!(viewer.history.is_empty());
        assert_eq!(viewer.presses, 0);
    }

    #[test]
    fn run_quits_on_q() {
        let mut term = term();
        term.backend_mut().push_input(b"a\x1b[Aq");
        run(&mut term).unwrap();
        assert!(term.is_active());
    }
}
