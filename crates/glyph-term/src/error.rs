// SPDX-License-Identifier: MIT
//
// Engine errors.
//
// Terminal I/O failures are propagated as-is: an interactive session whose
// terminal device stops accepting writes is not something the engine can
// repair, so nothing here is retried. Out-of-bounds grid access is not an
// error value at all: it panics at the call site (see `grid.rs`).

use std::io;

/// Everything that can go wrong inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The process has no controlling terminal (stdin is a pipe or file).
    ///
    /// Returned by backend construction before any global state is touched,
    /// so a failed init leaves nothing to clean up.
    #[error("stdin is not connected to a terminal")]
    NotATerminal,

    /// A read, write, or mode change on the terminal device failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// `init` was called on a terminal that is already active.
    #[error("terminal is already initialized")]
    AlreadyActive,

    /// An operation that needs an active terminal ran after `release`.
    #[error("terminal is not initialized")]
    NotActive,

    /// Buffer count outside `0..=2`.
    #[error("invalid buffer count {0} (expected 0, 1, or 2)")]
    InvalidBufferCount(u8),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, Error>;
