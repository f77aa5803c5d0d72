// SPDX-License-Identifier: MIT
//
// Registry — several independent terminals with a swappable "current" one.
//
// Each terminal owns its own grids, input queue, and backend; nothing is
// shared between entries. The current id is a convenience for code that
// draws to "whatever pane is active" without threading a handle through; it
// grants no exclusive access and is not a lock.

use std::collections::BTreeMap;
use std::fmt;

use crate::backend::Backend;
use crate::terminal::Terminal;

/// Handle to a terminal in a [`Registry`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TerminalId(u32);

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "term#{}", self.0)
    }
}

/// An owning collection of terminals.
pub struct Registry<B: Backend> {
    terminals: BTreeMap<TerminalId, Terminal<B>>,
    current: Option<TerminalId>,
    next_id: u32,
}

impl<B: Backend> Registry<B> {
    /// An empty registry with no current terminal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            terminals: BTreeMap::new(),
            current: None,
            next_id: 0,
        }
    }

    /// Take ownership of `term`. The first terminal added becomes current.
    pub fn insert(&mut self, term: Terminal<B>) -> TerminalId {
        let id = TerminalId(self.next_id);
        self.next_id += 1;
        self.terminals.insert(id, term);
        if self.current.is_none() {
            self.current = Some(id);
        }
        tracing::debug!(%id, "terminal registered");
        id
    }

    /// Give back a terminal. Removing the current one leaves no current.
    pub fn remove(&mut self, id: TerminalId) -> Option<Terminal<B>> {
        let term = self.terminals.remove(&id)?;
        if self.current == Some(id) {
            self.current = None;
        }
        tracing::debug!(%id, "terminal removed");
        Some(term)
    }

    /// The terminal registered as `id`.
    #[must_use]
    pub fn get(&self, id: TerminalId) -> Option<&Terminal<B>> {
        self.terminals.get(&id)
    }

    /// The terminal registered as `id`, mutably.
    pub fn get_mut(&mut self, id: TerminalId) -> Option<&mut Terminal<B>> {
        self.terminals.get_mut(&id)
    }

    /// Make `id` current. Returns `false` (and changes nothing) for an
    /// unknown id.
    pub fn set_current(&mut self, id: TerminalId) -> bool {
        if self.terminals.contains_key(&id) {
            self.current = Some(id);
            true
        } else {
            false
        }
    }

    /// The id of the current terminal, if one is set.
    #[inline]
    #[must_use]
    pub const fn current_id(&self) -> Option<TerminalId> {
        self.current
    }

    /// The current terminal.
    #[must_use]
    pub fn current(&self) -> Option<&Terminal<B>> {
        self.current.and_then(|id| self.terminals.get(&id))
    }

    /// The current terminal, mutably.
    pub fn current_mut(&mut self) -> Option<&mut Terminal<B>> {
        self.current.and_then(|id| self.terminals.get_mut(&id))
    }

    /// Registered ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = TerminalId> + '_ {
        self.terminals.keys().copied()
    }

    /// Number of registered terminals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }
}

impl<B: Backend> Default for Registry<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::grid::Size;
    use crate::headless::HeadlessBackend;
    use pretty_assertions::assert_eq;

    fn pane(cols: u16) -> Terminal<HeadlessBackend> {
        Terminal::init(HeadlessBackend::new(Size::new(cols, 1)), Config::default()).unwrap()
    }

    #[test]
    fn first_insert_becomes_current() {
        let mut reg = Registry::new();
        let a = reg.insert(pane(4));
        let b = reg.insert(pane(6));

        assert_eq!(reg.current_id(), Some(a));
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn set_current_switches_target() {
        let mut reg = Registry::new();
        let _a = reg.insert(pane(4));
        let b = reg.insert(pane(6));

        assert!(reg.set_current(b));
        assert_eq!(reg.current().map(Terminal::width), Some(6));
    }

    #[test]
    fn set_current_rejects_unknown() {
        let mut reg: Registry<HeadlessBackend> = Registry::new();
        assert!(!reg.set_current(TerminalId(7)));
        assert_eq!(reg.current_id(), None);
    }

    #[test]
    fn terminals_do_not_share_state() {
        let mut reg = Registry::new();
        let a = reg.insert(pane(4));
        let b = reg.insert(pane(4));

        reg.get_mut(a).unwrap().puts(b"aa").unwrap();
        reg.get_mut(a).unwrap().refresh().unwrap();
        reg.get_mut(b).unwrap().refresh().unwrap();

        assert_eq!(reg.get(a).unwrap().backend().screen_text(), "aa  \n");
        assert_eq!(reg.get(b).unwrap().backend().screen_text(), "    \n");
    }

    #[test]
    fn removing_current_clears_it() {
        let mut reg = Registry::new();
        let a = reg.insert(pane(4));
        let term = reg.remove(a).unwrap();

        assert!(term.is_active());
        assert_eq!(reg.current_id(), None);
        assert!(reg.current_mut().is_none());
        assert!(reg.remove(a).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut reg = Registry::new();
        let a = reg.insert(pane(1));
        reg.remove(a);
        let b = reg.insert(pane(1));
        assert_ne!(a, b);
        assert_eq!(b.to_string(), "term#1");
    }
}
