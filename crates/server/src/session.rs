//! The currently selected service.
//!
//! Selection is validate-then-commit: a caller takes a [`SelectionTicket`] before resolving the
//! target and commits with it afterwards. The commit only lands if nothing else was selected or
//! cleared in between.

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSelection {
    /// Resolved spec location (URL or file path).
    pub source: String,
    pub base_url_override: Option<String>,
    /// Config alias this selection came from, if any.
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionTicket {
    generation: u64,
}

#[derive(Debug, Error)]
#[error("selection superseded by a concurrent change")]
pub struct Superseded;

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    selection: Option<Arc<ServiceSelection>>,
}

#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
}

impl SessionState {
    #[must_use]
    pub fn current(&self) -> Option<Arc<ServiceSelection>> {
        self.inner.read().selection.clone()
    }

    #[must_use]
    pub fn begin(&self) -> SelectionTicket {
        SelectionTicket {
            generation: self.inner.read().generation,
        }
    }

    /// Install `selection` if the session has not changed since `ticket` was taken.
    ///
    /// # Errors
    ///
    /// Returns [`Superseded`] when another selection or clear happened first; the session is left
    /// as that operation set it.
    pub fn commit(&self, ticket: SelectionTicket, selection: ServiceSelection) -> Result<(), Superseded> {
        let mut inner = self.inner.write();
        if inner.generation != ticket.generation {
            return Err(Superseded);
        }
        inner.generation += 1;
        inner.selection = Some(Arc::new(selection));
        Ok(())
    }

    /// Drop the selection, returning what was selected.
    pub fn clear(&self) -> Option<Arc<ServiceSelection>> {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.selection.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(source: &str) -> ServiceSelection {
        ServiceSelection {
            source: source.to_string(),
            base_url_override: None,
            alias: None,
        }
    }

    #[test]
    fn starts_empty_and_commits() {
        let session = SessionState::default();
        assert!(session.current().is_none());

        let ticket = session.begin();
        session.commit(ticket, selection("a.json")).expect("commit");
        assert_eq!(session.current().expect("selected").source, "a.json");
    }

    #[test]
    fn losing_commit_keeps_the_winner() {
        let session = SessionState::default();
        let slow = session.begin();
        let fast = session.begin();

        session.commit(fast, selection("fast.json")).expect("first commit wins");
        assert!(session.commit(slow, selection("slow.json")).is_err());
        assert_eq!(session.current().expect("selected").source, "fast.json");
    }

    #[test]
    fn clear_supersedes_pending_selection() {
        let session = SessionState::default();
        let ticket = session.begin();
        session
            .commit(ticket, selection("a.json"))
            .expect("commit");

        let pending = session.begin();
        let previous = session.clear().expect("had a selection");
        assert_eq!(previous.source, "a.json");
        assert!(session.commit(pending, selection("b.json")).is_err());
        assert!(session.current().is_none());
    }
}
