//! WHOWAS history ring.
//!
//! Only the producer side lives in the core: departed or renamed nicks are
//! recorded here and the query surface is an external collaborator.

use std::collections::VecDeque;

/// Bounded history length.
const HISTORY_LEN: usize = 1024;

/// Snapshot of a nick at departure or rename time.
#[derive(Debug, Clone)]
pub struct WhowasEntry {
    pub name: String,
    pub username: String,
    pub host: String,
    pub info: String,
    pub server: String,
    /// Wall-clock second of the event.
    pub logoff: i64,
}

/// The ring itself; oldest entries fall off the front.
#[derive(Debug, Default)]
pub struct WhowasHistory {
    entries: VecDeque<WhowasEntry>,
}

impl WhowasHistory {
    /// Record one entry.
    pub fn add(&mut self, entry: WhowasEntry) {
        if self.entries.len() == HISTORY_LEN {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries for `name`, newest first, folded comparison.
    pub fn find(&self, name: &str) -> Vec<&WhowasEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| ferric_proto::irc_eq(&e.name, name))
            .collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
