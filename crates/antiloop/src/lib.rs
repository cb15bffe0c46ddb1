#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Stops a peer-mesh ping-pong: the moment a receiver applies a remote
//! write or delete, it installs an [`AntiLoopLedger`] entry for that
//! file's basename *before* touching the filesystem. The local change
//! handler consults the ledger before broadcasting a watcher event; a
//! hit within the TTL means "we just wrote this ourselves on a remote's
//! behalf", and the event is dropped rather than re-announced.
//!
//! Keyed by basename rather than content hash: the watcher event this
//! suppresses fires on the file this process just wrote, regardless of
//! what it now contains, so there is nothing to hash yet when the
//! lookup happens.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default suppression window. Short on purpose: genuine independent
/// edits to the same filename must not be swallowed for long.
pub const DEFAULT_TTL: Duration = Duration::from_millis(1500);

struct AntiLoopEntry {
    marked_at: Instant,
}

/// Tracks recently self-applied writes/deletes to suppress echo broadcasts.
pub struct AntiLoopLedger {
    entries: DashMap<Box<str>, AntiLoopEntry>,
    ttl: Duration,
}

impl AntiLoopLedger {
    /// Creates a ledger using [`DEFAULT_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Creates a ledger with a custom suppression window.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Marks `filename` as just mutated by an inbound sync or delete.
    /// Call this immediately before the filesystem mutation it guards.
    pub fn mark(&self, filename: &str) {
        self.entries.insert(
            filename.into(),
            AntiLoopEntry {
                marked_at: Instant::now(),
            },
        );
    }

    /// `true` if `filename` was marked within the TTL — the local change
    /// handler should drop the corresponding watcher event rather than
    /// broadcast it.
    #[must_use]
    pub fn should_suppress(&self, filename: &str) -> bool {
        match self.entries.get(filename) {
            Some(entry) => entry.marked_at.elapsed() < self.ttl,
            None => false,
        }
    }

    /// Removes every entry older than the ledger's TTL. Call periodically
    /// from a maintenance task; expired entries are also implicitly
    /// ignored by [`should_suppress`], so this only bounds memory growth.
    pub fn sweep_expired(&self) {
        self.entries.retain(|_, entry| entry.marked_at.elapsed() < self.ttl);
    }

    /// Number of entries currently stored, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AntiLoopLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn suppresses_an_event_for_a_just_marked_filename() {
        let ledger = AntiLoopLedger::new();
        ledger.mark("x.txt");
        assert!(ledger.should_suppress("x.txt"));
    }

    #[test]
    fn does_not_suppress_an_unrelated_filename() {
        let ledger = AntiLoopLedger::new();
        ledger.mark("x.txt");
        assert!(!ledger.should_suppress("y.txt"));
    }

    #[test]
    fn expired_entries_are_not_suppressed() {
        let ledger = AntiLoopLedger::with_ttl(Duration::from_millis(10));
        ledger.mark("x.txt");
        sleep(Duration::from_millis(30));
        assert!(!ledger.should_suppress("x.txt"));
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let ledger = AntiLoopLedger::with_ttl(Duration::from_millis(10));
        ledger.mark("x.txt");
        sleep(Duration::from_millis(30));
        ledger.sweep_expired();
        assert!(ledger.is_empty());
    }

    #[test]
    fn remarking_refreshes_the_ttl() {
        let ledger = AntiLoopLedger::with_ttl(Duration::from_millis(30));
        ledger.mark("x.txt");
        sleep(Duration::from_millis(20));
        ledger.mark("x.txt");
        sleep(Duration::from_millis(20));
        assert!(ledger.should_suppress("x.txt"));
    }

    proptest::proptest! {
        #[test]
        fn suppression_depends_only_on_whether_the_filename_was_marked(
            marked in "[a-z]{1,12}",
            queried in "[a-z]{1,12}",
        ) {
            let ledger = AntiLoopLedger::new();
            ledger.mark(&marked);
            assert_eq!(ledger.should_suppress(&queried), marked == queried);
        }
    }
}
