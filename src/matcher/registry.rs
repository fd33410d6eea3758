//! Shared live matcher.
//!
//! The host owns one [`MatcherRegistry`] and hands each consumer (an editor
//! view, a reading pane, a CLI scan) a [`MatcherSlot`]. A refresh builds a new
//! [`PrefixMatcher`] off to the side and [`MatcherRegistry::publish`] swaps the
//! same `Arc` into every live slot; readers never see a half-built matcher.
//! Slots whose consumer went away are pruned on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::matcher::trie::{Match, PrefixMatcher};

pub type MatcherGeneration = u64;

/// A consumer's view of the live matcher.
#[derive(Debug)]
pub struct MatcherSlot<P = String> {
    matcher: RwLock<Arc<PrefixMatcher<P>>>,
    generation: AtomicU64,
}

impl<P> MatcherSlot<P> {
    fn new(matcher: Arc<PrefixMatcher<P>>, generation: MatcherGeneration) -> Self {
        MatcherSlot {
            matcher: RwLock::new(matcher),
            generation: AtomicU64::new(generation),
        }
    }

    /// The matcher currently installed in this slot.
    pub fn current(&self) -> Arc<PrefixMatcher<P>> {
        Arc::clone(&self.matcher.read())
    }

    /// Generation of the installed matcher; bumps on every publish.
    pub fn generation(&self) -> MatcherGeneration {
        self.generation.load(Ordering::Acquire)
    }

    fn install(&self, matcher: Arc<PrefixMatcher<P>>, generation: MatcherGeneration) {
        *self.matcher.write() = matcher;
        self.generation.store(generation, Ordering::Release);
    }
}

impl<P: Clone> MatcherSlot<P> {
    pub fn find_all_matches(&self, text: &str) -> Vec<Match<P>> {
        self.current().find_all_matches(text)
    }
}

/// Owner of the live matcher snapshot.
#[derive(Debug)]
pub struct MatcherRegistry<P = String> {
    current: RwLock<Arc<PrefixMatcher<P>>>,
    slots: Mutex<Vec<Weak<MatcherSlot<P>>>>,
    generation: AtomicU64,
}

impl<P> Default for MatcherRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MatcherRegistry<P> {
    /// Registry holding an empty matcher at generation 0.
    pub fn new() -> Self {
        MatcherRegistry {
            current: RwLock::new(Arc::new(PrefixMatcher::new())),
            slots: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Register a consumer. The slot starts out with the current matcher.
    pub fn register(&self) -> Arc<MatcherSlot<P>> {
        let mut slots = self.slots.lock();
        let slot = Arc::new(MatcherSlot::new(self.current(), self.generation()));
        slots.push(Arc::downgrade(&slot));
        slot
    }

    /// Install `matcher` as the live snapshot in the registry and every live
    /// slot; returns the new generation.
    pub fn publish(&self, matcher: PrefixMatcher<P>) -> MatcherGeneration {
        let snapshot = Arc::new(matcher);

        let mut slots = self.slots.lock();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.current.write() = Arc::clone(&snapshot);

        slots.retain(|weak| match weak.upgrade() {
            Some(slot) => {
                slot.install(Arc::clone(&snapshot), generation);
                true
            }
            None => false,
        });

        debug!(
            "Published matcher generation {generation} ({} words) to {} slots",
            snapshot.len(),
            slots.len()
        );
        generation
    }

    pub fn current(&self) -> Arc<PrefixMatcher<P>> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> MatcherGeneration {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of slots whose consumer is still alive.
    pub fn live_slots(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
