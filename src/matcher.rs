//! Multi-pattern vocabulary matching.
//!
//! - `trie`: character trie matcher with word-boundary rules
//! - `overlap`: reduces overlapping matches to a non-overlapping set
//! - `registry`: shares the live matcher snapshot with its consumers

pub mod overlap;
pub mod registry;
pub mod trie;

pub use self::overlap::resolve_overlaps;
pub use self::registry::{MatcherRegistry, MatcherSlot};
pub use self::trie::{Match, PrefixMatcher};
