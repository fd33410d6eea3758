//! Overlap resolution for match lists.

use crate::matcher::trie::Match;

/// Reduce `matches` to a non-overlapping set.
///
/// Matches are ordered by start offset, longer first on ties, and kept greedily
/// when they begin at or after the end of the last kept match.
pub fn resolve_overlaps<P>(mut matches: Vec<Match<P>>) -> Vec<Match<P>> {
    matches.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.len().cmp(&a.len())));

    let mut kept: Vec<Match<P>> = Vec::with_capacity(matches.len());
    for candidate in matches {
        match kept.last() {
            Some(last) if candidate.start < last.end => continue,
            _ => kept.push(candidate),
        }
    }
    kept
}
