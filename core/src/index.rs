use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use crate::result::SearchResult;
use crate::{Location, Term};

/// Term -> location -> positions. Absent keys mean "no occurrences"; the
/// nested maps and sets are never left empty.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Postings(BTreeMap<Term, BTreeMap<Location, BTreeSet<usize>>>);

/// Append-only inverted index with per-location token counts.
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    postings: Postings,
    counts: BTreeMap<Location, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Records one token. The location's token count grows on every call,
    /// even when the position was already present.
    pub fn add(&mut self, term: &str, location: &str, position: usize) {
        self.postings
            .0
            .entry(term.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default()
            .insert(position);
        *self.counts.entry(location.to_string()).or_insert(0) += 1;
    }

    /// Adds `terms` at consecutive positions starting from `start`. Returns
    /// the next unused position.
    pub fn add_all<S: AsRef<str>>(&mut self, terms: &[S], location: &str, start: usize) -> usize {
        let mut position = start;
        for term in terms {
            self.add(term.as_ref(), location, position);
            position += 1;
        }
        position
    }

    /// Folds `other` into this index: positions are unioned and token counts
    /// summed.
    pub fn merge(&mut self, other: InvertedIndex) {
        for (term, locations) in other.postings.0 {
            match self.postings.0.entry(term) {
                Entry::Vacant(slot) => {
                    slot.insert(locations);
                }
                Entry::Occupied(mut slot) => {
                    let mine = slot.get_mut();
                    for (location, positions) in locations {
                        match mine.entry(location) {
                            Entry::Vacant(s) => {
                                s.insert(positions);
                            }
                            Entry::Occupied(mut s) => s.get_mut().extend(positions),
                        }
                    }
                }
            }
        }
        for (location, count) in other.counts {
            *self.counts.entry(location).or_insert(0) += count;
        }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.postings.0.contains_key(term)
    }

    pub fn contains_location(&self, term: &str, location: &str) -> bool {
        self.postings.0.get(term).is_some_and(|l| l.contains_key(location))
    }

    pub fn contains_position(&self, term: &str, location: &str, position: usize) -> bool {
        self.postings
            .0
            .get(term)
            .and_then(|l| l.get(location))
            .is_some_and(|p| p.contains(&position))
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.postings.0.keys().map(String::as_str)
    }

    pub fn locations<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a str> {
        self.postings
            .0
            .get(term)
            .into_iter()
            .flat_map(|l| l.keys().map(String::as_str))
    }

    pub fn positions<'a>(&'a self, term: &str, location: &str) -> impl Iterator<Item = usize> + 'a {
        self.postings
            .0
            .get(term)
            .and_then(|l| l.get(location))
            .into_iter()
            .flat_map(|p| p.iter().copied())
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.postings.0.len() }
    pub fn is_empty(&self) -> bool { self.postings.0.is_empty() }

    pub fn location_count(&self, term: &str) -> usize {
        self.postings.0.get(term).map_or(0, BTreeMap::len)
    }

    pub fn position_count(&self, term: &str, location: &str) -> usize {
        self.postings
            .0
            .get(term)
            .and_then(|l| l.get(location))
            .map_or(0, BTreeSet::len)
    }

    pub fn counts(&self) -> &BTreeMap<Location, usize> { &self.counts }

    pub fn count(&self, location: &str) -> usize {
        self.counts.get(location).copied().unwrap_or(0)
    }

    pub fn postings(&self) -> &Postings { &self.postings }

    pub fn exact_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult> {
        let mut matches = HashMap::new();
        for term in terms {
            self.accumulate(term, &mut matches);
        }
        self.rank(matches)
    }

    /// Every indexed term starting with a query term counts as a match. Terms
    /// are sorted, so each query term is a range scan from its first
    /// greater-or-equal key. A term matched by several query prefixes counts
    /// once per prefix.
    pub fn partial_search(&self, terms: &BTreeSet<Term>) -> Vec<SearchResult> {
        let mut matches = HashMap::new();
        for prefix in terms {
            let tail = self
                .postings
                .0
                .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded));
            for (word, _) in tail {
                if !word.starts_with(prefix.as_str()) {
                    break;
                }
                self.accumulate(word, &mut matches);
            }
        }
        self.rank(matches)
    }

    fn accumulate<'a>(&'a self, term: &str, matches: &mut HashMap<&'a str, usize>) {
        if let Some(locations) = self.postings.0.get(term) {
            for (location, positions) in locations {
                *matches.entry(location.as_str()).or_insert(0) += positions.len();
            }
        }
    }

    fn rank(&self, matches: HashMap<&str, usize>) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = matches
            .into_iter()
            .map(|(location, count)| SearchResult::new(count, self.count(location), location.to_string()))
            .collect();
        results.sort();
        results
    }
}
