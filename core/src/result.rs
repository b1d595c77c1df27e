use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::Location;

/// One ranked hit: how many query matches a location holds and the share of
/// that location's tokens they make up.
#[derive(Debug, Clone)]
pub struct SearchResult {
    count: usize,
    score: f64,
    location: Location,
}

impl SearchResult {
    pub fn new(count: usize, total: usize, location: Location) -> Self {
        let score = if total == 0 { 0.0 } else { count as f64 / total as f64 };
        Self { count, score, location }
    }

    pub fn count(&self) -> usize { self.count }
    pub fn score(&self) -> f64 { self.score }
    pub fn location(&self) -> &str { &self.location }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Score descending, then count descending, then location ascending
/// ignoring case. Locations equal up to case fall back to byte order so the
/// ordering stays total.
impl Ord for SearchResult {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| cmp_ignore_case(&self.location, &other.location))
            .then_with(|| self.location.cmp(&other.location))
    }
}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchResult {}

impl Serialize for SearchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // fixed 8 decimals, written verbatim
        let score = serde_json::Number::from_str(&format!("{:.8}", self.score))
            .map_err(S::Error::custom)?;
        let mut s = serializer.serialize_struct("SearchResult", 3)?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("score", &score)?;
        s.serialize_field("where", &self.location)?;
        s.end()
    }
}
