use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::Term;

lazy_static! {
    static ref CLEAN: Regex = Regex::new(r"[^\p{Alphabetic}\s]+").expect("valid regex");
    static ref SPLIT: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Fresh Snowball English stemmer. Build one per task rather than sharing.
pub fn english_stemmer() -> Stemmer {
    Stemmer::create(Algorithm::English)
}

/// Decompose, drop everything that is not a letter or whitespace, lowercase.
pub fn clean(text: &str) -> String {
    let decomposed = text.nfd().collect::<String>();
    CLEAN.replace_all(&decomposed, "").to_lowercase()
}

pub fn split(text: &str) -> Vec<&str> {
    SPLIT.split(text.trim()).filter(|w| !w.is_empty()).collect()
}

/// Clean then split.
pub fn parse(text: &str) -> Vec<String> {
    split(&clean(text)).into_iter().map(str::to_string).collect()
}

fn add_stems<C: Extend<Term>>(text: &str, stemmer: &Stemmer, stems: &mut C) {
    stems.extend(parse(text).iter().map(|w| stemmer.stem(w).into_owned()));
}

/// Stems in the order they occur, duplicates kept.
pub fn stem_line(text: &str, stemmer: &Stemmer) -> Vec<Term> {
    let mut stems = Vec::new();
    add_stems(text, stemmer, &mut stems);
    stems
}

/// Sorted, deduplicated stems of a line.
pub fn unique_stems(text: &str, stemmer: &Stemmer) -> BTreeSet<Term> {
    let mut stems = BTreeSet::new();
    add_stems(text, stemmer, &mut stems);
    stems
}

/// Stems of every line of a UTF-8 file, in reading order.
pub fn stem_file(path: &Path, stemmer: &Stemmer) -> io::Result<Vec<Term>> {
    let reader = BufReader::new(File::open(path)?);
    let mut stems = Vec::new();
    for line in reader.lines() {
        add_stems(&line?, stemmer, &mut stems);
    }
    Ok(stems)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_stem_line() {
        let t = stem_line("Running, runner's run!", &english_stemmer());
        assert!(t.iter().any(|w| w == "run"));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn clean_strips_digits_and_punctuation() {
        assert_eq!(clean("Hello, World 42!"), "hello world ");
    }

    #[test]
    fn split_ignores_surrounding_whitespace() {
        assert_eq!(split("  a \t b\n"), vec!["a", "b"]);
        assert!(split("   ").is_empty());
    }
}
