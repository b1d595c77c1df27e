//! Pretty JSON output for the index, token counts and query results.
//! Keys are sorted and indented by two spaces; scores carry 8 decimals.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{IndexError, Result};
use crate::index::InvertedIndex;
use crate::result::SearchResult;

fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).map_err(|e| IndexError::io(path, e))?;
    let mut out = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut out, value).map_err(|e| IndexError::json(path, e))?;
    out.flush().map_err(|e| IndexError::io(path, e))?;
    Ok(())
}

/// `{term: {location: [positions...]}}`
pub fn save_index(path: &Path, index: &InvertedIndex) -> Result<()> {
    save_json(path, index.postings())
}

/// `{location: count}`
pub fn save_counts(path: &Path, index: &InvertedIndex) -> Result<()> {
    save_json(path, index.counts())
}

/// `{query: [{count, score, where}, ...]}`
pub fn save_results(path: &Path, results: &BTreeMap<String, Vec<SearchResult>>) -> Result<()> {
    save_json(path, results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn index_json_is_sorted_and_nested() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        let mut index = InvertedIndex::new();
        index.add_all(&["b", "a", "b"], "x.txt", 1);
        save_index(&path, &index).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let expected = "{\n  \"a\": {\n    \"x.txt\": [\n      2\n    ]\n  },\n  \"b\": {\n    \"x.txt\": [\n      1,\n      3\n    ]\n  }\n}";
        assert_eq!(text, expected);
    }

    #[test]
    fn counts_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.json");
        let mut index = InvertedIndex::new();
        index.add_all(&["a", "b"], "y.txt", 1);
        index.add("a", "x.txt", 1);
        save_counts(&path, &index).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"x.txt\": 1,\n  \"y.txt\": 2\n}");
    }

    #[test]
    fn results_json_keeps_score_precision() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut results = BTreeMap::new();
        results.insert("cat".to_string(), vec![SearchResult::new(1, 3, "a.txt".to_string())]);
        results.insert("dog".to_string(), vec![]);
        save_results(&path, &results).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"score\": 0.33333333,"));
        assert!(text.contains("\"where\": \"a.txt\""));
        assert!(text.contains("\"dog\": []"));
    }

    #[test]
    fn unwritable_path_reports_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("index.json");
        let err = save_index(&path, &InvertedIndex::new()).unwrap_err();
        assert_eq!(err.path(), &path);
    }
}
