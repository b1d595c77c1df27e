use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::concurrent::ConcurrentInvertedIndex;
use crate::error::{IndexError, Result};
use crate::index::InvertedIndex;
use crate::queue::TaskQueue;
use crate::tokenizer::{english_stemmer, stem_file};

/// Adds every stem of `path` at positions 1..=n, keyed by the path's display
/// form. Returns the number of stems added.
pub fn index_file(path: &Path, index: &mut InvertedIndex) -> Result<usize> {
    let stems = stem_file(path, &english_stemmer()).map_err(|e| IndexError::io(path, e))?;
    let location = path.display().to_string();
    index.add_all(&stems, &location, 1);
    Ok(stems.len())
}

/// Indexes `files` one after the other. A file that fails is logged and the
/// rest are still indexed; the number of files indexed is returned.
pub fn build(files: &[PathBuf], index: &mut InvertedIndex) -> usize {
    let mut indexed = 0;
    for file in files {
        match index_file(file, index) {
            Ok(stems) => {
                tracing::debug!(file = %file.display(), stems, "indexed file");
                indexed += 1;
            }
            Err(err) => tracing::warn!(error = ?err, "skipping file"),
        }
    }
    tracing::info!(files = files.len(), indexed, "index build complete");
    indexed
}

/// One task per file. Each task fills a private index and merges it into
/// `index` once, so the write lock is taken once per file.
pub fn build_concurrent(files: &[PathBuf], index: &Arc<ConcurrentInvertedIndex>, queue: &TaskQueue) {
    for file in files {
        let file = file.clone();
        let index = Arc::clone(index);
        queue.submit(move || {
            let mut local = InvertedIndex::new();
            let stems = index_file(&file, &mut local)?;
            index.merge(local);
            tracing::debug!(file = %file.display(), stems, "indexed file");
            Ok(())
        });
    }
    queue.await_idle();
    tracing::info!(files = files.len(), words = index.len(), "index build complete");
}
