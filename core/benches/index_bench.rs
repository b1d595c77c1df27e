use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::BTreeSet;
use wordindex::tokenizer::{english_stemmer, stem_line};
use wordindex::InvertedIndex;

const TEXT: &str = "The quick brown fox jumps over the lazy dog. Searching, searched and \
    searches all stem the same way; runners running runs ran. Café menus list crêpes.";

fn bench_stem_line(c: &mut Criterion) {
    let stemmer = english_stemmer();
    c.bench_function("stem_line", |b| b.iter(|| stem_line(TEXT, &stemmer)));
}

fn bench_search(c: &mut Criterion) {
    let stemmer = english_stemmer();
    let stems = stem_line(TEXT, &stemmer);
    let mut index = InvertedIndex::new();
    for doc in 0..200 {
        index.add_all(&stems, &format!("doc{doc}.txt"), 1);
    }
    let query: BTreeSet<String> = ["search", "run", "qu"].iter().map(|s| s.to_string()).collect();
    c.bench_function("exact_search", |b| b.iter(|| index.exact_search(&query)));
    c.bench_function("partial_search", |b| b.iter(|| index.partial_search(&query)));
}

criterion_group!(benches, bench_stem_line, bench_search);
criterion_main!(benches);
