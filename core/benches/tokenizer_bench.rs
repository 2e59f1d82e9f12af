use criterion::{criterion_group, criterion_main, Criterion};
use revscope_core::tokenizer::tokenize;

fn bench_tokenize(c: &mut Criterion) {
    let text = include_str!("../src/search.rs");
    c.bench_function("tokenize_search_rs", |b| b.iter(|| tokenize(text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
