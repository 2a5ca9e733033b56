// ai
//! 🏎️ How fast does a record turn into bytes and back? Faster than the cluster
//! can scroll, hopefully. This is where we check.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kvault::codec::RecordCodec;
use kvault::common::Record;
use serde_json::{Value, json};

const SCHEMA: &str = "message Author {\n\toptional string name = 1;\n\toptional sint64 age = 2;\n}\n\
message Post {\n\toptional string id = 1;\n\toptional string title = 2;\n\trepeated string tags = 3;\n\
\toptional Author author = 4;\n\toptional double score = 5;\n\toptional bool draft = 6;\n}\n\
message EntryPoint {\n\trequired string index = 1;\n\trequired string type = 2;\n\trequired Post source = 3;\n}";

fn post(n: usize) -> Record {
    let body = json!({
        "id": format!("post-{n}"),
        "title": "A day in the life of a scroll cursor",
        "tags": ["rust", "search", "archives", "gzip"],
        "author": {"name": "ana", "age": 41},
        "score": 0.5 + n as f64,
        "draft": n % 2 == 0
    });
    match body {
        Value::Object(body) => Record::new("blog", "post", body),
        _ => unreachable!(),
    }
}

fn bench_codec(c: &mut Criterion) {
    let codec = RecordCodec::load(SCHEMA).expect("bench schema loads");
    let mut group = c.benchmark_group("codec");
    for &n in &[1usize, 100, 1_000] {
        let records: Vec<Record> = (0..n).map(post).collect();
        let packed: Vec<Vec<u8>> = records.iter().map(|r| codec.pack(r).expect("packs")).collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("pack", n), &records, |b, records| {
            b.iter(|| {
                for record in records {
                    criterion::black_box(codec.pack(record).expect("packs"));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("unpack", n), &packed, |b, packed| {
            b.iter(|| {
                for bytes in packed {
                    criterion::black_box(codec.unpack(bytes).expect("unpacks"));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
