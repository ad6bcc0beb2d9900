//! Criterion benchmarks for the base64 document codec.
//!
//! Document bodies can be several megabytes; these benchmarks track how long
//! decoding and envelope serialization take for typical sizes.
//!
//! Run with:
//! ```bash
//! cargo bench --package docview-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docview_core::protocol::envelope::{OpenDocumentBlobPayload, OutboundEnvelope};
use docview_core::{decode_document, encode_base64, mime_type_for};

const SIZES: [usize; 3] = [1024, 256 * 1024, 4 * 1024 * 1024];

fn fixture(len: usize) -> String {
    let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    encode_base64(&bytes)
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_document");
    for size in SIZES {
        let body = fixture(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| decode_document(black_box(body), black_box("pdf")))
        });
    }
    group.finish();
}

fn bench_envelope_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_document_blob_to_json");
    for size in SIZES {
        let blob = decode_document(&fixture(size), "pdf").expect("fixture is valid base64");
        let envelope = OutboundEnvelope::OpenDocumentBlob(OpenDocumentBlobPayload {
            blob,
            extension: "pdf".to_string(),
            filename: "bench.pdf".to_string(),
            document_id: "R1".to_string(),
        });
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &envelope, |b, env| {
            b.iter(|| serde_json::to_string(black_box(env)))
        });
    }
    group.finish();
}

fn bench_mime_lookup(c: &mut Criterion) {
    c.bench_function("mime_type_for", |b| {
        b.iter(|| {
            for ext in [".pdf", "docx", "PNG", "unknown"] {
                black_box(mime_type_for(black_box(ext)));
            }
        })
    });
}

criterion_group!(benches, bench_decode, bench_envelope_serialize, bench_mime_lookup);
criterion_main!(benches);
