//! Benchmarks for the render and encode paths
//!
//! Run with: cargo bench --bench boundary

use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mupdf_envelope::{new_context, STORE_DEFAULT, STORE_UNLIMITED};

/// Single page with one line of text
fn create_minimal_pdf() -> Vec<u8> {
    let stream = "BT /F1 12 Tf 72 720 Td (Benchmark page with a line of text) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> >> >> >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        write!(pdf, "{} 0 obj\n{}\nendobj\n", i + 1, body).unwrap();
    }
    let xref = pdf.len();
    write!(pdf, "xref\n0 5\n0000000000 65535 f \n").unwrap();
    for offset in offsets {
        write!(pdf, "{:010} 00000 n \n", offset).unwrap();
    }
    write!(pdf, "trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", xref).unwrap();
    pdf
}

fn bench_render(c: &mut Criterion) {
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(&create_minimal_pdf()).unwrap();

    let mut group = c.benchmark_group("render_page");
    for (name, store) in [("default_store", STORE_DEFAULT), ("tiny_store", 1), ("unlimited", STORE_UNLIMITED)] {
        let ctx = new_context(store).into_result().unwrap();
        let doc = ctx.open_document(file.path()).into_result().unwrap();
        let page = ctx.load_page(&doc, 0).into_result().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(name), &page, |b, page| {
            b.iter(|| {
                let pix = ctx.render_page(black_box(page), false, 1.0).into_result().unwrap();
                black_box(pix.width())
            })
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(&create_minimal_pdf()).unwrap();

    let ctx = new_context(STORE_DEFAULT).into_result().unwrap();
    let doc = ctx.open_document(file.path()).into_result().unwrap();
    let page = ctx.load_page(&doc, 0).into_result().unwrap();
    let pix = ctx.render_page(&page, false, 1.5).into_result().unwrap();

    let mut group = c.benchmark_group("pixmap_as_jpeg_bytes");
    for quality in [50, 85, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(quality), &quality, |b, &q| {
            b.iter(|| ctx.pixmap_as_jpeg_bytes(black_box(&pix), q).into_result().unwrap())
        });
    }
    group.finish();

    c.bench_function("page_as_plain_text", |b| {
        b.iter(|| ctx.page_as_plain_text(black_box(&page)).into_result().unwrap())
    });
}

criterion_group!(benches, bench_render, bench_encode);
criterion_main!(benches);
