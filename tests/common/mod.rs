//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const FIRST_PAGE: (f32, f32) = (200.0, 100.0);
pub const SECOND_PAGE: (f32, f32) = (300.0, 150.0);
pub const FIXTURE_TITLE: &str = "Fixture Title";
pub const FIRST_PAGE_TEXT: &str = "Hello Fixture";

fn content_stream(text: &str, y: u32) -> String {
    let body = format!("BT /F1 12 Tf 20 {} Td ({}) Tj ET", y, text);
    format!("<< /Length {} >>\nstream\n{}\nendstream", body.len(), body)
}

/// Two-page PDF with text, an outline and an info dictionary.
///
/// Objects are laid out in order so the xref offsets can be computed while
/// writing.
pub fn create_minimal_pdf() -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R /Outlines 7 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Contents 4 0 R /Resources << /Font << /F1 9 0 R >> >> >>".to_string(),
        content_stream(FIRST_PAGE_TEXT, 50),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 150] /Contents 6 0 R /Resources << /Font << /F1 9 0 R >> >> >>".to_string(),
        content_stream("Second page", 70),
        "<< /Type /Outlines /First 8 0 R /Last 8 0 R /Count 1 >>".to_string(),
        "<< /Title (Chapter One) /Parent 7 0 R /Dest [3 0 R /Fit] >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!("<< /Title ({}) /Author (Envelope Tests) >>", FIXTURE_TITLE),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        write!(pdf, "{} 0 obj\n{}\nendobj\n", i + 1, body).unwrap();
    }

    let xref = pdf.len();
    write!(pdf, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).unwrap();
    for offset in offsets {
        write!(pdf, "{:010} 00000 n \n", offset).unwrap();
    }
    write!(
        pdf,
        "trailer\n<< /Size {} /Root 1 0 R /Info 10 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    )
    .unwrap();

    pdf
}

/// Write `bytes` to a temporary file with the given extension.
pub fn write_fixture(bytes: &[u8], extension: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

pub fn pdf_fixture() -> NamedTempFile {
    write_fixture(&create_minimal_pdf(), ".pdf")
}
