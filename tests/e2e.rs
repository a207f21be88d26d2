//! End-to-end tests against the live Gemini API.
//!
//! These tests make real network calls. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested, and need `GOOGLE_API_KEY` or `GEMINI_API_KEY`.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture
//!
//! Claim forms are read from `./test_cases/` when present.

use edgequake_claims::{
    categorize, serialize, ApiCredential, ClaimsError, ExtractionConfig, Extractor,
    UploadedDocument,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test unless E2E_ENABLED is set and a credential is available.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match ApiCredential::resolve(None) {
            Ok(c) => c,
            Err(e) => {
                println!("SKIP — {e}");
                return;
            }
        }
    }};
}

/// Like `e2e_skip_unless_ready!` but also needs a file in `test_cases/`.
macro_rules! e2e_skip_unless_file {
    ($name:expr) => {{
        let credential = e2e_skip_unless_ready!();
        let p: PathBuf = test_cases_dir().join($name);
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        (credential, p)
    }};
}

fn blank_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([255, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

// ── Live model tests ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_blank_image_yields_a_record() {
    let credential = e2e_skip_unless_ready!();
    let extractor = Extractor::gemini(credential, ExtractionConfig::default()).unwrap();
    let document = UploadedDocument::new("blank.png", "image/png", blank_png());

    // A blank page has nothing to extract; the reply must still be a JSON object.
    let output = extractor
        .process(&document)
        .await
        .expect("blank image should still produce a record");
    println!("{}", serialize(&output.record).unwrap());
    assert_eq!(output.page_count, 1);
}

#[tokio::test]
async fn test_invalid_key_is_external_service_error() {
    let _ = e2e_skip_unless_ready!();
    let credential = ApiCredential::new("definitely-not-a-valid-key").unwrap();
    let extractor = Extractor::gemini(credential, ExtractionConfig::default()).unwrap();
    let document = UploadedDocument::new("blank.png", "image/png", blank_png());

    let err = extractor.process(&document).await.unwrap_err();
    match err {
        ClaimsError::ExternalService { status, .. } => {
            assert!(matches!(status, Some(400) | Some(401) | Some(403)), "{status:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_claim_form_pdf() {
    let (credential, path) = e2e_skip_unless_file!("claim_form.pdf");
    let extractor = Extractor::gemini(credential, ExtractionConfig::default()).unwrap();
    let document = UploadedDocument::from_path(&path, None).await.unwrap();

    let output = extractor.process(&document).await.expect("extraction");
    let view = categorize(&output.record);
    for group in &view.groups {
        println!("{}", group.category);
        for line in group.lines() {
            println!("  {line}");
        }
    }
    assert!(
        view.groups.iter().any(|g| !g.is_empty()),
        "a filled-in claim form should populate at least one group"
    );

    let written = edgequake_claims::write_export(&output.record, output_dir(), document.name())
        .await
        .unwrap();
    println!("wrote {}", written.display());
}

#[tokio::test]
async fn test_claim_form_is_memoized() {
    let (credential, path) = e2e_skip_unless_file!("claim_form.pdf");
    let extractor = Extractor::gemini(credential, ExtractionConfig::default()).unwrap();
    let document = UploadedDocument::from_path(&path, None).await.unwrap();

    let first = extractor.process(&document).await.expect("first extraction");
    let second = extractor.process(&document).await.expect("second extraction");
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.record, second.record);
}
