//! End-to-end tests against a live LLM provider.
//!
//! These make real API calls and are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//! The provider is resolved the same way the CLI resolves it
//! (`EDGEQUAKE_PROVIDER` / `EDGEQUAKE_MODEL`, else `ANTHROPIC_API_KEY`).
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use edgequake_pdf_translate::{
    resolve_backend, translate_directory, translate_pdf, NoopProgressCallback, TranslationConfig,
    TranslationProgressCallback,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn live_config(out: &Path) -> TranslationConfig {
    let mut builder = TranslationConfig::builder()
        .target_language("French")
        .output_dir(out);
    if let Ok(provider) = std::env::var("EDGEQUAKE_PROVIDER") {
        builder = builder.provider_name(provider);
    }
    if let Ok(model) = std::env::var("EDGEQUAKE_MODEL") {
        builder = builder.model(model);
    }
    builder.build().expect("valid config")
}

fn write_one_page_pdf(path: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

// ── Live tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_translate_single_page_live() {
    e2e_skip_unless_enabled!();
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("hello.pdf");
    write_one_page_pdf(&src, "Good morning. The weather is lovely today.");
    let config = live_config(&tmp.path().join("out"));

    let backend = resolve_backend(&config).expect("a provider must be configured for e2e");
    let report = translate_pdf(&src, backend.as_ref(), &config).await;

    assert!(report.error.is_none(), "{:?}", report.error);
    assert_eq!(report.translated_pages, vec![1], "{:?}", report.failed_pages);
    let written = report.output.expect("output written");
    let doc = Document::load(&written).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    let text = doc.extract_text(&[1]).unwrap_or_default();
    println!("[live] translated page: {text}");
    assert!(!text.trim().is_empty());
}

#[tokio::test]
async fn test_translate_directory_live() {
    e2e_skip_unless_enabled!();
    let tmp = tempfile::tempdir().unwrap();
    let books = tmp.path().join("books");
    std::fs::create_dir(&books).unwrap();
    write_one_page_pdf(&books.join("a.pdf"), "The cat sleeps on the sofa.");
    write_one_page_pdf(&books.join("b.pdf"), "Trains leave every hour.");

    let mut config = live_config(&tmp.path().join("out"));
    config.input_dir = books;
    let report = translate_directory(&config).await.expect("run should start");

    println!(
        "{}",
        serde_json::to_string_pretty(&report).expect("RunReport must serialise")
    );
    assert_eq!(report.written(), 2);
}

// ── Structural tests (no API calls, always run) ──────────────────────────────

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    let _cb: std::sync::Arc<dyn TranslationProgressCallback> =
        std::sync::Arc::new(NoopProgressCallback);
}

#[test]
fn test_config_accepts_provider_name() {
    let config = TranslationConfig::builder()
        .target_language("French")
        .provider_name("mistral")
        .model("mistral-small-latest")
        .build()
        .expect("valid config");
    assert_eq!(config.provider_name.as_deref(), Some("mistral"));
    assert_eq!(config.model.as_deref(), Some("mistral-small-latest"));
}
