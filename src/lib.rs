//! # edgequake-claims
//!
//! Extract structured fields from insurance claim forms using a hosted
//! vision language model.
//!
//! A claim arrives as a PDF or a phone photo/scan (JPEG, PNG). Every page is
//! rasterised, the ordered page images are sent with a fixed extraction
//! prompt in one Gemini request, and the JSON reply becomes an
//! [`ExtractedRecord`]. The record can then be grouped for display
//! ([`categorize`]) or exported as JSON ([`serialize`], [`write_export`]).
//!
//! ## Pipeline Overview
//!
//! ```text
//! UploadedDocument
//!  │
//!  ├─ 1. Decode   PDF pages via pdfium, or one JPEG/PNG image (spawn_blocking)
//!  ├─ 2. Encode   PNG → base64 InlineImage
//!  ├─ 3. Model    one generateContent call: prompt + every page, in order
//!  ├─ 4. Parse    strip code fences, parse the JSON object
//!  └─ 5. Present  four display groups + raw record, JSON export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_claims::{categorize, ApiCredential, ExtractionConfig, Extractor, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GOOGLE_API_KEY or GEMINI_API_KEY
//!     let credential = ApiCredential::resolve(None)?;
//!     let extractor = Extractor::gemini(credential, ExtractionConfig::default())?;
//!
//!     let document = UploadedDocument::from_path("claim.pdf", None).await?;
//!     let output = extractor.process(&document).await?;
//!     for line in categorize(&output.record).personal().lines() {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `claims` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiCredential, ExtractionConfig, ExtractionConfigBuilder};
pub use error::ClaimsError;
pub use extract::Extractor;
pub use output::{ExtractionOutput, ExtractionStats};
pub use pipeline::document::{DocumentKind, UploadedDocument};
pub use pipeline::encode::InlineImage;
pub use pipeline::llm::{GeminiModel, ModelReply, VisionModel, VisionRequest};
pub use pipeline::postprocess::{parse_reply, strip_code_fence};
pub use pipeline::render::{decode, PageImage};
pub use present::{
    categorize, export_file_name, serialize, write_export, CategorizedRecord, DisplayField,
    DisplayGroup,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::extraction_prompt;
pub use record::{ExtractedRecord, FieldValue};
pub use schema::{Category, FieldGroup, FieldSpec, FIELDS, SCHEMA_VERSION};
