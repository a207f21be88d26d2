//! Pipeline stages for claim-form extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ render ──▶ encode ──▶ llm ──▶ postprocess
//! (bytes+MIME) (pdfium)   (base64)   (VLM)   (fence strip + JSON)
//! ```
//!
//! 1. [`document`]: the uploaded file and its declared MIME type
//! 2. [`render`]: decode to ordered page images; PDF pages through pdfium
//!    inside `spawn_blocking`
//! 3. [`encode`]: PNG-encode and base64-wrap each page for the request body
//! 4. [`llm`]: one model call per document; the only stage with network I/O
//! 5. [`postprocess`]: strip code fences and parse the reply into a record

pub mod document;
pub mod encode;
pub mod llm;
pub mod postprocess;
pub mod render;
