//! Error types for the edgequake-claims library.
//!
//! Every failure of the extraction pipeline is a [`ClaimsError`]. There is no
//! partial success: a document either yields a complete
//! [`crate::record::ExtractedRecord`] or one error that the caller presents
//! as-is. The variants follow the pipeline stages:
//!
//! * startup: [`ClaimsError::Configuration`], [`ClaimsError::InvalidConfig`]
//! * decoding: [`ClaimsError::UnsupportedFormat`], [`ClaimsError::Decode`],
//!   [`ClaimsError::PdfEngineUnavailable`]
//! * model call: [`ClaimsError::ExternalService`],
//!   [`ClaimsError::MalformedResponse`]
//! * shell I/O: [`ClaimsError::FileRead`], [`ClaimsError::OutputWriteFailed`]

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-claims library.
#[derive(Debug, Error)]
pub enum ClaimsError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// The model API credential is missing or unusable. Fatal at startup.
    #[error("API credential not configured: {detail}\nSet GOOGLE_API_KEY (or GEMINI_API_KEY), or add GOOGLE_API_KEY to a secrets file passed with --secrets.")]
    Configuration { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared MIME type is not PDF, JPEG or PNG.
    #[error("Unsupported file type '{mime_type}'\nSupported types: application/pdf, image/jpeg, image/png.")]
    UnsupportedFormat { mime_type: String },

    /// The bytes do not parse as the declared type.
    #[error("Could not decode {}as {mime_type}: {detail}", file_prefix(.file))]
    Decode {
        file: Option<String>,
        mime_type: String,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF rasterisation needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium into a system library path.\n"
    )]
    PdfEngineUnavailable(String),

    /// The input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model call failed (network, quota, timeout, rejected request).
    #[error("{service} request failed: {message}")]
    ExternalService {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// The model answered, but not with a JSON object.
    #[error("Model returned malformed JSON: {detail}\nRaw response:\n{raw}")]
    MalformedResponse { detail: String, raw: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn file_prefix(file: &Option<String>) -> String {
    file.as_deref()
        .map(|f| format!("'{f}' "))
        .unwrap_or_default()
}

impl ClaimsError {
    /// Short, stable name of the error category, for display next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimsError::Configuration { .. } => "ConfigurationError",
            ClaimsError::InvalidConfig(_) => "InvalidConfig",
            ClaimsError::UnsupportedFormat { .. } => "UnsupportedFormatError",
            ClaimsError::Decode { .. } => "DecodeError",
            ClaimsError::PdfEngineUnavailable(_) => "PdfEngineUnavailable",
            ClaimsError::FileRead { .. } => "FileReadError",
            ClaimsError::ExternalService { .. } => "ExternalServiceError",
            ClaimsError::MalformedResponse { .. } => "MalformedResponseError",
            ClaimsError::OutputWriteFailed { .. } => "OutputWriteError",
            ClaimsError::Internal(_) => "InternalError",
        }
    }

    /// Attach the uploaded file name to a [`ClaimsError::Decode`] error.
    ///
    /// Other variants pass through untouched.
    pub fn with_file(self, name: &str) -> Self {
        match self {
            ClaimsError::Decode {
                mime_type, detail, ..
            } => ClaimsError::Decode {
                file: Some(name.to_string()),
                mime_type,
                detail,
            },
            other => other,
        }
    }

    /// Raw model text carried by a [`ClaimsError::MalformedResponse`].
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ClaimsError::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
