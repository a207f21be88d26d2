//! Configuration types for claim extraction.
//!
//! Two values configure the pipeline, and both are built once at startup and
//! passed in explicitly:
//!
//! * [`ApiCredential`]: the single model API key. A missing key is a
//!   [`ClaimsError::Configuration`] error reported before any document is
//!   touched.
//! * [`ExtractionConfig`]: every other knob, built via
//!   [`ExtractionConfigBuilder`] with documented defaults.

use crate::error::ClaimsError;
use crate::progress::ProgressCallback;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables checked for the API key, in order.
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// The model API key.
///
/// The key never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct ApiCredential {
    key: String,
    source: String,
}

impl ApiCredential {
    /// Wrap an explicit key.
    pub fn new(key: impl Into<String>) -> Result<Self, ClaimsError> {
        Self::with_source(key, "explicit")
    }

    fn with_source(key: impl Into<String>, source: impl Into<String>) -> Result<Self, ClaimsError> {
        let key = key.into().trim().to_string();
        let source = source.into();
        if key.is_empty() {
            return Err(ClaimsError::Configuration {
                detail: format!("the API key from {source} is empty"),
            });
        }
        Ok(Self { key, source })
    }

    /// Resolve the key from, in order: `secrets_file` (TOML, key
    /// `GOOGLE_API_KEY`), then the [`CREDENTIAL_ENV_VARS`].
    ///
    /// A secrets file that is given but unreadable is an error; a missing or
    /// empty key in it falls through to the environment.
    pub fn resolve(secrets_file: Option<&Path>) -> Result<Self, ClaimsError> {
        Self::resolve_with(secrets_file, |name| std::env::var(name).ok())
    }

    fn resolve_with(
        secrets_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClaimsError> {
        if let Some(path) = secrets_file {
            if let Some(key) = read_secrets_key(path)? {
                debug!("API credential loaded from {}", path.display());
                return Self::with_source(key, path.display().to_string());
            }
        }

        for var in CREDENTIAL_ENV_VARS {
            if let Some(key) = env(var).filter(|k| !k.trim().is_empty()) {
                debug!("API credential loaded from ${}", var);
                return Self::with_source(key, format!("${var}"));
            }
        }

        Err(ClaimsError::Configuration {
            detail: "no API key found".to_string(),
        })
    }

    /// The key itself, for the request header.
    pub fn expose(&self) -> &str {
        &self.key
    }

    /// Where the key came from (`$GOOGLE_API_KEY`, a file path, `explicit`).
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Deserialize)]
struct SecretsFile {
    #[serde(rename = "GOOGLE_API_KEY")]
    google_api_key: Option<String>,
}

fn read_secrets_key(path: &Path) -> Result<Option<String>, ClaimsError> {
    let text = std::fs::read_to_string(path).map_err(|e| ClaimsError::Configuration {
        detail: format!("cannot read secrets file '{}': {e}", path.display()),
    })?;
    let secrets: SecretsFile = toml::from_str(&text).map_err(|e| ClaimsError::Configuration {
        detail: format!("secrets file '{}' is not valid TOML: {e}", path.display()),
    })?;
    Ok(secrets
        .google_api_key
        .filter(|k| !k.trim().is_empty()))
}

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for document decoding and extraction.
///
/// # Example
/// ```rust
/// use edgequake_claims::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for PDF pages. Range: 72–400. Default: 200.
    ///
    /// Claim forms are dense with small print and hand-written entries; 200
    /// DPI keeps them legible for the model.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2400.
    ///
    /// Caps oversized pages; an A4 page at 200 DPI (1654 × 2339 px) fits
    /// unscaled.
    pub max_rendered_pixels: u32,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API base URL, without trailing slash. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// Timeout for the model call in seconds. Default: 120.
    ///
    /// One call carries every page of the document, so this is generous.
    pub api_timeout_secs: u64,

    /// Sampling temperature. Default: 0.0 (transcription, not creativity).
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    pub max_output_tokens: u32,

    /// Memoize records per page sequence for the process lifetime. Default: true.
    pub memoize: bool,

    /// Explicit pdfium shared library path. Falls back to `PDFIUM_LIB_PATH`.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Progress events receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 2400,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_timeout_secs: 120,
            temperature: 0.0,
            max_output_tokens: 8192,
            memoize: true,
            pdfium_lib_path: None,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("memoize", &self.memoize)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn memoize(mut self, v: bool) -> Self {
        self.config.memoize = v;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ClaimsError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ClaimsError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.api_base.starts_with("http://") || c.api_base.starts_with("https://")) {
            return Err(ClaimsError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ClaimsError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(ClaimsError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
