//! Document-to-record extraction entry points.
//!
//! An [`Extractor`] owns the model client, the configuration and the
//! memoization cache. It is cheap to share behind an `Arc` and lives as long
//! as the session, so repeated uploads of the same document are answered
//! from the cache.
//!
//! Processing is all-or-nothing: [`Extractor::process`] returns either a
//! complete record or the first error, unchanged.

use crate::cache::{CacheKey, ExtractionCache};
use crate::config::{ApiCredential, ExtractionConfig};
use crate::error::ClaimsError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::document::UploadedDocument;
use crate::pipeline::encode;
use crate::pipeline::llm::{GeminiModel, ModelReply, VisionModel, VisionRequest};
use crate::pipeline::postprocess;
use crate::pipeline::render::{self, PageImage};
use crate::progress::ProgressCallback;
use crate::prompts::extraction_prompt;
use crate::record::ExtractedRecord;
use crate::schema::SCHEMA_VERSION;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of [`Extractor::extract`] with bookkeeping the caller may want.
struct Extraction {
    record: Arc<ExtractedRecord>,
    from_cache: bool,
    usage: ModelReply,
    model_duration_ms: u64,
}

/// Drives decode → model call → parse for uploaded documents.
pub struct Extractor {
    model: Arc<dyn VisionModel>,
    config: ExtractionConfig,
    cache: ExtractionCache,
}

impl Extractor {
    /// Use any [`VisionModel`] implementation.
    pub fn new(model: Arc<dyn VisionModel>, config: ExtractionConfig) -> Self {
        Self {
            model,
            config,
            cache: ExtractionCache::new(),
        }
    }

    /// Build an extractor backed by Gemini.
    pub fn gemini(credential: ApiCredential, config: ExtractionConfig) -> Result<Self, ClaimsError> {
        let model = GeminiModel::new(credential, &config)?;
        Ok(Self::new(Arc::new(model), config))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Number of memoized records.
    pub async fn cached_records(&self) -> usize {
        self.cache.len().await
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.config.progress_callback.as_ref()
    }

    /// Decode an uploaded document into ordered page images.
    ///
    /// Decode errors name the uploaded file.
    pub async fn decode(&self, document: &UploadedDocument) -> Result<Vec<PageImage>, ClaimsError> {
        render::decode(document.bytes(), document.mime_type(), &self.config)
            .await
            .map_err(|e| e.with_file(document.name()))
    }

    /// Extract a record from ordered page images with one model call.
    ///
    /// A cached record is returned without calling the model. Only records
    /// that parsed successfully are cached.
    pub async fn extract(&self, pages: &[PageImage]) -> Result<Arc<ExtractedRecord>, ClaimsError> {
        Ok(self.extract_pages(pages).await?.record)
    }

    async fn extract_pages(&self, pages: &[PageImage]) -> Result<Extraction, ClaimsError> {
        if pages.is_empty() {
            return Err(ClaimsError::Internal("no pages to extract".into()));
        }

        let images = encode::encode_pages(pages)?;
        let key = CacheKey::new(SCHEMA_VERSION, &images);

        if self.config.memoize {
            if let Some(record) = self.cache.get(&key).await {
                info!("Cache hit {}", key);
                if let Some(cb) = self.progress() {
                    cb.on_cache_hit();
                }
                return Ok(Extraction {
                    record,
                    from_cache: true,
                    usage: ModelReply::default(),
                    model_duration_ms: 0,
                });
            }
        }

        let request = VisionRequest {
            prompt: extraction_prompt().to_string(),
            images,
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };

        if let Some(cb) = self.progress() {
            cb.on_model_request(self.model.name(), request.images.len());
        }
        info!(
            "Sending {} page(s) to {}",
            request.images.len(),
            self.model.name()
        );

        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.api_timeout_secs);
        let reply = tokio::time::timeout(timeout, self.model.generate(&request))
            .await
            .map_err(|_| ClaimsError::ExternalService {
                service: self.model.name().to_string(),
                status: None,
                message: format!("no reply within {}s", self.config.api_timeout_secs),
            })??;
        let model_duration_ms = start.elapsed().as_millis() as u64;
        debug!("Model replied in {}ms", model_duration_ms);

        let record = postprocess::parse_reply(&reply.text)?;

        let record = if self.config.memoize {
            self.cache.insert(key, record).await
        } else {
            Arc::new(record)
        };

        Ok(Extraction {
            record,
            from_cache: false,
            usage: reply,
            model_duration_ms,
        })
    }

    /// Decode and extract one uploaded document.
    pub async fn process(&self, document: &UploadedDocument) -> Result<ExtractionOutput, ClaimsError> {
        let result = self.process_inner(document).await;
        if let Err(ref e) = result {
            warn!("{}: {}", document.name(), e);
            if let Some(cb) = self.progress() {
                cb.on_error(e.kind(), &e.to_string());
            }
        }
        result
    }

    async fn process_inner(&self, document: &UploadedDocument) -> Result<ExtractionOutput, ClaimsError> {
        let total_start = Instant::now();
        info!("Processing {}", document.summary());
        if let Some(cb) = self.progress() {
            cb.on_document_start(document.name(), document.mime_type());
        }

        let decode_start = Instant::now();
        let pages = self.decode(document).await?;
        let decode_duration_ms = decode_start.elapsed().as_millis() as u64;
        if let Some(cb) = self.progress() {
            cb.on_pages_decoded(pages.len());
        }

        let extraction = self.extract_pages(&pages).await?;

        let stats = ExtractionStats {
            input_tokens: extraction.usage.prompt_tokens as u64,
            output_tokens: extraction.usage.output_tokens as u64,
            decode_duration_ms,
            model_duration_ms: extraction.model_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Extracted {} fields from {} page(s) in {}ms{}",
            extraction.record.len(),
            pages.len(),
            stats.total_duration_ms,
            if extraction.from_cache { " (cached)" } else { "" }
        );
        if let Some(cb) = self.progress() {
            cb.on_extraction_complete(extraction.record.len());
        }

        Ok(ExtractionOutput {
            document: document.name().to_string(),
            record: extraction.record,
            page_count: pages.len(),
            from_cache: extraction.from_cache,
            stats,
        })
    }
}
