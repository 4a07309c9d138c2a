pub mod http;

use async_trait::async_trait;
use mindgate_core::types::{
    ChatMessage, ChatResult, ClassificationResult, EntityResult, OcrResult, SearchResult,
    SentimentResult, SummaryResult, TagResult, TitleResult, TranslationResult,
};
use mindgate_core::Result;

/// The backend capability seam. One async function per capability; each
/// rejects with a human-readable message on failure. Implementations are
/// opaque to the orchestration layer.
#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn summarize(&self, text: &str, style: &str) -> Result<SummaryResult>;

    async fn translate(&self, text: &str, target_lang: &str) -> Result<TranslationResult>;

    async fn extract_entities(&self, text: &str, min_confidence: f64) -> Result<EntityResult>;

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult>;

    async fn classify(&self, text: &str, taxonomy: &[String]) -> Result<ClassificationResult>;

    async fn ocr(&self, image_base64: &str, languages: &[String]) -> Result<OcrResult>;

    async fn generate_title(&self, text: &str, max_length: u32) -> Result<TitleResult>;

    async fn auto_tag(&self, text: &str, max_tags: u32) -> Result<TagResult>;

    async fn smart_search(&self, query: &str, max_results: u32) -> Result<SearchResult>;

    async fn chat(&self, messages: &[ChatMessage], model: Option<&str>) -> Result<ChatResult>;
}

pub use http::HttpBackend;
