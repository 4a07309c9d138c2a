use async_trait::async_trait;
use mindgate_core::types::{
    ChatMessage, ChatResult, ClassificationResult, EntityResult, OcrResult, SearchResult,
    SentimentResult, SummaryResult, TagResult, TitleResult, TranslationResult,
};
use mindgate_core::{Capability, Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::AiBackend;

/// Find the largest byte index <= `max_bytes` that is a valid char boundary.
fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> usize {
    if max_bytes >= s.len() {
        return s.len();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// AI service backend speaking a plain JSON-over-HTTP protocol:
/// `POST {api_base}/{capability}` with a JSON body, typed JSON response.
pub struct HttpBackend {
    client: Client,
    api_base: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client with timeout, using default");
            Client::new()
        });
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post<T: DeserializeOwned>(&self, capability: Capability, body: Value) -> Result<T> {
        let url = format!("{}/{}", self.api_base, capability.as_str());
        debug!(%capability, %url, "Calling AI backend");

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Backend(format!("{} request failed: {}", capability, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let end = truncate_at_char_boundary(&text, 500);
            return Err(Error::Backend(format!(
                "{} returned {}: {}",
                capability,
                status,
                &text[..end]
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Backend(format!("{} returned malformed JSON: {}", capability, e)))
    }
}

#[async_trait]
impl AiBackend for HttpBackend {
    async fn summarize(&self, text: &str, style: &str) -> Result<SummaryResult> {
        self.post(Capability::Summarize, json!({ "text": text, "style": style })).await
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<TranslationResult> {
        self.post(Capability::Translate, json!({ "text": text, "target_lang": target_lang })).await
    }

    async fn extract_entities(&self, text: &str, min_confidence: f64) -> Result<EntityResult> {
        self.post(
            Capability::ExtractEntities,
            json!({ "text": text, "min_confidence": min_confidence }),
        )
        .await
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult> {
        self.post(Capability::Sentiment, json!({ "text": text })).await
    }

    async fn classify(&self, text: &str, taxonomy: &[String]) -> Result<ClassificationResult> {
        self.post(Capability::Classify, json!({ "text": text, "taxonomy": taxonomy })).await
    }

    async fn ocr(&self, image_base64: &str, languages: &[String]) -> Result<OcrResult> {
        self.post(Capability::Ocr, json!({ "image": image_base64, "languages": languages })).await
    }

    async fn generate_title(&self, text: &str, max_length: u32) -> Result<TitleResult> {
        self.post(Capability::TitleGeneration, json!({ "text": text, "max_length": max_length }))
            .await
    }

    async fn auto_tag(&self, text: &str, max_tags: u32) -> Result<TagResult> {
        self.post(Capability::AutoTag, json!({ "text": text, "max_tags": max_tags })).await
    }

    async fn smart_search(&self, query: &str, max_results: u32) -> Result<SearchResult> {
        self.post(Capability::SmartSearch, json!({ "query": query, "max_results": max_results }))
            .await
    }

    async fn chat(&self, messages: &[ChatMessage], model: Option<&str>) -> Result<ChatResult> {
        let mut body = json!({ "messages": messages });
        if let Some(model) = model {
            body["model"] = json!(model);
        }
        self.post(Capability::Chat, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_at_char_boundary() {
        assert_eq!(truncate_at_char_boundary("hello", 10), 5);
        assert_eq!(truncate_at_char_boundary("hello", 3), 3);
        // 'é' is two bytes; cutting inside it must back off.
        let s = "é";
        assert_eq!(truncate_at_char_boundary(s, 1), 0);
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8950/api/ai/", "", Duration::from_secs(5));
        assert_eq!(backend.api_base, "http://localhost:8950/api/ai");
    }
}
