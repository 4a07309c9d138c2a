use mindgate_backend::AiBackend;
use mindgate_core::settings::Settings;
use mindgate_core::types::{
    ChatMessage, ChatResult, ClassificationResult, EntityResult, OcrResult, SearchResult,
    SentimentResult, SummaryResult, TagResult, TitleResult, TranslationResult,
};
use mindgate_core::{Capability, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::{signature, ResultCache};
use crate::registry::{Operation, OperationRegistry, OperationStatus};

/// Maximum characters kept of an input when recording an operation.
const PREVIEW_MAX_CHARS: usize = 120;

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > PREVIEW_MAX_CHARS {
        let cut: String = trimmed.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

/// The operation message recorded when a backend call is rejected. Wrapper
/// variants carry the human-readable message verbatim.
fn failure_message(error: &Error) -> String {
    match error {
        Error::Backend(m) | Error::Timeout(m) | Error::Settings(m) | Error::Other(m) => m.clone(),
        other => other.to_string(),
    }
}

/// Mediates every AI-augmented feature between callers and the backend.
///
/// Owns all orchestration state: the settings gate, the result cache, the
/// operation registry, and the in-flight table. Constructed per application
/// context; callers share it behind an `Arc`. Only this facade mutates
/// registry and cache; callers read status through the derived views.
pub struct Orchestrator {
    settings: RwLock<Settings>,
    settings_path: PathBuf,
    backend: Arc<dyn AiBackend>,
    registry: OperationRegistry,
    cache: ResultCache,
    /// In-flight executions keyed by cache signature. Later identical
    /// callers subscribe and await the leader's broadcast instead of
    /// issuing a duplicate backend call.
    inflight: Mutex<HashMap<String, broadcast::Sender<Option<Value>>>>,
}

impl Orchestrator {
    pub fn new(settings: Settings, settings_path: PathBuf, backend: Arc<dyn AiBackend>) -> Self {
        Self {
            settings: RwLock::new(settings),
            settings_path,
            backend,
            registry: OperationRegistry::new(),
            cache: ResultCache::new(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    // ── Settings gate ───────────────────────────────────────────────────

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub async fn is_enabled(&self, capability: Capability) -> bool {
        self.settings.read().await.is_enabled(capability)
    }

    /// Flip one capability's gate and rewrite the settings file.
    pub async fn set_capability_enabled(
        &self,
        capability: Capability,
        enabled: bool,
    ) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.set_enabled(capability, enabled);
        settings.save(&self.settings_path)
    }

    /// Merge a JSON patch into one capability's settings and persist the
    /// entire settings object immediately.
    pub async fn update_capability(&self, capability: Capability, patch: &Value) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.apply_capability_patch(capability, patch)?;
        settings.save(&self.settings_path)
    }

    // ── Derived views ───────────────────────────────────────────────────

    pub async fn operation(&self, id: &str) -> Option<Operation> {
        self.registry.get(id).await
    }

    pub async fn operations(&self, status_filter: Option<OperationStatus>) -> Vec<Operation> {
        self.registry.list(status_filter).await
    }

    pub async fn active_operations(&self) -> Vec<Operation> {
        self.registry.active_operations().await
    }

    pub async fn is_processing(&self) -> bool {
        self.registry.is_processing().await
    }

    pub async fn has_errors(&self) -> bool {
        self.registry.has_errors().await
    }

    pub async fn operation_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn cached_result_count(&self) -> usize {
        self.cache.len().await
    }

    // ── Generic dispatch ────────────────────────────────────────────────

    /// The uniform algorithm behind every capability method:
    /// gate check → cache read → single-flight join → operation create →
    /// timeout-raced backend call → cache write + operation update.
    ///
    /// Backend failures are absorbed here: each failure updates exactly one
    /// operation and the caller sees `None`, never a panic or an error.
    async fn dispatch<T, F, Fut>(
        &self,
        capability: Capability,
        input_preview: String,
        key: String,
        use_cache: bool,
        call: F,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.is_enabled(capability).await {
            debug!(%capability, "Capability disabled, dispatch skipped");
            return None;
        }

        if use_cache {
            if let Some(value) = self.cache.get(&key).await {
                debug!(%capability, "Cache hit");
                return decode(capability, value);
            }

            // Join an identical in-flight execution instead of duplicating
            // the backend call. A bypassing caller never lands here: it
            // asked for a fresh execution.
            let joined = {
                let mut inflight = self.inflight.lock().await;
                match inflight.get(&key) {
                    Some(tx) => Some(tx.subscribe()),
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        inflight.insert(key.clone(), tx);
                        None
                    }
                }
            };
            if let Some(mut rx) = joined {
                debug!(%capability, "Awaiting in-flight operation with same signature");
                return match rx.recv().await {
                    Ok(Some(value)) => decode(capability, value),
                    _ => None,
                };
            }
        }

        let timeout_secs = self.settings.read().await.backend.request_timeout_secs;
        let id = self.registry.create(capability, &input_preview).await;
        self.registry.begin(&id).await;

        let (broadcast_value, returned) =
            match tokio::time::timeout(Duration::from_secs(timeout_secs), call()).await {
                Ok(Ok(result)) => match serde_json::to_value(&result) {
                    Ok(value) => {
                        // Cache write happens even on bypassed reads so a
                        // later default call finds the entry warm.
                        self.cache.insert(&key, value.clone()).await;
                        self.registry.complete(&id, value.clone()).await;
                        (Some(value), Some(result))
                    }
                    Err(e) => {
                        warn!(%capability, error = %e, "Result not representable as JSON");
                        self.registry.fail(&id, &format!("unserializable result: {}", e)).await;
                        (None, None)
                    }
                },
                Ok(Err(e)) => {
                    warn!(%capability, error = %e, "Backend call failed");
                    self.registry.fail(&id, &failure_message(&e)).await;
                    (None, None)
                }
                Err(_) => {
                    warn!(%capability, timeout_secs, "Backend call timed out");
                    self.registry
                        .fail(&id, &format!("timed out after {}s", timeout_secs))
                        .await;
                    (None, None)
                }
            };

        if use_cache {
            let tx = self.inflight.lock().await.remove(&key);
            if let Some(tx) = tx {
                let _ = tx.send(broadcast_value);
            }
        }
        returned
    }

    // ── Capability methods ──────────────────────────────────────────────

    pub async fn summarize(
        &self,
        text: &str,
        style: Option<&str>,
        use_cache: bool,
    ) -> Option<SummaryResult> {
        let style = match style {
            Some(s) => s.to_string(),
            None => self.settings.read().await.capabilities.summarize.default_style.clone(),
        };
        let key = signature(Capability::Summarize, text, &[("style", style.clone())]);
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(Capability::Summarize, preview(&text), key, use_cache, move || async move {
            backend.summarize(&text, &style).await
        })
        .await
    }

    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        use_cache: bool,
    ) -> Option<TranslationResult> {
        let target = target_lang.to_string();
        let key = signature(Capability::Translate, text, &[("target_lang", target.clone())]);
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(Capability::Translate, preview(&text), key, use_cache, move || async move {
            backend.translate(&text, &target).await
        })
        .await
    }

    pub async fn extract_entities(&self, text: &str, use_cache: bool) -> Option<EntityResult> {
        let min_confidence =
            self.settings.read().await.capabilities.extract_entities.min_confidence;
        let key = signature(
            Capability::ExtractEntities,
            text,
            &[("min_confidence", format!("{}", min_confidence))],
        );
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(
            Capability::ExtractEntities,
            preview(&text),
            key,
            use_cache,
            move || async move { backend.extract_entities(&text, min_confidence).await },
        )
        .await
    }

    pub async fn analyze_sentiment(&self, text: &str, use_cache: bool) -> Option<SentimentResult> {
        let key = signature(Capability::Sentiment, text, &[]);
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(Capability::Sentiment, preview(&text), key, use_cache, move || async move {
            backend.analyze_sentiment(&text).await
        })
        .await
    }

    pub async fn classify(&self, text: &str, use_cache: bool) -> Option<ClassificationResult> {
        let taxonomy = self.settings.read().await.capabilities.classify.taxonomy.clone();
        let key =
            signature(Capability::Classify, text, &[("taxonomy", taxonomy.join(","))]);
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(Capability::Classify, preview(&text), key, use_cache, move || async move {
            backend.classify(&text, &taxonomy).await
        })
        .await
    }

    pub async fn ocr(&self, image_base64: &str, use_cache: bool) -> Option<OcrResult> {
        let languages = self.settings.read().await.capabilities.ocr.languages.clone();
        let key =
            signature(Capability::Ocr, image_base64, &[("languages", languages.join(","))]);
        let input_preview = format!("image ({} bytes base64)", image_base64.len());
        let backend = Arc::clone(&self.backend);
        let image = image_base64.to_string();
        self.dispatch(Capability::Ocr, input_preview, key, use_cache, move || async move {
            backend.ocr(&image, &languages).await
        })
        .await
    }

    pub async fn generate_title(&self, text: &str, use_cache: bool) -> Option<TitleResult> {
        let max_length = self.settings.read().await.capabilities.title_generation.max_length;
        let key = signature(
            Capability::TitleGeneration,
            text,
            &[("max_length", max_length.to_string())],
        );
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(
            Capability::TitleGeneration,
            preview(&text),
            key,
            use_cache,
            move || async move { backend.generate_title(&text, max_length).await },
        )
        .await
    }

    pub async fn auto_tag(&self, text: &str, use_cache: bool) -> Option<TagResult> {
        let max_tags = self.settings.read().await.capabilities.auto_tag.max_tags;
        let key = signature(Capability::AutoTag, text, &[("max_tags", max_tags.to_string())]);
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        self.dispatch(Capability::AutoTag, preview(&text), key, use_cache, move || async move {
            backend.auto_tag(&text, max_tags).await
        })
        .await
    }

    pub async fn smart_search(&self, query: &str, use_cache: bool) -> Option<SearchResult> {
        let max_results = self.settings.read().await.capabilities.smart_search.max_results;
        let key = signature(
            Capability::SmartSearch,
            query,
            &[("max_results", max_results.to_string())],
        );
        let backend = Arc::clone(&self.backend);
        let query = query.to_string();
        self.dispatch(
            Capability::SmartSearch,
            preview(&query),
            key,
            use_cache,
            move || async move { backend.smart_search(&query, max_results).await },
        )
        .await
    }

    /// Chat is gated, tracked, and timeout-protected like every capability,
    /// but the cache read is bypassed: an identical transcript legitimately
    /// expects a fresh reply.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Option<ChatResult> {
        let model = self.settings.read().await.capabilities.chat.model.clone();
        let transcript = serde_json::to_string(messages).unwrap_or_default();
        let key = signature(
            Capability::Chat,
            &transcript,
            &[("model", model.clone().unwrap_or_default())],
        );
        let input_preview = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| preview(&m.content))
            .unwrap_or_else(|| format!("{} messages", messages.len()));
        let backend = Arc::clone(&self.backend);
        let messages = messages.to_vec();
        self.dispatch(Capability::Chat, input_preview, key, false, move || async move {
            backend.chat(&messages, model.as_deref()).await
        })
        .await
    }
}

fn decode<T: DeserializeOwned>(capability: Capability, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(%capability, error = %e, "Stored result no longer decodes, treating as miss");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mindgate_core::types::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scriptable backend: counts calls, optionally sleeps, optionally fails.
    struct MockBackend {
        calls: AtomicUsize,
        delay: Duration,
        fail_with: Option<String>,
        fail_only_first: bool,
    }

    impl MockBackend {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_with: None,
                fail_only_first: false,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self { delay, ..Self::ok() }
        }

        fn failing(message: &str) -> Self {
            Self { fail_with: Some(message.to_string()), ..Self::ok() }
        }

        fn failing_once(message: &str) -> Self {
            Self { fail_with: Some(message.to_string()), fail_only_first: true, ..Self::ok() }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn tick(&self) -> Result<()> {
            let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.fail_with {
                Some(message) if !self.fail_only_first || call_index == 0 => {
                    Err(Error::Backend(message.clone()))
                }
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl AiBackend for MockBackend {
        async fn summarize(&self, _text: &str, style: &str) -> Result<SummaryResult> {
            self.tick().await?;
            Ok(SummaryResult { summary: "X".to_string(), style: style.to_string() })
        }

        async fn translate(&self, _text: &str, target_lang: &str) -> Result<TranslationResult> {
            self.tick().await?;
            Ok(TranslationResult {
                translated_text: "marhaba".to_string(),
                target_lang: target_lang.to_string(),
                detected_lang: None,
            })
        }

        async fn extract_entities(&self, _text: &str, _min: f64) -> Result<EntityResult> {
            self.tick().await?;
            Ok(EntityResult { entities: vec![] })
        }

        async fn analyze_sentiment(&self, _text: &str) -> Result<SentimentResult> {
            self.tick().await?;
            Ok(SentimentResult { label: "neutral".to_string(), score: 0.0 })
        }

        async fn classify(&self, _text: &str, _taxonomy: &[String]) -> Result<ClassificationResult> {
            self.tick().await?;
            Ok(ClassificationResult { category: "news".to_string(), confidence: Some(0.9) })
        }

        async fn ocr(&self, _image: &str, _languages: &[String]) -> Result<OcrResult> {
            self.tick().await?;
            Ok(OcrResult { text: "scanned".to_string(), confidence: None })
        }

        async fn generate_title(&self, _text: &str, _max: u32) -> Result<TitleResult> {
            self.tick().await?;
            Ok(TitleResult { title: "A Title".to_string(), alternatives: vec![] })
        }

        async fn auto_tag(&self, _text: &str, _max: u32) -> Result<TagResult> {
            self.tick().await?;
            Ok(TagResult { tags: vec!["ai".to_string()] })
        }

        async fn smart_search(&self, _query: &str, _max: u32) -> Result<SearchResult> {
            self.tick().await?;
            Ok(SearchResult { hits: vec![] })
        }

        async fn chat(&self, _messages: &[ChatMessage], _model: Option<&str>) -> Result<ChatResult> {
            self.tick().await?;
            Ok(ChatResult { reply: "hello there".to_string() })
        }
    }

    fn orchestrator(backend: Arc<MockBackend>) -> (Orchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        (Orchestrator::new(Settings::default(), settings_path, backend), dir)
    }

    #[tokio::test]
    async fn test_disabled_capability_is_inert() {
        let backend = Arc::new(MockBackend::ok());
        let (orch, _dir) = orchestrator(Arc::clone(&backend));
        orch.set_capability_enabled(Capability::Translate, false).await.unwrap();

        let result = orch.translate("hello", "ar", true).await;
        assert!(result.is_none());
        assert_eq!(backend.calls(), 0);
        assert_eq!(orch.operation_count().await, 0);
    }

    #[tokio::test]
    async fn test_repeat_call_served_from_cache() {
        let backend = Arc::new(MockBackend::ok());
        let (orch, _dir) = orchestrator(Arc::clone(&backend));

        let first = orch.summarize("hello", Some("brief"), true).await.unwrap();
        assert_eq!(first.summary, "X");
        assert_eq!(backend.calls(), 1);
        assert_eq!(orch.operation_count().await, 1);

        let second = orch.summarize("hello", Some("brief"), true).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(backend.calls(), 1);
        // A cache hit creates no operation.
        assert_eq!(orch.operation_count().await, 1);
    }

    #[tokio::test]
    async fn test_different_params_miss_the_cache() {
        let backend = Arc::new(MockBackend::ok());
        let (orch, _dir) = orchestrator(Arc::clone(&backend));

        orch.summarize("hello", Some("brief"), true).await.unwrap();
        orch.summarize("hello", Some("detailed"), true).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_bypass_rereads_backend_but_keeps_cache_warm() {
        let backend = Arc::new(MockBackend::ok());
        let (orch, _dir) = orchestrator(Arc::clone(&backend));

        orch.summarize("hello", Some("brief"), false).await.unwrap();
        orch.summarize("hello", Some("brief"), false).await.unwrap();
        assert_eq!(backend.calls(), 2);
        assert_eq!(orch.cached_result_count().await, 1);

        // The bypassed writes left the cache warm for a default call.
        orch.summarize("hello", Some("brief"), true).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_is_absorbed() {
        let backend = Arc::new(MockBackend::failing("boom"));
        let (orch, _dir) = orchestrator(Arc::clone(&backend));

        let result = orch.classify("text", true).await;
        assert!(result.is_none());
        assert!(orch.has_errors().await);

        let errored = orch.operations(Some(OperationStatus::Error)).await;
        assert_eq!(errored.len(), 1);
        assert_eq!(errored[0].error.as_deref(), Some("boom"));
        assert_eq!(errored[0].capability, Capability::Classify);
        // Nothing was cached.
        assert_eq!(orch.cached_result_count().await, 0);
    }

    #[tokio::test]
    async fn test_errors_persist_across_later_successes() {
        let backend = Arc::new(MockBackend::failing_once("boom"));
        let (orch, _dir) = orchestrator(Arc::clone(&backend));

        assert!(orch.classify("text", true).await.is_none());
        assert!(orch.has_errors().await);

        // A later successful operation does not erase the error record.
        assert!(orch.classify("text", true).await.is_some());
        assert!(orch.has_errors().await);
        assert!(!orch.is_processing().await);
        assert_eq!(orch.operation_count().await, 2);
    }

    #[tokio::test]
    async fn test_single_flight_deduplicates_concurrent_calls() {
        let backend = Arc::new(MockBackend::slow(Duration::from_millis(50)));
        let (orch, _dir) = orchestrator(Arc::clone(&backend));
        let orch = Arc::new(orch);

        let a = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.summarize("hello", Some("brief"), true).await })
        };
        let b = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.summarize("hello", Some("brief"), true).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a, b);
        assert!(a.is_some());
        assert_eq!(backend.calls(), 1);
        // Only the leader created an operation.
        assert_eq!(orch.operation_count().await, 1);
    }

    #[tokio::test]
    async fn test_bypass_does_not_join_in_flight() {
        let backend = Arc::new(MockBackend::slow(Duration::from_millis(50)));
        let (orch, _dir) = orchestrator(Arc::clone(&backend));
        let orch = Arc::new(orch);

        let cached = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.summarize("hello", Some("brief"), true).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = orch.summarize("hello", Some("brief"), false).await;

        assert!(cached.await.unwrap().is_some());
        assert!(fresh.is_some());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_is_processing_tracks_in_flight_work() {
        let backend = Arc::new(MockBackend::slow(Duration::from_millis(50)));
        let (orch, _dir) = orchestrator(Arc::clone(&backend));
        let orch = Arc::new(orch);

        let handle = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.analyze_sentiment("hello", true).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(orch.is_processing().await);
        assert_eq!(orch.active_operations().await.len(), 1);

        handle.await.unwrap().unwrap();
        assert!(!orch.is_processing().await);
        assert!(orch.active_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_fails_the_operation() {
        let backend = Arc::new(MockBackend::slow(Duration::from_millis(100)));
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.backend.request_timeout_secs = 0;
        let orch =
            Orchestrator::new(settings, dir.path().join("settings.json"), Arc::clone(&backend) as Arc<dyn AiBackend>);

        let result = orch.generate_title("some long draft", true).await;
        assert!(result.is_none());

        let errored = orch.operations(Some(OperationStatus::Error)).await;
        assert_eq!(errored.len(), 1);
        assert!(errored[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_chat_is_tracked_but_never_cached() {
        let backend = Arc::new(MockBackend::ok());
        let (orch, _dir) = orchestrator(Arc::clone(&backend));

        let messages = vec![ChatMessage::user("hi")];
        let first = orch.chat(&messages).await.unwrap();
        let second = orch.chat(&messages).await.unwrap();
        assert_eq!(first.reply, "hello there");
        assert_eq!(second.reply, "hello there");
        assert_eq!(backend.calls(), 2);
        assert_eq!(orch.operation_count().await, 2);
    }

    #[tokio::test]
    async fn test_settings_updates_persist_to_disk() {
        let backend = Arc::new(MockBackend::ok());
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let orch = Orchestrator::new(Settings::default(), settings_path.clone(), backend);

        orch.update_capability(
            Capability::AutoTag,
            &serde_json::json!({ "enabled": false, "max_tags": 8 }),
        )
        .await
        .unwrap();

        let paths = mindgate_core::Paths::with_base(dir.path().to_path_buf());
        let reloaded = Settings::load_or_default(&paths);
        assert!(!reloaded.is_enabled(Capability::AutoTag));
        assert_eq!(reloaded.capabilities.auto_tag.max_tags, 8);
    }
}
