use base64::Engine;
use mindgate_backend::HttpBackend;
use mindgate_core::types::ChatMessage;
use mindgate_core::{Capability, Paths, Settings};
use mindgate_orchestrator::{Orchestrator, OperationStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

fn build_orchestrator() -> Orchestrator {
    let paths = Paths::new();
    let settings = Settings::load_or_default(&paths);
    let backend = Arc::new(HttpBackend::new(
        &settings.backend.api_base,
        &settings.backend.api_key,
        Duration::from_secs(settings.backend.request_timeout_secs),
    ));
    Orchestrator::new(settings, paths.settings_file(), backend)
}

/// Print the result, or turn an absorbed failure back into a CLI error by
/// reading the registry's error record.
async fn finish<T: Serialize>(
    orch: &Orchestrator,
    capability: Capability,
    result: Option<T>,
) -> anyhow::Result<()> {
    match result {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        None => {
            if !orch.is_enabled(capability).await {
                anyhow::bail!(
                    "{} is disabled — enable it with `mindgate config enable {}`",
                    capability,
                    capability
                );
            }
            let message = orch
                .operations(Some(OperationStatus::Error))
                .await
                .into_iter()
                .find(|op| op.capability == capability)
                .and_then(|op| op.error)
                .unwrap_or_else(|| "no result".to_string());
            anyhow::bail!("{} failed: {}", capability, message)
        }
    }
}

pub async fn summarize(text: &str, style: Option<&str>, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.summarize(text, style, use_cache).await;
    finish(&orch, Capability::Summarize, result).await
}

pub async fn translate(text: &str, to: Option<&str>, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let target = match to {
        Some(lang) => lang.to_string(),
        None => orch.settings().await.capabilities.translate.default_target_lang,
    };
    let result = orch.translate(text, &target, use_cache).await;
    finish(&orch, Capability::Translate, result).await
}

pub async fn entities(text: &str, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.extract_entities(text, use_cache).await;
    finish(&orch, Capability::ExtractEntities, result).await
}

pub async fn sentiment(text: &str, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.analyze_sentiment(text, use_cache).await;
    finish(&orch, Capability::Sentiment, result).await
}

pub async fn classify(text: &str, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.classify(text, use_cache).await;
    finish(&orch, Capability::Classify, result).await
}

pub async fn ocr(image_path: &str, use_cache: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(image_path)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

    let orch = build_orchestrator();
    let result = orch.ocr(&encoded, use_cache).await;
    finish(&orch, Capability::Ocr, result).await
}

pub async fn title(text: &str, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.generate_title(text, use_cache).await;
    finish(&orch, Capability::TitleGeneration, result).await
}

pub async fn tags(text: &str, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.auto_tag(text, use_cache).await;
    finish(&orch, Capability::AutoTag, result).await
}

pub async fn search(query: &str, use_cache: bool) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let result = orch.smart_search(query, use_cache).await;
    finish(&orch, Capability::SmartSearch, result).await
}

pub async fn chat(message: &str) -> anyhow::Result<()> {
    let orch = build_orchestrator();
    let messages = vec![ChatMessage::user(message)];
    let result = orch.chat(&messages).await;
    match result {
        Some(result) => {
            println!("{}", result.reply);
            Ok(())
        }
        None => finish::<()>(&orch, Capability::Chat, None).await,
    }
}
