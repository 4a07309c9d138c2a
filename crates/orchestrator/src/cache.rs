use mindgate_core::Capability;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Compute the deterministic cache signature for one capability call.
///
/// The signature covers the capability id, the trimmed primary input, and
/// every relevant parameter as sorted `key=value` pairs. Identical calls
/// always produce the same signature; any parameter difference (a different
/// target language, a different summary style) produces a different one.
pub fn signature(capability: Capability, input: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    hasher.update(capability.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(input.trim().as_bytes());
    for (key, value) in sorted {
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([b'=']);
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Content-addressed map from cache signature to the most recent successful
/// result. Unconditionally overwritten on every fresh success; lives for the
/// process lifetime with no eviction (acceptable at expected volumes).
#[derive(Clone, Default)]
pub struct ResultCache {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().await;
        entries.get(key).cloned()
    }

    pub async fn insert(&self, key: &str, result: Value) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), result);
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.len()
    }
}
