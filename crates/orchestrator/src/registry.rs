use chrono::{DateTime, Utc};
use mindgate_core::Capability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Lifecycle state of one tracked capability invocation.
/// `Success` and `Error` are terminal; no further transition is possible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Success | OperationStatus::Error)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::Processing)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "pending"),
            OperationStatus::Processing => write!(f, "processing"),
            OperationStatus::Success => write!(f, "success"),
            OperationStatus::Error => write!(f, "error"),
        }
    }
}

/// One tracked invocation of a capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub capability: Capability,
    pub status: OperationStatus,
    /// Short human-readable descriptor of the primary input.
    pub input_preview: String,
    /// Successful result, stored as raw JSON.
    pub result: Option<Value>,
    /// Failure message if the backend rejected or timed out.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// In-memory registry of in-flight and completed operations. Append-only
/// within a session; records are never removed.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: Arc<Mutex<HashMap<String, Operation>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new operation in `pending` state and return its id.
    pub async fn create(&self, capability: Capability, input_preview: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let operation = Operation {
            id: id.clone(),
            capability,
            status: OperationStatus::Pending,
            input_preview: input_preview.to_string(),
            result: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        let mut operations = self.operations.lock().await;
        operations.insert(id.clone(), operation);
        id
    }

    /// Advance a pending operation to `processing`.
    pub async fn begin(&self, id: &str) {
        let mut operations = self.operations.lock().await;
        if let Some(op) = operations.get_mut(id) {
            if op.status.is_terminal() {
                warn!(%id, status = %op.status, "Ignoring begin on terminal operation");
                return;
            }
            op.status = OperationStatus::Processing;
        }
    }

    /// Transition to terminal `success`, storing the result.
    pub async fn complete(&self, id: &str, result: Value) {
        let mut operations = self.operations.lock().await;
        if let Some(op) = operations.get_mut(id) {
            if op.status.is_terminal() {
                warn!(%id, status = %op.status, "Ignoring complete on terminal operation");
                return;
            }
            op.status = OperationStatus::Success;
            op.result = Some(result);
            op.completed_at = Some(Utc::now());
        }
    }

    /// Transition to terminal `error`, storing the failure message.
    pub async fn fail(&self, id: &str, message: &str) {
        let mut operations = self.operations.lock().await;
        if let Some(op) = operations.get_mut(id) {
            if op.status.is_terminal() {
                warn!(%id, status = %op.status, "Ignoring fail on terminal operation");
                return;
            }
            op.status = OperationStatus::Error;
            op.error = Some(message.to_string());
            op.completed_at = Some(Utc::now());
        }
    }

    pub async fn get(&self, id: &str) -> Option<Operation> {
        let operations = self.operations.lock().await;
        operations.get(id).cloned()
    }

    /// All operations, newest first, optionally filtered by status.
    pub async fn list(&self, status_filter: Option<OperationStatus>) -> Vec<Operation> {
        let operations = self.operations.lock().await;
        let mut result: Vec<Operation> = operations
            .values()
            .filter(|op| status_filter.map_or(true, |s| op.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result
    }

    /// Operations still `pending` or `processing`, newest first.
    pub async fn active_operations(&self) -> Vec<Operation> {
        let operations = self.operations.lock().await;
        let mut result: Vec<Operation> =
            operations.values().filter(|op| op.status.is_active()).cloned().collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result
    }

    pub async fn is_processing(&self) -> bool {
        let operations = self.operations.lock().await;
        operations.values().any(|op| op.status.is_active())
    }

    pub async fn has_errors(&self) -> bool {
        let operations = self.operations.lock().await;
        operations.values().any(|op| op.status == OperationStatus::Error)
    }

    pub async fn len(&self) -> usize {
        let operations = self.operations.lock().await;
        operations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_lifecycle_to_success() {
        let registry = OperationRegistry::new();
        let id = registry.create(Capability::Summarize, "hello").await;

        let op = registry.get(&id).await.unwrap();
        assert_eq!(op.status, OperationStatus::Pending);
        assert!(op.completed_at.is_none());

        registry.begin(&id).await;
        assert!(registry.is_processing().await);

        registry.complete(&id, json!({"summary": "X"})).await;
        let op = registry.get(&id).await.unwrap();
        assert_eq!(op.status, OperationStatus::Success);
        assert_eq!(op.result, Some(json!({"summary": "X"})));
        assert!(op.completed_at.is_some());
        assert!(!registry.is_processing().await);
    }

    #[tokio::test]
    async fn test_lifecycle_to_error() {
        let registry = OperationRegistry::new();
        let id = registry.create(Capability::Classify, "text").await;
        registry.begin(&id).await;
        registry.fail(&id, "boom").await;

        let op = registry.get(&id).await.unwrap();
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.error.as_deref(), Some("boom"));
        assert!(registry.has_errors().await);
    }

    #[tokio::test]
    async fn test_terminal_states_are_frozen() {
        let registry = OperationRegistry::new();
        let id = registry.create(Capability::Translate, "hello").await;
        registry.begin(&id).await;
        registry.complete(&id, json!({"translated_text": "bonjour"})).await;

        registry.fail(&id, "too late").await;
        registry.begin(&id).await;
        registry.complete(&id, json!({"translated_text": "hola"})).await;

        let op = registry.get(&id).await.unwrap();
        assert_eq!(op.status, OperationStatus::Success);
        assert_eq!(op.result, Some(json!({"translated_text": "bonjour"})));
        assert!(op.error.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = OperationRegistry::new();
        let a = registry.create(Capability::Ocr, "img").await;
        let b = registry.create(Capability::Ocr, "img").await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_derived_views() {
        let registry = OperationRegistry::new();
        assert!(!registry.is_processing().await);
        assert!(!registry.has_errors().await);

        let a = registry.create(Capability::Summarize, "one").await;
        let b = registry.create(Capability::Sentiment, "two").await;
        registry.begin(&a).await;
        assert_eq!(registry.active_operations().await.len(), 2);

        registry.complete(&a, json!({})).await;
        registry.fail(&b, "nope").await;
        assert!(registry.active_operations().await.is_empty());
        assert!(!registry.is_processing().await);
        assert!(registry.has_errors().await);

        assert_eq!(registry.list(Some(OperationStatus::Success)).await.len(), 1);
        assert_eq!(registry.list(Some(OperationStatus::Error)).await.len(), 1);
        assert_eq!(registry.list(None).await.len(), 2);
    }
}
