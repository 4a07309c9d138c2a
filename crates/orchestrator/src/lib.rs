pub mod cache;
pub mod dispatch;
pub mod registry;

pub use cache::{signature, ResultCache};
pub use dispatch::Orchestrator;
pub use registry::{Operation, OperationRegistry, OperationStatus};
