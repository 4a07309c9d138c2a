pub mod capability;
pub mod error;
pub mod paths;
pub mod settings;
pub mod types;

pub use capability::{Capability, CapabilityDescriptor};
pub use error::{Error, Result};
pub use paths::Paths;
pub use settings::Settings;
