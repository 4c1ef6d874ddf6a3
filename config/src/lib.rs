// Pkgwatch Configuration System
// Layered configuration management

pub mod layered;
pub mod loader;
pub mod types;

pub use layered::LayeredConfig;
pub use loader::{ConfigLoader, parse_override};
pub use types::*;
