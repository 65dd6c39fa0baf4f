pub mod config;
pub mod contexts;
pub mod error;
pub mod factories;
pub mod internals;
pub mod resources;
pub mod vk;

pub use config::{FactoryConfig, HeapConfig};
pub use contexts::resource_ctx::RenderResourceContext;
pub use error::{ResourceError, Result};
pub use resources::ResourceKind;
