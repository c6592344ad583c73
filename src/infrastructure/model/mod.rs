//! Model infrastructure module
//!
//! # Structure
//! - `types` - Request, stream event and error types
//! - `traits` - ModelProvider trait
//! - `adapter` - Message format adapters
//! - `decoder` - SSE chunk decoder
//! - `clients` - Client implementations

pub mod adapter;
pub mod clients;
pub mod decoder;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use clients::OpenAIClient;
pub use traits::ModelProvider;
pub use types::{ModelError, ModelEvent, ModelRequest, ModelStream};
