//! Model traits

use super::types::{ModelError, ModelRequest, ModelStream};
use async_trait::async_trait;

/// Capability of holding a streamed conversation round-trip with a model.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the transcript and tool catalog, returning the response as a stream.
    async fn converse(&self, request: ModelRequest) -> Result<ModelStream, ModelError>;
}
