use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GenerationError;

/// A remote text-generation API.
///
/// One call, no retries: wrapping with backoff is the caller's job.
#[async_trait]
pub trait TextGenerator: Send + Sync + 'static {
    /// Generate text for `prompt`.
    ///
    /// `Ok(None)` means the remote answered successfully but produced no text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError>;
}

#[async_trait]
impl<G> TextGenerator for Arc<G>
where
    G: TextGenerator + ?Sized,
{
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        (**self).generate(prompt).await
    }
}
