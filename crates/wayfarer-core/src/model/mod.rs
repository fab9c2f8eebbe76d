//! Generative model seam.

mod gemini;

pub use gemini::GeminiModel;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Text returned by a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
}

/// Single-shot text completion.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Completion>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<M: GenerativeModel + ?Sized> GenerativeModel for Arc<M> {
    async fn generate(&self, prompt: &str) -> Result<Completion> {
        (**self).generate(prompt).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
