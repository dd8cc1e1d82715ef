use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::fmt;
use crate::types::{ChatMessage, Completion};
use crate::Result;

/// Incremental text chunks of a streamed completion.
pub type TextStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait ChatProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run a chat completion and return the full response text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Like `complete`, keeping any citations the vendor returns
    async fn complete_cited(&self, messages: &[ChatMessage]) -> Result<Completion> {
        Ok(self.complete(messages).await?.into())
    }

    /// Run a chat completion and return the response as it arrives
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TextStream>;
}
