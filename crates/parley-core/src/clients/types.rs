//! Provider-agnostic chat client contract

use anyhow::Result;
use async_trait::async_trait;

/// Trait every chat-completion backend implements.
///
/// One call, one completion. The core assumes no retry contract; a failure
/// here surfaces to the orchestration pass that issued the call.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model identifier (e.g. "gpt-4o-mini"), for logging
    fn model(&self) -> &str;

    /// Send one system + user prompt pair and return the reply text
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String>;
}
