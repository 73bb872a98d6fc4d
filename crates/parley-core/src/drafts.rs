//! Per-agent draft generation

use anyhow::{Context, Result};
use tracing::debug;

use crate::clients::{AgentId, ClientPool};

/// Fan a question out to the given agents, one model call each.
///
/// Calls run concurrently as spawned tasks; results are joined in the order
/// the agents were given, which is the persistence order for team mode. Any
/// single failure fails the whole batch so no draft is silently dropped.
pub async fn generate_drafts(
    pool: &ClientPool,
    agents: &[AgentId],
    asker_name: &str,
    prompt: &str,
    context: &str,
    temperature: f32,
) -> Result<Vec<(AgentId, String)>> {
    let user_prompt = format!("{} asks: {}", asker_name, prompt);

    let mut handles = Vec::with_capacity(agents.len());
    for agent in agents {
        let client = pool.client_for(agent);
        let system_prompt = format!(
            "{}\n\nYou are {}. Provide your perspective for the team.",
            context,
            agent.display_name()
        );
        let user_prompt = user_prompt.clone();
        handles.push((
            agent.clone(),
            tokio::spawn(async move {
                client
                    .complete(&system_prompt, &user_prompt, temperature)
                    .await
            }),
        ));
    }

    let mut drafts = Vec::with_capacity(handles.len());
    for (agent, handle) in handles {
        let text = handle
            .await
            .context("Draft task panicked")?
            .with_context(|| format!("Draft generation failed for agent {}", agent))?;
        let text = text.trim().to_string();
        debug!("Draft from {} ({} chars)", agent, text.len());
        drafts.push((agent, text));
    }

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ChatClient;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct EchoClient {
        name: String,
        delay_ms: u64,
    }

    #[async_trait]
    impl ChatClient for EchoClient {
        fn model(&self) -> &str {
            &self.name
        }
        async fn complete(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _temperature: f32,
        ) -> Result<String> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(format!("{} heard: {}", self.name, user_prompt))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        fn model(&self) -> &str {
            "failing"
        }
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _temperature: f32,
        ) -> Result<String> {
            Err(anyhow!("provider is down"))
        }
    }

    fn pool_with(entries: Vec<(&str, Arc<dyn ChatClient>)>) -> ClientPool {
        let mut entries = entries.into_iter();
        let (first_name, first_client) = entries.next().unwrap();
        let mut pool = ClientPool::new(AgentId::new(first_name).unwrap(), first_client);
        for (name, client) in entries {
            pool.insert(AgentId::new(name).unwrap(), client);
        }
        pool
    }

    #[tokio::test]
    async fn test_drafts_come_back_in_roster_order() {
        // The slower agent is listed first; order must still hold
        let pool = pool_with(vec![
            (
                "sean",
                Arc::new(EchoClient {
                    name: "sean".to_string(),
                    delay_ms: 30,
                }) as Arc<dyn ChatClient>,
            ),
            (
                "yug",
                Arc::new(EchoClient {
                    name: "yug".to_string(),
                    delay_ms: 0,
                }) as Arc<dyn ChatClient>,
            ),
        ]);
        let agents = vec![AgentId::new("sean").unwrap(), AgentId::new("yug").unwrap()];

        let drafts = generate_drafts(&pool, &agents, "Alice", "status?", "ctx", 0.7)
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].0.as_str(), "sean");
        assert_eq!(drafts[1].0.as_str(), "yug");
        assert_eq!(drafts[0].1, "sean heard: Alice asks: status?");
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_batch() {
        let pool = pool_with(vec![
            (
                "sean",
                Arc::new(EchoClient {
                    name: "sean".to_string(),
                    delay_ms: 0,
                }) as Arc<dyn ChatClient>,
            ),
            ("yug", Arc::new(FailingClient) as Arc<dyn ChatClient>),
        ]);
        let agents = vec![AgentId::new("sean").unwrap(), AgentId::new("yug").unwrap()];

        let result = generate_drafts(&pool, &agents, "Alice", "status?", "ctx", 0.7).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("yug"));
    }

    #[tokio::test]
    async fn test_single_agent_slice() {
        let pool = pool_with(vec![(
            "sean",
            Arc::new(EchoClient {
                name: "sean".to_string(),
                delay_ms: 0,
            }) as Arc<dyn ChatClient>,
        )]);
        let agent = AgentId::new("sean").unwrap();

        let drafts = generate_drafts(
            &pool,
            std::slice::from_ref(&agent),
            "Alice",
            "hello",
            "ctx",
            0.7,
        )
        .await
        .unwrap();
        assert_eq!(drafts.len(), 1);
    }
}
