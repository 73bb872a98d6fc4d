//! Agent identity, team roster, and the agent-to-client mapping

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::types::ChatClient;

/// Well-known agent id backing the team synthesis pass
pub const COORDINATOR: &str = "coordinator";

/// Normalized agent identifier: trimmed, lowercased, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(name: &str) -> Result<Self> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            bail!("agent name is empty");
        }
        Ok(Self(normalized))
    }

    pub fn coordinator() -> Self {
        Self(COORDINATOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name as shown in transcripts ("sean" -> "Sean")
    pub fn display_name(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AgentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AgentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Ordered team member list. Insertion order is the draft generation and
/// persistence order for team mode; duplicates keep their first position.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<AgentId>,
}

impl Roster {
    pub fn new(members: Vec<AgentId>) -> Result<Self> {
        let mut unique = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        if unique.is_empty() {
            bail!("roster has no members");
        }
        Ok(Self { members: unique })
    }

    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.members.contains(id)
    }
}

/// Total mapping from agent id to chat client.
///
/// The fallback policy lives here and nowhere else: an id without a dedicated
/// client resolves to the default agent's client.
pub struct ClientPool {
    clients: HashMap<AgentId, Arc<dyn ChatClient>>,
    default_agent: AgentId,
}

impl ClientPool {
    pub fn new(default_agent: AgentId, default_client: Arc<dyn ChatClient>) -> Self {
        let mut clients = HashMap::new();
        clients.insert(default_agent.clone(), default_client);
        Self {
            clients,
            default_agent,
        }
    }

    pub fn insert(&mut self, id: AgentId, client: Arc<dyn ChatClient>) {
        self.clients.insert(id, client);
    }

    pub fn default_agent(&self) -> &AgentId {
        &self.default_agent
    }

    /// Whether this id has a client of its own (no fallback involved)
    pub fn contains(&self, id: &AgentId) -> bool {
        self.clients.contains_key(id)
    }

    /// Resolve an agent to its client; unknown ids get the default agent's
    pub fn client_for(&self, id: &AgentId) -> Arc<dyn ChatClient> {
        match self.clients.get(id) {
            Some(client) => Arc::clone(client),
            None => {
                debug!("No client for agent {}, using default {}", id, self.default_agent);
                Arc::clone(&self.clients[&self.default_agent])
            }
        }
    }
}

impl fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool")
            .field("agents", &self.clients.keys().collect::<Vec<_>>())
            .field("default_agent", &self.default_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NamedClient {
        name: String,
    }

    #[async_trait]
    impl ChatClient for NamedClient {
        fn model(&self) -> &str {
            &self.name
        }
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _temperature: f32,
        ) -> Result<String> {
            Ok(format!("from {}", self.name))
        }
    }

    fn client(name: &str) -> Arc<dyn ChatClient> {
        Arc::new(NamedClient {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_agent_id_normalizes() {
        let id = AgentId::new("  Sean ").unwrap();
        assert_eq!(id.as_str(), "sean");
        assert_eq!(id.display_name(), "Sean");
        assert!(AgentId::new("   ").is_err());
    }

    #[test]
    fn test_agent_id_serde_as_string() {
        let id = AgentId::new("Yug").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"yug\"");
        let back: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_roster_keeps_order_and_dedups() {
        let roster = Roster::new(vec![
            AgentId::new("sean").unwrap(),
            AgentId::new("yug").unwrap(),
            AgentId::new("sean").unwrap(),
            AgentId::new("maya").unwrap(),
        ])
        .unwrap();
        let names: Vec<&str> = roster.members().iter().map(|a| a.as_str()).collect();
        assert_eq!(names, vec!["sean", "yug", "maya"]);
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert!(Roster::new(vec![]).is_err());
    }

    #[tokio::test]
    async fn test_pool_fallback_to_default() {
        let default = AgentId::new("sean").unwrap();
        let mut pool = ClientPool::new(default.clone(), client("sean-model"));
        pool.insert(AgentId::new("yug").unwrap(), client("yug-model"));

        assert!(pool.contains(&AgentId::new("yug").unwrap()));
        assert!(!pool.contains(&AgentId::new("maya").unwrap()));

        let known = pool.client_for(&AgentId::new("yug").unwrap());
        assert_eq!(known.model(), "yug-model");

        // Unknown ids resolve to the default agent's client
        let unknown = pool.client_for(&AgentId::new("maya").unwrap());
        assert_eq!(unknown.model(), "sean-model");
        assert_eq!(pool.default_agent(), &default);
    }
}
