//! Workspace configuration loaded from TOML

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::clients::{AgentId, ClientPool, OpenAiChatClient, Roster};

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_presence_window_secs() -> i64 {
    120
}

/// Chat client settings for one agent
#[derive(Clone, Deserialize)]
pub struct AgentClientConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for AgentClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClientConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Top-level workspace configuration (config.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Agent used when a request names no target
    pub default_agent: String,
    /// Team members fanned out to in team mode, in draft order
    pub roster: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Seconds since last activity within which a member counts as online
    #[serde(default = "default_presence_window_secs")]
    pub presence_window_secs: i64,
    /// Per-agent client settings. A `coordinator` entry, when present, backs
    /// the synthesis pass; otherwise the default agent's client is used.
    pub agents: BTreeMap<String, AgentClientConfig>,
}

impl WorkspaceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config at {}", path.as_ref().display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.agents.contains_key(&self.default_agent) {
            bail!(
                "default agent '{}' has no [agents.{}] entry",
                self.default_agent,
                self.default_agent
            );
        }
        if self.roster.is_empty() {
            bail!("roster is empty");
        }
        for name in &self.roster {
            if !self.agents.contains_key(name) {
                bail!("roster member '{}' has no [agents.{}] entry", name, name);
            }
        }
        Ok(())
    }

    /// Build the agent-to-client mapping from the configured agents
    pub fn build_pool(&self) -> Result<ClientPool> {
        let default_id = AgentId::new(&self.default_agent)?;
        let default_cfg = &self.agents[&self.default_agent];
        let mut pool = ClientPool::new(default_id, make_client(default_cfg));
        for (name, cfg) in &self.agents {
            pool.insert(AgentId::new(name)?, make_client(cfg));
        }
        Ok(pool)
    }

    pub fn build_roster(&self) -> Result<Roster> {
        let members = self
            .roster
            .iter()
            .map(|name| AgentId::new(name))
            .collect::<Result<Vec<_>>>()?;
        Roster::new(members)
    }
}

fn make_client(cfg: &AgentClientConfig) -> Arc<OpenAiChatClient> {
    Arc::new(OpenAiChatClient::new(
        cfg.api_key.clone(),
        cfg.model.clone(),
        cfg.base_url.clone(),
        cfg.max_tokens,
    ))
}

/// Replace `${VAR}` references with environment values (empty when unset)
fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while let Some(start) = result[pos..].find("${") {
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();
        let value = std::env::var(&var_name).unwrap_or_default();
        let value_len = value.len();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value_len;
    }
    result
}

/// Mask a secret for safe display in Debug output and logs
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        default_agent = "sean"
        roster = ["sean", "yug"]

        [agents.sean]
        api_key = "sk-sean-key-000001"
        model = "gpt-4o-mini"

        [agents.yug]
        api_key = "sk-yug-key-0000002"

        [agents.coordinator]
        api_key = "sk-coord-key-00003"
        model = "gpt-4o"
    "#;

    #[test]
    fn test_parse_sample_with_defaults() {
        let config = WorkspaceConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.default_agent, "sean");
        assert_eq!(config.roster, vec!["sean", "yug"]);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.presence_window_secs, 120);

        let yug = &config.agents["yug"];
        assert_eq!(yug.model, "gpt-4o-mini");
        assert_eq!(yug.base_url, "https://api.openai.com");
        assert_eq!(yug.max_tokens, 4096);
        assert_eq!(config.agents["coordinator"].model, "gpt-4o");
    }

    #[test]
    fn test_build_pool_and_roster() {
        let config = WorkspaceConfig::from_toml(SAMPLE).unwrap();
        let pool = config.build_pool().unwrap();
        assert!(pool.contains(&AgentId::new("sean").unwrap()));
        assert!(pool.contains(&AgentId::new("yug").unwrap()));
        assert!(pool.contains(&AgentId::coordinator()));
        assert_eq!(pool.default_agent().as_str(), "sean");

        let roster = config.build_roster().unwrap();
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_validate_rejects_missing_default_agent() {
        let bad = r#"
            default_agent = "sean"
            roster = ["sean"]
        "#;
        assert!(WorkspaceConfig::from_toml(bad).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_roster_member() {
        let bad = r#"
            default_agent = "sean"
            roster = ["sean", "ghost"]

            [agents.sean]
            api_key = "k"
        "#;
        let err = WorkspaceConfig::from_toml(bad).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_validate_rejects_empty_roster() {
        let bad = r#"
            default_agent = "sean"
            roster = []

            [agents.sean]
            api_key = "k"
        "#;
        assert!(WorkspaceConfig::from_toml(bad).is_err());
    }

    #[test]
    fn test_expand_env_vars_unset_becomes_empty() {
        let expanded = expand_env_vars("key = \"${PARLEY_TEST_SURELY_UNSET}\"");
        assert_eq!(expanded, "key = \"\"");
    }

    #[test]
    fn test_expand_env_vars_leaves_plain_text() {
        assert_eq!(expand_env_vars("plain text"), "plain text");
        assert_eq!(expand_env_vars("dangling ${brace"), "dangling ${brace");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-abcdef123456"), "sk-...3456");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = WorkspaceConfig::from_toml(SAMPLE).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-sean-key-000001"));
    }
}
