//! Coordinator synthesis over a set of drafts

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::clients::{AgentId, ChatClient};

/// Literal marker a synthesis reply uses to propose a new rolling summary.
/// It is parsed here, immediately after the model call; no other call site
/// scans raw text for it.
pub const SUMMARY_MARKER: &str = "SUMMARY_UPDATE:";

/// A synthesis reply split into its answer and optional summary proposal
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub answer: String,
    pub summary_update: Option<String>,
}

/// Split a raw synthesis reply on the summary marker. A marker with nothing
/// after it counts as no update.
pub fn parse_synthesis(raw: &str) -> SynthesisResult {
    match raw.find(SUMMARY_MARKER) {
        Some(idx) => {
            let update = raw[idx + SUMMARY_MARKER.len()..].trim();
            SynthesisResult {
                answer: raw[..idx].trim().to_string(),
                summary_update: if update.is_empty() {
                    None
                } else {
                    Some(update.to_string())
                },
            }
        }
        None => SynthesisResult {
            answer: raw.trim().to_string(),
            summary_update: None,
        },
    }
}

/// Combine per-agent drafts into one coordinator answer, with an optional
/// structured summary update.
pub async fn synthesize(
    coordinator: Arc<dyn ChatClient>,
    asker_name: &str,
    prompt: &str,
    context: &str,
    drafts: &[(AgentId, String)],
    temperature: f32,
) -> Result<SynthesisResult> {
    let system_prompt = format!(
        "{context}\n\nYou are the team coordinator. Combine the team's draft \
         answers into one reply for {asker_name}, then list 2-5 concrete next \
         steps. If this exchange meaningfully changes the shared project \
         state, end your reply with a line starting with {SUMMARY_MARKER} \
         followed by 1-3 sentences describing the new state. Otherwise do \
         not mention {SUMMARY_MARKER} at all."
    );

    let mut user_prompt = format!("{} asks: {}\n\nTeam drafts:\n", asker_name, prompt);
    for (agent, text) in drafts {
        user_prompt.push_str(&format!("\n--- {} ---\n{}\n", agent.display_name(), text));
    }

    let raw = coordinator
        .complete(&system_prompt, &user_prompt, temperature)
        .await
        .context("Synthesis model call failed")?;

    let result = parse_synthesis(&raw);
    debug!(
        "Synthesis: {} chars, summary_update={}",
        result.answer.len(),
        result.summary_update.is_some()
    );
    Ok(result)
}
