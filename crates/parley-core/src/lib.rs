//! parley-core - conversation orchestration for the Parley workspace
//!
//! This crate provides:
//! - A chat client pool mapping agent identities to configured model clients
//! - Deterministic prompt context built from a room's summary, history, and
//!   team activity
//! - Parallel per-agent draft generation and coordinator synthesis with a
//!   structured summary-update channel
//! - The orchestrator that routes self/teammate/team requests and keeps the
//!   room transcript consistent through model failures
//! - A deterministic outreach-confirmation shortcut that never calls a model
//! - A broadcast event bus for live room status

pub mod clients;
pub mod config;
pub mod context;
pub mod drafts;
pub mod events;
pub mod orchestrator;
pub mod outreach;
pub mod synthesis;

// Re-export main types for convenience
pub use clients::{AgentId, ChatClient, ClientPool, OpenAiChatClient, Roster};
pub use config::{AgentClientConfig, WorkspaceConfig};
pub use context::build_context;
pub use drafts::generate_drafts;
pub use events::{EventBus, RoomEvent, RoomEvents};
pub use orchestrator::{AskRequest, Mode, Orchestrator, OrchestratorError, RoomTranscript};
pub use outreach::{
    SuggestedOutreach, extract_suggested_outreach, is_confirmation, try_handle_confirmation,
};
pub use synthesis::{SUMMARY_MARKER, SynthesisResult, synthesize};
