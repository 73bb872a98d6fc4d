//! Chat clients and the agent-to-client mapping

pub mod openai;
pub mod pool;
pub mod types;

pub use openai::OpenAiChatClient;
pub use pool::{AgentId, COORDINATOR, ClientPool, Roster};
pub use types::ChatClient;
