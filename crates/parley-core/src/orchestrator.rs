//! Conversation orchestration: routing, drafting, synthesis, summary updates
//!
//! One inbound message drives one orchestration pass: persist the user's
//! message, try the deterministic outreach shortcut, otherwise route to a
//! single agent or fan out to the whole roster and synthesize. Model failures
//! degrade into a persisted fallback reply; the user's own message is never
//! rolled back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use parley_store::{Message, Role, Room, Sender, User, WorkspaceDb};

use crate::clients::{AgentId, ClientPool, Roster};
use crate::context::{self, build_context};
use crate::drafts::generate_drafts;
use crate::events::{EventBus, RoomEvent};
use crate::outreach;
use crate::synthesis::{self, SynthesisResult};

/// Reply persisted in place of output the model failed to produce
const FALLBACK_REPLY: &str = "Something went wrong. Try again.";

/// Stand-in reply when a model returns empty text
const EMPTY_REPLY: &str = "No response.";

/// Cap for the one-line activity summary derived from each request
const ACTIVITY_SUMMARY_CHARS: usize = 80;

/// Importance of the audit note written alongside each summary update
const SUMMARY_AUDIT_IMPORTANCE: f64 = 0.6;

/// How an inbound request is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Ask your own agent
    #[serde(rename = "self")]
    SelfAgent,
    /// Ask one teammate's agent
    Teammate,
    /// Fan out to the whole roster, then synthesize
    Team,
}

/// One inbound orchestration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub room_id: String,
    pub user_id: String,
    pub mode: Mode,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_agent: Option<String>,
}

/// The room's state returned after a pass
#[derive(Debug, Clone, Serialize)]
pub struct RoomTranscript {
    pub room_id: String,
    pub project_summary: Option<String>,
    pub memory_summary: Option<String>,
    pub summary_version: i64,
    pub messages: Vec<Message>,
}

/// Input errors, rejected before any model call
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("message content is empty")]
    EmptyContent,
    #[error("unknown room: {0}")]
    UnknownRoom(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

enum Route {
    Single(AgentId),
    Team,
}

/// Drives one orchestration pass per inbound message
pub struct Orchestrator {
    db: Arc<WorkspaceDb>,
    pool: ClientPool,
    roster: Roster,
    events: EventBus,
    temperature: f32,
}

impl Orchestrator {
    pub fn new(db: Arc<WorkspaceDb>, pool: ClientPool, roster: Roster, events: EventBus) -> Self {
        Self {
            db,
            pool,
            roster,
            events,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Handle one inbound message and return the updated room transcript.
    ///
    /// The inbound message is durable before any model call; every generated
    /// draft and synthesis is durable before the transcript is returned.
    /// Provider failures come back as a persisted fallback reply, not as an
    /// error.
    pub async fn ask(&self, req: AskRequest) -> Result<RoomTranscript, OrchestratorError> {
        let content = req.content.trim();
        if content.is_empty() {
            return Err(OrchestratorError::EmptyContent);
        }
        let user = self
            .db
            .get_user(&req.user_id)
            .await?
            .ok_or_else(|| OrchestratorError::UnknownUser(req.user_id.clone()))?;
        let room = self
            .db
            .get_room(&req.room_id)
            .await?
            .ok_or_else(|| OrchestratorError::UnknownRoom(req.room_id.clone()))?;
        // Resolve the route up front so a bad target is rejected before any write
        let route = self.resolve_route(req.mode, req.target_agent.as_deref())?;

        let room = self.heal_room_org(room, &user).await?;
        self.db.touch_seen(&user.id).await?;

        info!(
            "Handling {:?} request from {} in room {}",
            req.mode, user.name, room.name
        );

        // The user's own message is durable before anything can fail
        let inbound = self
            .db
            .append_message(
                &room.id,
                &Sender::User(user.id.clone()),
                &user.name,
                Role::User,
                content,
            )
            .await?;
        self.events.publish(RoomEvent::MessageAppended {
            room_id: room.id.clone(),
            message_id: inbound.id,
        });
        self.db
            .record_activity(
                &user.id,
                &user.name,
                &context::truncate_with_ellipsis(content, ACTIVITY_SUMMARY_CHARS),
            )
            .await?;

        // Deterministic approval shortcut: no model call
        if let Some(reply) =
            outreach::try_handle_confirmation(&self.db, &self.events, &room, &user, content)
                .await?
        {
            let agent = match &route {
                Route::Single(agent) => agent.clone(),
                Route::Team => AgentId::coordinator(),
            };
            self.persist_reply(&room.id, &agent, &reply).await?;
            return self.transcript(&room.id).await;
        }

        let recent = self
            .db
            .recent_messages(&room.id, context::MAX_HISTORY_MESSAGES)
            .await?;
        let activity = self.db.recent_activity(context::MAX_ACTIVITY_ENTRIES).await?;
        let prompt_context = build_context(&room, &recent, &activity, &user.name);

        match route {
            Route::Single(agent) => {
                match generate_drafts(
                    &self.pool,
                    std::slice::from_ref(&agent),
                    &user.name,
                    content,
                    &prompt_context,
                    self.temperature,
                )
                .await
                {
                    Ok(mut drafts) => {
                        let (agent, text) = drafts.remove(0);
                        self.persist_reply(&room.id, &agent, &text).await?;
                    }
                    Err(e) => {
                        error!("Draft generation failed for {}: {:#}", agent, e);
                        self.persist_reply(&room.id, &agent, FALLBACK_REPLY).await?;
                    }
                }
            }
            Route::Team => {
                self.run_team_pass(&room, &user, content, &prompt_context)
                    .await?
            }
        }

        self.transcript(&room.id).await
    }

    /// Team mode: draft from the full roster, then always synthesize
    async fn run_team_pass(
        &self,
        room: &Room,
        user: &User,
        content: &str,
        prompt_context: &str,
    ) -> Result<(), OrchestratorError> {
        let coordinator = AgentId::coordinator();

        let drafts = match generate_drafts(
            &self.pool,
            self.roster.members(),
            &user.name,
            content,
            prompt_context,
            self.temperature,
        )
        .await
        {
            Ok(drafts) => drafts,
            Err(e) => {
                error!("Team drafting failed: {:#}", e);
                self.persist_reply(&room.id, &coordinator, FALLBACK_REPLY)
                    .await?;
                return Ok(());
            }
        };

        // Drafts are durable in generation order before synthesis runs
        for (agent, text) in &drafts {
            self.persist_reply(&room.id, agent, text).await?;
        }

        match synthesis::synthesize(
            self.pool.client_for(&coordinator),
            &user.name,
            content,
            prompt_context,
            &drafts,
            self.temperature,
        )
        .await
        {
            Ok(SynthesisResult {
                answer,
                summary_update,
            }) => {
                if let Some(update) = summary_update {
                    let version = self.db.update_summary(&room.id, &update).await?;
                    self.db
                        .append_memory(
                            coordinator.as_str(),
                            Some(&room.id),
                            &format!("Summary updated: {}", update),
                            SUMMARY_AUDIT_IMPORTANCE,
                        )
                        .await?;
                    self.events.publish(RoomEvent::SummaryUpdated {
                        room_id: room.id.clone(),
                        version,
                    });
                    info!("Room {} summary advanced to v{}", room.name, version);
                }
                self.persist_reply(&room.id, &coordinator, &answer).await?;
            }
            Err(e) => {
                error!("Synthesis failed: {:#}", e);
                self.persist_reply(&room.id, &coordinator, FALLBACK_REPLY)
                    .await?;
            }
        }
        Ok(())
    }

    fn resolve_route(
        &self,
        mode: Mode,
        target: Option<&str>,
    ) -> Result<Route, OrchestratorError> {
        match mode {
            Mode::Team => Ok(Route::Team),
            Mode::SelfAgent | Mode::Teammate => {
                let agent = match target {
                    Some(name) => {
                        let id = AgentId::new(name)
                            .map_err(|_| OrchestratorError::UnknownAgent(name.to_string()))?;
                        // An explicit target must have its own client; the
                        // pool's fallback only covers implicit resolution
                        if !self.pool.contains(&id) {
                            return Err(OrchestratorError::UnknownAgent(name.to_string()));
                        }
                        id
                    }
                    None => self.pool.default_agent().clone(),
                };
                Ok(Route::Single(agent))
            }
        }
    }

    /// Lenient consistency policy: a room asked about by a user from another
    /// organization is reassigned to that user's organization with a warning,
    /// instead of failing the request.
    async fn heal_room_org(&self, room: Room, user: &User) -> Result<Room, OrchestratorError> {
        if room.org_id == user.org_id {
            return Ok(room);
        }
        warn!(
            "Room {} belongs to org {} but {} is in org {}; reassigning",
            room.id, room.org_id, user.name, user.org_id
        );
        self.db.reassign_room_org(&room.id, &user.org_id).await?;
        Ok(Room {
            org_id: user.org_id.clone(),
            ..room
        })
    }

    async fn persist_reply(
        &self,
        room_id: &str,
        agent: &AgentId,
        text: &str,
    ) -> Result<(), OrchestratorError> {
        let text = if text.trim().is_empty() {
            EMPTY_REPLY
        } else {
            text
        };
        let message = self
            .db
            .append_message(
                room_id,
                &Sender::Agent(agent.as_str().to_string()),
                &agent.display_name(),
                Role::Assistant,
                text,
            )
            .await?;
        self.events.publish(RoomEvent::MessageAppended {
            room_id: room_id.to_string(),
            message_id: message.id,
        });
        Ok(())
    }

    /// Current summary fields plus the full ordered message log
    pub async fn transcript(&self, room_id: &str) -> Result<RoomTranscript, OrchestratorError> {
        let room = self
            .db
            .get_room(room_id)
            .await?
            .ok_or_else(|| OrchestratorError::UnknownRoom(room_id.to_string()))?;
        let messages = self.db.room_messages(room_id).await?;
        Ok(RoomTranscript {
            room_id: room.id,
            project_summary: room.project_summary,
            memory_summary: room.memory_summary,
            summary_version: room.summary_version,
            messages,
        })
    }
}
