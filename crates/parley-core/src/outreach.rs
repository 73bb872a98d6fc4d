//! Deterministic outreach-confirmation shortcut
//!
//! Detects a user approving a message an agent previously drafted for a
//! teammate, and converts the approval into a delivered notification without
//! another model call. The delivered text must be exactly what the user saw
//! and agreed to, so this path never rephrases anything.

use anyhow::Result;
use tracing::{info, warn};

use parley_store::{Role, Room, User, WorkspaceDb};

use crate::events::{EventBus, RoomEvent};

/// Phrases treated as approval when they match the whole normalized message
const CONFIRMATION_EXACT: &[&str] = &[
    "yes", "yep", "yeah", "sure", "ok", "okay", "send", "do it", "confirm",
];

/// Multi-word phrases treated as approval when contained anywhere in it
const CONFIRMATION_CONTAINS: &[&str] = &[
    "yes please",
    "send it",
    "go ahead",
    "sounds good",
    "please send",
];

/// Literal pattern an assistant reply uses to suggest an outbound message
const DRAFT_PREFIX: &str = "message you could send to ";

/// How far back to look for the suggesting assistant message
const LOOKBACK_MESSAGES: usize = 50;

/// Whether the text reads as an approval of a pending suggestion
pub fn is_confirmation(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_end_matches(['.', '!'])
        .to_lowercase();
    CONFIRMATION_EXACT.iter().any(|p| normalized == *p)
        || CONFIRMATION_CONTAINS.iter().any(|p| normalized.contains(p))
}

/// A message draft extracted from a prior assistant reply
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedOutreach {
    pub recipient: String,
    pub text: String,
}

/// Extract `message you could send to <Name>: "<text>"` from an assistant
/// reply. Name and quoted text are captured verbatim.
pub fn extract_suggested_outreach(assistant_text: &str) -> Option<SuggestedOutreach> {
    // ASCII lowering keeps byte offsets valid in the original text
    let lowered = assistant_text.to_ascii_lowercase();
    let start = lowered.find(DRAFT_PREFIX)?;

    let after_prefix = &assistant_text[start + DRAFT_PREFIX.len()..];
    let colon = after_prefix.find(':')?;
    let recipient = after_prefix[..colon].trim();
    if recipient.is_empty() {
        return None;
    }

    let after_colon = &after_prefix[colon + 1..];
    let open = after_colon.find('"')?;
    let rest = &after_colon[open + 1..];
    let close = rest.find('"')?;
    let text = &rest[..close];
    if text.is_empty() {
        return None;
    }

    Some(SuggestedOutreach {
        recipient: recipient.to_string(),
        text: text.to_string(),
    })
}

/// Try to treat `latest_text` as the approval of a previously drafted
/// outreach message. Returns the deterministic assistant reply when the
/// message is claimed, `None` when normal routing should proceed.
pub async fn try_handle_confirmation(
    db: &WorkspaceDb,
    events: &EventBus,
    room: &Room,
    user: &User,
    latest_text: &str,
) -> Result<Option<String>> {
    if !is_confirmation(latest_text) {
        return Ok(None);
    }

    let recent = db.recent_messages(&room.id, LOOKBACK_MESSAGES).await?;
    let Some(last_assistant) = recent.iter().rev().find(|m| m.role == Role::Assistant) else {
        return Ok(None);
    };
    let Some(draft) = extract_suggested_outreach(&last_assistant.content) else {
        return Ok(None);
    };

    match db.find_user_by_name(&room.org_id, &draft.recipient).await? {
        Some(recipient) => {
            db.create_notification(&recipient.id, &draft.text).await?;
            events.publish(RoomEvent::NotificationCreated {
                room_id: room.id.clone(),
                recipient_id: recipient.id.clone(),
            });
            info!(
                "Delivered approved outreach from {} to {}",
                user.name, recipient.name
            );
            Ok(Some(format!(
                "Okay, I sent this message to {}: \"{}\"",
                recipient.name, draft.text
            )))
        }
        None => {
            warn!(
                "Outreach recipient '{}' not found in org {}",
                draft.recipient, room.org_id
            );
            Ok(Some(format!(
                "I couldn't find {} in your workspace, so nothing was sent. \
                 Here is the message to copy manually: \"{}\"",
                draft.recipient, draft.text
            )))
        }
    }
}
