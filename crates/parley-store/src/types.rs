//! Shared message types for the workspace store

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Who produced a message. Rendered as a tagged string (`user:<id>`,
/// `agent:<name>`, `voice:<id>`, `sms:<phone>`) in storage and on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    /// A human member, by user id
    User(String),
    /// An AI agent, by agent name
    Agent(String),
    /// A voice-call transcript line, by user id
    Voice(String),
    /// An inbound text message, by phone number
    Sms(String),
}

impl Sender {
    /// Parse a tagged sender string (e.g. `agent:sean`)
    pub fn from_string(s: &str) -> Option<Self> {
        let (prefix, rest) = s.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        match prefix {
            "user" => Some(Self::User(rest.to_string())),
            "agent" => Some(Self::Agent(rest.to_string())),
            "voice" => Some(Self::Voice(rest.to_string())),
            "sms" => Some(Self::Sms(rest.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Agent(name) => write!(f, "agent:{}", name),
            Self::Voice(id) => write!(f, "voice:{}", id),
            Self::Sms(phone) => write!(f, "sms:{}", phone),
        }
    }
}

impl Serialize for Sender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_string(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid sender tag: {}", s)))
    }
}

/// Conversational role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
