use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Identifier of one client conversation session. Every session owns its own
/// transcript and channels; nothing is shared across sessions.
#[derive(Debug, Default, Display, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn into_string(&self) -> String {
        self.0.to_string()
    }

    pub fn parse(value: impl ToString) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(&value.to_string()).map_err(Error::SessionId)?,
        ))
    }
}

/// Lifecycle of a session's chat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Idle,
    Ongoing,
    Ended,
    Error,
}

impl Default for ChatStatus {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_session_id_round_trip() {
        let fixture = SessionId::generate();
        let actual = SessionId::parse(fixture.into_string()).unwrap();
        assert_eq!(actual, fixture);
    }

    #[test]
    fn test_session_id_parse_rejects_garbage() {
        let actual = SessionId::parse("not-a-uuid");
        assert!(actual.is_err());
    }

    #[test]
    fn test_chat_status_serializes_snake_case() {
        let actual = serde_json::to_string(&ChatStatus::Ongoing).unwrap();
        assert_eq!(actual, "\"ongoing\"");
    }
}
