use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::MatchDto;

#[derive(Clone, Debug)]
/// Serialized payload carried by one SSE `data:` frame.
pub struct ServerEvent {
    /// JSON text sent as the frame body.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<T>(payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed on the match stream, discriminated by `type`.
#[serde(tag = "type")]
pub enum StreamMessage {
    /// First frame after the stream opens.
    #[serde(rename = "connected")]
    Connected {
        /// Interval the client should fall back to when the stream drops.
        poll_interval_ms: u64,
        /// Whether the backend currently runs without storage.
        degraded: bool,
    },
    /// Authoritative state of the category's current match.
    #[serde(rename = "game-update")]
    GameUpdate {
        /// Full match payload; clients replace their local copy with it.
        game: MatchDto,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::Match;

    #[test]
    fn messages_carry_type_tag() {
        let connected = ServerEvent::json(&StreamMessage::Connected {
            poll_interval_ms: 500,
            degraded: false,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&connected.data).unwrap();
        assert_eq!(value["type"], "connected");
        assert_eq!(value["poll_interval_ms"], 500);

        let update = ServerEvent::json(&StreamMessage::GameUpdate {
            game: Match::open("tic-tac-toe", "alice").into(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&update.data).unwrap();
        assert_eq!(value["type"], "game-update");
        assert_eq!(value["game"]["playerX"], "alice");
    }
}
