//! WebSocket client → server messages.

use serde::Deserialize;
use thiserror::Error;

/// Message sent by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Add tags to this connection.
    Subscribe { tags: Vec<String> },
    /// Remove tags from this connection.
    Unsubscribe { tags: Vec<String> },
    /// Keepalive; answered with a `pong` message.
    Ping,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("tags must not be empty strings")]
    EmptyTag,
    #[error("binary frames are not supported")]
    Binary,
}

/// Parse and validate one text frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let message: ClientMessage = serde_json::from_str(text)?;
    match &message {
        ClientMessage::Subscribe { tags } | ClientMessage::Unsubscribe { tags }
            if tags.iter().any(|t| t.trim().is_empty()) =>
        {
            Err(ProtocolError::EmptyTag)
        }
        _ => Ok(message),
    }
}

/// Split a `tags=a,b` query value, dropping blanks.
pub fn parse_tag_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            parse_client_message(r#"{"action":"subscribe","tags":["whales"]}"#).unwrap(),
            ClientMessage::Subscribe { tags: vec!["whales".into()] }
        );
        assert_eq!(
            parse_client_message(r#"{"action":"ping"}"#).unwrap(),
            ClientMessage::Ping
        );
    }

    #[test]
    fn test_rejects_bad_messages() {
        assert!(matches!(
            parse_client_message(r#"{"action":"dance"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_client_message(r#"{"action":"unsubscribe","tags":[" "]}"#),
            Err(ProtocolError::EmptyTag)
        ));
    }

    #[test]
    fn test_tag_list() {
        assert_eq!(parse_tag_list(Some("a, b,,c")), vec!["a", "b", "c"]);
        assert!(parse_tag_list(None).is_empty());
    }
}
