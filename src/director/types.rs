//! Scene director wire types and error taxonomy

use serde::{Deserialize, Serialize};

/// Speaker shown when an utterance does not name one
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Connection status for the director WebSocket
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Error(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => f.write_str("disconnected"),
            ConnectionStatus::Connecting => f.write_str("connecting"),
            ConnectionStatus::Connected => f.write_str("connected"),
            ConnectionStatus::Closing => f.write_str("closing"),
            ConnectionStatus::Error(reason) => write!(f, "error ({})", reason),
        }
    }
}

/// The single outbound message of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Serialize to the JSON text frame sent right after the connection opens
    pub fn to_frame(&self) -> Result<String, DirectorError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One line of scene dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    pub content: String,
    pub stage_warning: Option<String>,
}

impl Utterance {
    pub fn new(
        speaker: impl Into<String>,
        content: impl Into<String>,
        stage_warning: Option<String>,
    ) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
            stage_warning,
        }
    }

    /// Apply the display defaults. Empty strings count as absent.
    pub fn from_raw(raw: RawUtterance) -> Self {
        let non_empty = |value: Option<String>| value.filter(|s| !s.is_empty());

        Self {
            speaker: non_empty(raw.speaker).unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
            content: raw.content.unwrap_or_default(),
            stage_warning: non_empty(raw.stage_warning),
        }
    }
}

/// Scene element exactly as it arrives on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUtterance {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub stage_warning: Option<String>,
}

/// Content of a `director` panel
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorContent {
    #[serde(default)]
    pub message: Option<String>,
}

/// Panel kinds the client knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Director,
    Status,
    Scene,
}

impl PanelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelKind::Director => "director",
            PanelKind::Status => "status",
            PanelKind::Scene => "scene",
        }
    }
}

/// A classified inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Replaces the director note
    Director { message: String },
    /// Informational only
    Status { message: Option<String> },
    /// Utterances to append, in arrival order
    Scene { utterances: Vec<Utterance> },
    /// Known panel whose payload has the wrong shape to act on
    Ignored { panel: PanelKind },
}

impl PanelEvent {
    /// Classify message based on the `panel` field
    pub fn classify(value: &serde_json::Value) -> Option<PanelKind> {
        value
            .get("panel")
            .and_then(|v| v.as_str())
            .and_then(|panel| match panel {
                "director" => Some(PanelKind::Director),
                "status" => Some(PanelKind::Status),
                "scene" => Some(PanelKind::Scene),
                _ => None,
            })
    }

    /// Parse one inbound text frame
    pub fn parse(text: &str) -> Result<Self, DirectorError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| DirectorError::MalformedPayload(format!("invalid JSON: {}", e)))?;

        // Other non-object values carry no panel and are ignored like one
        if value.is_null() {
            return Err(DirectorError::MalformedPayload(
                "inbound message is null".to_string(),
            ));
        }

        match Self::classify(&value) {
            Some(PanelKind::Director) => {
                let content = value.get("content").cloned().ok_or_else(|| {
                    DirectorError::MalformedPayload("director panel without content".to_string())
                })?;
                let content: DirectorContent = serde_json::from_value(content).map_err(|e| {
                    DirectorError::MalformedPayload(format!("director content: {}", e))
                })?;

                Ok(PanelEvent::Director {
                    message: content.message.unwrap_or_default(),
                })
            }
            Some(PanelKind::Status) => {
                let message = match value.get("message") {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                Ok(PanelEvent::Status { message })
            }
            Some(PanelKind::Scene) => match value.get("content") {
                Some(serde_json::Value::Array(items)) => {
                    let utterances = items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| {
                            serde_json::from_value::<RawUtterance>(item.clone())
                                .map(Utterance::from_raw)
                                .map_err(|e| {
                                    DirectorError::MalformedPayload(format!(
                                        "scene item {}: {}",
                                        index, e
                                    ))
                                })
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    Ok(PanelEvent::Scene { utterances })
                }
                _ => Ok(PanelEvent::Ignored {
                    panel: PanelKind::Scene,
                }),
            },
            None => {
                let panel = value
                    .get("panel")
                    .map(|p| match p.as_str() {
                        Some(s) => s.to_string(),
                        None => p.to_string(),
                    })
                    .unwrap_or_else(|| "<missing>".to_string());
                Err(DirectorError::UnknownPanel(panel))
            }
        }
    }
}

/// Events produced by a connection's I/O task, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connection established and the prompt was transmitted
    Opened,
    /// One inbound text frame
    Message(String),
    /// Connection could not be established
    OpenFailed(String),
    /// Fault on an established connection
    Error(String),
    /// Connection closed by the peer or the network
    Closed { code: Option<u16>, reason: String },
}

/// Error types for director sessions
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("Failed to open connection to {url}: {reason}")]
    TransportOpenFailure { url: String, reason: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Unknown panel: {0}")]
    UnknownPanel(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Health endpoint reply
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_frame() {
        let frame = PromptRequest::new("A duel at dawn").to_frame().unwrap();
        assert_eq!(frame, r#"{"prompt":"A duel at dawn"}"#);
    }

    #[test]
    fn test_classify_message_director() {
        let json_data = serde_json::json!({
            "panel": "director",
            "content": { "message": "Tense standoff" }
        });
        assert_eq!(PanelEvent::classify(&json_data), Some(PanelKind::Director));
    }

    #[test]
    fn test_classify_message_unknown() {
        let json_data = serde_json::json!({ "panel": "lighting" });
        assert_eq!(PanelEvent::classify(&json_data), None);
    }

    #[test]
    fn test_parse_director() {
        let event = PanelEvent::parse(
            r#"{"panel":"director","content":{"title":"Director's Vision","message":"Tense standoff"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PanelEvent::Director {
                message: "Tense standoff".to_string()
            }
        );
    }

    #[test]
    fn test_parse_director_without_content_is_malformed() {
        let result = PanelEvent::parse(r#"{"panel":"director"}"#);
        assert!(matches!(result, Err(DirectorError::MalformedPayload(_))));
    }

    #[test]
    fn test_parse_status() {
        let event =
            PanelEvent::parse(r#"{"panel":"status","message":"Agents generated and saved."}"#)
                .unwrap();
        assert_eq!(
            event,
            PanelEvent::Status {
                message: Some("Agents generated and saved.".to_string())
            }
        );
    }

    #[test]
    fn test_parse_scene_applies_defaults() {
        let event = PanelEvent::parse(
            r#"{"panel":"scene","content":[
                {"speaker":"Alice","content":"Draw your sword."},
                {},
                {"speaker":"","content":"Hm.","stage_warning":""},
                {"speaker":"Bob","stage_warning":"exits left"}
            ]}"#,
        )
        .unwrap();

        let PanelEvent::Scene { utterances } = event else {
            panic!("expected scene event");
        };
        assert_eq!(
            utterances,
            vec![
                Utterance::new("Alice", "Draw your sword.", None),
                Utterance::new("Unknown", "", None),
                Utterance::new("Unknown", "Hm.", None),
                Utterance::new("Bob", "", Some("exits left".to_string())),
            ]
        );
    }

    #[test]
    fn test_parse_scene_null_stage_warning() {
        let event = PanelEvent::parse(
            r#"{"panel":"scene","content":[{"speaker":"Alice","content":"Hi","stage_warning":null}]}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PanelEvent::Scene {
                utterances: vec![Utterance::new("Alice", "Hi", None)]
            }
        );
    }

    #[test]
    fn test_parse_scene_non_array_is_ignored() {
        let event = PanelEvent::parse(r#"{"panel":"scene","content":{"speaker":"Alice"}}"#).unwrap();
        assert_eq!(
            event,
            PanelEvent::Ignored {
                panel: PanelKind::Scene
            }
        );
    }

    #[test]
    fn test_parse_scene_bad_item_is_malformed() {
        let result = PanelEvent::parse(r#"{"panel":"scene","content":[{"speaker":42}]}"#);
        assert!(matches!(result, Err(DirectorError::MalformedPayload(_))));
    }

    #[test]
    fn test_parse_unknown_and_missing_panel() {
        assert!(matches!(
            PanelEvent::parse(r#"{"panel":"lighting","content":{}}"#),
            Err(DirectorError::UnknownPanel(p)) if p == "lighting"
        ));
        assert!(matches!(
            PanelEvent::parse(r#"{"content":[]}"#),
            Err(DirectorError::UnknownPanel(_))
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            PanelEvent::parse("{not json"),
            Err(DirectorError::MalformedPayload(_))
        ));
        assert!(matches!(
            PanelEvent::parse("null"),
            Err(DirectorError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_non_object_has_no_panel() {
        for text in ["[1, 2]", "42", r#""x""#, "true"] {
            assert!(
                matches!(PanelEvent::parse(text), Err(DirectorError::UnknownPanel(_))),
                "{} should be ignored",
                text
            );
        }
    }
}
