//! Request/response shapes exchanged with the session service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult, TransportError};

/// Theme tag asking the service to pick a theme itself
pub const AUTO_THEME: &str = "auto";

/// Upper bound on the number of choices offered per turn
pub const MAX_CHOICES: usize = 4;

/// How the player picks the narrative setting at start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSelection {
    Auto,
    Custom(String),
}

impl ThemeSelection {
    pub fn custom(theme: impl Into<String>) -> Self {
        ThemeSelection::Custom(theme.into())
    }

    /// Build the wire request, rejecting a blank custom theme locally.
    pub fn to_request(&self) -> ClientResult<StartRequest> {
        match self {
            ThemeSelection::Auto => Ok(StartRequest {
                theme: Some(AUTO_THEME.to_string()),
                custom_theme: None,
            }),
            ThemeSelection::Custom(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ClientError::Validation("empty custom theme".to_string()));
                }
                Ok(StartRequest {
                    theme: None,
                    custom_theme: Some(trimmed.to_string()),
                })
            }
        }
    }
}

/// `POST /api/v1/start` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub custom_theme: Option<String>,
}

/// `POST /api/v1/start` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
    pub theme: String,
    pub affection: i64,
    pub initial_dialogue: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

/// `POST /api/v1/dialogue` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueRequest {
    pub user_input: String,
    pub session_id: String,
    /// Theme the client believes the session is bound to; always sent, never authoritative.
    #[serde(default)]
    pub theme: String,
}

/// `POST /api/v1/dialogue` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResponse {
    pub affection: i64,
    pub character_response: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

/// `GET /api/v1/session/:session_id` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub theme: String,
    pub affection: i64,
    pub history_length: usize,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Body of every non-success service response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Who spoke a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Character,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Character => write!(f, "character"),
        }
    }
}

/// One transcript line as held by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn character(text: impl Into<String>) -> Self {
        Self {
            role: Role::Character,
            text: text.into(),
        }
    }
}

fn check_choices(choices: &[String]) -> Result<(), TransportError> {
    if choices.len() > MAX_CHOICES {
        return Err(TransportError::Protocol(format!(
            "expected at most {} choices, got {}",
            MAX_CHOICES,
            choices.len()
        )));
    }
    Ok(())
}

/// Reject start responses the client cannot bind a session from.
pub fn validate_start_response(response: &StartResponse) -> Result<(), TransportError> {
    if response.session_id.trim().is_empty() {
        return Err(TransportError::Protocol("missing session_id".to_string()));
    }
    if response.theme.trim().is_empty() {
        return Err(TransportError::Protocol("missing theme".to_string()));
    }
    check_choices(&response.choices)
}

pub fn validate_dialogue_response(response: &DialogueResponse) -> Result<(), TransportError> {
    check_choices(&response.choices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auto_selection_request() {
        let request = ThemeSelection::Auto.to_request().unwrap();
        assert_eq!(request.theme.as_deref(), Some("auto"));
        assert!(request.custom_theme.is_none());

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"theme": "auto", "custom_theme": null}));
    }

    #[test]
    fn test_dialogue_request_theme_is_a_string() {
        let request = DialogueRequest {
            user_input: "Wave".to_string(),
            session_id: "s-1".to_string(),
            theme: "Rainy bookshop".to_string(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({"user_input": "Wave", "session_id": "s-1", "theme": "Rainy bookshop"})
        );

        // older clients may leave it out
        let parsed: DialogueRequest =
            serde_json::from_value(json!({"user_input": "Wave", "session_id": "s-1"})).unwrap();
        assert_eq!(parsed.theme, "");
    }

    #[test]
    fn test_custom_selection_is_trimmed() {
        let request = ThemeSelection::custom("  rainy library  ").to_request().unwrap();
        assert_eq!(request.theme, None);
        assert_eq!(request.custom_theme.as_deref(), Some("rainy library"));
    }

    #[test]
    fn test_blank_custom_selection_rejected() {
        for raw in ["", "   ", "\t\n"] {
            let err = ThemeSelection::custom(raw).to_request().unwrap_err();
            assert!(matches!(err, ClientError::Validation(_)));
            assert_eq!(err.to_string(), "ValidationError: empty custom theme");
        }
    }

    #[test]
    fn test_dialogue_response_ignores_extra_fields() {
        let body = json!({
            "session_id": "abc",
            "character_response": "Hello again.",
            "choices": ["Wave", "Smile"],
            "timestamp": "2024-05-01T10:00:00",
            "affection": 53
        });
        let response: DialogueResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.affection, 53);
        assert_eq!(response.choices.len(), 2);
    }

    #[test]
    fn test_missing_affection_fails_to_decode() {
        let body = json!({"character_response": "...", "choices": []});
        assert!(serde_json::from_value::<DialogueResponse>(body).is_err());
    }

    #[test]
    fn test_start_response_validation() {
        let mut response = StartResponse {
            session_id: "s-1".to_string(),
            theme: "Summer festival".to_string(),
            affection: 50,
            initial_dialogue: "Hi!".to_string(),
            choices: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        };
        assert!(validate_start_response(&response).is_ok());

        response.choices.push("E".to_string());
        assert!(matches!(
            validate_start_response(&response),
            Err(TransportError::Protocol(_))
        ));

        response.choices.truncate(2);
        response.session_id = " ".to_string();
        assert!(validate_start_response(&response).is_err());
    }

    #[test]
    fn test_empty_choices_are_valid() {
        let response = DialogueResponse {
            affection: 40,
            character_response: "Goodbye.".to_string(),
            choices: vec![],
        };
        assert!(validate_dialogue_response(&response).is_ok());
    }

    #[test]
    fn test_role_wire_format() {
        let entry = HistoryEntry::character("Welcome");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["role"], "character");
        assert_eq!(Role::User.to_string(), "user");
    }
}
