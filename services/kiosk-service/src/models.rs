use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// Body of `POST /log`. Every field is optional here so that absence is reported
/// as a validation failure rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInteractionRequest {
    pub screen: Option<String>,
    pub action: Option<String>,
    pub timestamp: Option<ClientTimestamp>,
    pub kiosk_id: Option<String>,
}

/// Kiosks send either a formatted string or a numeric epoch; both are stored verbatim.
/// Epochs keep the token exactly as it appeared in the body (`1.5e12` stays `1.5e12`).
#[derive(Debug, Clone, PartialEq)]
pub enum ClientTimestamp {
    Text(String),
    Epoch { raw: String, value: f64 },
}

impl ClientTimestamp {
    fn is_truthy(&self) -> bool {
        match self {
            ClientTimestamp::Text(value) => !value.is_empty(),
            ClientTimestamp::Epoch { value, .. } => *value != 0.0,
        }
    }

    fn into_text(self) -> String {
        match self {
            ClientTimestamp::Text(value) => value,
            ClientTimestamp::Epoch { raw, .. } => raw,
        }
    }
}

impl<'de> Deserialize<'de> for ClientTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let token = raw.get().trim();
        if token.starts_with('"') {
            let text = serde_json::from_str::<String>(token).map_err(de::Error::custom)?;
            return Ok(ClientTimestamp::Text(text));
        }
        let number = serde_json::from_str::<serde_json::Number>(token)
            .map_err(|_| de::Error::custom("timestamp must be a string or a number"))?;
        Ok(ClientTimestamp::Epoch {
            raw: token.to_string(),
            value: number.as_f64().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingRequiredFields;

/// A validated interaction, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    pub screen: String,
    pub action: String,
    pub timestamp: String,
    pub kiosk_id: String,
}

impl LogInteractionRequest {
    pub fn validate(self) -> Result<NewInteraction, MissingRequiredFields> {
        let screen = non_empty(self.screen).ok_or(MissingRequiredFields)?;
        let action = non_empty(self.action).ok_or(MissingRequiredFields)?;
        let timestamp = self
            .timestamp
            .filter(ClientTimestamp::is_truthy)
            .ok_or(MissingRequiredFields)?
            .into_text();
        let kiosk_id = non_empty(self.kiosk_id).ok_or(MissingRequiredFields)?;
        Ok(NewInteraction {
            screen,
            action,
            timestamp,
            kiosk_id,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[derive(Debug, Serialize)]
pub struct LogInteractionResponse {
    pub message: &'static str,
}

/// A row of `GET /all`. `friendly_name` is null when the kiosk has no location entry.
/// The table is shared with other writers, so any column may come back null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub screen: Option<String>,
    pub action: Option<String>,
    pub timestamp: Option<String>,
    pub kiosk_id: Option<String>,
    pub friendly_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestartSessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RestartSessionResponse {
    pub ok: bool,
    pub session_id: String,
    pub restart_clicks: i64,
}

#[derive(Debug, Serialize)]
pub struct RestartClickResponse {
    pub ok: bool,
    pub restart_clicks: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}
