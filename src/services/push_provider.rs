/// Push provider boundary
///
/// The dispatcher only depends on three things from a provider: a token-format
/// validator, a batch-send call, and per-ticket status inspection. The default
/// implementation speaks the Expo push HTTP protocol, which is what the Kreels
/// mobile client registers tokens for.
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One message in a provider batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,
}

/// Per-token delivery ticket returned by the provider
#[derive(Debug, Clone)]
pub struct PushTicket {
    pub token: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl PushTicket {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True when the provider signalled the token is gone for good and should
    /// be deactivated rather than retried.
    pub fn token_unregistered(&self) -> bool {
        self.error
            .as_deref()
            .map(|e| {
                let lower = e.to_lowercase();
                lower.contains("devicenotregistered")
                    || lower.contains("notregistered")
                    || lower.contains("invalidcredentials")
            })
            .unwrap_or(false)
    }
}

/// Minimal provider contract used by the dispatcher
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Cheap format validation; malformed tokens are dropped before sending
    fn is_valid_token(&self, token: &str) -> bool;

    /// Maximum messages per batch-send call
    fn batch_size(&self) -> usize;

    /// Send one batch, returning one ticket per message in order.
    ///
    /// Errors here are transport-level (whole chunk failed); per-token
    /// failures come back as error tickets.
    async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, String>;
}

/// Registration-time guard: reject tokens the provider would never accept,
/// so the registry only ever holds sendable tokens.
pub fn ensure_token_format(provider: &dyn PushProvider, token: &str) -> AppResult<()> {
    if provider.is_valid_token(token) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "unrecognized push token format".to_string(),
        ))
    }
}

/// Expo push service client
pub struct ExpoPushClient {
    endpoint: String,
    access_token: Option<String>,
    http_client: reqwest::Client,
}

/// Expo caps receipts at 100 messages per request
const EXPO_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    id: Option<String>,
    message: Option<String>,
    details: Option<ExpoTicketDetails>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicketDetails {
    error: Option<String>,
}

impl ExpoPushClient {
    pub fn new(endpoint: String, access_token: Option<String>) -> Self {
        Self {
            endpoint,
            access_token,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushProvider for ExpoPushClient {
    fn is_valid_token(&self, token: &str) -> bool {
        (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
            && token.ends_with(']')
            && token.len() > "ExpoPushToken[]".len()
    }

    fn batch_size(&self) -> usize {
        EXPO_BATCH_SIZE
    }

    async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, String> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(messages);

        if let Some(token) = &self.access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("push send request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(format!("push provider error: {} - {}", status, text));
        }

        let parsed: ExpoResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse push response: {}", e))?;

        // Tickets come back in request order; pair them with the tokens sent.
        let tickets = messages
            .iter()
            .zip(parsed.data.into_iter())
            .map(|(message, ticket)| {
                let error = if ticket.status == "ok" {
                    None
                } else {
                    Some(
                        ticket
                            .details
                            .and_then(|d| d.error)
                            .or(ticket.message)
                            .unwrap_or_else(|| "unknown ticket error".to_string()),
                    )
                };
                PushTicket {
                    token: message.to.clone(),
                    message_id: ticket.id,
                    error,
                }
            })
            .collect();

        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ExpoPushClient {
        ExpoPushClient::new("https://exp.host/--/api/v2/push/send".to_string(), None)
    }

    #[test]
    fn test_valid_token_formats() {
        let client = client();
        assert!(client.is_valid_token("ExponentPushToken[abc123]"));
        assert!(client.is_valid_token("ExpoPushToken[xyz]"));
    }

    #[test]
    fn test_invalid_token_formats() {
        let client = client();
        assert!(!client.is_valid_token(""));
        assert!(!client.is_valid_token("abc123"));
        assert!(!client.is_valid_token("ExponentPushToken[abc"));
        assert!(!client.is_valid_token("ExpoPushToken[]"));
        assert!(!client.is_valid_token("fcm-token-legacy"));
    }

    #[test]
    fn test_registration_rejects_malformed_token() {
        let client = client();
        let err = ensure_token_format(&client, "fcm-token-legacy").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(ensure_token_format(&client, "ExponentPushToken[abc123]").is_ok());
    }

    #[test]
    fn test_batch_size() {
        assert_eq!(client().batch_size(), 100);
    }

    #[test]
    fn test_ticket_ok() {
        let ticket = PushTicket {
            token: "ExponentPushToken[abc]".to_string(),
            message_id: Some("id-1".to_string()),
            error: None,
        };
        assert!(ticket.is_ok());
        assert!(!ticket.token_unregistered());
    }

    #[test]
    fn test_ticket_device_not_registered() {
        let ticket = PushTicket {
            token: "ExponentPushToken[abc]".to_string(),
            message_id: None,
            error: Some("DeviceNotRegistered".to_string()),
        };
        assert!(!ticket.is_ok());
        assert!(ticket.token_unregistered());
    }

    #[test]
    fn test_ticket_transient_error_is_not_unregistered() {
        let ticket = PushTicket {
            token: "ExponentPushToken[abc]".to_string(),
            message_id: None,
            error: Some("MessageRateExceeded".to_string()),
        };
        assert!(!ticket.is_ok());
        assert!(!ticket.token_unregistered());
    }

    #[test]
    fn test_push_message_serialization_skips_empty_fields() {
        let message = PushMessage {
            to: "ExponentPushToken[abc]".to_string(),
            title: "New follower".to_string(),
            body: "kreels_fan started following you".to_string(),
            data: None,
            badge: None,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("data").is_none());
        assert!(json.get("badge").is_none());
        assert_eq!(json["to"], "ExponentPushToken[abc]");
    }

    #[test]
    fn test_expo_response_parsing() {
        let raw = r#"{"data":[{"status":"ok","id":"ticket-1"},{"status":"error","message":"token gone","details":{"error":"DeviceNotRegistered"}}]}"#;
        let parsed: ExpoResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].status, "ok");
        assert_eq!(
            parsed.data[1].details.as_ref().unwrap().error.as_deref(),
            Some("DeviceNotRegistered")
        );
    }
}
