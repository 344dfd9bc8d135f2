//! Outbound call control against the media provider's REST API
//!
//! Thin delegation: one room per call, named `call-<digits>`, plus a SIP
//! participant that bridges the telephone leg into the room. Requests are
//! authorized with short-lived HS256 access tokens minted from the
//! configured API key and secret.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use laura_config::MediaConfig;

use crate::ServerError;

const TOKEN_TTL: Duration = Duration::from_secs(600);

/// Details of a started outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInfo {
    pub room_name: String,
    pub participant_identity: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    nbf: u64,
    exp: u64,
    video: VideoGrants,
    sip: SipGrants,
}

#[derive(Debug, Serialize)]
struct VideoGrants {
    #[serde(rename = "roomCreate")]
    room_create: bool,
    #[serde(rename = "roomAdmin")]
    room_admin: bool,
}

#[derive(Debug, Serialize)]
struct SipGrants {
    admin: bool,
    call: bool,
}

/// Media provider call-control client
pub struct OutboundCallService {
    config: MediaConfig,
    client: reqwest::Client,
}

impl OutboundCallService {
    pub fn new(config: MediaConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { config, client })
    }

    /// Provider REST base URL (the media URL is usually a ws/wss URL)
    fn http_url(&self) -> String {
        let url = self.config.url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = url.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            url.to_string()
        }
    }

    /// Room name for a call: `call-` plus the digits of the number
    pub fn room_name_for(phone_number: &str) -> String {
        let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("call-{}", digits)
    }

    fn access_token(&self, identity: &str) -> Result<String, ServerError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ServerError::Token(e.to_string()))?
            .as_secs();

        let claims = Claims {
            iss: &self.config.api_key,
            sub: identity,
            nbf: now,
            exp: now + TOKEN_TTL.as_secs(),
            video: VideoGrants {
                room_create: true,
                room_admin: true,
            },
            sip: SipGrants {
                admin: true,
                call: true,
            },
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.api_secret.as_bytes()),
        )
        .map_err(|e| ServerError::Token(e.to_string()))
    }

    async fn twirp_post(
        &self,
        service_method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ServerError> {
        let url = format!("{}/twirp/{}", self.http_url(), service_method);
        let token = self.access_token("laura-call-control")?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServerError::Media(format!(
                "{}: HTTP {}: {}",
                service_method, status, error_text
            )));
        }

        Ok(response.json().await.unwrap_or(serde_json::Value::Null))
    }

    /// Start an outbound call: create the room and dial the SIP leg
    pub async fn start_call(&self, phone_number: &str) -> Result<CallInfo, ServerError> {
        if self.config.outbound_trunk_id.is_empty() {
            return Err(ServerError::Media(
                "no outbound SIP trunk configured".to_string(),
            ));
        }

        let room_name = Self::room_name_for(phone_number);
        let participant_identity = format!("sip-{}", phone_number);

        self.twirp_post(
            "livekit.RoomService/CreateRoom",
            json!({ "name": room_name }),
        )
        .await?;
        tracing::info!(room_name = %room_name, "Call room created");

        self.twirp_post(
            "livekit.SIP/CreateSIPParticipant",
            json!({
                "sip_trunk_id": self.config.outbound_trunk_id,
                "sip_call_to": phone_number,
                "room_name": room_name,
                "participant_identity": participant_identity,
                "participant_name": "Llamada saliente",
            }),
        )
        .await?;
        tracing::info!(
            room_name = %room_name,
            participant_identity = %participant_identity,
            "SIP participant dialing"
        );

        Ok(CallInfo {
            room_name,
            participant_identity,
            phone_number: phone_number.to_string(),
        })
    }

    /// End a call by deleting its room
    pub async fn end_call(&self, room_name: &str) -> Result<(), ServerError> {
        self.twirp_post(
            "livekit.RoomService/DeleteRoom",
            json!({ "room": room_name }),
        )
        .await?;
        tracing::info!(room_name = %room_name, "Call room deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> MediaConfig {
        MediaConfig {
            url: url.to_string(),
            api_key: "lk_key".to_string(),
            api_secret: "lk_secret".to_string(),
            outbound_trunk_id: "ST_trunk".to_string(),
            sip_uri: String::new(),
        }
    }

    #[test]
    fn test_room_name_keeps_digits_only() {
        assert_eq!(
            OutboundCallService::room_name_for("+52 55 1234 5678"),
            "call-525512345678"
        );
    }

    #[test]
    fn test_ws_url_maps_to_http() {
        let service = OutboundCallService::new(test_config("wss://media.example.com/")).unwrap();
        assert_eq!(service.http_url(), "https://media.example.com");

        let service = OutboundCallService::new(test_config("ws://localhost:7880")).unwrap();
        assert_eq!(service.http_url(), "http://localhost:7880");
    }

    #[test]
    fn test_access_token_is_well_formed() {
        let service = OutboundCallService::new(test_config("wss://media.example.com")).unwrap();
        let token = service.access_token("laura-call-control").unwrap();
        // Three base64url segments
        assert_eq!(token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn test_missing_trunk_is_rejected_before_any_request() {
        let mut config = test_config("http://127.0.0.1:9");
        config.outbound_trunk_id.clear();
        let service = OutboundCallService::new(config).unwrap();

        match service.start_call("+525512345678").await {
            Err(ServerError::Media(msg)) => assert!(msg.contains("trunk")),
            other => panic!("expected media error, got {:?}", other.map(|c| c.room_name)),
        }
    }
}
