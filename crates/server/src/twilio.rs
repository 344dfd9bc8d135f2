//! TwiML responses for the telephony platform's webhooks
//!
//! Inbound calls are bridged into the media provider over SIP; when no
//! SIP URI is configured the caller hears a short Spanish notice and the
//! call is hung up.

use serde::Deserialize;

/// Form fields posted by the telephony platform on an inbound call
#[derive(Debug, Deserialize)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
}

/// Form fields posted on call status transitions
#[derive(Debug, Deserialize)]
pub struct StatusWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
}

/// TwiML that bridges the caller to the configured SIP endpoint
pub fn bridge_response(sip_uri: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Response>\n\
         \x20 <Dial>\n\
         \x20   <Sip>{}</Sip>\n\
         \x20 </Dial>\n\
         </Response>",
        escape_xml(sip_uri)
    )
}

/// TwiML spoken when the agent cannot take the call
pub fn unavailable_response() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
     <Response>\n\
     \x20 <Say language=\"es-MX\">Lo sentimos, el servicio no está disponible en este momento.</Say>\n\
     \x20 <Hangup/>\n\
     </Response>"
        .to_string()
}

/// Log a status callback at a level matching the transition
pub fn log_status(status: &StatusWebhook) {
    let sid = status.call_sid.as_deref().unwrap_or("unknown");
    let state = status.call_status.as_deref().unwrap_or("unknown");
    match state {
        "failed" | "busy" | "no-answer" => {
            tracing::warn!(call_sid = %sid, status = %state, "Call did not complete");
        }
        "completed" => {
            let duration = status.call_duration.as_deref().unwrap_or("?");
            tracing::info!(call_sid = %sid, duration_secs = %duration, "Call completed");
        }
        _ => {
            tracing::info!(call_sid = %sid, status = %state, "Call status update");
        }
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
