//! HTTP control surface
//!
//! Call control (outbound dialing, hangup), telephony webhooks and
//! health. Webhook handlers answer with TwiML; everything else is JSON.

use axum::extract::{Form, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::twilio;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/make-call", post(make_call))
        .route("/end-call/:room_name", post(end_call))
        .route("/webhook/twilio", post(twilio_voice))
        .route("/webhook/twilio/status", post(twilio_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": state.settings.agent.agent_name,
        "endpoints": [
            "GET /health",
            "POST /make-call",
            "POST /end-call/:room_name",
            "POST /webhook/twilio",
            "POST /webhook/twilio/status",
        ],
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": state.settings.agent.agent_name,
        "active_sessions": state.sessions.active_sessions(),
    }))
}

#[derive(Debug, Deserialize)]
struct MakeCallRequest {
    phone_number: String,
    agent_name: Option<String>,
}

async fn make_call(
    State(state): State<AppState>,
    Json(request): Json<MakeCallRequest>,
) -> impl IntoResponse {
    if request.phone_number.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "phone_number required" })),
        );
    }

    let agent = request
        .agent_name
        .as_deref()
        .unwrap_or(&state.settings.agent.agent_name);

    match state.outbound.start_call(&request.phone_number).await {
        Ok(info) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "room_name": info.room_name,
                "message": format!("Calling {} as {}", info.phone_number, agent),
            })),
        ),
        Err(e) => {
            tracing::error!(phone_number = %request.phone_number, error = %e, "Outbound call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
        }
    }
}

async fn end_call(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> impl IntoResponse {
    match state.outbound.end_call(&room_name).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("Room {} deleted", room_name),
            })),
        ),
        Err(e) => {
            tracing::error!(room_name = %room_name, error = %e, "Hangup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
        }
    }
}

async fn twilio_voice(
    State(state): State<AppState>,
    Form(webhook): Form<twilio::VoiceWebhook>,
) -> impl IntoResponse {
    tracing::info!(
        call_sid = %webhook.call_sid.as_deref().unwrap_or("unknown"),
        from = %webhook.from.as_deref().unwrap_or("unknown"),
        to = %webhook.to.as_deref().unwrap_or("unknown"),
        "Inbound call webhook"
    );

    let sip_uri = &state.settings.media.sip_uri;
    let xml = if sip_uri.is_empty() {
        twilio::unavailable_response()
    } else {
        twilio::bridge_response(sip_uri)
    };

    ([(header::CONTENT_TYPE, "application/xml")], xml)
}

async fn twilio_status(Form(webhook): Form<twilio::StatusWebhook>) -> impl IntoResponse {
    twilio::log_status(&webhook);
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use laura_config::Settings;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let mut settings = Settings::default();
        settings.credentials.groq_api_key = "gsk_test".to_string();
        settings.credentials.elevenlabs_api_key = "el_test".to_string();
        settings.credentials.openai_api_key = "sk_test".to_string();
        settings.media.sip_uri = "sip:laura@sip.example.com".to_string();
        AppState::new(settings).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_session_count() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "laura-sdr");
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_voice_webhook_answers_with_twiml() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/twilio")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("CallSid=CA123&From=%2B5255&To=%2B5266"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/xml"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let xml = String::from_utf8(body.to_vec()).unwrap();
        assert!(xml.contains("<Sip>sip:laura@sip.example.com</Sip>"));
    }

    #[tokio::test]
    async fn test_voice_webhook_without_sip_uri_hangs_up() {
        let mut settings = Settings::default();
        settings.credentials.groq_api_key = "gsk_test".to_string();
        settings.credentials.elevenlabs_api_key = "el_test".to_string();
        settings.credentials.openai_api_key = "sk_test".to_string();
        settings.media.sip_uri.clear();
        let app = create_router(AppState::new(settings).unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/twilio")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("CallSid=CA123"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let xml = String::from_utf8(body.to_vec()).unwrap();
        assert!(xml.contains("<Hangup/>"));
    }

    #[tokio::test]
    async fn test_make_call_rejects_empty_number() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/make-call")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"phone_number": "  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_webhook_returns_plaintext_ok() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/twilio/status")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("CallSid=CA123&CallStatus=completed&CallDuration=42"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }
}
