//! Per-participant voice sessions
//!
//! One session per connected participant identity: a fresh speech turn
//! pipeline, sales tracker and dialogue history, all discarded when the
//! participant leaves. Reconnecting under the same identity starts over
//! with a brand-new session.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use laura_config::Settings;
use laura_core::{AudioFrame, DialogueHistory, SpeechSynthesizer};
use laura_llm::GroqChat;
use laura_pipeline::{
    ElevenLabsTts, FallbackSynthesizer, GroqStt, OpenAiTts, SpeechTurnPipeline, VadConfig,
};

use crate::ServerError;

/// A live voice session bound to one participant
pub struct Session {
    pub id: String,
    pub identity: String,
    pub pipeline: Arc<SpeechTurnPipeline>,
    pub history: Arc<Mutex<DialogueHistory>>,
    pub created_at: DateTime<Utc>,
    active: AtomicBool,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Registry of live sessions keyed by participant identity
pub struct SessionManager {
    settings: Arc<Settings>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn get(&self, identity: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(identity).cloned()
    }

    /// Build the capability stack for one session
    fn build_session(
        &self,
        identity: &str,
        audio_out: mpsc::Sender<Vec<u8>>,
    ) -> Result<Arc<Session>, ServerError> {
        let settings = &self.settings;

        let vad_config = VadConfig::from_settings(&settings.vad)
            .map_err(|e| ServerError::Session(e.to_string()))?;

        let stt = Arc::new(GroqStt::new(
            settings.stt.clone(),
            settings.credentials.groq_api_key.clone(),
            settings.language.clone(),
        )?);

        let llm = Arc::new(GroqChat::new(
            settings.llm.clone(),
            settings.credentials.groq_api_key.clone(),
            settings.agent.system_prompt.clone(),
        )?);

        let elevenlabs = Arc::new(ElevenLabsTts::new(
            settings.tts.elevenlabs.clone(),
            settings.tts.sample_rate,
            settings.tts.timeout_secs,
            settings.credentials.elevenlabs_api_key.clone(),
        )?);
        let openai = Arc::new(OpenAiTts::new(
            settings.tts.openai.clone(),
            settings.tts.timeout_secs,
            settings.credentials.openai_api_key.clone(),
        )?);
        let tts = Arc::new(FallbackSynthesizer::new(vec![
            elevenlabs as Arc<dyn SpeechSynthesizer>,
            openai as Arc<dyn SpeechSynthesizer>,
        ]));

        let history = Arc::new(Mutex::new(DialogueHistory::new(
            settings.agent.system_prompt.clone(),
        )));

        let id = Uuid::new_v4().to_string();
        let pipeline = SpeechTurnPipeline::new(
            id.clone(),
            vad_config,
            stt,
            llm,
            tts,
            history.clone(),
            audio_out,
        );

        Ok(Arc::new(Session {
            id,
            identity: identity.to_string(),
            pipeline,
            history,
            created_at: Utc::now(),
            active: AtomicBool::new(true),
        }))
    }

    /// A participant joined: start a fresh session and speak the greeting
    ///
    /// Any existing session under the same identity is discarded first.
    pub fn on_participant_connected(
        &self,
        identity: &str,
        audio_out: mpsc::Sender<Vec<u8>>,
    ) -> Result<Arc<Session>, ServerError> {
        if let Some(previous) = self.sessions.write().remove(identity) {
            previous.deactivate();
            tracing::info!(
                identity = %identity,
                session_id = %previous.id,
                "Replacing existing session on reconnect"
            );
        }

        let session = self.build_session(identity, audio_out)?;
        self.sessions
            .write()
            .insert(identity.to_string(), session.clone());

        tracing::info!(
            identity = %identity,
            session_id = %session.id,
            "Session started"
        );

        let greeting = self.settings.agent.greeting.clone();
        let greeting_session = session.clone();
        tokio::spawn(async move {
            greeting_session.history.lock().push_assistant(&greeting);
            greeting_session.pipeline.speak(&greeting).await;
        });

        Ok(session)
    }

    /// A participant left: tear the session down (no-op for unknown identities)
    pub fn on_participant_disconnected(&self, identity: &str) {
        let removed = self.sessions.write().remove(identity);
        match removed {
            Some(session) => {
                session.deactivate();
                let summary = session.pipeline.tracker_summary();
                tracing::info!(
                    identity = %identity,
                    session_id = %session.id,
                    stage = ?summary.stage,
                    meeting_scheduled = summary.meeting_scheduled,
                    "Session ended"
                );
            }
            None => {
                tracing::debug!(identity = %identity, "Disconnect for unknown identity");
            }
        }
    }

    /// Inbound audio for a participant; silently dropped for unknown
    /// or inactive identities
    pub fn on_audio_frame(&self, identity: &str, frame: AudioFrame) {
        let Some(session) = self.get(identity) else {
            return;
        };
        if !session.is_active() {
            return;
        }
        if let Err(e) = session.pipeline.process_frame(frame) {
            tracing::debug!(
                session_id = %session.id,
                error = %e,
                "Dropped audio frame"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laura_core::{Channels, SampleRate};

    fn test_settings() -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.credentials.groq_api_key = "gsk_test".to_string();
        settings.credentials.elevenlabs_api_key = "el_test".to_string();
        settings.credentials.openai_api_key = "sk_test".to_string();
        // Nothing listens here; spawned greeting synthesis fails silently
        let unreachable = "http://127.0.0.1:9".to_string();
        settings.stt.endpoint = unreachable.clone();
        settings.llm.endpoint = unreachable.clone();
        settings.tts.elevenlabs.endpoint = unreachable.clone();
        settings.tts.openai.endpoint = unreachable;
        Arc::new(settings)
    }

    fn frame() -> AudioFrame {
        AudioFrame::new(
            vec![0.0f32; 320],
            SampleRate::Hz16000,
            Channels::Mono,
            0,
        )
    }

    #[tokio::test]
    async fn test_disconnect_unknown_identity_is_noop() {
        let manager = SessionManager::new(test_settings());
        manager.on_participant_disconnected("ghost");
        assert_eq!(manager.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_session() {
        let manager = SessionManager::new(test_settings());
        let (tx, _rx) = mpsc::channel(8);
        let first = manager.on_participant_connected("caller", tx.clone()).unwrap();
        let second = manager.on_participant_connected("caller", tx).unwrap();

        assert_ne!(first.id, second.id);
        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(manager.active_sessions(), 1);
    }

    #[tokio::test]
    async fn test_audio_for_unknown_identity_is_dropped() {
        let manager = SessionManager::new(test_settings());
        manager.on_audio_frame("ghost", frame());
    }

    #[tokio::test]
    async fn test_disconnect_removes_session() {
        let manager = SessionManager::new(test_settings());
        let (tx, _rx) = mpsc::channel(8);
        manager.on_participant_connected("caller", tx).unwrap();
        assert_eq!(manager.active_sessions(), 1);

        manager.on_participant_disconnected("caller");
        assert_eq!(manager.active_sessions(), 0);
        assert!(manager.get("caller").is_none());
    }
}
