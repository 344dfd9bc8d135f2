//! Speech turn orchestration
//!
//! Owns the per-session turn loop: frames go through VAD hysteresis and
//! accumulate into an utterance; a finished utterance runs one turn of
//! transcription, state machine update, reply generation and synthesis.
//!
//! Concurrency model: at most one turn is in flight per session, enforced
//! by a compare-and-swap on the `busy` flag before the first suspension
//! point. Interruption is best effort: it bumps a generation counter and
//! clears `busy`; the abandoned turn keeps running but its output is
//! discarded, and its cleanup cannot clear a successor turn's flag because
//! the clear is guarded by the generation it started with.

use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

use laura_agent::{ConversationSummary, SalesTracker};
use laura_core::{
    AudioBuffer, AudioFrame, DialogueHistory, ReplyGenerator, SpeechSynthesizer, SpeechToText,
};

use crate::vad::{EnergyVad, VadConfig, VadResult};
use crate::PipelineError;

/// Utterances are capped at this duration; older audio is dropped
const MAX_UTTERANCE: Duration = Duration::from_secs(30);

/// Per-session speech turn pipeline
pub struct SpeechTurnPipeline {
    session_id: String,
    vad: EnergyVad,
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn ReplyGenerator>,
    tts: Arc<dyn SpeechSynthesizer>,
    tracker: Mutex<SalesTracker>,
    history: Arc<Mutex<DialogueHistory>>,
    audio_out: mpsc::Sender<Vec<u8>>,
    utterance: Mutex<AudioBuffer>,
    utterance_seq: AtomicU64,
    busy: AtomicBool,
    generation: AtomicU64,
    // Self-handle so the frame loop can spawn turn tasks
    this: Weak<Self>,
}

impl SpeechTurnPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: impl Into<String>,
        vad_config: VadConfig,
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn ReplyGenerator>,
        tts: Arc<dyn SpeechSynthesizer>,
        history: Arc<Mutex<DialogueHistory>>,
        audio_out: mpsc::Sender<Vec<u8>>,
    ) -> Arc<Self> {
        let sample_rate = vad_config.sample_rate;
        Arc::new_cyclic(|this| Self {
            session_id: session_id.into(),
            vad: EnergyVad::new(vad_config),
            stt,
            llm,
            tts,
            tracker: Mutex::new(SalesTracker::new()),
            history,
            audio_out,
            utterance: Mutex::new(AudioBuffer::new(
                sample_rate,
                laura_core::Channels::Mono,
                MAX_UTTERANCE,
            )),
            utterance_seq: AtomicU64::new(0),
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            this: this.clone(),
        })
    }

    /// Feed one inbound audio frame
    ///
    /// Runs VAD and utterance accumulation inline; a finished utterance is
    /// processed on a spawned task so the frame loop never stalls behind
    /// provider calls.
    pub fn process_frame(&self, mut frame: AudioFrame) -> Result<(), PipelineError> {
        let (_state, _probability, result) = self.vad.process(&mut frame)?;

        match result {
            VadResult::Silence => {
                // Discard any false-start audio
                let mut utterance = self.utterance.lock();
                if !utterance.is_empty() {
                    utterance.clear();
                }
            }

            VadResult::PotentialSpeechStart
            | VadResult::SpeechContinue
            | VadResult::PotentialSpeechEnd => {
                self.utterance.lock().push(&frame);
            }

            VadResult::SpeechConfirmed => {
                // The caller started talking over us
                if self.busy.load(Ordering::Acquire) {
                    self.handle_interruption();
                }
                self.utterance.lock().push(&frame);
            }

            VadResult::SpeechEnd => {
                self.utterance.lock().push(&frame);
                let sequence = self.utterance_seq.fetch_add(1, Ordering::Relaxed);
                let utterance = self.utterance.lock().take_frame(sequence);
                tracing::debug!(
                    session_id = %self.session_id,
                    duration_ms = utterance.duration_ms(),
                    "Utterance complete"
                );

                if let Some(pipeline) = self.this.upgrade() {
                    tokio::spawn(async move {
                        pipeline.process_speech_pipeline(utterance).await;
                    });
                }
            }
        }

        Ok(())
    }

    /// Run one full conversational turn from a finished utterance
    ///
    /// Single flight: if a turn is already in progress the utterance is
    /// dropped entirely. The busy flag is claimed before the first await.
    pub async fn process_speech_pipeline(&self, utterance: AudioFrame) {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(
                session_id = %self.session_id,
                "Turn already in flight, dropping utterance"
            );
            return;
        }
        let generation = self.generation.load(Ordering::Acquire);

        let text = match self.stt.transcribe(&utterance).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.finish_turn(generation);
                return;
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "Dropping malformed utterance"
                );
                self.finish_turn(generation);
                return;
            }
        };

        tracing::info!(session_id = %self.session_id, text = %text, "User said");

        {
            let mut tracker = self.tracker.lock();
            tracker.observe_user_utterance(&text);
            if tracker.should_close_conversation() {
                tracing::info!(
                    session_id = %self.session_id,
                    summary = ?tracker.summary(),
                    "Meeting scheduled, conversation ready to close"
                );
            }
        }
        self.history.lock().push_user(&text);

        let mut reply = String::new();
        {
            let mut fragments = self.llm.generate_response(&text);
            while let Some(fragment) = fragments.next().await {
                if self.generation.load(Ordering::Acquire) != generation {
                    tracing::debug!(
                        session_id = %self.session_id,
                        "Turn interrupted during reply generation"
                    );
                    self.finish_turn(generation);
                    return;
                }
                reply.push_str(&fragment);
            }
        }

        if reply.is_empty() {
            self.finish_turn(generation);
            return;
        }
        self.history.lock().push_assistant(&reply);
        tracing::info!(
            session_id = %self.session_id,
            reply_chars = reply.len(),
            "Assistant reply ready"
        );

        let mut chunks = self.tts.synthesize(&reply, true);
        while let Some(item) = chunks.next().await {
            if self.generation.load(Ordering::Acquire) != generation {
                tracing::debug!(
                    session_id = %self.session_id,
                    "Turn interrupted during synthesis"
                );
                break;
            }
            match item {
                Ok(chunk) => {
                    if self.audio_out.send(chunk).await.is_err() {
                        tracing::debug!(
                            session_id = %self.session_id,
                            "Audio sink closed, stopping emission"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %self.session_id, error = %e, "Synthesis error");
                    break;
                }
            }
        }

        self.finish_turn(generation);
    }

    /// Clear the busy flag, unless a successor turn owns it
    fn finish_turn(&self, generation: u64) {
        if self.generation.load(Ordering::Acquire) == generation {
            self.busy.store(false, Ordering::Release);
        }
    }

    /// Abandon the in-flight turn, if any
    ///
    /// Provider calls are not cancelled; the stale turn's output is
    /// discarded via the generation counter.
    pub fn handle_interruption(&self) {
        if self.busy.load(Ordering::Acquire) {
            self.generation.fetch_add(1, Ordering::AcqRel);
            self.busy.store(false, Ordering::Release);
            tracing::info!(session_id = %self.session_id, "Turn interrupted by caller");
        }
    }

    /// Clear the reply generator's running history
    ///
    /// The sales tracker is deliberately untouched; script progress
    /// survives a conversation restart.
    pub fn reset_conversation(&self) {
        self.llm.clear_history();
        tracing::info!(session_id = %self.session_id, "Conversation history reset");
    }

    /// Synthesize a scripted line straight to the audio sink
    pub async fn speak(&self, text: &str) {
        let mut chunks = self.tts.synthesize(text, true);
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    if self.audio_out.send(chunk).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %self.session_id, error = %e, "Synthesis error");
                    break;
                }
            }
        }
    }

    /// Whether a turn is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the sales state machine
    pub fn tracker_summary(&self) -> ConversationSummary {
        self.tracker.lock().summary()
    }

    /// Whether the script has completed with a booked meeting
    pub fn should_close_conversation(&self) -> bool {
        self.tracker.lock().should_close_conversation()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
