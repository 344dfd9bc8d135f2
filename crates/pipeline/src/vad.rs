//! Energy-based voice activity detection with hysteresis
//!
//! Frame-level detection: a frame counts as speech when its energy-derived
//! probability clears the confidence threshold and its peak amplitude
//! clears the volume floor. Utterance boundaries come from hysteresis, not
//! single frames: speech is confirmed only after `min_speech_frames`
//! consecutive speech frames, and ended only after `min_silence_frames`
//! consecutive silence frames. Brief pauses inside an utterance therefore
//! never split it.

use parking_lot::Mutex;

use laura_config::VadSettings;
use laura_core::{AudioFrame, Channels, SampleRate};

use crate::PipelineError;

/// VAD configuration
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Speech probability threshold (0.0 - 1.0)
    pub threshold: f32,
    /// Minimum peak amplitude (0.0 - 1.0) for a frame to count as speech
    pub min_volume: f32,
    /// Expected frame duration in milliseconds
    pub frame_ms: u32,
    /// Consecutive speech frames required to confirm an utterance start
    pub min_speech_frames: usize,
    /// Consecutive silence frames required to confirm an utterance end
    pub min_silence_frames: usize,
    /// Expected input sample rate
    pub sample_rate: SampleRate,
    /// Energy floor in dB for quick silence rejection
    pub energy_floor_db: f32,
}

impl VadConfig {
    /// Derive a frame-count configuration from duration-based settings
    pub fn from_settings(settings: &VadSettings) -> Result<Self, PipelineError> {
        let sample_rate = SampleRate::from_u32(settings.sample_rate).ok_or_else(|| {
            PipelineError::Vad(format!("unsupported sample rate {}", settings.sample_rate))
        })?;

        let frames_for = |secs: f32| -> usize {
            ((secs * 1000.0 / settings.frame_ms as f32).ceil() as usize).max(1)
        };

        Ok(Self {
            threshold: settings.confidence,
            min_volume: settings.min_volume,
            frame_ms: settings.frame_ms,
            min_speech_frames: frames_for(settings.start_secs),
            min_silence_frames: frames_for(settings.stop_secs),
            sample_rate,
            energy_floor_db: -50.0,
        })
    }
}

/// VAD hysteresis state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    /// No speech detected
    #[default]
    Silence,
    /// Potential speech start (accumulating)
    SpeechStart,
    /// Active speech confirmed
    Speech,
    /// Potential speech end (accumulating silence)
    SpeechEnd,
}

/// Per-frame detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadResult {
    /// Silence
    Silence,
    /// Potential speech start (below confirmation duration)
    PotentialSpeechStart,
    /// Speech confirmed (confirmation duration met)
    SpeechConfirmed,
    /// Speech continuing
    SpeechContinue,
    /// Potential speech end (accumulating silence)
    PotentialSpeechEnd,
    /// Speech ended (silence duration met)
    SpeechEnd,
}

struct VadMutableState {
    state: VadState,
    speech_frames: usize,
    silence_frames: usize,
}

/// Energy-based VAD
pub struct EnergyVad {
    config: VadConfig,
    mutable: Mutex<VadMutableState>,
}

impl EnergyVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            mutable: Mutex::new(VadMutableState {
                state: VadState::Silence,
                speech_frames: 0,
                silence_frames: 0,
            }),
        }
    }

    /// Process one audio frame
    ///
    /// Returns (current_state, speech_probability, detailed_result).
    /// Frames that do not match the configured format are rejected; the
    /// caller drops them without touching hysteresis state.
    pub fn process(
        &self,
        frame: &mut AudioFrame,
    ) -> Result<(VadState, f32, VadResult), PipelineError> {
        if frame.sample_rate != self.config.sample_rate || frame.channels != Channels::Mono {
            return Err(laura_core::Error::InvalidAudioFormat {
                expected: format!("{} Hz mono", self.config.sample_rate.as_u32()),
                got: format!(
                    "{} Hz {:?}",
                    frame.sample_rate.as_u32(),
                    frame.channels
                ),
            }
            .into());
        }
        if frame.samples.is_empty() {
            return Err(laura_core::Error::InvalidAudioFormat {
                expected: "non-empty frame".to_string(),
                got: "0 samples".to_string(),
            }
            .into());
        }

        // Quick rejection of obvious silence
        if frame.energy_db < self.config.energy_floor_db {
            frame.vad_probability = Some(0.0);
            frame.is_speech = false;

            let mut state = self.mutable.lock();
            return Ok(self.update_state(&mut state, false, 0.0));
        }

        let probability = self.speech_probability(frame.energy_db);
        let peak = frame
            .samples
            .iter()
            .fold(0.0f32, |max, s| max.max(s.abs()));

        let is_speech =
            probability >= self.config.threshold && peak >= self.config.min_volume;
        frame.vad_probability = Some(probability);
        frame.is_speech = is_speech;

        let mut state = self.mutable.lock();
        Ok(self.update_state(&mut state, is_speech, probability))
    }

    /// Map frame energy to a pseudo-probability above the floor
    fn speech_probability(&self, energy_db: f32) -> f32 {
        let threshold_db = self.config.energy_floor_db + 10.0;
        if energy_db > threshold_db {
            ((energy_db - threshold_db) / 30.0).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn update_state(
        &self,
        state: &mut VadMutableState,
        is_speech: bool,
        probability: f32,
    ) -> (VadState, f32, VadResult) {
        let result = match (state.state, is_speech) {
            (VadState::Silence, true) => {
                state.state = VadState::SpeechStart;
                state.speech_frames = 1;
                state.silence_frames = 0;
                if state.speech_frames >= self.config.min_speech_frames {
                    state.state = VadState::Speech;
                    VadResult::SpeechConfirmed
                } else {
                    VadResult::PotentialSpeechStart
                }
            }

            (VadState::SpeechStart, true) => {
                state.speech_frames += 1;
                if state.speech_frames >= self.config.min_speech_frames {
                    state.state = VadState::Speech;
                    VadResult::SpeechConfirmed
                } else {
                    VadResult::PotentialSpeechStart
                }
            }

            // False start, fall straight back to silence
            (VadState::SpeechStart, false) => {
                state.state = VadState::Silence;
                state.speech_frames = 0;
                VadResult::Silence
            }

            (VadState::Speech, true) => {
                state.silence_frames = 0;
                VadResult::SpeechContinue
            }

            (VadState::Speech, false) => {
                state.state = VadState::SpeechEnd;
                state.silence_frames = 1;
                if state.silence_frames >= self.config.min_silence_frames {
                    state.state = VadState::Silence;
                    state.speech_frames = 0;
                    state.silence_frames = 0;
                    VadResult::SpeechEnd
                } else {
                    VadResult::PotentialSpeechEnd
                }
            }

            // Speech resumed inside the hold window
            (VadState::SpeechEnd, true) => {
                state.state = VadState::Speech;
                state.silence_frames = 0;
                VadResult::SpeechContinue
            }

            (VadState::SpeechEnd, false) => {
                state.silence_frames += 1;
                if state.silence_frames >= self.config.min_silence_frames {
                    state.state = VadState::Silence;
                    state.speech_frames = 0;
                    state.silence_frames = 0;
                    VadResult::SpeechEnd
                } else {
                    VadResult::PotentialSpeechEnd
                }
            }

            (VadState::Silence, false) => VadResult::Silence,
        };

        (state.state, probability, result)
    }

    /// Reset hysteresis state
    pub fn reset(&self) {
        let mut state = self.mutable.lock();
        state.state = VadState::Silence;
        state.speech_frames = 0;
        state.silence_frames = 0;
    }

    /// Current hysteresis state
    pub fn state(&self) -> VadState {
        self.mutable.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VadConfig {
        VadConfig {
            threshold: 0.8,
            min_volume: 0.6,
            frame_ms: 20,
            min_speech_frames: 3,
            min_silence_frames: 2,
            sample_rate: SampleRate::Hz16000,
            energy_floor_db: -50.0,
        }
    }

    fn loud_frame(sequence: u64) -> AudioFrame {
        AudioFrame::new(vec![0.8; 320], SampleRate::Hz16000, Channels::Mono, sequence)
    }

    fn silent_frame(sequence: u64) -> AudioFrame {
        AudioFrame::new(vec![0.0; 320], SampleRate::Hz16000, Channels::Mono, sequence)
    }

    #[test]
    fn test_from_settings_derives_frame_counts() {
        let settings = VadSettings::default();
        let config = VadConfig::from_settings(&settings).unwrap();

        // 0.2s start / 0.8s stop at 20ms frames
        assert_eq!(config.min_speech_frames, 10);
        assert_eq!(config.min_silence_frames, 40);
        assert_eq!(config.sample_rate, SampleRate::Hz16000);
    }

    #[test]
    fn test_unsupported_sample_rate_rejected() {
        let settings = VadSettings {
            sample_rate: 11025,
            ..VadSettings::default()
        };
        assert!(VadConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn test_speech_confirmed_after_hold() {
        let vad = EnergyVad::new(test_config());

        let (_, _, r1) = vad.process(&mut loud_frame(0)).unwrap();
        assert_eq!(r1, VadResult::PotentialSpeechStart);
        let (_, _, r2) = vad.process(&mut loud_frame(1)).unwrap();
        assert_eq!(r2, VadResult::PotentialSpeechStart);
        let (state, prob, r3) = vad.process(&mut loud_frame(2)).unwrap();
        assert_eq!(r3, VadResult::SpeechConfirmed);
        assert_eq!(state, VadState::Speech);
        assert!(prob >= 0.8);
    }

    #[test]
    fn test_false_start_returns_to_silence() {
        let vad = EnergyVad::new(test_config());

        vad.process(&mut loud_frame(0)).unwrap();
        let (state, _, result) = vad.process(&mut silent_frame(1)).unwrap();
        assert_eq!(state, VadState::Silence);
        assert_eq!(result, VadResult::Silence);
    }

    #[test]
    fn test_speech_ends_after_silence_hold() {
        let vad = EnergyVad::new(test_config());

        for seq in 0..3 {
            vad.process(&mut loud_frame(seq)).unwrap();
        }
        assert_eq!(vad.state(), VadState::Speech);

        let (_, _, r1) = vad.process(&mut silent_frame(3)).unwrap();
        assert_eq!(r1, VadResult::PotentialSpeechEnd);
        let (state, _, r2) = vad.process(&mut silent_frame(4)).unwrap();
        assert_eq!(r2, VadResult::SpeechEnd);
        assert_eq!(state, VadState::Silence);
    }

    #[test]
    fn test_brief_pause_does_not_split_utterance() {
        let vad = EnergyVad::new(test_config());

        for seq in 0..3 {
            vad.process(&mut loud_frame(seq)).unwrap();
        }

        // One silent frame is inside the hold window
        let (_, _, pause) = vad.process(&mut silent_frame(3)).unwrap();
        assert_eq!(pause, VadResult::PotentialSpeechEnd);

        let (state, _, resumed) = vad.process(&mut loud_frame(4)).unwrap();
        assert_eq!(resumed, VadResult::SpeechContinue);
        assert_eq!(state, VadState::Speech);
    }

    #[test]
    fn test_low_volume_not_speech() {
        let vad = EnergyVad::new(test_config());

        // Energetic enough for a high probability, but below the volume floor
        let mut frame =
            AudioFrame::new(vec![0.3; 320], SampleRate::Hz16000, Channels::Mono, 0);
        let (state, _, result) = vad.process(&mut frame).unwrap();
        assert_eq!(state, VadState::Silence);
        assert_eq!(result, VadResult::Silence);
        assert!(!frame.is_speech);
    }

    #[test]
    fn test_malformed_frame_rejected_without_state_change() {
        let vad = EnergyVad::new(test_config());

        let mut wrong_rate =
            AudioFrame::new(vec![0.8; 320], SampleRate::Hz48000, Channels::Mono, 0);
        assert!(vad.process(&mut wrong_rate).is_err());

        let mut stereo =
            AudioFrame::new(vec![0.8; 640], SampleRate::Hz16000, Channels::Stereo, 0);
        assert!(vad.process(&mut stereo).is_err());

        let mut empty = AudioFrame::new(vec![], SampleRate::Hz16000, Channels::Mono, 0);
        assert!(vad.process(&mut empty).is_err());

        assert_eq!(vad.state(), VadState::Silence);
    }

    #[test]
    fn test_reset_clears_hysteresis() {
        let vad = EnergyVad::new(test_config());
        for seq in 0..3 {
            vad.process(&mut loud_frame(seq)).unwrap();
        }
        assert_eq!(vad.state(), VadState::Speech);

        vad.reset();
        assert_eq!(vad.state(), VadState::Silence);
    }
}
