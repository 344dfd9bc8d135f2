//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Spoken-language code for STT/TTS (ISO 639-1)
    #[serde(default = "default_language")]
    pub language: String,

    /// HTTP control-surface configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Voice activity detection thresholds
    #[serde(default)]
    pub vad: VadSettings,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttConfig,

    /// Reply-generation configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Speech-synthesis configuration
    #[serde(default)]
    pub tts: TtsConfig,

    /// Agent persona and script
    #[serde(default)]
    pub agent: AgentConfig,

    /// Provider credentials (env-sourced)
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Media/room provider configuration
    #[serde(default)]
    pub media: MediaConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
            server: ServerConfig::default(),
            vad: VadSettings::default(),
            stt: SttConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
            agent: AgentConfig::default(),
            credentials: CredentialsConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// VAD thresholds
///
/// The hysteresis policy is a configuration contract: speech is reported
/// started only after `start_secs` of frames above threshold, and ended
/// only after `stop_secs` below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    /// Speech probability threshold (0.0 - 1.0)
    #[serde(default = "default_vad_confidence")]
    pub confidence: f32,
    /// Seconds of speech required to confirm an utterance start
    #[serde(default = "default_vad_start_secs")]
    pub start_secs: f32,
    /// Seconds of silence required to confirm an utterance end
    #[serde(default = "default_vad_stop_secs")]
    pub stop_secs: f32,
    /// Minimum volume (0.0 - 1.0) for a frame to count as speech
    #[serde(default = "default_vad_min_volume")]
    pub min_volume: f32,
    /// Expected frame duration in milliseconds
    #[serde(default = "default_vad_frame_ms")]
    pub frame_ms: u32,
    /// Expected input sample rate
    #[serde(default = "default_vad_sample_rate")]
    pub sample_rate: u32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            confidence: default_vad_confidence(),
            start_secs: default_vad_start_secs(),
            stop_secs: default_vad_stop_secs(),
            min_volume: default_vad_min_volume(),
            frame_ms: default_vad_frame_ms(),
            sample_rate: default_vad_sample_rate(),
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_stt_model")]
    pub model: String,
    #[serde(default = "default_groq_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: default_stt_model(),
            endpoint: default_groq_endpoint(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Reply-generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_groq_endpoint")]
    pub endpoint: String,
    /// Token budget for one assistant turn
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    /// Fixed creativity parameter matching the persona
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            endpoint: default_groq_endpoint(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Speech-synthesis configuration
///
/// `sample_rate` fixes the output format for every provider in the
/// fallback chain; downstream emission assumes a single format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub elevenlabs: TtsElevenLabsConfig,
    #[serde(default)]
    pub openai: TtsOpenAiConfig,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_tts_sample_rate(),
            elevenlabs: TtsElevenLabsConfig::default(),
            openai: TtsOpenAiConfig::default(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Primary synthesis provider (ElevenLabs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsElevenLabsConfig {
    #[serde(default = "default_elevenlabs_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model: String,
    #[serde(default = "default_elevenlabs_stability")]
    pub stability: f32,
    #[serde(default = "default_elevenlabs_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default = "default_elevenlabs_style")]
    pub style: f32,
    #[serde(default)]
    pub use_speaker_boost: bool,
    #[serde(default = "default_elevenlabs_streaming_latency")]
    pub optimize_streaming_latency: u8,
    #[serde(default = "default_elevenlabs_endpoint")]
    pub endpoint: String,
}

impl Default for TtsElevenLabsConfig {
    fn default() -> Self {
        Self {
            voice_id: default_elevenlabs_voice_id(),
            model: default_elevenlabs_model(),
            stability: default_elevenlabs_stability(),
            similarity_boost: default_elevenlabs_similarity_boost(),
            style: default_elevenlabs_style(),
            use_speaker_boost: false,
            optimize_streaming_latency: default_elevenlabs_streaming_latency(),
            endpoint: default_elevenlabs_endpoint(),
        }
    }
}

/// Fallback synthesis provider (OpenAI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsOpenAiConfig {
    #[serde(default = "default_openai_tts_voice")]
    pub voice: String,
    #[serde(default = "default_openai_tts_model")]
    pub model: String,
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
}

impl Default for TtsOpenAiConfig {
    fn default() -> Self {
        Self {
            voice: default_openai_tts_voice(),
            model: default_openai_tts_model(),
            endpoint: default_openai_endpoint(),
        }
    }
}

/// Agent persona and script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// System prompt seeding every session's dialogue history
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Scripted opening line, spoken when a participant connects
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
        }
    }
}

/// Provider credentials
///
/// Defaults read the conventional environment variables so deployment
/// works without a config file; empty values fail validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "env_groq_api_key")]
    pub groq_api_key: String,
    #[serde(default = "env_elevenlabs_api_key")]
    pub elevenlabs_api_key: String,
    #[serde(default = "env_openai_api_key")]
    pub openai_api_key: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            groq_api_key: env_groq_api_key(),
            elevenlabs_api_key: env_elevenlabs_api_key(),
            openai_api_key: env_openai_api_key(),
        }
    }
}

/// Media/room provider configuration (LiveKit-style REST surface)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_url")]
    pub url: String,
    #[serde(default = "env_livekit_api_key")]
    pub api_key: String,
    #[serde(default = "env_livekit_api_secret")]
    pub api_secret: String,
    /// SIP trunk used for outbound calls
    #[serde(default = "env_outbound_trunk_id")]
    pub outbound_trunk_id: String,
    /// SIP URI advertised to the telephony platform
    #[serde(default)]
    pub sip_uri: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            url: default_media_url(),
            api_key: env_livekit_api_key(),
            api_secret: env_livekit_api_secret(),
            outbound_trunk_id: env_outbound_trunk_id(),
            sip_uri: String::new(),
        }
    }
}

impl Settings {
    /// Validate settings at startup
    ///
    /// Missing credentials and out-of-range thresholds are fatal: the
    /// process must not start and fail later at first provider use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.groq_api_key.is_empty() {
            return Err(ConfigError::MissingCredential("GROQ_API_KEY"));
        }
        if self.credentials.elevenlabs_api_key.is_empty() {
            return Err(ConfigError::MissingCredential("ELEVENLABS_API_KEY"));
        }
        if self.credentials.openai_api_key.is_empty() {
            return Err(ConfigError::MissingCredential("OPENAI_API_KEY"));
        }
        if self.media.api_key.is_empty() {
            return Err(ConfigError::MissingCredential("LIVEKIT_API_KEY"));
        }
        if self.media.api_secret.is_empty() {
            return Err(ConfigError::MissingCredential("LIVEKIT_API_SECRET"));
        }

        if !(0.0..=1.0).contains(&self.vad.confidence) {
            return Err(ConfigError::InvalidValue {
                field: "vad.confidence",
                reason: format!("{} not in [0.0, 1.0]", self.vad.confidence),
            });
        }
        if !(0.0..=1.0).contains(&self.vad.min_volume) {
            return Err(ConfigError::InvalidValue {
                field: "vad.min_volume",
                reason: format!("{} not in [0.0, 1.0]", self.vad.min_volume),
            });
        }
        if self.vad.start_secs <= 0.0 || self.vad.stop_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "vad.start_secs/stop_secs",
                reason: "hold durations must be positive".to_string(),
            });
        }
        if self.vad.frame_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vad.frame_ms",
                reason: "frame duration must be positive".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature",
                reason: format!("{} not in [0.0, 2.0]", self.llm.temperature),
            });
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens",
                reason: "token budget must be positive".to_string(),
            });
        }
        if self.agent.system_prompt.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "agent.system_prompt",
                reason: "system prompt must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` >
/// built-in defaults. Validation runs before the settings are returned.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LAURA")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

fn default_language() -> String {
    "es".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_vad_confidence() -> f32 {
    0.8
}

fn default_vad_start_secs() -> f32 {
    0.2
}

fn default_vad_stop_secs() -> f32 {
    0.8
}

fn default_vad_min_volume() -> f32 {
    0.6
}

fn default_vad_frame_ms() -> u32 {
    20
}

fn default_vad_sample_rate() -> u32 {
    16000
}

fn default_stt_model() -> String {
    "whisper-large-v3-turbo".to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_llm_max_tokens() -> u32 {
    150
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_groq_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_tts_sample_rate() -> u32 {
    24000
}

fn default_elevenlabs_voice_id() -> String {
    "qHkrJuifPpn95wK3rm2A".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_flash_v2_5".to_string()
}

fn default_elevenlabs_stability() -> f32 {
    0.2
}

fn default_elevenlabs_similarity_boost() -> f32 {
    0.30
}

fn default_elevenlabs_style() -> f32 {
    1.0
}

fn default_elevenlabs_streaming_latency() -> u8 {
    4
}

fn default_elevenlabs_endpoint() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_openai_tts_voice() -> String {
    "nova".to_string()
}

fn default_openai_tts_model() -> String {
    "tts-1".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_agent_name() -> String {
    "laura-sdr".to_string()
}

fn default_system_prompt() -> String {
    "Rol: Laura, consultora IA de TDX. Directa, audaz, educada, mentalidad vendedora. \
     Estilo: voz rápida, respuestas de una frase, profesional y concisa. \
     Objetivo: identificar dolor tecnológico, proponer solución TDX (IA, automatización, \
     MVP en quince días) y agendar una reunión de veinticinco minutos. \
     Guía: saluda y preséntate (\"Laura, TDX\"); menciona retos clave de líderes \
     (atención lenta, sobrecarga, innovar rápido) y pregunta si resuenan; haz preguntas \
     muy cortas sobre el dolor relevante; conecta el dolor a una oferta TDX; cierra \
     agendando veinticinco minutos para ver resultados de casos similares. \
     Reglas: improvisa con tu estilo, espera al usuario y responde solo cuando hable, \
     escucha setenta por ciento y habla treinta, lenguaje profesional, números en \
     palabras. Tu meta es agendar la reunión."
        .to_string()
}

fn default_greeting() -> String {
    "¡Hola! Soy Laura de TDX. Ayudo a líderes empresariales con retos tecnológicos como \
     atención lenta, sobrecarga operativa y necesidad de innovar rápido. ¿Alguno de estos \
     temas resuena contigo?"
        .to_string()
}

fn default_media_url() -> String {
    std::env::var("LIVEKIT_URL").unwrap_or_default()
}

fn env_groq_api_key() -> String {
    std::env::var("GROQ_API_KEY").unwrap_or_default()
}

fn env_elevenlabs_api_key() -> String {
    std::env::var("ELEVENLABS_API_KEY").unwrap_or_default()
}

fn env_openai_api_key() -> String {
    std::env::var("OPENAI_API_KEY").unwrap_or_default()
}

fn env_livekit_api_key() -> String {
    std::env::var("LIVEKIT_API_KEY").unwrap_or_default()
}

fn env_livekit_api_secret() -> String {
    std::env::var("LIVEKIT_API_SECRET").unwrap_or_default()
}

fn env_outbound_trunk_id() -> String {
    std::env::var("OUTBOUND_TRUNK_ID").unwrap_or_default()
}
