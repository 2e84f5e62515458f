//! Configuration module for voice sessions
//!
//! This module handles session configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading and overrides
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_voice_session::config::SessionConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = SessionConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = SessionConfig::from_file(&PathBuf::from("session.yaml"))?;
//! println!("Negotiating with {}", config.signaling_url);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

mod env;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::realtime::{
    AudioFormat, DEFAULT_ICE_SERVER, DEFAULT_SIGNALING_URL, DEFAULT_TRANSCRIPTION_MODEL,
    InputAudioTranscription, MaxTokens, RealtimeModel, RealtimeVoice, TurnDetection,
    WireSessionConfig,
};
use crate::core::session::base::{SessionError, SessionResult};
use crate::core::transport::IceServer;

/// Server-side voice activity detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadSettings {
    /// Activation threshold (0.0 - 1.0)
    pub threshold: f32,
    /// Audio kept before detected speech (ms)
    pub prefix_padding_ms: u32,
    /// Silence that ends a user turn (ms)
    pub silence_duration_ms: u32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Timing knobs of the session pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Quiet period after the last delta before a transcript flush
    pub transcript_debounce: Duration,
    /// Retry interval while assistant text waits for a final user item
    pub assistant_gate_retry: Duration,
    /// Longest an assistant turn may go without reporting its end
    pub ai_fallback: Duration,
    /// How long a surfaced warning stays visible
    pub warning_ttl: Duration,
    /// Timeout for the signaling exchange
    pub signaling_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            transcript_debounce: Duration::from_millis(100),
            assistant_gate_retry: Duration::from_millis(250),
            ai_fallback: Duration::from_secs(30),
            warning_ttl: Duration::from_secs(5),
            signaling_timeout: Duration::from_secs(15),
        }
    }
}

/// Session configuration
///
/// Contains everything needed to negotiate and run one voice session:
/// - Credentials and signaling endpoint
/// - Model, voice and audio settings sent with `session.update`
/// - ICE servers for the peer transport
/// - Pipeline timings
#[derive(Clone)]
pub struct SessionConfig {
    /// Bearer key for the signaling endpoint, zeroized on drop
    pub api_key: Option<Zeroizing<String>>,
    pub signaling_url: String,
    pub model: RealtimeModel,
    pub voice: RealtimeVoice,
    pub instructions: Option<String>,
    pub transcription_model: String,
    pub audio_format: AudioFormat,
    pub temperature: f32,
    /// Negative means unlimited, `None` leaves the service default
    pub max_response_output_tokens: Option<i32>,
    pub vad: VadSettings,
    pub ice_servers: Vec<IceServer>,
    pub timing: TimingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            model: RealtimeModel::default(),
            voice: RealtimeVoice::default(),
            instructions: None,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            audio_format: AudioFormat::default(),
            temperature: 0.8,
            max_response_output_tokens: None,
            vad: VadSettings::default(),
            ice_servers: vec![IceServer::new(DEFAULT_ICE_SERVER)],
            timing: TimingConfig::default(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("signaling_url", &self.signaling_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("instructions", &self.instructions)
            .field("transcription_model", &self.transcription_model)
            .field("audio_format", &self.audio_format)
            .field("temperature", &self.temperature)
            .field("max_response_output_tokens", &self.max_response_output_tokens)
            .field("vad", &self.vad)
            .field("ice_servers", &self.ice_servers)
            .field("timing", &self.timing)
            .finish()
    }
}

impl SessionConfig {
    /// Load configuration from environment variables
    ///
    /// Expects `.env` to have been loaded already (the binary does this at startup).
    /// Unset variables fall back to defaults; the result is validated.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let mut config = env::load_from_env()?;
        yaml_config.apply(&mut config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Zeroizing::new(key.into()));
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.as_str())
    }

    /// Check the credentials before the first connection attempt.
    ///
    /// This is a shape check only; the signaling endpoint has the final word.
    pub fn validate_credentials(&self) -> SessionResult<()> {
        match self.api_key() {
            None => Err(SessionError::AuthenticationFailed(
                "API key not configured".to_string(),
            )),
            Some(key) if key.trim().is_empty() => Err(SessionError::AuthenticationFailed(
                "API key is empty".to_string(),
            )),
            Some(key) if key.chars().any(char::is_whitespace) => Err(
                SessionError::AuthenticationFailed("API key contains whitespace".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }

    /// The `session.update` payload for this configuration.
    pub fn to_wire_session(&self) -> WireSessionConfig {
        WireSessionConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: self.instructions.clone(),
            voice: Some(self.voice.wire_name().to_string()),
            input_audio_format: Some(self.audio_format.wire_name().to_string()),
            output_audio_format: Some(self.audio_format.wire_name().to_string()),
            input_audio_transcription: Some(InputAudioTranscription {
                model: self.transcription_model.clone(),
            }),
            turn_detection: Some(TurnDetection::ServerVad {
                threshold: Some(self.vad.threshold),
                prefix_padding_ms: Some(self.vad.prefix_padding_ms),
                silence_duration_ms: Some(self.vad.silence_duration_ms),
            }),
            temperature: Some(self.temperature),
            max_response_output_tokens: self.max_response_output_tokens.map(MaxTokens::from_limit),
        }
    }

    /// One line per setting, with the key redacted.
    pub fn summary(&self) -> Vec<String> {
        let key = match self.api_key() {
            Some(key) if key.chars().count() > 8 => {
                format!("{}…", key.chars().take(3).collect::<String>())
            }
            Some(_) => "<set>".to_string(),
            None => "<missing>".to_string(),
        };
        vec![
            format!("api_key: {key}"),
            format!("signaling_url: {}", self.signaling_url),
            format!("model: {}", self.model),
            format!("voice: {}", self.voice),
            format!("audio_format: {}", self.audio_format),
            format!("transcription_model: {}", self.transcription_model),
            format!("temperature: {}", self.temperature),
            format!(
                "vad: threshold={} prefix_padding_ms={} silence_duration_ms={}",
                self.vad.threshold, self.vad.prefix_padding_ms, self.vad.silence_duration_ms
            ),
            format!(
                "ice_servers: {}",
                self.ice_servers
                    .iter()
                    .flat_map(|s| s.urls.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            format!(
                "timing: debounce={:?} gate_retry={:?} ai_fallback={:?} warning_ttl={:?} signaling_timeout={:?}",
                self.timing.transcript_debounce,
                self.timing.assistant_gate_retry,
                self.timing.ai_fallback,
                self.timing.warning_ttl,
                self.timing.signaling_timeout
            ),
        ]
    }
}
