use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

use super::SessionConfig;
use super::env::parse_ice_servers;
use crate::core::realtime::select;
use crate::core::transport::IceServer;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// realtime:
///   api_key: "sk-..."
///   signaling_url: "https://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview"
///   voice: "alloy"
///   instructions: "You are a helpful assistant."
///   temperature: 0.8
///   max_response_output_tokens: 4096
///
/// audio:
///   format: "pcm16"
///   transcription_model: "whisper-1"
///
/// vad:
///   threshold: 0.5
///   prefix_padding_ms: 300
///   silence_duration_ms: 500
///
/// ice_servers:
///   - urls: ["stun:stun.l.google.com:19302"]
///   - urls: ["turn:turn.example.org:3478"]
///     username: "user"
///     credential: "secret"
///
/// timing:
///   transcript_debounce_ms: 100
///   assistant_gate_retry_ms: 250
///   ai_fallback_ms: 30000
///   warning_ttl_ms: 5000
///   signaling_timeout_ms: 15000
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub realtime: Option<RealtimeYaml>,
    pub audio: Option<AudioYaml>,
    pub vad: Option<VadYaml>,
    pub ice_servers: Option<IceServersYaml>,
    pub timing: Option<TimingYaml>,
}

/// Realtime service settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub signaling_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub temperature: Option<f32>,
    /// Negative for unlimited
    pub max_response_output_tokens: Option<i32>,
}

/// Audio settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    /// "pcm16", "g711_ulaw" or "g711_alaw"
    pub format: Option<String>,
    pub transcription_model: Option<String>,
}

/// Server VAD settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VadYaml {
    /// Speech probability threshold (0.0 - 1.0)
    pub threshold: Option<f32>,
    pub prefix_padding_ms: Option<u32>,
    pub silence_duration_ms: Option<u32>,
}

/// ICE servers as a list of entries or a comma separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IceServersYaml {
    List(Vec<IceServer>),
    Inline(String),
}

/// Pipeline timings from YAML, all in milliseconds
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimingYaml {
    pub transcript_debounce_ms: Option<u64>,
    pub assistant_gate_retry_ms: Option<u64>,
    pub ai_fallback_ms: Option<u64>,
    pub warning_ttl_ms: Option<u64>,
    pub signaling_timeout_ms: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Override `config` with every value present in this file.
    pub fn apply(&self, config: &mut SessionConfig) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(realtime) = &self.realtime {
            if let Some(key) = &realtime.api_key {
                config.api_key = Some(Zeroizing::new(key.clone()));
            }
            if let Some(url) = &realtime.signaling_url {
                config.signaling_url = url.clone();
            }
            if let Some(model) = &realtime.model {
                config.model = select(model);
            }
            if let Some(voice) = &realtime.voice {
                config.voice = select(voice);
            }
            if let Some(instructions) = &realtime.instructions {
                config.instructions = Some(instructions.clone());
            }
            if let Some(temperature) = realtime.temperature {
                config.temperature = temperature;
            }
            if let Some(tokens) = realtime.max_response_output_tokens {
                config.max_response_output_tokens = Some(tokens);
            }
        }

        if let Some(audio) = &self.audio {
            if let Some(format) = &audio.format {
                config.audio_format = select(format);
            }
            if let Some(model) = &audio.transcription_model {
                config.transcription_model = model.clone();
            }
        }

        if let Some(vad) = &self.vad {
            if let Some(threshold) = vad.threshold {
                config.vad.threshold = threshold;
            }
            if let Some(padding) = vad.prefix_padding_ms {
                config.vad.prefix_padding_ms = padding;
            }
            if let Some(silence) = vad.silence_duration_ms {
                config.vad.silence_duration_ms = silence;
            }
        }

        match &self.ice_servers {
            Some(IceServersYaml::List(servers)) => config.ice_servers = servers.clone(),
            Some(IceServersYaml::Inline(raw)) => config.ice_servers = parse_ice_servers(raw),
            None => {}
        }

        if let Some(timing) = &self.timing {
            let overrides = [
                (timing.transcript_debounce_ms, &mut config.timing.transcript_debounce),
                (timing.assistant_gate_retry_ms, &mut config.timing.assistant_gate_retry),
                (timing.ai_fallback_ms, &mut config.timing.ai_fallback),
                (timing.warning_ttl_ms, &mut config.timing.warning_ttl),
                (timing.signaling_timeout_ms, &mut config.timing.signaling_timeout),
            ];
            for (value, slot) in overrides {
                if let Some(ms) = value {
                    *slot = Duration::from_millis(ms);
                }
            }
        }

        Ok(())
    }
}
