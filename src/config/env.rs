use std::env;
use std::str::FromStr;
use std::time::Duration;

use zeroize::Zeroizing;

use super::SessionConfig;
use crate::core::realtime::select;
use crate::core::transport::IceServer;

/// Read a variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable with a readable error naming it.
fn parse_env<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} ('{raw}'): {e}").into()),
        None => Ok(None),
    }
}

fn parse_millis(name: &str) -> Result<Option<Duration>, Box<dyn std::error::Error>> {
    Ok(parse_env::<u64>(name)?.map(Duration::from_millis))
}

/// Split a comma separated ICE server list.
pub(super) fn parse_ice_servers(raw: &str) -> Vec<IceServer> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(IceServer::new)
        .collect()
}

/// Build a configuration from the process environment on top of defaults.
pub(super) fn load_from_env() -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = SessionConfig::default();

    if let Some(key) = env_var("OPENAI_API_KEY") {
        config.api_key = Some(Zeroizing::new(key));
    }
    if let Some(url) = env_var("REALTIME_SIGNALING_URL") {
        config.signaling_url = url;
    }
    if let Some(model) = env_var("REALTIME_MODEL") {
        config.model = select(&model);
    }
    if let Some(voice) = env_var("REALTIME_VOICE") {
        config.voice = select(&voice);
    }
    if let Some(instructions) = env_var("REALTIME_INSTRUCTIONS") {
        config.instructions = Some(instructions);
    }
    if let Some(model) = env_var("REALTIME_TRANSCRIPTION_MODEL") {
        config.transcription_model = model;
    }
    if let Some(format) = env_var("REALTIME_AUDIO_FORMAT") {
        config.audio_format = select(&format);
    }
    if let Some(temperature) = parse_env::<f32>("REALTIME_TEMPERATURE")? {
        config.temperature = temperature;
    }
    if let Some(tokens) = parse_env::<i32>("REALTIME_MAX_OUTPUT_TOKENS")? {
        config.max_response_output_tokens = Some(tokens);
    }

    // VAD
    if let Some(threshold) = parse_env::<f32>("REALTIME_VAD_THRESHOLD")? {
        config.vad.threshold = threshold;
    }
    if let Some(padding) = parse_env::<u32>("REALTIME_VAD_PREFIX_PADDING_MS")? {
        config.vad.prefix_padding_ms = padding;
    }
    if let Some(silence) = parse_env::<u32>("REALTIME_VAD_SILENCE_MS")? {
        config.vad.silence_duration_ms = silence;
    }

    if let Some(servers) = env_var("REALTIME_ICE_SERVERS") {
        config.ice_servers = parse_ice_servers(&servers);
    }

    // Timing
    if let Some(d) = parse_millis("REALTIME_TRANSCRIPT_DEBOUNCE_MS")? {
        config.timing.transcript_debounce = d;
    }
    if let Some(d) = parse_millis("REALTIME_ASSISTANT_GATE_RETRY_MS")? {
        config.timing.assistant_gate_retry = d;
    }
    if let Some(d) = parse_millis("REALTIME_AI_FALLBACK_MS")? {
        config.timing.ai_fallback = d;
    }
    if let Some(d) = parse_millis("REALTIME_WARNING_TTL_MS")? {
        config.timing.warning_ttl = d;
    }
    if let Some(d) = parse_millis("REALTIME_SIGNALING_TIMEOUT_MS")? {
        config.timing.signaling_timeout = d;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ice_servers() {
        let servers = parse_ice_servers(" stun:a:3478 ,, turn:b:3478 ");
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].urls, vec!["stun:a:3478".to_string()]);
        assert_eq!(servers[1].urls, vec!["turn:b:3478".to_string()]);
        assert!(parse_ice_servers("").is_empty());
    }
}
