use std::time::Duration;
use url::Url;

use super::SessionConfig;

/// Temperature bounds accepted by the realtime service.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.6..=1.2;

/// Validate a fully merged configuration.
///
/// Credentials are not checked here; a session validates them before its first
/// connection attempt so `check-config` can still report everything else.
pub(super) fn validate(config: &SessionConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_signaling_url(&config.signaling_url)?;

    if !TEMPERATURE_RANGE.contains(&config.temperature) {
        return Err(format!(
            "temperature must be between {} and {}, got {}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end(),
            config.temperature
        )
        .into());
    }

    if !(0.0..=1.0).contains(&config.vad.threshold) {
        return Err(format!(
            "vad threshold must be between 0.0 and 1.0, got {}",
            config.vad.threshold
        )
        .into());
    }

    if config.transcription_model.trim().is_empty() {
        return Err("transcription model must not be empty".into());
    }

    for (name, value) in [
        ("transcript_debounce", config.timing.transcript_debounce),
        ("assistant_gate_retry", config.timing.assistant_gate_retry),
        ("ai_fallback", config.timing.ai_fallback),
        ("warning_ttl", config.timing.warning_ttl),
        ("signaling_timeout", config.timing.signaling_timeout),
    ] {
        if value == Duration::ZERO {
            return Err(format!("timing.{name} must be greater than zero").into());
        }
    }

    for server in &config.ice_servers {
        if server.urls.is_empty() {
            return Err("ICE server entry without urls".into());
        }
    }

    Ok(())
}

fn validate_signaling_url(raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(raw).map_err(|e| format!("Invalid signaling URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("Signaling URL must use http or https, got '{other}'").into()),
    }
}
