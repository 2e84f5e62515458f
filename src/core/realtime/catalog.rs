//! Realtime service catalog and protocol constants.
//!
//! Every setting that must name something the service knows (model, voice,
//! audio format) is a catalog: a closed enum whose variants carry their wire
//! name and any accepted spellings. Configuration sources resolve raw strings
//! through [`select`], the single parse path for all catalogs.

use std::fmt;

use tracing::warn;

/// Signaling endpoint that exchanges an SDP offer for an answer.
pub const DEFAULT_SIGNALING_URL: &str = "https://api.openai.com/v1/realtime";

/// Protocol-version header sent with every signaling request.
pub const PROTOCOL_VERSION_HEADER: &str = "OpenAI-Beta";
pub const PROTOCOL_VERSION: &str = "realtime=v1";

/// Label of the data channel carrying JSON control events.
pub const DATA_CHANNEL_LABEL: &str = "oai-events";

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_ICE_SERVER: &str = "stun:stun.l.google.com:19302";

// =============================================================================
// Catalog plumbing
// =============================================================================

/// A closed set of names the service accepts for one setting.
pub trait CatalogEntry: Copy + Default + fmt::Display + 'static {
    /// Setting name used in diagnostics.
    const SETTING: &'static str;

    /// Every accepted spelling, wire names first.
    const NAMES: &'static [(&'static str, Self)];

    /// Case-insensitive lookup of a raw configuration value.
    fn lookup(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(raw))
            .map(|(_, entry)| *entry)
    }
}

/// Resolve a configured value, falling back to the catalog default with a
/// warning when the service would not recognise it.
pub fn select<T: CatalogEntry>(raw: &str) -> T {
    T::lookup(raw).unwrap_or_else(|| {
        let fallback = T::default();
        warn!(setting = T::SETTING, value = %raw, %fallback, "Unknown value, using default");
        fallback
    })
}

/// Declare a catalog enum.
///
/// ```ignore
/// catalog! {
///     /// Doc
///     Name for "setting" {
///         #[default]
///         Variant => "wire-name" | "alias",
///     }
/// }
/// ```
macro_rules! catalog {
    (
        $(#[$meta:meta])*
        $name:ident for $setting:literal {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $wire:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            $( $(#[$variant_meta])* $variant, )+
        }

        impl $name {
            /// Name sent to the service.
            pub const fn wire_name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }
        }

        impl CatalogEntry for $name {
            const SETTING: &'static str = $setting;
            const NAMES: &'static [(&'static str, Self)] = &[
                $( ($wire, Self::$variant), )+
                $( $( ($alias, Self::$variant), )* )+
            ];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.wire_name())
            }
        }
    };
}

// =============================================================================
// Catalogs
// =============================================================================

catalog! {
    /// Model negotiated during signaling (`?model=` on the offer request).
    RealtimeModel for "model" {
        #[default]
        Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
        Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
        GptRealtime => "gpt-realtime",
    }
}

catalog! {
    /// Assistant voice sent in `session.update`.
    RealtimeVoice for "voice" {
        #[default]
        Alloy => "alloy",
        Ash => "ash",
        Ballad => "ballad",
        Coral => "coral",
        Echo => "echo",
        Sage => "sage",
        Shimmer => "shimmer",
        Verse => "verse",
    }
}

catalog! {
    /// Audio encoding for both directions of the session.
    AudioFormat for "audio_format" {
        /// 16-bit PCM, 24kHz mono
        #[default]
        Pcm16 => "pcm16" | "pcm" | "linear16",
        G711Ulaw => "g711_ulaw" | "ulaw" | "mulaw",
        G711Alaw => "g711_alaw" | "alaw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_accepts_wire_names_and_aliases() {
        assert_eq!(select::<RealtimeModel>("GPT-REALTIME"), RealtimeModel::GptRealtime);
        assert_eq!(select::<RealtimeVoice>(" shimmer "), RealtimeVoice::Shimmer);
        assert_eq!(select::<AudioFormat>("mulaw"), AudioFormat::G711Ulaw);
    }

    #[test]
    fn test_select_unknown_falls_back() {
        assert_eq!(select::<RealtimeVoice>("nope"), RealtimeVoice::Alloy);
        assert_eq!(RealtimeModel::lookup("gpt-3.5-turbo"), None);
    }

    #[test]
    fn test_wire_names_are_canonical() {
        // Aliases resolve to a variant whose wire name is what gets sent
        assert_eq!(select::<AudioFormat>("linear16").wire_name(), "pcm16");
        assert_eq!(AudioFormat::G711Alaw.to_string(), "g711_alaw");
        for (name, entry) in RealtimeVoice::NAMES {
            assert_eq!(*name, entry.wire_name());
        }
    }
}
