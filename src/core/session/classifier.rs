//! Failure classification.
//!
//! Turns raw failure text (protocol `error` events, send failures, transport
//! errors) into a [`Classification`]. The rules are content heuristics over the
//! message text:
//!
//! - the cancel race ("no active response") is expected and suppressed
//! - authentication, quota and billing failures are fatal
//! - everything else is a recoverable error

use super::base::{ConnectionError, ErrorSeverity, SessionError};

/// Sending `response.cancel` after the response already ended produces this;
/// it is a normal race, not a failure.
const BENIGN_CANCEL_RACE: &str = "no active response";

/// Failures the session cannot recover from without user action.
const FATAL_TERMS: &[&str] = &[
    "auth",
    "api key",
    "api_key",
    "api-key",
    "apikey",
    "quota",
    "billing",
    "payment",
];

/// Lowercase with runs of whitespace collapsed to one space.
fn normalized(message: &str) -> String {
    message
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classifier verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Expected noise; log at debug and move on
    Suppressed,
    /// Show this to observers
    Surface(ConnectionError),
}

/// Whether `message` is the benign cancel race.
pub fn is_benign(message: &str) -> bool {
    normalized(message).contains(BENIGN_CANCEL_RACE)
}

/// Whether `message` names an authentication, quota or billing failure.
pub fn is_fatal_message(message: &str) -> bool {
    let message = normalized(message);
    FATAL_TERMS.iter().any(|term| message.contains(term))
}

/// Classify a failure message.
pub fn classify(message: &str) -> Classification {
    if is_benign(message) {
        return Classification::Suppressed;
    }
    if is_fatal_message(message) {
        return Classification::Surface(ConnectionError::new(message, ErrorSeverity::Fatal, false));
    }
    Classification::Surface(ConnectionError::new(message, ErrorSeverity::Error, true))
}

/// Classify a failure as a warning: benign races are still suppressed, anything
/// else surfaces with `Warning` severity.
pub fn classify_warning(message: &str) -> Classification {
    if is_benign(message) {
        return Classification::Suppressed;
    }
    Classification::Surface(ConnectionError::warning(message))
}

/// Classify a lifecycle error raised by `start()` or the transport.
///
/// The error's own recoverability wins; message heuristics can only escalate.
pub fn classify_session_error(err: &SessionError) -> Classification {
    let message = err.to_string();
    if is_benign(&message) {
        return Classification::Suppressed;
    }
    if !err.is_recoverable() || is_fatal_message(&message) {
        return Classification::Surface(ConnectionError::new(message, ErrorSeverity::Fatal, false));
    }
    Classification::Surface(ConnectionError::new(message, ErrorSeverity::Error, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppressed(c: Classification) -> bool {
        matches!(c, Classification::Suppressed)
    }

    fn surfaced(c: Classification) -> ConnectionError {
        match c {
            Classification::Surface(e) => e,
            Classification::Suppressed => panic!("expected surfaced error"),
        }
    }

    #[test]
    fn test_cancel_race_suppressed() {
        assert!(suppressed(classify("Cancellation failed: no active response found")));
        assert!(suppressed(classify("NO ACTIVE RESPONSE")));
        assert!(suppressed(classify_warning("Cancellation failed: no active response found")));
        assert!(
            suppressed(classify_session_error(&SessionError::ChannelSend(
                "Cancellation failed: no active response found".to_string()
            )))
        );
    }

    #[test]
    fn test_fatal_terms() {
        for msg in [
            "Incorrect API key provided",
            "You exceeded your current quota",
            "Unauthorized",
            "billing hard limit reached",
            "payment required",
            "invalid_api_key",
        ] {
            let e = surfaced(classify(msg));
            assert_eq!(e.severity, ErrorSeverity::Fatal, "{msg}");
            assert!(!e.recoverable);
        }
    }

    #[test]
    fn test_other_errors_recoverable() {
        let e = surfaced(classify("Conversation already has an active response"));
        assert_eq!(e.severity, ErrorSeverity::Error);
        assert!(e.recoverable);
        assert_eq!(e.message, "Conversation already has an active response");
    }

    #[test]
    fn test_warning_severity() {
        let e = surfaced(classify_warning("Data channel not open"));
        assert_eq!(e.severity, ErrorSeverity::Warning);
        assert!(e.recoverable);
    }

    #[test]
    fn test_cancel_race_tolerates_spacing() {
        assert!(is_benign("Cancellation failed:  No\tactive\n response"));
        assert!(!is_benign("response already active"));
    }

    #[test]
    fn test_session_error_recoverability_wins() {
        let severity = |err: SessionError| surfaced(classify_session_error(&err)).severity;
        assert_eq!(severity(SessionError::PermissionDenied), ErrorSeverity::Fatal);
        assert_eq!(
            severity(SessionError::Signaling("timeout".to_string())),
            ErrorSeverity::Error
        );
        assert_eq!(
            severity(SessionError::Signaling("401 Unauthorized".to_string())),
            ErrorSeverity::Fatal
        );
    }
}
