//! Turn-taking state machine.
//!
//! A Mealy machine over [`ConversationState`]: every call returns a
//! [`Transition`] describing the state change and the side effects the caller
//! must perform (send a cancel, arm or disarm the assistant fallback timer).
//! The machine itself never touches timers or the transport.
//!
//! Barge-in has priority: a new user turn cancels an in-flight response, and a
//! late `ai_speaking_stopped` for that response can neither resurrect
//! `AiSpeaking` nor end the user's turn.

use super::base::ConversationState;
use super::normalizer::NormalizedEvent;

/// Side effect attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEffect {
    /// Send `response.cancel` so the remote side yields the floor
    SendCancel,
    /// Arm the assistant-turn fallback timer
    ArmFallbackTimer,
    /// Disarm the assistant-turn fallback timer
    DisarmFallbackTimer,
}

/// Result of feeding one input to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: ConversationState,
    pub to: ConversationState,
    pub effects: Vec<TurnEffect>,
    /// The input was a duplicate assistant start and was ignored
    pub duplicate: bool,
}

impl Transition {
    fn stay(state: ConversationState) -> Self {
        Self {
            from: state,
            to: state,
            effects: Vec::new(),
            duplicate: false,
        }
    }

    /// Whether the conversation state changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[cfg(test)]
impl Transition {
    fn has_effect(&self, effect: TurnEffect) -> bool {
        self.effects.contains(&effect)
    }
}

/// Conversation state plus the response-in-progress guard.
#[derive(Debug, Clone, Default)]
pub struct TurnStateMachine {
    state: ConversationState,
    response_in_progress: bool,
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn response_in_progress(&self) -> bool {
        self.response_in_progress
    }

    /// Apply a normalized event.
    ///
    /// Transcript, error and unknown events never move the state; the caller
    /// routes them elsewhere.
    pub fn handle(&mut self, event: NormalizedEvent) -> Transition {
        let from = self.state;
        match event {
            NormalizedEvent::UserSpeakingStarted => {
                let mut effects = Vec::new();
                if self.response_in_progress {
                    // Barge-in
                    self.response_in_progress = false;
                    effects.push(TurnEffect::SendCancel);
                    effects.push(TurnEffect::DisarmFallbackTimer);
                }
                self.state = ConversationState::UserSpeaking;
                Transition {
                    from,
                    to: self.state,
                    effects,
                    duplicate: false,
                }
            }

            NormalizedEvent::UserSpeakingStopped => {
                self.state = ConversationState::Processing;
                Transition {
                    from,
                    to: self.state,
                    effects: Vec::new(),
                    duplicate: false,
                }
            }

            NormalizedEvent::AiSpeakingStarted => {
                if self.response_in_progress {
                    let mut t = Transition::stay(from);
                    t.duplicate = true;
                    return t;
                }
                self.response_in_progress = true;
                self.state = ConversationState::AiSpeaking;
                Transition {
                    from,
                    to: self.state,
                    effects: vec![TurnEffect::ArmFallbackTimer],
                    duplicate: false,
                }
            }

            NormalizedEvent::AiSpeakingStopped => {
                let was_in_progress = self.response_in_progress;
                self.response_in_progress = false;
                self.state = match from {
                    ConversationState::AiSpeaking => ConversationState::Idle,
                    ConversationState::UserSpeaking => ConversationState::UserSpeaking,
                    // A stop for an already-cancelled response must not end the wait
                    // for the reply to the user's new turn.
                    ConversationState::Processing if !was_in_progress => {
                        ConversationState::Processing
                    }
                    _ => ConversationState::Idle,
                };
                Transition {
                    from,
                    to: self.state,
                    effects: vec![TurnEffect::DisarmFallbackTimer],
                    duplicate: false,
                }
            }

            NormalizedEvent::UserTranscriptionDelta
            | NormalizedEvent::UserTranscriptionCompleted
            | NormalizedEvent::AiTranscriptionDelta
            | NormalizedEvent::AiTranscriptionCompleted
            | NormalizedEvent::Error
            | NormalizedEvent::Unknown => Transition::stay(from),
        }
    }

    /// The assistant never reported the end of its turn.
    pub fn on_fallback_timeout(&mut self) -> Transition {
        let from = self.state;
        if !self.response_in_progress {
            return Transition::stay(from);
        }
        self.response_in_progress = false;
        if from != ConversationState::UserSpeaking {
            self.state = ConversationState::Idle;
        }
        Transition {
            from,
            to: self.state,
            effects: Vec::new(),
            duplicate: false,
        }
    }

    /// Locally cancel the in-flight response, if any.
    pub fn cancel_response(&mut self) -> Transition {
        let from = self.state;
        if !self.response_in_progress {
            return Transition::stay(from);
        }
        self.response_in_progress = false;
        if from == ConversationState::AiSpeaking {
            self.state = ConversationState::Idle;
        }
        Transition {
            from,
            to: self.state,
            effects: vec![TurnEffect::SendCancel, TurnEffect::DisarmFallbackTimer],
            duplicate: false,
        }
    }

    /// The remote side reported a failure for the in-flight response; it will
    /// not send `response.done`, so the turn ends here. Nothing is sent back.
    pub fn on_response_error(&mut self) -> Transition {
        let from = self.state;
        if !self.response_in_progress {
            return Transition::stay(from);
        }
        self.response_in_progress = false;
        if from == ConversationState::AiSpeaking {
            self.state = ConversationState::Idle;
        }
        Transition {
            from,
            to: self.state,
            effects: vec![TurnEffect::DisarmFallbackTimer],
            duplicate: false,
        }
    }

    /// Back to idle with no response in progress.
    pub fn reset(&mut self) -> Transition {
        let from = self.state;
        self.state = ConversationState::Idle;
        self.response_in_progress = false;
        Transition {
            from,
            to: self.state,
            effects: vec![TurnEffect::DisarmFallbackTimer],
            duplicate: false,
        }
    }
}
