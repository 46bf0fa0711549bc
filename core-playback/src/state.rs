//! # Playback State Machine
//!
//! Tracks the current [`PlaybackState`] and intent-to-play, and derives the
//! host-facing playing/buffering indicator.
//!
//! The machine itself is pure: it reports what changed and the engine turns
//! that into events in a fixed order (error cleared, state, indicator).

use serde::Serialize;
use tracing::debug;

use crate::error::PlaybackFailure;
use crate::types::PlaybackState;

/// `(playing, buffering)` as shown by host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlayingIndicator {
    pub playing: bool,
    pub buffering: bool,
}

impl PlayingIndicator {
    /// `playing` while intent is set and the state can still produce audio;
    /// `buffering` while intent is set and media is being fetched.
    pub fn derive(state: &PlaybackState, play_when_ready: bool) -> Self {
        let playing = play_when_ready
            && !matches!(
                state,
                PlaybackState::Error(_) | PlaybackState::Ended | PlaybackState::None
            );
        let buffering = play_when_ready
            && matches!(state, PlaybackState::Loading | PlaybackState::Buffering);
        Self { playing, buffering }
    }
}

/// What an effective transition changed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub previous: PlaybackState,
    pub current: PlaybackState,
    /// The error that was cleared by leaving `Error`.
    pub error_cleared: Option<PlaybackFailure>,
    /// New indicator, only if it differs from the last one reported.
    pub indicator: Option<PlayingIndicator>,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackStateMachine {
    state: PlaybackState,
    play_when_ready: bool,
    indicator: PlayingIndicator,
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    pub fn indicator(&self) -> PlayingIndicator {
        self.indicator
    }

    pub fn error(&self) -> Option<&PlaybackFailure> {
        match &self.state {
            PlaybackState::Error(failure) => Some(failure),
            _ => None,
        }
    }

    /// Moves to `next`. Returns `None` when the state is unchanged.
    pub fn transition(&mut self, next: PlaybackState) -> Option<TransitionOutcome> {
        if self.state == next {
            return None;
        }

        let previous = std::mem::replace(&mut self.state, next.clone());
        let error_cleared = match (&previous, &next) {
            (PlaybackState::Error(failure), current) if !current.is_error() => {
                Some(failure.clone())
            }
            _ => None,
        };

        debug!(from = %previous, to = %next, "Playback state transition");

        Some(TransitionOutcome {
            previous,
            current: next,
            error_cleared,
            indicator: self.refresh_indicator(),
        })
    }

    /// Sets intent-to-play. Returns the new indicator if it changed.
    pub fn set_play_when_ready(&mut self, play_when_ready: bool) -> Option<PlayingIndicator> {
        self.play_when_ready = play_when_ready;
        self.refresh_indicator()
    }

    fn refresh_indicator(&mut self) -> Option<PlayingIndicator> {
        let indicator = PlayingIndicator::derive(&self.state, self.play_when_ready);
        if indicator == self.indicator {
            return None;
        }
        self.indicator = indicator;
        Some(indicator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::RendererErrorCode;

    fn failure() -> PlaybackFailure {
        PlaybackFailure::new(RendererErrorCode::TimedOut, "timed out")
    }

    #[test]
    fn same_state_is_not_a_transition() {
        let mut machine = PlaybackStateMachine::new();
        assert!(machine.transition(PlaybackState::None).is_none());

        let outcome = machine.transition(PlaybackState::Loading).unwrap();
        assert_eq!(outcome.previous, PlaybackState::None);
        assert!(outcome.indicator.is_none());
        assert!(machine.transition(PlaybackState::Loading).is_none());
    }

    #[test]
    fn indicator_follows_intent_and_state() {
        let mut machine = PlaybackStateMachine::new();
        machine.transition(PlaybackState::Loading);

        let indicator = machine.set_play_when_ready(true).unwrap();
        assert_eq!(
            indicator,
            PlayingIndicator {
                playing: true,
                buffering: true
            }
        );

        let outcome = machine.transition(PlaybackState::Ready).unwrap();
        assert_eq!(
            outcome.indicator,
            Some(PlayingIndicator {
                playing: true,
                buffering: false
            })
        );

        // Ready -> Playing keeps the pair, so nothing to report.
        let outcome = machine.transition(PlaybackState::Playing).unwrap();
        assert!(outcome.indicator.is_none());

        let outcome = machine.transition(PlaybackState::Ended).unwrap();
        assert_eq!(outcome.indicator, Some(PlayingIndicator::default()));
    }

    #[test]
    fn leaving_error_clears_payload() {
        let mut machine = PlaybackStateMachine::new();
        machine.transition(PlaybackState::Error(failure()));
        assert_eq!(machine.error(), Some(&failure()));

        let outcome = machine.transition(PlaybackState::Loading).unwrap();
        assert_eq!(outcome.error_cleared, Some(failure()));
        assert!(machine.error().is_none());
    }

    #[test]
    fn error_to_error_keeps_no_clear() {
        let mut machine = PlaybackStateMachine::new();
        machine.transition(PlaybackState::Error(failure()));

        let other = PlaybackFailure::new(RendererErrorCode::DecodeFailed, "bad");
        let outcome = machine.transition(PlaybackState::Error(other)).unwrap();
        assert!(outcome.error_cleared.is_none());
    }

    #[test]
    fn intent_without_state_change_reports_once() {
        let mut machine = PlaybackStateMachine::new();
        machine.transition(PlaybackState::Paused);

        assert!(machine.set_play_when_ready(true).is_some());
        assert!(machine.set_play_when_ready(true).is_none());
        assert!(machine.set_play_when_ready(false).is_some());
    }
}
