use super::error::{StateError, StateResult};
use super::event::{ScreenEvent, StateTransition};
use super::model::{Draft, ScreenPhase, ScreenState};

/// Computes the state that follows `event`, leaving `state` untouched.
pub fn reduce(state: &ScreenState, event: &ScreenEvent) -> StateResult<ScreenState> {
    let phase = state.phase();
    let reject = |reason: &'static str| StateError::InvalidStateTransition {
        from: phase,
        event: event.kind(),
        reason,
    };

    let mut next = state.clone();
    match event {
        ScreenEvent::CameraPermission(status) => next.camera = *status,
        ScreenEvent::LocationPermission(status) => next.location = *status,
        ScreenEvent::PhotoCaptured(photo) => {
            if phase == ScreenPhase::AwaitingPermissions {
                return Err(reject("permissions not granted"));
            }
            next.draft.photo = Some(photo.clone());
            // A retake must not inherit the previous location sample.
            next.draft.coordinates = None;
        }
        ScreenEvent::LocationSampled(coords) => {
            if phase != ScreenPhase::Preview {
                return Err(reject("no photo drafted"));
            }
            next.draft.coordinates = Some(*coords);
        }
        ScreenEvent::NoteEdited(note) => {
            if phase != ScreenPhase::Preview {
                return Err(reject("no photo drafted"));
            }
            next.draft.note.clone_from(note);
        }
        ScreenEvent::EntrySaved {
            entry,
            clear_location,
        } => {
            if phase != ScreenPhase::Preview || !state.draft.is_complete() {
                return Err(reject("draft is incomplete"));
            }
            next.entries.push(entry.clone());
            next.draft.photo = None;
            next.draft.note.clear();
            if *clear_location {
                next.draft.coordinates = None;
            }
        }
        ScreenEvent::SubmissionStarted => {
            if phase == ScreenPhase::AwaitingPermissions {
                return Err(reject("permissions not granted"));
            }
            next.sending = true;
        }
        ScreenEvent::SubmissionCompleted { accepted } => {
            if *accepted {
                next.draft = Draft::default();
            }
            next.sending = false;
        }
    }

    Ok(next)
}

#[derive(Debug, Default)]
pub struct StateMachine {
    state: ScreenState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn phase(&self) -> ScreenPhase {
        self.state.phase()
    }

    pub fn can_apply(&self, event: &ScreenEvent) -> bool {
        reduce(&self.state, event).is_ok()
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn apply(&mut self, event: ScreenEvent) -> StateResult<ScreenPhase> {
        let from = self.state.phase();
        tracing::debug!(from = ?from, event = ?event.kind(), "request state transition");
        let next = reduce(&self.state, &event).inspect_err(|err| {
            tracing::warn!(from = ?from, event = ?event.kind(), %err, "invalid state transition requested");
        })?;

        self.state = next;
        let to = self.state.phase();
        self.transition_history
            .push(StateTransition::new(from, event.kind(), to));

        Ok(to)
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScreenPhase::{:?}", self.state.phase())
    }
}
