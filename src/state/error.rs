use super::event::ScreenEventKind;
use super::model::ScreenPhase;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state transition: from {from:?} using event {event:?}: {reason}")]
    InvalidStateTransition {
        from: ScreenPhase,
        event: ScreenEventKind,
        reason: &'static str,
    },
}
