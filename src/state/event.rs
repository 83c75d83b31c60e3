use super::model::{Entry, PhotoReference, ScreenPhase};
use crate::geo::Coordinates;
use crate::permission::PermissionStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    CameraPermission(PermissionStatus),
    LocationPermission(PermissionStatus),
    PhotoCaptured(PhotoReference),
    LocationSampled(Coordinates),
    NoteEdited(String),
    EntrySaved { entry: Entry, clear_location: bool },
    SubmissionStarted,
    SubmissionCompleted { accepted: bool },
}

impl ScreenEvent {
    pub fn kind(&self) -> ScreenEventKind {
        match self {
            Self::CameraPermission(_) => ScreenEventKind::CameraPermission,
            Self::LocationPermission(_) => ScreenEventKind::LocationPermission,
            Self::PhotoCaptured(_) => ScreenEventKind::PhotoCaptured,
            Self::LocationSampled(_) => ScreenEventKind::LocationSampled,
            Self::NoteEdited(_) => ScreenEventKind::NoteEdited,
            Self::EntrySaved { .. } => ScreenEventKind::EntrySaved,
            Self::SubmissionStarted => ScreenEventKind::SubmissionStarted,
            Self::SubmissionCompleted { .. } => ScreenEventKind::SubmissionCompleted,
        }
    }
}

/// Payload-free tag of a [`ScreenEvent`], kept in transition history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenEventKind {
    CameraPermission,
    LocationPermission,
    PhotoCaptured,
    LocationSampled,
    NoteEdited,
    EntrySaved,
    SubmissionStarted,
    SubmissionCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ScreenPhase,
    pub event: ScreenEventKind,
    pub to: ScreenPhase,
}

impl StateTransition {
    pub const fn new(from: ScreenPhase, event: ScreenEventKind, to: ScreenPhase) -> Self {
        Self { from, event, to }
    }
}
