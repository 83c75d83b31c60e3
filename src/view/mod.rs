//! Screen description derived from [`ScreenState`]; no I/O happens here.

mod render;

pub use render::render_text;

use crate::state::{Entry, ScreenState};

pub const CAMERA_PERMISSION_MESSAGE: &str = "Requesting camera permission...";
pub const LOCATION_PERMISSION_MESSAGE: &str = "Requesting location permission...";
pub const GRANT_CAMERA_LABEL: &str = "Grant Camera Permission";
pub const TAKE_PICTURE_LABEL: &str = "Take Picture";
pub const RETAKE_PICTURE_LABEL: &str = "Retake Photo";
pub const SUBMIT_LABEL: &str = "Save To Google Sheets";
pub const NOTE_PLACEHOLDER: &str = "Add a note...";

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenView {
    PermissionPrompt(PermissionPrompt),
    Capture(CaptureView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPrompt {
    pub message: &'static str,
    /// Only camera permission can be requested again.
    pub retry_label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureView {
    pub stage: CaptureStage,
    pub capture_label: &'static str,
    pub sending: bool,
    pub entries: Vec<EntryRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStage {
    Viewfinder,
    Preview(PreviewPane),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPane {
    pub image_uri: String,
    pub note: String,
    pub note_placeholder: &'static str,
    pub location: Option<String>,
    pub submit_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: String,
    pub thumbnail_uri: String,
    pub note: String,
    pub coordinates: String,
}

impl From<&Entry> for EntryRow {
    fn from(entry: &Entry) -> Self {
        let thumbnail_uri = entry
            .thumbnail
            .as_deref()
            .map(crate::state::model::file_uri)
            .unwrap_or_else(|| entry.media_uri());
        Self {
            id: entry.id.clone(),
            thumbnail_uri,
            note: entry.note.clone(),
            coordinates: entry.coordinates.to_string(),
        }
    }
}

pub fn build_view(state: &ScreenState) -> ScreenView {
    if !state.camera.is_granted() {
        return ScreenView::PermissionPrompt(PermissionPrompt {
            message: CAMERA_PERMISSION_MESSAGE,
            retry_label: Some(GRANT_CAMERA_LABEL),
        });
    }
    if !state.location.is_granted() {
        return ScreenView::PermissionPrompt(PermissionPrompt {
            message: LOCATION_PERMISSION_MESSAGE,
            retry_label: None,
        });
    }

    let (stage, capture_label) = match &state.draft.photo {
        Some(photo) => (
            CaptureStage::Preview(PreviewPane {
                image_uri: photo.uri(),
                note: state.draft.note.clone(),
                note_placeholder: NOTE_PLACEHOLDER,
                location: state.draft.coordinates.map(|coords| coords.to_string()),
                submit_label: SUBMIT_LABEL,
            }),
            RETAKE_PICTURE_LABEL,
        ),
        None => (CaptureStage::Viewfinder, TAKE_PICTURE_LABEL),
    };

    ScreenView::Capture(CaptureView {
        stage,
        capture_label,
        sending: state.sending,
        entries: state.entries.iter().map(EntryRow::from).collect(),
    })
}
