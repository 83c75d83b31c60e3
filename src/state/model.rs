use std::path::{Path, PathBuf};

use crate::geo::Coordinates;
use crate::permission::PermissionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenPhase {
    AwaitingPermissions,
    Viewfinder,
    Preview,
}

/// Handle to a freshly captured image that has not been registered with the
/// media library yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoReference {
    pub capture_id: String,
    pub path: PathBuf,
}

impl PhotoReference {
    pub fn new(capture_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            capture_id: capture_id.into(),
            path: path.into(),
        }
    }

    pub fn uri(&self) -> String {
        file_uri(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub photo: Option<PhotoReference>,
    pub coordinates: Option<Coordinates>,
    pub note: String,
}

impl Draft {
    pub fn is_complete(&self) -> bool {
        self.photo.is_some() && self.coordinates.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.photo.is_none() && self.coordinates.is_none() && self.note.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub media_reference: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub coordinates: Coordinates,
    pub note: String,
}

impl Entry {
    pub fn media_uri(&self) -> String {
        file_uri(&self.media_reference)
    }
}

/// Everything the capture screen renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenState {
    pub camera: PermissionStatus,
    pub location: PermissionStatus,
    pub draft: Draft,
    pub entries: Vec<Entry>,
    pub sending: bool,
}

impl ScreenState {
    pub fn gate_open(&self) -> bool {
        self.camera.is_granted() && self.location.is_granted()
    }

    pub fn phase(&self) -> ScreenPhase {
        if !self.gate_open() {
            ScreenPhase::AwaitingPermissions
        } else if self.draft.photo.is_some() {
            ScreenPhase::Preview
        } else {
            ScreenPhase::Viewfinder
        }
    }
}

pub(crate) fn file_uri(path: &Path) -> String {
    format!("file://{}", path.to_string_lossy())
}
