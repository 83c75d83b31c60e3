use std::fs::File;

use crate::capture::CameraSource;
use crate::location::LocationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    #[default]
    Undetermined,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undetermined => "undetermined",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

/// Access checks for the two capabilities the capture screen depends on.
///
/// Camera permission can be read without prompting and requested again later;
/// location permission is only ever requested.
pub trait PermissionBackend {
    fn camera_status(&self) -> PermissionStatus;
    fn request_camera(&self) -> PermissionStatus;
    fn request_location(&self) -> PermissionStatus;
}

/// Derives permission from what the host actually allows: a readable camera
/// device (or still-image file) and a configured location source.
#[derive(Debug, Clone)]
pub struct DevicePermissionBackend {
    camera: CameraSource,
    location: LocationSource,
}

impl DevicePermissionBackend {
    pub fn new(camera: CameraSource, location: LocationSource) -> Self {
        Self { camera, location }
    }

    fn probe_camera(&self) -> PermissionStatus {
        match &self.camera {
            CameraSource::Device { device, .. } => match File::open(device) {
                Ok(_) => PermissionStatus::Granted,
                Err(err) => {
                    tracing::warn!(device = %device.display(), ?err, "camera device is not accessible");
                    PermissionStatus::Denied
                }
            },
            CameraSource::File { path } => {
                if path.is_file() {
                    PermissionStatus::Granted
                } else {
                    tracing::warn!(path = %path.display(), "still image source does not exist");
                    PermissionStatus::Denied
                }
            }
        }
    }
}

impl PermissionBackend for DevicePermissionBackend {
    fn camera_status(&self) -> PermissionStatus {
        self.probe_camera()
    }

    fn request_camera(&self) -> PermissionStatus {
        self.probe_camera()
    }

    fn request_location(&self) -> PermissionStatus {
        match &self.location {
            LocationSource::Disabled => {
                tracing::warn!("no location source configured; location permission denied");
                PermissionStatus::Denied
            }
            LocationSource::Fixed {
                latitude,
                longitude,
            } => {
                let coords = crate::geo::Coordinates::new(*latitude, *longitude);
                if coords.is_valid() {
                    PermissionStatus::Granted
                } else {
                    tracing::warn!(%coords, "configured fixed location is out of range");
                    PermissionStatus::Denied
                }
            }
            LocationSource::Command { .. } => PermissionStatus::Granted,
        }
    }
}
