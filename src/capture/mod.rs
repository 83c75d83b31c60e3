use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::command::{run_command_status, CommandError};
use crate::state::PhotoReference;
use crate::storage::temp_capture_path;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_PROGRAM: &str = "ffmpeg";

/// Where still images come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CameraSource {
    /// Grab a single frame from a V4L2 device through an external program.
    Device {
        #[serde(default = "default_camera_device")]
        device: PathBuf,
        #[serde(default = "default_camera_program")]
        program: String,
    },
    /// Use an existing image file as the captured frame.
    File { path: PathBuf },
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::Device {
            device: default_camera_device(),
            program: default_camera_program(),
        }
    }
}

fn default_camera_device() -> PathBuf {
    PathBuf::from(DEFAULT_CAMERA_DEVICE)
}

fn default_camera_program() -> String {
    DEFAULT_CAMERA_PROGRAM.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub capture_id: String,
    pub temp_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl CaptureArtifact {
    pub fn photo_reference(&self) -> PhotoReference {
        PhotoReference::new(self.capture_id.clone(), self.temp_path.clone())
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("failed to copy still image {path}: {source}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid capture artifact: {message}")]
    InvalidCaptureArtifact { message: String },
    #[error("failed to read captured image dimensions: {message}")]
    ImageReadFailed { message: String },
}

pub trait CameraBackend {
    /// Whether a frame can be captured right now.
    fn is_ready(&self) -> bool;
    fn capture_still(&self, output: &Path) -> Result<(), CaptureError>;
    fn image_dimensions(&self, output: &Path) -> Result<(u32, u32), CaptureError>;
}

#[derive(Debug, Clone)]
pub struct DeviceCameraBackend {
    device: PathBuf,
    program: String,
}

impl DeviceCameraBackend {
    pub fn new(device: PathBuf, program: String) -> Self {
        Self { device, program }
    }

    fn capture_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "video4linux2".to_string(),
            "-i".to_string(),
            self.device.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            "1".to_string(),
        ]
    }
}

impl CameraBackend for DeviceCameraBackend {
    fn is_ready(&self) -> bool {
        self.device.exists()
    }

    fn capture_still(&self, output: &Path) -> Result<(), CaptureError> {
        run_command_status(&self.program, &self.capture_args(), output)?;
        Ok(())
    }

    fn image_dimensions(&self, output: &Path) -> Result<(u32, u32), CaptureError> {
        read_image_dimensions(output)
    }
}

#[derive(Debug, Clone)]
pub struct StillImageBackend {
    path: PathBuf,
}

impl StillImageBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CameraBackend for StillImageBackend {
    fn is_ready(&self) -> bool {
        self.path.is_file()
    }

    fn capture_still(&self, output: &Path) -> Result<(), CaptureError> {
        std::fs::copy(&self.path, output).map_err(|err| CaptureError::SourceIo {
            path: self.path.clone(),
            source: err,
        })?;
        Ok(())
    }

    fn image_dimensions(&self, output: &Path) -> Result<(u32, u32), CaptureError> {
        read_image_dimensions(output)
    }
}

pub fn camera_backend_for(source: &CameraSource) -> Box<dyn CameraBackend> {
    match source {
        CameraSource::Device { device, program } => {
            Box::new(DeviceCameraBackend::new(device.clone(), program.clone()))
        }
        CameraSource::File { path } => Box::new(StillImageBackend::new(path.clone())),
    }
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), CaptureError> {
    // The temp file extension is fixed, so sniff the real format from its header.
    let reader = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| CaptureError::ImageReadFailed {
            message: err.to_string(),
        })?;
    reader
        .into_dimensions()
        .map_err(|err| CaptureError::ImageReadFailed {
            message: err.to_string(),
        })
}

/// Captures one still frame into `temp_dir` and validates it by reading its
/// dimensions back. The temporary file is removed when either step fails.
pub fn capture_still_with<B: CameraBackend + ?Sized>(
    backend: &B,
    temp_dir: &Path,
) -> Result<CaptureArtifact, CaptureError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| CaptureError::InvalidCaptureArtifact {
            message: format!("system time before unix epoch: {err}"),
        })?;

    let capture_id = format!("{}", now.as_nanos());
    let temp_path = temp_capture_path(temp_dir, &capture_id);
    if let Some(parent) = temp_path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| CaptureError::SourceIo {
            path: parent.to_path_buf(),
            source: err,
        })?;
    }

    if let Err(err) = backend.capture_still(&temp_path) {
        cleanup_temp_capture_file(&temp_path, "capture command failure");
        return Err(err);
    }

    let (width, height) = match backend.image_dimensions(&temp_path) {
        Ok(size) => size,
        Err(err) => {
            cleanup_temp_capture_file(&temp_path, "capture image dimension read failure");
            return Err(err);
        }
    };
    if width == 0 || height == 0 {
        cleanup_temp_capture_file(&temp_path, "capture produced an empty image");
        return Err(CaptureError::InvalidCaptureArtifact {
            message: format!("captured image must be non-empty, got {width}x{height}"),
        });
    }

    tracing::info!(capture_id = %capture_id, width, height, "captured still image");
    Ok(CaptureArtifact {
        capture_id,
        temp_path,
        width,
        height,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TempCaptureCleanupOutcome {
    Removed,
    NotFound,
    Failed,
}

fn cleanup_temp_capture_file(temp_path: &Path, stage: &str) -> TempCaptureCleanupOutcome {
    cleanup_temp_capture_file_with(temp_path, stage, |path| std::fs::remove_file(path))
}

fn cleanup_temp_capture_file_with<F>(
    temp_path: &Path,
    stage: &str,
    remove_file: F,
) -> TempCaptureCleanupOutcome
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    match remove_file(temp_path) {
        Ok(()) => TempCaptureCleanupOutcome::Removed,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                stage = stage,
                path = %temp_path.display(),
                "temporary capture file was never written"
            );
            TempCaptureCleanupOutcome::NotFound
        }
        Err(err) => {
            tracing::warn!(
                stage = stage,
                path = %temp_path.display(),
                ?err,
                "failed to cleanup temporary capture file"
            );
            TempCaptureCleanupOutcome::Failed
        }
    }
}
