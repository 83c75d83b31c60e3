use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::state::PhotoReference;
use thiserror::Error;

const DEFAULT_TEMP_PREFIX: &str = "capture_";
const DEFAULT_TEMP_EXTENSION: &str = "jpg";
const APP_SUBDIR: &str = "geosnap";
const LIBRARY_PARENT_SUBDIR: &str = "Pictures";
const DEFAULT_FALLBACK_TEMP_DIR: &str = "/tmp/geosnap";
const THUMBNAIL_EDGE: u32 = 100;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("capture id is empty")]
    MissingCaptureId,
    #[error("captured image {path} no longer exists")]
    MissingSource { path: PathBuf },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Default, Clone)]
pub struct PruneReport {
    pub removed_files: usize,
}

/// A captured image after it has been copied into the picture library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredMedia {
    pub path: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

pub trait MediaLibrary {
    /// Copies a captured image into durable storage and returns its new location.
    fn register(&self, photo: &PhotoReference) -> StorageResult<RegisteredMedia>;
}

#[derive(Debug, Clone)]
pub struct StorageService {
    temp_dir: PathBuf,
    library_dir: PathBuf,
}

impl StorageService {
    pub const fn with_paths(temp_dir: PathBuf, library_dir: PathBuf) -> Self {
        Self {
            temp_dir,
            library_dir,
        }
    }

    /// Uses `$XDG_RUNTIME_DIR/geosnap` for captures and `library_dir` (or
    /// `$HOME/Pictures/geosnap`) for registered images.
    pub fn with_default_paths(library_dir: Option<PathBuf>) -> StorageResult<Self> {
        let library_dir = match library_dir {
            Some(dir) => dir,
            None => default_library_dir()?,
        };
        let temp_dir = default_runtime_temp_dir();

        fs::create_dir_all(&temp_dir)?;
        fs::create_dir_all(&library_dir)?;

        Ok(Self::with_paths(temp_dir, library_dir))
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    fn validate_capture_id(capture_id: &str) -> StorageResult<()> {
        if capture_id.is_empty() {
            return Err(StorageError::MissingCaptureId);
        }
        Ok(())
    }

    pub fn temp_path_for_capture(&self, capture_id: &str) -> StorageResult<PathBuf> {
        Self::validate_capture_id(capture_id)?;
        Ok(temp_capture_path(&self.temp_dir, capture_id))
    }

    pub fn allocate_target_path(&self, capture_id: &str, source: &Path) -> StorageResult<PathBuf> {
        Self::validate_capture_id(capture_id)?;
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(DEFAULT_TEMP_EXTENSION);
        let mut path = self.library_dir.clone();
        path.push(format!("{capture_id}.{extension}"));
        Ok(path)
    }

    pub fn thumbnail_path(&self, capture_id: &str) -> StorageResult<PathBuf> {
        Self::validate_capture_id(capture_id)?;
        let mut path = self.library_dir.clone();
        path.push(format!("{capture_id}.thumb.png"));
        Ok(path)
    }

    pub fn register_photo(&self, photo: &PhotoReference) -> StorageResult<RegisteredMedia> {
        if !photo.path.is_file() {
            return Err(StorageError::MissingSource {
                path: photo.path.clone(),
            });
        }
        let target = self.allocate_target_path(&photo.capture_id, &photo.path)?;
        save_overwrite(&photo.path, &target)?;

        let thumbnail_target = self.thumbnail_path(&photo.capture_id)?;
        let thumbnail = match write_thumbnail(&target, &thumbnail_target) {
            Ok(()) => Some(thumbnail_target),
            Err(err) => {
                tracing::warn!(path = %target.display(), %err, "failed to write thumbnail");
                None
            }
        };

        if photo.path.starts_with(&self.temp_dir) {
            self.discard_session_artifacts(&photo.capture_id)?;
        }

        tracing::info!(
            capture_id = %photo.capture_id,
            path = %target.display(),
            "registered capture with media library"
        );
        Ok(RegisteredMedia {
            path: target,
            thumbnail,
        })
    }

    pub fn discard_session_artifacts(&self, capture_id: &str) -> StorageResult<()> {
        let path = self.temp_path_for_capture(capture_id)?;
        remove_temp_capture(&path)?;
        Ok(())
    }

    pub fn prune_stale_temp_files(&self, max_age_hours: u64) -> StorageResult<PruneReport> {
        let now = SystemTime::now();
        let mut report = PruneReport::default();
        let max_age = Duration::from_secs(max_age_hours.saturating_mul(60 * 60));

        if !self.temp_dir.exists() {
            return Ok(report);
        }

        for entry in fs::read_dir(&self.temp_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_none_or(|name| !name.starts_with(DEFAULT_TEMP_PREFIX))
            {
                continue;
            }

            let metadata = fs::metadata(&path)?;
            let modified = metadata.modified()?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

            if age > max_age {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        report.removed_files += 1;
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %path.display(),
                            ?err,
                            "failed to remove stale temp capture file"
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}

impl MediaLibrary for StorageService {
    fn register(&self, photo: &PhotoReference) -> StorageResult<RegisteredMedia> {
        self.register_photo(photo)
    }
}

pub fn temp_capture_path(temp_dir: &Path, capture_id: &str) -> PathBuf {
    temp_dir.join(format!(
        "{DEFAULT_TEMP_PREFIX}{capture_id}.{DEFAULT_TEMP_EXTENSION}"
    ))
}

/// Deletes a temporary capture; a file that is already gone is not an error.
pub fn remove_temp_capture(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn save_overwrite<S: AsRef<Path>, D: AsRef<Path>>(source: S, destination: D) -> StorageResult<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let _ = fs::remove_file(destination);
    fs::copy(source, destination)?;
    Ok(())
}

fn write_thumbnail(source: &Path, destination: &Path) -> Result<(), image::ImageError> {
    let decoded = image::ImageReader::open(source)?
        .with_guessed_format()?
        .decode()?;
    decoded
        .thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE)
        .save(destination)
}

pub fn prune_stale_temp_files(max_age_hours: u64) -> StorageResult<PruneReport> {
    let service = StorageService::with_paths(default_runtime_temp_dir(), PathBuf::new());
    service.prune_stale_temp_files(max_age_hours)
}

pub fn default_runtime_temp_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join(APP_SUBDIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FALLBACK_TEMP_DIR))
}

fn default_library_dir() -> StorageResult<PathBuf> {
    let home = std::env::var_os("HOME").ok_or(StorageError::MissingHomeDirectory)?;
    let mut dir = PathBuf::from(home);
    dir.push(LIBRARY_PARENT_SUBDIR);
    dir.push(APP_SUBDIR);
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_service(name: &str) -> StorageService {
        let root = std::env::temp_dir().join(format!(
            "geosnap-storage-{}-{name}",
            std::process::id()
        ));
        let service = StorageService::with_paths(root.join("runtime"), root.join("library"));
        fs::create_dir_all(service.temp_dir()).unwrap();
        service
    }

    fn cleanup(service: &StorageService) {
        if let Some(root) = service.temp_dir().parent() {
            let _ = fs::remove_dir_all(root);
        }
    }

    #[test]
    fn temp_capture_path_targets_temp_directory() {
        let path = temp_capture_path(Path::new("/run/user/1000/geosnap"), "123");
        assert_eq!(
            path,
            PathBuf::from("/run/user/1000/geosnap/capture_123.jpg")
        );
    }

    #[test]
    fn allocate_target_path_uses_capture_id_and_source_extension() {
        let service = StorageService::with_paths(
            PathBuf::from("/tmp"),
            PathBuf::from("/home/test/Pictures/geosnap"),
        );
        let path = service
            .allocate_target_path("abc", Path::new("/tmp/capture_abc.png"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/home/test/Pictures/geosnap/abc.png"));

        let err = service
            .allocate_target_path("", Path::new("/tmp/x.jpg"))
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingCaptureId));
    }

    #[test]
    fn register_photo_copies_into_library_writes_thumbnail_and_discards_temp() {
        let service = scratch_service("register");
        let source = service.temp_path_for_capture("artifact-1").unwrap();
        image::RgbImage::from_pixel(300, 200, image::Rgb([10, 20, 30]))
            .save_with_format(&source, image::ImageFormat::Png)
            .unwrap();
        let source_bytes = fs::read(&source).unwrap();

        let media = service
            .register(&PhotoReference::new("artifact-1", source.clone()))
            .expect("registration should succeed");

        assert!(media.path.starts_with(service.library_dir()));
        assert_eq!(fs::read(&media.path).unwrap(), source_bytes);
        let thumbnail = media.thumbnail.expect("thumbnail should be written");
        let (width, height) = image::image_dimensions(&thumbnail).unwrap();
        assert!(width <= THUMBNAIL_EDGE && height <= THUMBNAIL_EDGE);
        assert!(!source.exists());
        cleanup(&service);
    }

    #[test]
    fn register_photo_keeps_entry_when_thumbnail_cannot_be_decoded() {
        let service = scratch_service("nothumb");
        let source = service.temp_path_for_capture("raw").unwrap();
        fs::write(&source, b"not an image").unwrap();

        let media = service
            .register_photo(&PhotoReference::new("raw", source))
            .expect("registration should not depend on thumbnails");
        assert!(media.path.exists());
        assert_eq!(media.thumbnail, None);
        cleanup(&service);
    }

    #[test]
    fn register_photo_fails_when_capture_is_gone() {
        let service = scratch_service("missing");
        let err = service
            .register_photo(&PhotoReference::new(
                "gone",
                service.temp_dir().join("capture_gone.jpg"),
            ))
            .expect_err("missing capture should fail");
        assert!(matches!(err, StorageError::MissingSource { .. }));
        cleanup(&service);
    }

    #[test]
    fn prune_stale_temp_files_removes_captures_older_than_max_age() {
        let service = scratch_service("prune-stale");
        let stale = service.temp_path_for_capture("old").unwrap();
        let fresh = service.temp_path_for_capture("new").unwrap();
        let foreign = service.temp_dir().join("notes.txt");
        for path in [&stale, &fresh, &foreign] {
            fs::write(path, b"data").unwrap();
        }
        let two_days_ago = SystemTime::now() - Duration::from_secs(48 * 60 * 60);
        for path in [&stale, &foreign] {
            fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(two_days_ago)
                .unwrap();
        }

        let report = service.prune_stale_temp_files(24).unwrap();

        assert_eq!(report.removed_files, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(foreign.exists());
        cleanup(&service);
    }

    #[test]
    fn remove_temp_capture_ignores_missing_files() {
        let service = scratch_service("remove-missing");
        let path = service.temp_path_for_capture("gone").unwrap();
        fs::write(&path, b"jpg").unwrap();

        remove_temp_capture(&path).unwrap();
        assert!(!path.exists());
        remove_temp_capture(&path).unwrap();
        cleanup(&service);
    }

    #[test]
    fn prune_stale_temp_files_keeps_fresh_captures_and_foreign_files() {
        let service = scratch_service("prune");
        let capture = service.temp_path_for_capture("old").unwrap();
        let other = service.temp_dir().join("keep.txt");
        fs::write(&capture, b"jpg").unwrap();
        fs::write(&other, b"txt").unwrap();

        let report = service.prune_stale_temp_files(24).unwrap();
        assert_eq!(report.removed_files, 0);
        assert!(capture.exists());
        assert!(other.exists());
        cleanup(&service);
    }
}
