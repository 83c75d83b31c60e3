use std::path::PathBuf;

use crate::capture::{capture_still_with, CameraBackend};
use crate::error::AppResult;
use crate::location::LocationProvider;
use crate::notification::Notifier;
use crate::permission::{PermissionBackend, PermissionStatus};
use crate::state::{Entry, ScreenEvent, ScreenState, StateMachine};
use crate::storage::{remove_temp_capture, MediaLibrary};
use crate::submission::{
    classify_response, validate_complete_draft, SheetTransport, SubmissionOutcome,
    SubmissionPayload,
};

mod entry_id;

use self::entry_id::EntryIdGenerator;

const MISSING_DATA_TITLE: &str = "Missing Data";
const MISSING_DATA_BODY: &str = "Please take a photo, add a note, and ensure location is available.";

/// The platform services a capture session talks to.
pub struct Capabilities {
    pub permissions: Box<dyn PermissionBackend>,
    pub camera: Box<dyn CameraBackend>,
    pub location: Box<dyn LocationProvider>,
    pub media: Box<dyn MediaLibrary>,
    pub transport: Box<dyn SheetTransport>,
    pub notifier: Box<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    pub require_complete_draft: bool,
    pub retain_location_after_save: bool,
}

/// Owns the screen state and drives every user action through the
/// capability ports, one blocking call at a time.
pub struct CaptureSession {
    machine: StateMachine,
    capabilities: Capabilities,
    options: SessionOptions,
    temp_dir: PathBuf,
    entry_ids: EntryIdGenerator,
}

impl CaptureSession {
    pub fn new(capabilities: Capabilities, options: SessionOptions, temp_dir: PathBuf) -> Self {
        Self {
            machine: StateMachine::new(),
            capabilities,
            options,
            temp_dir,
            entry_ids: EntryIdGenerator::default(),
        }
    }

    pub fn state(&self) -> &ScreenState {
        self.machine.state()
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Requests location permission and reads the current camera permission.
    pub fn mount(&mut self) -> AppResult<()> {
        let location = self.capabilities.permissions.request_location();
        self.machine.apply(ScreenEvent::LocationPermission(location))?;

        let camera = self.capabilities.permissions.camera_status();
        self.machine.apply(ScreenEvent::CameraPermission(camera))?;

        tracing::info!(
            camera = camera.as_str(),
            location = location.as_str(),
            "permission gate resolved"
        );
        Ok(())
    }

    pub fn retry_camera_permission(&mut self) -> AppResult<PermissionStatus> {
        let camera = self.capabilities.permissions.request_camera();
        self.machine.apply(ScreenEvent::CameraPermission(camera))?;
        tracing::info!(camera = camera.as_str(), "camera permission requested again");
        Ok(camera)
    }

    /// Captures a photo, then samples the location. Returns `false` without
    /// touching the draft when the gate is closed or the camera is not ready.
    pub fn take_picture(&mut self) -> AppResult<bool> {
        if !self.state().gate_open() {
            tracing::debug!("take picture ignored: permissions not granted");
            return Ok(false);
        }
        if !self.capabilities.camera.is_ready() {
            tracing::warn!("take picture ignored: camera is not ready");
            return Ok(false);
        }

        let artifact = capture_still_with(self.capabilities.camera.as_ref(), &self.temp_dir)?;
        self.discard_replaced_capture();
        self.machine
            .apply(ScreenEvent::PhotoCaptured(artifact.photo_reference()))?;

        let coords = self.capabilities.location.current_position()?;
        self.machine.apply(ScreenEvent::LocationSampled(coords))?;
        tracing::info!(capture_id = %artifact.capture_id, %coords, "photo drafted");
        Ok(true)
    }

    /// Removes the temp file of a drafted photo that a retake is about to replace.
    fn discard_replaced_capture(&self) {
        let Some(previous) = self.state().draft.photo.as_ref() else {
            return;
        };
        if !previous.path.starts_with(&self.temp_dir) {
            return;
        }
        if let Err(err) = remove_temp_capture(&previous.path) {
            tracing::warn!(
                capture_id = %previous.capture_id,
                path = %previous.path.display(),
                ?err,
                "failed to remove replaced capture"
            );
        }
    }

    pub fn edit_note(&mut self, note: impl Into<String>) -> AppResult<()> {
        self.machine.apply(ScreenEvent::NoteEdited(note.into()))?;
        Ok(())
    }

    /// Registers the drafted photo and appends it to the entry list. Does
    /// nothing while the draft lacks a photo or a location.
    pub fn save_entry(&mut self) -> AppResult<Option<Entry>> {
        let draft = &self.machine.state().draft;
        let (Some(photo), Some(coordinates)) = (draft.photo.clone(), draft.coordinates) else {
            tracing::debug!("save entry ignored: draft is incomplete");
            return Ok(None);
        };
        let note = draft.note.clone();

        let media = self.capabilities.media.register(&photo)?;
        let entry = Entry {
            id: self.entry_ids.next_id(),
            media_reference: media.path,
            thumbnail: media.thumbnail,
            coordinates,
            note,
        };
        self.machine.apply(ScreenEvent::EntrySaved {
            entry: entry.clone(),
            clear_location: !self.options.retain_location_after_save,
        })?;

        tracing::info!(
            id = %entry.id,
            entries = self.state().entries.len(),
            "entry saved"
        );
        Ok(Some(entry))
    }

    /// Sends the draft to the sheet webhook. Webhook and transport failures
    /// are reported through the returned outcome, never as `Err`; only draft
    /// preconditions fail the call.
    pub fn send_to_sheet(&mut self) -> AppResult<SubmissionOutcome> {
        tracing::info!("sending draft to sheet");
        let draft = self.machine.state().draft.clone();

        if self.options.require_complete_draft {
            if let Err(err) = validate_complete_draft(&draft) {
                self.capabilities
                    .notifier
                    .alert(MISSING_DATA_TITLE, MISSING_DATA_BODY);
                return Err(err.into());
            }
        }
        let payload = SubmissionPayload::from_draft(&draft)?;

        self.machine.apply(ScreenEvent::SubmissionStarted)?;
        let outcome = match self.capabilities.transport.post_json(&payload) {
            Ok(body) => classify_response(&body),
            Err(err) => SubmissionOutcome::Failed {
                message: err.to_string(),
            },
        };

        match &outcome {
            SubmissionOutcome::Accepted => {
                tracing::info!("success - data saved to sheet");
                self.capabilities
                    .notifier
                    .alert("Success", "Data saved to Google Sheet!");
            }
            SubmissionOutcome::Rejected { result } => {
                tracing::warn!(?result, "error - failed to save data");
                self.capabilities
                    .notifier
                    .alert("Error", "Failed to save data.");
            }
            SubmissionOutcome::Failed { message } => {
                tracing::error!(%message, "sheet submission failed");
                self.capabilities.notifier.alert("Error", message);
            }
        }

        self.machine.apply(ScreenEvent::SubmissionCompleted {
            accepted: outcome.is_accepted(),
        })?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::command::CommandError;
    use crate::error::AppError;
    use crate::geo::Coordinates;
    use crate::location::LocationError;
    use crate::state::{PhotoReference, ScreenPhase};
    use crate::storage::{RegisteredMedia, StorageError, StorageResult};
    use crate::submission::{SubmissionError, SubmissionResult};
    use serde_json::{json, Value};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::path::Path;
    use std::rc::Rc;

    struct FakePermissions {
        camera: Rc<Cell<PermissionStatus>>,
        location: PermissionStatus,
    }

    impl PermissionBackend for FakePermissions {
        fn camera_status(&self) -> PermissionStatus {
            self.camera.get()
        }

        fn request_camera(&self) -> PermissionStatus {
            self.camera.get()
        }

        fn request_location(&self) -> PermissionStatus {
            self.location
        }
    }

    struct FakeCamera {
        ready: bool,
        fail: Rc<Cell<bool>>,
    }

    impl CameraBackend for FakeCamera {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn capture_still(&self, output: &Path) -> Result<(), CaptureError> {
            if self.fail.get() {
                return Err(CaptureError::Command(CommandError::Failed {
                    command: "ffmpeg".to_string(),
                    message: "device busy".to_string(),
                }));
            }
            std::fs::write(output, b"jpeg").map_err(|err| CaptureError::SourceIo {
                path: output.to_path_buf(),
                source: err,
            })
        }

        fn image_dimensions(&self, _output: &Path) -> Result<(u32, u32), CaptureError> {
            Ok((640, 480))
        }
    }

    struct FakeLocation {
        readings: RefCell<VecDeque<Result<Coordinates, LocationError>>>,
    }

    impl LocationProvider for FakeLocation {
        fn current_position(&self) -> Result<Coordinates, LocationError> {
            self.readings
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(LocationError::Disabled))
        }
    }

    struct FakeMedia {
        registered: Rc<RefCell<Vec<PhotoReference>>>,
        fail: bool,
    }

    impl MediaLibrary for FakeMedia {
        fn register(&self, photo: &PhotoReference) -> StorageResult<RegisteredMedia> {
            if self.fail {
                return Err(StorageError::MissingSource {
                    path: photo.path.clone(),
                });
            }
            self.registered.borrow_mut().push(photo.clone());
            Ok(RegisteredMedia {
                path: PathBuf::from(format!("/library/{}.jpg", photo.capture_id)),
                thumbnail: None,
            })
        }
    }

    struct FakeTransport {
        responses: RefCell<VecDeque<SubmissionResult<Value>>>,
        payloads: Rc<RefCell<Vec<SubmissionPayload>>>,
    }

    impl SheetTransport for FakeTransport {
        fn post_json(&self, payload: &SubmissionPayload) -> SubmissionResult<Value> {
            self.payloads.borrow_mut().push(payload.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"result": "success"})))
        }
    }

    struct RecordingNotifier {
        alerts: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl Notifier for RecordingNotifier {
        fn alert(&self, title: &str, body: &str) {
            self.alerts
                .borrow_mut()
                .push((title.to_string(), body.to_string()));
        }
    }

    struct Harness {
        camera_permission: Rc<Cell<PermissionStatus>>,
        camera_fails: Rc<Cell<bool>>,
        registered: Rc<RefCell<Vec<PhotoReference>>>,
        payloads: Rc<RefCell<Vec<SubmissionPayload>>>,
        alerts: Rc<RefCell<Vec<(String, String)>>>,
        temp_dir: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.temp_dir);
        }
    }

    struct Setup {
        camera_permission: PermissionStatus,
        location_permission: PermissionStatus,
        camera_ready: bool,
        camera_fails: bool,
        readings: Vec<Result<Coordinates, LocationError>>,
        media_fails: bool,
        responses: Vec<SubmissionResult<Value>>,
        options: SessionOptions,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                camera_permission: PermissionStatus::Granted,
                location_permission: PermissionStatus::Granted,
                camera_ready: true,
                camera_fails: false,
                readings: vec![Ok(here()), Ok(there())],
                media_fails: false,
                responses: Vec::new(),
                options: SessionOptions::default(),
            }
        }
    }

    fn here() -> Coordinates {
        Coordinates::new(59.3293, 18.0686)
    }

    fn there() -> Coordinates {
        Coordinates::new(-22.9068, -43.1729)
    }

    fn new_session(name: &str, setup: Setup) -> (CaptureSession, Harness) {
        let temp_dir = std::env::temp_dir().join(format!(
            "geosnap-session-{}-{name}",
            std::process::id()
        ));
        let harness = Harness {
            camera_permission: Rc::new(Cell::new(setup.camera_permission)),
            camera_fails: Rc::new(Cell::new(setup.camera_fails)),
            registered: Rc::new(RefCell::new(Vec::new())),
            payloads: Rc::new(RefCell::new(Vec::new())),
            alerts: Rc::new(RefCell::new(Vec::new())),
            temp_dir: temp_dir.clone(),
        };
        let capabilities = Capabilities {
            permissions: Box::new(FakePermissions {
                camera: Rc::clone(&harness.camera_permission),
                location: setup.location_permission,
            }),
            camera: Box::new(FakeCamera {
                ready: setup.camera_ready,
                fail: Rc::clone(&harness.camera_fails),
            }),
            location: Box::new(FakeLocation {
                readings: RefCell::new(setup.readings.into()),
            }),
            media: Box::new(FakeMedia {
                registered: Rc::clone(&harness.registered),
                fail: setup.media_fails,
            }),
            transport: Box::new(FakeTransport {
                responses: RefCell::new(setup.responses.into()),
                payloads: Rc::clone(&harness.payloads),
            }),
            notifier: Box::new(RecordingNotifier {
                alerts: Rc::clone(&harness.alerts),
            }),
        };
        let mut session = CaptureSession::new(capabilities, setup.options, temp_dir);
        session.mount().expect("mount should succeed");
        (session, harness)
    }

    fn drafted(name: &str, setup: Setup, note: &str) -> (CaptureSession, Harness) {
        let (mut session, harness) = new_session(name, setup);
        assert!(session.take_picture().expect("capture should succeed"));
        session.edit_note(note).expect("note should apply");
        (session, harness)
    }

    #[test]
    fn mount_opens_gate_only_when_both_permissions_are_granted() {
        let (session, _harness) = new_session("gate-open", Setup::default());
        assert_eq!(session.machine().phase(), ScreenPhase::Viewfinder);

        let (session, _harness) = new_session(
            "gate-location",
            Setup {
                location_permission: PermissionStatus::Denied,
                ..Setup::default()
            },
        );
        assert_eq!(session.machine().phase(), ScreenPhase::AwaitingPermissions);
    }

    #[test]
    fn retry_camera_permission_opens_gate_after_access_is_granted() {
        let (mut session, harness) = new_session(
            "gate-retry",
            Setup {
                camera_permission: PermissionStatus::Denied,
                ..Setup::default()
            },
        );
        assert_eq!(session.machine().phase(), ScreenPhase::AwaitingPermissions);
        assert!(!session.take_picture().unwrap());

        harness.camera_permission.set(PermissionStatus::Granted);
        assert_eq!(
            session.retry_camera_permission().unwrap(),
            PermissionStatus::Granted
        );
        assert_eq!(session.machine().phase(), ScreenPhase::Viewfinder);
    }

    #[test]
    fn take_picture_drafts_photo_then_location() {
        let (mut session, harness) = new_session("capture", Setup::default());

        assert!(session.take_picture().expect("capture should succeed"));

        let draft = &session.state().draft;
        let photo = draft.photo.as_ref().expect("photo should be drafted");
        assert!(!photo.uri().is_empty());
        assert!(photo.path.starts_with(&harness.temp_dir));
        assert!(photo.path.exists());
        let coords = draft.coordinates.expect("location should be sampled");
        assert_eq!(coords, here());
        assert!(coords.latitude.is_finite() && coords.longitude.is_finite());
        assert_eq!(session.machine().phase(), ScreenPhase::Preview);
    }

    #[test]
    fn retake_replaces_photo_and_removes_previous_capture() {
        let (mut session, harness) = drafted("retake", Setup::default(), "kept note");
        let first = session.state().draft.photo.clone().unwrap();
        assert!(first.path.exists());

        assert!(session.take_picture().expect("retake should succeed"));

        let draft = &session.state().draft;
        let second = draft.photo.as_ref().expect("retake should draft a photo");
        assert_ne!(second.capture_id, first.capture_id);
        assert!(second.path.exists());
        assert!(!first.path.exists());
        assert_eq!(draft.note, "kept note");
        assert_eq!(draft.coordinates, Some(there()));
        let leftovers = std::fs::read_dir(&harness.temp_dir).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn failed_retake_keeps_previous_capture() {
        let (mut session, harness) = drafted("retake-fail", Setup::default(), "");
        let first = session.state().draft.photo.clone().unwrap();
        harness.camera_fails.set(true);

        session.take_picture().expect_err("capture failure should propagate");

        assert_eq!(session.state().draft.photo.as_ref(), Some(&first));
        assert!(first.path.exists());
    }

    #[test]
    fn take_picture_is_a_no_op_when_camera_is_not_ready() {
        let (mut session, _harness) = new_session(
            "not-ready",
            Setup {
                camera_ready: false,
                ..Setup::default()
            },
        );
        assert!(!session.take_picture().unwrap());
        assert!(session.state().draft.is_empty());
    }

    #[test]
    fn capture_failure_propagates_and_leaves_draft_untouched() {
        let (mut session, _harness) = new_session(
            "capture-fail",
            Setup {
                camera_fails: true,
                ..Setup::default()
            },
        );
        let err = session.take_picture().expect_err("capture failure should propagate");
        assert!(matches!(err, AppError::Capture(_)));
        assert!(session.state().draft.is_empty());
    }

    #[test]
    fn location_failure_keeps_new_photo_without_coordinates() {
        let (mut session, _harness) = new_session(
            "location-fail",
            Setup {
                readings: vec![Err(LocationError::InvalidReading {
                    message: "no fix".to_string(),
                })],
                ..Setup::default()
            },
        );
        let err = session.take_picture().expect_err("location failure should propagate");
        assert!(matches!(err, AppError::Location(_)));
        assert!(session.state().draft.photo.is_some());
        assert_eq!(session.state().draft.coordinates, None);
    }

    #[test]
    fn save_entry_is_a_no_op_with_an_empty_draft() {
        let (mut session, harness) = new_session("save-empty", Setup::default());
        assert_eq!(session.save_entry().unwrap(), None);
        assert!(session.state().entries.is_empty());
        assert!(harness.registered.borrow().is_empty());
    }

    #[test]
    fn save_entry_appends_entry_and_clears_photo_and_note() {
        let (mut session, harness) = drafted("save", Setup::default(), "harbour crane");
        let photo = session.state().draft.photo.clone().unwrap();

        let entry = session
            .save_entry()
            .expect("save should succeed")
            .expect("entry should be created");

        let state = session.state();
        assert_eq!(state.entries.len(), 1);
        assert_eq!(state.entries[0], entry);
        assert_eq!(entry.coordinates, here());
        assert_eq!(entry.note, "harbour crane");
        assert_eq!(
            entry.media_reference,
            PathBuf::from(format!("/library/{}.jpg", photo.capture_id))
        );
        assert!(!entry.id.is_empty());
        assert_eq!(state.draft.photo, None);
        assert!(state.draft.note.is_empty());
        assert_eq!(state.draft.coordinates, None);
        assert_eq!(harness.registered.borrow().as_slice(), &[photo]);
    }

    #[test]
    fn save_entry_can_retain_location_for_legacy_behavior() {
        let (mut session, _harness) = drafted(
            "save-retain",
            Setup {
                options: SessionOptions {
                    retain_location_after_save: true,
                    ..SessionOptions::default()
                },
                ..Setup::default()
            },
            "",
        );
        session.save_entry().unwrap().expect("entry should be created");
        assert_eq!(session.state().draft.coordinates, Some(here()));
        assert_eq!(session.state().draft.photo, None);
    }

    #[test]
    fn save_entry_keeps_insertion_order_and_unique_ids() {
        let (mut session, _harness) = drafted("save-order", Setup::default(), "first");
        session.save_entry().unwrap();
        assert!(session.take_picture().unwrap());
        session.edit_note("second").unwrap();
        session.save_entry().unwrap();

        let entries = &session.state().entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].note, "first");
        assert_eq!(entries[1].note, "second");
        assert_eq!(entries[1].coordinates, there());
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn save_entry_failure_leaves_draft_untouched() {
        let (mut session, _harness) = drafted(
            "save-fail",
            Setup {
                media_fails: true,
                ..Setup::default()
            },
            "kept",
        );
        let before = session.state().draft.clone();
        let err = session.save_entry().expect_err("registration failure should propagate");
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(session.state().draft, before);
        assert!(session.state().entries.is_empty());
    }

    #[test]
    fn accepted_submission_clears_draft_and_resets_sending() {
        let (mut session, harness) = drafted("send-ok", Setup::default(), "bridge");
        let photo = session.state().draft.photo.clone().unwrap();

        let outcome = session.send_to_sheet().expect("send should complete");

        assert_eq!(outcome, SubmissionOutcome::Accepted);
        assert!(session.state().draft.is_empty());
        assert!(!session.state().sending);
        let payloads = harness.payloads.borrow();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            serde_json::to_value(&payloads[0]).unwrap(),
            json!({
                "imageUrl": photo.uri(),
                "note": "bridge",
                "location": {"latitude": 59.3293, "longitude": 18.0686}
            })
        );
        assert_eq!(
            harness.alerts.borrow().as_slice(),
            &[(
                "Success".to_string(),
                "Data saved to Google Sheet!".to_string()
            )]
        );
    }

    #[test]
    fn rejected_submission_keeps_draft_and_resets_sending() {
        let (mut session, harness) = drafted(
            "send-rejected",
            Setup {
                responses: vec![Ok(json!({"result": "error"}))],
                ..Setup::default()
            },
            "bridge",
        );
        let before = session.state().draft.clone();

        let outcome = session.send_to_sheet().expect("send should complete");

        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected {
                result: Some("error".to_string())
            }
        );
        assert_eq!(session.state().draft, before);
        assert!(!session.state().sending);
        assert_eq!(harness.alerts.borrow()[0].0, "Error");
    }

    #[test]
    fn transport_failure_keeps_draft_and_resets_sending() {
        let (mut session, _harness) = drafted(
            "send-failed",
            Setup {
                responses: vec![Err(SubmissionError::InvalidResponse {
                    status: 502,
                    source: serde_json::from_str::<Value>("<html>").unwrap_err(),
                })],
                ..Setup::default()
            },
            "bridge",
        );
        let before = session.state().draft.clone();

        let outcome = session.send_to_sheet().expect("send should complete");

        assert!(matches!(outcome, SubmissionOutcome::Failed { .. }));
        assert_eq!(session.state().draft, before);
        assert!(!session.state().sending);
    }

    #[test]
    fn lenient_submission_allows_empty_note() {
        let (mut session, harness) = drafted("send-empty-note", Setup::default(), "");
        assert_eq!(
            session.send_to_sheet().unwrap(),
            SubmissionOutcome::Accepted
        );
        assert_eq!(harness.payloads.borrow()[0].note, "");
    }

    #[test]
    fn strict_submission_rejects_blank_note_before_sending() {
        let (mut session, harness) = drafted(
            "send-strict",
            Setup {
                options: SessionOptions {
                    require_complete_draft: true,
                    ..SessionOptions::default()
                },
                ..Setup::default()
            },
            "  ",
        );

        let err = session
            .send_to_sheet()
            .expect_err("blank note should be rejected");
        assert!(matches!(
            err,
            AppError::Submission(SubmissionError::IncompleteDraft { .. })
        ));
        assert!(harness.payloads.borrow().is_empty());
        assert!(!session.state().sending);
        assert_eq!(
            harness.alerts.borrow().as_slice(),
            &[(MISSING_DATA_TITLE.to_string(), MISSING_DATA_BODY.to_string())]
        );
    }

    #[test]
    fn submission_without_location_is_a_handled_error() {
        let (mut session, harness) = new_session(
            "send-no-location",
            Setup {
                readings: vec![Err(LocationError::Disabled)],
                ..Setup::default()
            },
        );
        let _ = session.take_picture();

        let err = session
            .send_to_sheet()
            .expect_err("missing location should be rejected");
        assert!(matches!(
            err,
            AppError::Submission(SubmissionError::MissingLocation)
        ));
        assert!(harness.payloads.borrow().is_empty());
        assert!(!session.state().sending);
    }
}
