use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::geo::Coordinates;
use crate::state::Draft;

/// Apps Script web app the capture screen posts to unless configured otherwise.
pub const DEFAULT_WEBHOOK_URL: &str = "https://script.google.com/macros/s/AKfycbx6iByJlhCpoxBIkl_utsmbx7y-uPhRALeghNqbPBvPTtoOrHQ3lD4fGhggVf1w5gxO/exec";

const SUCCESS_RESULT: &str = "success";
const USER_AGENT: &str = concat!("geosnap/", env!("CARGO_PKG_VERSION"));

/// The JSON body the sheet webhook expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub image_url: String,
    pub note: String,
    pub location: Coordinates,
}

impl SubmissionPayload {
    pub fn from_draft(draft: &Draft) -> SubmissionResult<Self> {
        let photo = draft.photo.as_ref().ok_or(SubmissionError::MissingPhoto)?;
        let location = draft.coordinates.ok_or(SubmissionError::MissingLocation)?;
        Ok(Self {
            image_url: photo.uri(),
            note: draft.note.clone(),
            location,
        })
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no photo has been taken")]
    MissingPhoto,
    #[error("no location is available for the photo")]
    MissingLocation,
    #[error("please take a photo, add a note, and ensure location is available (missing: {missing})")]
    IncompleteDraft { missing: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to sheet webhook failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheet webhook answered {status} with a non-json body: {source}")]
    InvalidResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

pub type SubmissionResult<T> = std::result::Result<T, SubmissionError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected { result: Option<String> },
    Failed { message: String },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Checks the stricter draft rules: photo, location and a non-blank note.
pub fn validate_complete_draft(draft: &Draft) -> SubmissionResult<()> {
    let mut missing = Vec::new();
    if draft.photo.is_none() {
        missing.push("photo");
    }
    if draft.note.trim().is_empty() {
        missing.push("note");
    }
    if draft.coordinates.is_none() {
        missing.push("location");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SubmissionError::IncompleteDraft {
            missing: missing.join(", "),
        })
    }
}

/// Success is signalled only by a top-level `"result": "success"`.
pub fn classify_response(body: &Value) -> SubmissionOutcome {
    match body.get("result") {
        Some(Value::String(result)) if result == SUCCESS_RESULT => SubmissionOutcome::Accepted,
        Some(Value::String(result)) => SubmissionOutcome::Rejected {
            result: Some(result.clone()),
        },
        Some(other) => SubmissionOutcome::Rejected {
            result: Some(other.to_string()),
        },
        None => SubmissionOutcome::Rejected { result: None },
    }
}

pub trait SheetTransport {
    /// Posts `payload` as JSON and returns the decoded response body.
    fn post_json(&self, payload: &SubmissionPayload) -> SubmissionResult<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpSheetTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSheetTransport {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> SubmissionResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(SubmissionError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl SheetTransport for HttpSheetTransport {
    fn post_json(&self, payload: &SubmissionPayload) -> SubmissionResult<Value> {
        let response = self.client.post(&self.url).json(payload).send()?;
        let status = response.status();
        let body = response.text()?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "sheet webhook answered");

        serde_json::from_str(&body).map_err(|source| SubmissionError::InvalidResponse {
            status: status.as_u16(),
            source,
        })
    }
}
