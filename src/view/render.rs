use std::fmt::Write;

use super::{CaptureStage, CaptureView, PermissionPrompt, ScreenView};

const TITLE: &str = "== geosnap ==";

/// Plain-text rendering of the screen, one block per region.
pub fn render_text(view: &ScreenView, status: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    match view {
        ScreenView::PermissionPrompt(prompt) => render_prompt(&mut out, prompt),
        ScreenView::Capture(capture) => render_capture(&mut out, capture),
    }
    if let Some(status) = status.filter(|status| !status.is_empty()) {
        let _ = writeln!(out, "> {status}");
    }
    out
}

fn render_prompt(out: &mut String, prompt: &PermissionPrompt) {
    let _ = writeln!(out, "{}", prompt.message);
    if let Some(label) = prompt.retry_label {
        let _ = writeln!(out, "[r] {label}");
    }
}

fn render_capture(out: &mut String, view: &CaptureView) {
    match &view.stage {
        CaptureStage::Viewfinder => {
            let _ = writeln!(out, "[camera ready]");
        }
        CaptureStage::Preview(preview) => {
            let _ = writeln!(out, "photo: {}", preview.image_uri);
            let _ = writeln!(
                out,
                "location: {}",
                preview.location.as_deref().unwrap_or("unavailable")
            );
            if preview.note.is_empty() {
                let _ = writeln!(out, "note: ({})", preview.note_placeholder);
            } else {
                let _ = writeln!(out, "note: {}", preview.note);
            }
            let _ = writeln!(out, "[n <text>] edit note  [s] save entry");
            let _ = writeln!(out, "[u] {}", preview.submit_label);
        }
    }
    let _ = writeln!(out, "[c] {}", view.capture_label);
    if view.sending {
        let _ = writeln!(out, "sending...");
    }

    let _ = writeln!(out, "-- entries ({}) --", view.entries.len());
    for (index, row) in view.entries.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, row.note);
        let _ = writeln!(out, "   {}", row.coordinates);
        let _ = writeln!(out, "   {}", row.thumbnail_uri);
    }
}
