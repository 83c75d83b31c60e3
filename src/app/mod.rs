use std::io::{BufRead, Write};

use crate::error::AppResult;
use crate::input::{resolve_command, CommandAction, InputContext, HELP_TEXT};
use crate::session::CaptureSession;
use crate::state::ScreenPhase;
use crate::submission::SubmissionOutcome;
use crate::view::{build_view, render_text};

mod bootstrap;

pub use self::bootstrap::StartupError;
use self::bootstrap::{bootstrap_app_runtime, StartupConfig, StartupMode, USAGE};

const PROMPT: &str = "geosnap> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Quit,
}

/// Terminal frontend: renders the screen, reads one command per line and
/// forwards it to the session.
pub struct App {
    session: CaptureSession,
    status: Option<String>,
}

impl App {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            session,
            status: None,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn start(&mut self) -> AppResult<()> {
        self.session.mount()?;
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.run_loop(stdin.lock(), stdout.lock())
    }

    /// Runs until `quit` or end of input. Action failures become the status
    /// line; only terminal I/O errors end the loop early.
    pub fn run_loop<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> AppResult<()> {
        let mut line = String::new();
        loop {
            self.draw(&mut output)?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                tracing::debug!("input closed");
                break;
            }
            if self.handle_line(&line) == LoopControl::Quit {
                break;
            }
        }
        writeln!(output)?;
        output.flush()?;
        Ok(())
    }

    fn draw<W: Write>(&self, output: &mut W) -> AppResult<()> {
        let view = build_view(self.session.state());
        write!(output, "{}{PROMPT}", render_text(&view, self.status()))?;
        output.flush()?;
        Ok(())
    }

    fn input_context(&self) -> InputContext {
        let state = self.session.state();
        InputContext {
            gate_open: state.gate_open(),
            in_preview: state.phase() == ScreenPhase::Preview,
        }
    }

    fn handle_line(&mut self, line: &str) -> LoopControl {
        if line.trim().is_empty() {
            return LoopControl::Continue;
        }
        let Some(action) = resolve_command(line, self.input_context()) else {
            self.status = Some(format!(
                "unknown command: {} (h for help)",
                line.split_whitespace().next().unwrap_or_default()
            ));
            return LoopControl::Continue;
        };
        tracing::debug!(?action, "dispatching command");

        match self.dispatch(action) {
            Ok(control) => control,
            Err(err) => {
                tracing::warn!(%err, "command failed");
                self.status = Some(err.to_string());
                LoopControl::Continue
            }
        }
    }

    fn dispatch(&mut self, action: CommandAction) -> AppResult<LoopControl> {
        self.status = None;
        match action {
            CommandAction::Quit => return Ok(LoopControl::Quit),
            CommandAction::Help => self.status = Some(HELP_TEXT.to_string()),
            CommandAction::RetryCameraPermission => {
                let camera = self.session.retry_camera_permission()?;
                if !camera.is_granted() {
                    self.status = Some(format!("camera permission {}", camera.as_str()));
                }
            }
            CommandAction::TakePicture => {
                if !self.session.take_picture()? {
                    self.status = Some("camera is not ready".to_string());
                }
            }
            CommandAction::EditNote(note) => self.session.edit_note(note)?,
            CommandAction::SaveEntry => {
                self.status = Some(match self.session.save_entry()? {
                    Some(entry) => format!("saved entry {}", entry.id),
                    None => "nothing to save yet".to_string(),
                });
            }
            CommandAction::Submit => {
                self.status = Some(match self.session.send_to_sheet()? {
                    SubmissionOutcome::Accepted => "Data saved to Google Sheet!".to_string(),
                    SubmissionOutcome::Rejected { .. } => "Failed to save data.".to_string(),
                    SubmissionOutcome::Failed { message } => message,
                });
            }
        }
        Ok(LoopControl::Continue)
    }
}

/// Parses the command line, wires the desktop capabilities and runs the
/// terminal loop.
pub fn run_from_args() -> AppResult<()> {
    let startup = StartupConfig::from_args()?;
    match startup.mode {
        StartupMode::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        StartupMode::Version => {
            println!("geosnap {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        StartupMode::Run => {}
    }

    let bootstrap = bootstrap_app_runtime(&startup)?;
    let session = CaptureSession::new(bootstrap.capabilities, bootstrap.options, bootstrap.temp_dir);
    let mut app = App::new(session);
    app.start()?;

    tracing::info!(
        entries = app.session().state().entries.len(),
        transitions = app.session().machine().history().len(),
        "session finished"
    );
    Ok(())
}
