#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub gate_open: bool,
    pub in_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    TakePicture,
    EditNote(String),
    SaveEntry,
    Submit,
    RetryCameraPermission,
    Help,
    Quit,
}

pub const HELP_TEXT: &str = "\
commands:
  c, capture, retake   take (or retake) a picture
  n, note <text>       replace the note on the drafted photo
  s, save              keep the drafted photo in the entry list
  u, send, submit      send the drafted photo to the sheet
  r, retry             request camera permission again
  h, help, ?           show this help
  q, quit, exit        leave";

fn resolve_global_command(keyword: &str) -> Option<CommandAction> {
    match keyword {
        "h" | "help" | "?" => Some(CommandAction::Help),
        "q" | "quit" | "exit" => Some(CommandAction::Quit),
        _ => None,
    }
}

fn resolve_permission_command(keyword: &str) -> Option<CommandAction> {
    match keyword {
        "r" | "retry" => Some(CommandAction::RetryCameraPermission),
        _ => None,
    }
}

fn resolve_capture_command(keyword: &str) -> Option<CommandAction> {
    match keyword {
        "c" | "capture" | "retake" => Some(CommandAction::TakePicture),
        "s" | "save" => Some(CommandAction::SaveEntry),
        "u" | "send" | "submit" => Some(CommandAction::Submit),
        _ => None,
    }
}

fn resolve_preview_command(keyword: &str, rest: &str) -> Option<CommandAction> {
    match keyword {
        "n" | "note" => Some(CommandAction::EditNote(rest.to_string())),
        _ => resolve_capture_command(keyword),
    }
}

/// Maps one input line to an action, honouring which screen is showing.
pub fn resolve_command(line: &str, context: InputContext) -> Option<CommandAction> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };
    if keyword.is_empty() {
        return None;
    }
    let keyword = keyword.to_ascii_lowercase();

    if let Some(action) = resolve_global_command(&keyword) {
        return Some(action);
    }

    if !context.gate_open {
        return resolve_permission_command(&keyword);
    }

    if context.in_preview {
        return resolve_preview_command(&keyword, rest);
    }

    resolve_capture_command(&keyword)
}
