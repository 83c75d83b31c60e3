mod command;

pub use command::{resolve_command, CommandAction, InputContext, HELP_TEXT};
