pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{ScreenEvent, ScreenEventKind, StateTransition};
pub use machine::{reduce, StateMachine};
pub use model::{Draft, Entry, PhotoReference, ScreenPhase, ScreenState};
