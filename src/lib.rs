pub mod app;
pub mod capture;
pub mod command;
mod config;
pub mod error;
pub mod geo;
pub mod input;
pub mod location;
pub mod logging;
pub mod notification;
pub mod permission;
pub mod session;
pub mod state;
pub mod storage;
pub mod submission;
pub mod view;
pub use error::{AppError, AppResult};

/// Entrypoint used by the `geosnap` binary.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting geosnap");
    app::run_from_args()
}
