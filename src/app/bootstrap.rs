use std::path::PathBuf;

use crate::capture::camera_backend_for;
use crate::config::{load_app_config, load_app_config_from, AppConfig};
use crate::error::AppResult;
use crate::location::location_provider_for;
use crate::notification::{DesktopNotifier, Notifier, SilentNotifier};
use crate::permission::DevicePermissionBackend;
use crate::session::{Capabilities, SessionOptions};
use crate::storage::{prune_stale_temp_files, StorageService};
use crate::submission::HttpSheetTransport;

const STALE_TEMP_MAX_AGE_HOURS: u64 = 24;

pub(crate) const USAGE: &str = "\
usage: geosnap [options]

options:
  --config <path>        read settings from <path> instead of the default config.json
  --webhook-url <url>    post submissions to <url>
  -h, --help             print this help
  -V, --version          print the version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StartupMode {
    Run,
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartupConfig {
    pub(crate) mode: StartupMode,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) webhook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartupError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for {0}")]
    MissingValue(&'static str),
}

impl StartupConfig {
    pub(crate) fn from_args() -> Result<Self, StartupError> {
        Self::parse(std::env::args().skip(1))
    }

    pub(crate) fn parse<I, S>(args: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self {
            mode: StartupMode::Run,
            config_path: None,
            webhook_url: None,
        };
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => config.mode = StartupMode::Help,
                "-V" | "--version" => config.mode = StartupMode::Version,
                "--config" => {
                    let value = args.next().ok_or(StartupError::MissingValue("--config"))?;
                    config.config_path = Some(PathBuf::from(value));
                }
                "--webhook-url" => {
                    let value = args
                        .next()
                        .ok_or(StartupError::MissingValue("--webhook-url"))?;
                    config.webhook_url = Some(value);
                }
                _ => {
                    if let Some(value) = arg.strip_prefix("--config=") {
                        config.config_path = Some(PathBuf::from(value));
                    } else if let Some(value) = arg.strip_prefix("--webhook-url=") {
                        config.webhook_url = Some(value.to_string());
                    } else {
                        return Err(StartupError::UnknownArgument(arg));
                    }
                }
            }
        }

        Ok(config)
    }

    fn resolve_app_config(&self) -> AppConfig {
        let mut config = match &self.config_path {
            Some(path) => load_app_config_from(path),
            None => load_app_config(),
        };
        if let Some(url) = &self.webhook_url {
            config.webhook_url = url.clone();
        }
        config
    }
}

pub(super) struct AppBootstrap {
    pub(super) capabilities: Capabilities,
    pub(super) options: SessionOptions,
    pub(super) temp_dir: PathBuf,
}

pub(super) fn bootstrap_app_runtime(startup: &StartupConfig) -> AppResult<AppBootstrap> {
    prune_stale_capture_temp_files();

    let config = startup.resolve_app_config();
    tracing::info!(
        webhook_url = %config.webhook_url,
        camera = ?config.camera,
        location = ?config.location,
        alerts_enabled = config.alerts_enabled,
        require_complete_draft = config.require_complete_draft,
        "loaded app config"
    );

    let storage = StorageService::with_default_paths(config.library_dir.clone())?;
    let temp_dir = storage.temp_dir().to_path_buf();
    tracing::debug!(
        temp_dir = %temp_dir.display(),
        library_dir = %storage.library_dir().display(),
        "storage ready"
    );

    let transport = HttpSheetTransport::new(config.webhook_url.clone(), config.request_timeout())?;

    Ok(AppBootstrap {
        capabilities: Capabilities {
            permissions: Box::new(DevicePermissionBackend::new(
                config.camera.clone(),
                config.location.clone(),
            )),
            camera: camera_backend_for(&config.camera),
            location: location_provider_for(&config.location),
            media: Box::new(storage),
            transport: Box::new(transport),
            notifier: notifier_for(&config),
        },
        options: session_options(&config),
        temp_dir,
    })
}

fn notifier_for(config: &AppConfig) -> Box<dyn Notifier> {
    if config.alerts_enabled {
        Box::new(DesktopNotifier)
    } else {
        Box::new(SilentNotifier)
    }
}

fn session_options(config: &AppConfig) -> SessionOptions {
    SessionOptions {
        require_complete_draft: config.require_complete_draft,
        retain_location_after_save: config.retain_location_after_save,
    }
}

fn prune_stale_capture_temp_files() {
    match prune_stale_temp_files(STALE_TEMP_MAX_AGE_HOURS) {
        Ok(report) if report.removed_files > 0 => {
            tracing::info!(
                removed_files = report.removed_files,
                "pruned stale capture temp files"
            );
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(
                max_age_hours = STALE_TEMP_MAX_AGE_HOURS,
                ?err,
                "failed to prune stale capture temp files"
            );
        }
    }
}
