use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;
use veranda_adapters::fixture::{FixtureError, FixtureService};
use veranda_core::settings::{FileSettingsStore, Settings};

const LOG_FILTER_ENV: &str = "VERANDA_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Installs a file-backed subscriber. The terminal belongs to the TUI, so
/// without a configured log file nothing is installed.
fn init_logging(log_file: Option<&Path>) -> Result<bool, Box<dyn Error>> {
    let Some(path) = log_file else {
        return Ok(false);
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| -> Box<dyn Error> { error })?;
    Ok(true)
}

fn select_service(settings: &Settings) -> Result<FixtureService, FixtureError> {
    match &settings.service.fixture_path {
        Some(path) => {
            info!(path = %path.display(), "replaying fixture replies");
            FixtureService::load(path)
        }
        None => {
            info!("no fixture configured, using demo replies");
            Ok(FixtureService::demo())
        }
    }
}

fn run_app(
    settings: &Settings,
    run_tui: impl FnOnce(FixtureService, &Settings) -> Result<(), veranda_tui::TuiError>,
) -> Result<(), Box<dyn Error>> {
    info!(
        ui = veranda_tui::ui_name(),
        adapters = veranda_adapters::adapter_name(),
        "starting"
    );
    let service = select_service(settings)?;
    run_tui(service, settings)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let store = FileSettingsStore::load_default()?;
    let settings = store.settings().clone();
    init_logging(settings.log_file.as_deref())?;
    info!(path = %store.path().display(), "loaded settings");
    run_app(&settings, |service, settings| {
        veranda_tui::run(service, settings)
    })
}
