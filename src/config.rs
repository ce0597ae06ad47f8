use cle::{LedgerSettings, Result};

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Installs the stderr logger (`RUST_LOG` overrides the level) and reads the
/// engine settings from the environment
pub fn configure_app() -> Result<LedgerSettings> {
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    let settings = LedgerSettings::from_env()?;
    log::debug!("Using settings: {settings:?}");

    return Ok(settings);
}
