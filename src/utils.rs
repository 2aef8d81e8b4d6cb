use std::path::Path;
use std::sync::Mutex;

pub fn init_logging(log_file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    if let Some(parent) = log_file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(log_file_path)?;
    let file_writer = std::io::BufWriter::new(file);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file_writer))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_file(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging initialized to: {}", log_file_path.display());

    Ok(())
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}
