use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing.
///
/// The filter comes from `RUST_LOG` (default `info`). Set `TALLY_LOG` to a
/// file path to write logs there instead of stderr.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Ok(log_path) = std::env::var("TALLY_LOG") {
        match std::fs::File::create(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339());
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Failed to create log file {}: {}", log_path, e);
            }
        }
    }

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
