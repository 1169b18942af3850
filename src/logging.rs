use std::{
    fs::OpenOptions,
    io,
    path::Path,
    sync::Mutex,
};

use tracing_subscriber::EnvFilter;

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// One-shot commands log to stderr, quiet unless `RUST_LOG` says otherwise.
pub fn init_cli_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// The terminal UI owns the screen, so its log goes to a file.
pub fn init_tui_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
