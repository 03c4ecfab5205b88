//! Daily cloud cost report posted to a chat webhook

pub mod cli;
pub mod config;
pub mod services;
pub mod types;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing; logs go to stderr so stdout only carries output
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
