//! Cadence - personal tracker for recurring dates
//!
//! Records dates, keeps rolling interval averages and predicts the next date.

// Use the library crate for all modules
use cadence::cli;

fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .with_writer(std::io::stderr)
        .init();

    // Run CLI
    cli::run()
}
