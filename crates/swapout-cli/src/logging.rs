use anyhow::Result;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// Logs go to stderr so stdout stays clean for tables and JSON.
/// `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    subscriber(filter, std::io::stderr).try_init()?;

    Ok(())
}

/// The subscriber both binaries log through, writing to `writer`
pub fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(false),
        )
        .with(filter)
}

/// Default level for the controller: quiet runs only surface errors
pub fn controller_level(quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        "info"
    }
}
