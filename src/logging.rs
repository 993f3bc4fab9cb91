use crate::error::ContactsError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber, logging to stderr.
///
/// The filter starts from `RUST_LOG` and adds `directive`, normally
/// `league_contacts=warn`. Stdout is left to the report.
pub fn setup_logging(directive: &str) -> Result<(), ContactsError> {
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .map_err(|error| ContactsError::LogSetupError(format!("'{directive}': {error}")))?,
    );
    tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init()
        .map_err(|error| ContactsError::LogSetupError(error.to_string()))
}
