use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::Args;

/// Installs the global subscriber.
///
/// Logs go to stderr so benchmark output can be piped separately.
pub fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("Parse log level {:?}", args.log_level))?;

    let builder = tracing_subscriber::fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!args.log_no_ansi);

    let installed = if args.log_json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    installed
        .map_err(|e| anyhow!(e))
        .context("Install log subscriber")
}
