mod commands;
mod logging;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::logging::init_logging;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(version, about)]
/// Benchmarks for compressed in-memory arrays and tables.
///
/// Compares evaluating expressions over plain arrays against evaluating
/// them block by block over compressed tables.
pub struct Args {
    #[arg(long, env = "CARRAY_LOG_LEVEL", default_value = "info")]
    /// Set the log level of the benchmark.
    ///
    /// This can filter on various levels, for example `info,carray=debug`
    /// will display all logs at `info` level severity and above, plus the
    /// `debug` events emitted by the `carray` crate.
    log_level: String,
    #[arg(long, env = "CARRAY_LOG_JSON")]
    /// Emit logs in JSON format rather than as plain text.
    log_json: bool,
    #[arg(long, env = "CARRAY_LOG_NO_ANSI")]
    /// Disable ANSI colour codes being present in the logs.
    log_no_ansi: bool,
    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args).context("Init logging")?;

    info!("carray-bench v{}", env!("CARGO_PKG_VERSION"));
    info!(cores = carray::available_cores(), "Detected cores");

    args.command.display_startup_message();
    args.command.execute()
}
