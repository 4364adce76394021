use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context};
use carray::{available_cores, ArrayOptions, Backend, CArray, CParams, CTable, MAX_CLEVEL};
use carray_expr::{Bindings, Expression};
use carray_types::Array;
use clap::Subcommand;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate an expression over plain arrays and over a compressed table.
    Eval {
        #[arg(short = 'n', long, default_value_t = 10_000_000)]
        /// The number of points in every input column.
        length: usize,
        #[arg(long, default_value_t = 5)]
        /// The compression level of the inputs and the result (0-9).
        clevel: u8,
        #[arg(long, default_value = "(2*x**3+.3*y**2+z+1)<0")]
        /// The expression to compute.
        ///
        /// Every free name in the expression becomes an input column
        /// holding `0, 1, 2, ...` as floats.
        expression: String,
        #[arg(long, env = "CARRAY_NUM_THREADS")]
        /// The number of compression threads used while evaluating the table.
        ///
        /// Defaults to half of the available cores.
        threads: Option<usize>,
        #[arg(long)]
        /// Write the compressed result to this file.
        output: Option<PathBuf>,
    },
    /// Compress the same data at every compression level.
    Levels {
        #[arg(short = 'n', long, default_value_t = 1_000_000)]
        /// The number of points to compress.
        length: usize,
    },
}

impl Commands {
    /// Triggers any additional startup messages which are aware
    /// of the provided subcommand.
    pub fn display_startup_message(&self) {
        match self {
            Commands::Eval {
                length,
                clevel,
                expression,
                ..
            } => {
                info!(length, clevel, expression = %expression, "Running the expression benchmark");
            },
            Commands::Levels { length } => {
                info!(length, max_clevel = MAX_CLEVEL, "Running the compression level benchmark");
            },
        }
    }

    /// Executes the command
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Commands::Eval {
                length,
                clevel,
                expression,
                threads,
                output,
            } => run_eval(length, clevel, &expression, threads, output),
            Commands::Levels { length } => run_levels(length),
        }
    }
}

fn run_eval(
    length: usize,
    clevel: u8,
    source: &str,
    threads: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let expression = Expression::parse(source).context("Parse expression")?;
    let options = ArrayOptions::builder()
        .cparams(CParams::new(clevel, true)?)
        .expected_len(length)
        .build();

    info!("Creating inputs...");
    let names: Vec<&str> = expression
        .names()
        .iter()
        .map(String::as_str)
        .filter(|name| carray_expr::constant(name).is_none())
        .collect();
    let values: Array = (0..length).map(|i| i as f64).collect();

    let mut bindings = Bindings::new();
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        bindings.insert(*name, values.clone());
        columns.push(CArray::from_array(&values, options.clone())?);
    }
    let table = CTable::from_columns(columns, Some(names.as_slice()), options)?;
    info!(
        nbytes = table.nbytes(),
        cbytes = table.cbytes(),
        "Created table"
    );

    info!(expression = %source, points = length, "Evaluating");

    let start = Instant::now();
    let plain = expression.evaluate(&bindings)?;
    info!(elapsed = ?start.elapsed(), "Time for plain arrays");

    let threads = threads.unwrap_or(available_cores() / 2);
    Backend::shared().set_num_threads(threads);

    let start = Instant::now();
    let result = table.eval(source, &Bindings::new())?;
    info!(elapsed = ?start.elapsed(), "Time for ctable");
    info!("Result:\n{result}");

    ensure!(
        result.to_array()? == plain.into_array(length),
        "The table result differs from the plain result"
    );

    if let Some(path) = output {
        result.save(&path).context("Save result")?;
        info!(path = %path.display(), "Saved result");
    }

    Ok(())
}

fn run_levels(length: usize) -> anyhow::Result<()> {
    let values: Array = (0..length).map(|i| (i as f64).powf(2.2)).collect();

    for shuffle in [true, false] {
        for clevel in 0..=MAX_CLEVEL {
            let options = ArrayOptions::builder()
                .cparams(CParams::new(clevel, shuffle)?)
                .expected_len(length)
                .build();

            let start = Instant::now();
            let carray = CArray::from_array(&values, options)?;
            let compress = start.elapsed();

            let start = Instant::now();
            let decoded = carray.to_array()?;
            let decompress = start.elapsed();

            ensure!(
                decoded == values,
                "Decompressed values differ at clevel {clevel}"
            );

            info!(
                clevel,
                shuffle,
                cbytes = carray.cbytes(),
                ratio = %format!("{:.2}", carray.nbytes() as f64 / carray.cbytes().max(1) as f64),
                compress_mb_s = throughput(carray.nbytes(), compress),
                decompress_mb_s = throughput(carray.nbytes(), decompress),
                "Compressed",
            );
        }
    }

    Ok(())
}

fn throughput(nbytes: usize, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0;
    }
    (nbytes as f64 / secs / 1_000_000.0) as u64
}
