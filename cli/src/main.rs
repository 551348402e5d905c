// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! # commp
//!
//! Streams a payload through the piece commitment accumulator and prints the
//! resulting commP together with the raw, unpadded and padded sizes.
//!
//! ## Usage:
//! ```bash
//! commp payload.car
//! cat payload.car | commp --zero-fill
//! RUST_LOG=debug commp --max-depth 35 payload.car
//! ```

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use filecoin_commp::{
    Accumulator, AccumulatorConfig, DEFAULT_MAX_DEPTH, PieceCommitment, TailPolicy,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "commp",
    about = "Compute the Filecoin piece commitment (commP) of a payload",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Payload to read; stdin when absent or `-`
    path: Option<PathBuf>,

    /// Maximum merkle tree depth, bounding the payload at 2^(depth-2) * 127 bytes
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Zero-fill a payload that does not end on a 127-byte boundary instead of failing
    #[arg(long, default_value_t = false)]
    zero_fill: bool,

    /// Read buffer size in bytes
    #[arg(long, default_value_t = 1 << 20, value_parser = clap::value_parser!(u32).range(1..))]
    chunk_size: u32,
}

impl Cli {
    fn config(&self) -> AccumulatorConfig {
        let tail = if self.zero_fill {
            TailPolicy::ZeroFill
        } else {
            TailPolicy::Reject
        };
        AccumulatorConfig::default()
            .with_max_depth(self.max_depth)
            .with_tail(tail)
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config();
    let chunk_size = cli.chunk_size as usize;

    let commitment = match cli.path.as_deref() {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            commit_reader(file, config, chunk_size)?
        }
        _ => commit_reader(io::stdin().lock(), config, chunk_size)?,
    };

    print!("{}", report(&commitment));
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Feeds everything `reader` yields to a fresh accumulator and finalizes it
fn commit_reader(
    mut reader: impl Read,
    config: AccumulatorConfig,
    chunk_size: usize,
) -> Result<PieceCommitment> {
    let mut acc = Accumulator::with_config(config).context("invalid accumulator configuration")?;
    let mut buf = vec![0u8; chunk_size];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read payload"),
        };
        acc.write(&buf[..n])
            .with_context(|| format!("failed after {} bytes", acc.bytes_written()))?;
    }

    let commitment = acc
        .finalize()
        .context("failed to finalize piece commitment")?;
    info!(
        comm_p = %commitment,
        payload_size = commitment.payload_size,
        padded_size = commitment.padded_size.get(),
        "finished"
    );
    Ok(commitment)
}

fn report(commitment: &PieceCommitment) -> String {
    format!(
        "CommP:          {}\n\
         Raw bytes:      {:>12} bytes\n\
         Unpadded piece: {:>12} bytes\n\
         Padded piece:   {:>12} bytes\n",
        commitment,
        commitment.payload_size,
        commitment.unpadded_size(),
        commitment.padded_size,
    )
}
