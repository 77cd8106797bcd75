//! nodectl - merge and convert node control reports.
//!
//! This is the entry point for the `nodectl` binary.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use node_controls_cli::{convert, load_codec_config, merge_files};
use node_controls_core::{WireCodec, WireFormat};

/// nodectl - merge and convert node control reports.
#[derive(Parser, Debug)]
#[command(name = "nodectl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON codec configuration file.
    #[arg(long, env = "NODECTL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Encoding of input files, overriding the config file (default json).
    #[arg(long, env = "NODECTL_FORMAT", global = true)]
    format: Option<WireFormat>,

    /// Largest input file accepted in bytes, overriding the config file.
    #[arg(long, env = "NODECTL_MAX_PAYLOAD_BYTES", global = true)]
    max_payload_bytes: Option<usize>,

    /// Enable debug logging.
    #[arg(long, default_value = "false", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge report files per node and print the result as JSON.
    Merge {
        /// Report files, oldest observer first.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-encode a single node controls payload.
    Convert {
        /// Payload file.
        file: PathBuf,

        /// Output encoding.
        #[arg(long)]
        to: WireFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        "node_controls=debug,warn"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = load_codec_config(args.config.as_deref())?;
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(max_payload_bytes) = args.max_payload_bytes {
        config.max_payload_bytes = max_payload_bytes;
    }
    let codec = WireCodec::new(config);

    let mut stdout = io::stdout().lock();
    match args.command {
        Command::Merge { files } => {
            let merged = merge_files(files.as_slice(), &codec)?;
            tracing::debug!(files = files.len(), nodes = merged.len(), "merged reports");
            serde_json::to_writer_pretty(&mut stdout, &merged)?;
            writeln!(stdout)?;
        }
        Command::Convert { file, to } => {
            let bytes = std::fs::read(&file)?;
            let output = convert(&bytes, &codec, &WireCodec::with_format(to))?;
            stdout.write_all(&output)?;
        }
    }
    stdout.flush()?;

    Ok(())
}
