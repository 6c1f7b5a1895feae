//! mpx - motion program file tool
//!
//! Offline companion to the execution client:
//! - encode a YAML program document into the controller's binary format
//! - decode a program binary back into readable commands
//! - dump a result log as CSV or JSON

use abb_mpx::{DecodedProgram, ProgramDocument, ResultLog};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "mpx")]
#[command(about = "Encode, inspect and dump ABB motion program files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a YAML program document into a program binary
    Encode {
        input: PathBuf,
        /// Output path, defaults to the input with a .bin extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Sequence number written instead of the document's own
        #[arg(long)]
        seqno: Option<u32>,
    },
    /// Print the commands in a program binary
    Decode { input: PathBuf },
    /// Print the samples of a result log
    Log {
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = LogFormat::Csv)]
        format: LogFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Csv,
    Json,
}

fn encode(input: PathBuf, output: Option<PathBuf>, seqno: Option<u32>) -> Result<()> {
    let program = ProgramDocument::load_from_path(&input)
        .and_then(|doc| doc.into_program())
        .with_context(|| format!("Failed to load program document {}", input.display()))?;
    let bytes = program
        .serialize(seqno)
        .context("Failed to encode motion program")?;

    let output = output.unwrap_or_else(|| input.with_extension("bin"));
    fs::write(&output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {} commands ({} bytes) to {}",
        program.commands().len(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

fn decode(input: PathBuf) -> Result<()> {
    let bytes = fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let program = DecodedProgram::parse(&bytes).context("Failed to decode motion program")?;
    print!("{}", program);
    Ok(())
}

fn dump_log(input: PathBuf, format: LogFormat) -> Result<()> {
    let bytes = fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let log = ResultLog::parse(&bytes).context("Failed to parse result log")?;
    info!("Result log {}: {} rows x {} columns", log.timestamp, log.rows(), log.columns());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        LogFormat::Csv => {
            writeln!(out, "{}", log.column_headers.join(","))?;
            for row in log.iter_rows() {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                writeln!(out, "{}", line.join(","))?;
            }
        }
        LogFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &log).context("Failed to serialize result log")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Encode { input, output, seqno } => encode(input, output, seqno),
        Commands::Decode { input } => decode(input),
        Commands::Log { input, format } => dump_log(input, format),
    }
}
