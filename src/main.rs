use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use lockstep::SyncConfig;
use lockstep_core::{CommandTag, CommandType};
use lockstep_net::{decode_frame_info, split_into_chunks, WireValue, WrapperChunk};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    version,
    about = "Inspect lockstep command types, frame info and wrapper chunks"
)]
struct Cli {
    /// Sync configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every command type with its policy flags.
    Types,
    /// Resolve a command type by tag or name.
    Lookup {
        /// Numeric tag or (case/punctuation-insensitive) name.
        query: String,
    },
    /// Decode a binary wrapper chunk given as hex.
    DecodeChunk {
        /// Chunk bytes, hex encoded.
        hex: String,
    },
    /// Decode a frame-info message given as JSON.
    DecodeFrame {
        /// Message JSON, e.g. '{"sender":2,"frame":14}'.
        json: String,
    },
    /// Split a payload into wrapper chunks and print each as hex.
    Split {
        /// Wrapped command id.
        #[arg(long)]
        id: u16,
        /// Payload bytes, hex encoded.
        #[arg(long)]
        hex: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting lockstep v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => SyncConfig::load_from_path(path),
        None => SyncConfig::load(),
    };
    config.validate().context("invalid sync configuration")?;

    match cli.command {
        Command::Types => print_types(),
        Command::Lookup { query } => lookup(&query)?,
        Command::DecodeChunk { hex } => {
            let bytes = parse_hex(&hex)?;
            let chunk = WrapperChunk::parse(&bytes)
                .map_err(|err| anyhow!("chunk rejected ({:?}): {err}", err.kind()))?;
            println!("{}", serde_json::to_string_pretty(&chunk)?);
        }
        Command::DecodeFrame { json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("message is not valid JSON")?;
            let Some(info) = decode_frame_info(&WireValue::from(value), config.max_slots) else {
                bail!("frame info rejected (max_slots = {})", config.max_slots);
            };
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Split { id, hex } => {
            let payload = parse_hex(&hex)?;
            let chunks = split_into_chunks(id, &payload, config.max_chunk_data_len)
                .context("failed to split payload")?;
            for chunk in chunks {
                println!("{}", to_hex(&chunk.encode()?));
            }
        }
    }
    Ok(())
}

fn print_types() {
    println!(
        "{:>3}  {:<36} {:>4} {:>4} {:>6} {:>5}",
        "tag", "name", "id", "ack", "direct", "sync"
    );
    for ty in CommandType::ALL {
        let flags = ty.policy();
        println!(
            "{:>3}  {:<36} {:>4} {:>4} {:>6} {:>5}",
            ty.tag(),
            ty.name(),
            yes_no(flags.requires_id),
            yes_no(flags.requires_ack),
            yes_no(flags.requires_direct_send),
            yes_no(flags.synchronized),
        );
    }
}

fn lookup(query: &str) -> Result<()> {
    let ty = match query.trim().parse::<i64>() {
        Ok(raw) => {
            let tag = CommandTag::try_from(raw)?;
            tag.command_type()
                .ok_or_else(|| anyhow!("no command type has tag {raw}"))?
        }
        Err(_) => query.parse::<CommandType>()?,
    };
    println!("{} {}", ty.tag(), ty.name());
    println!("{}", serde_json::to_string_pretty(&ty.policy())?);
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "-"
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).with_context(|| format!("invalid hex byte {byte:?}"))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
