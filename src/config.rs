use lockstep_core::ArgumentError;
use lockstep_net::{
    AssemblyLimits, CommandStamper, COMMAND_ID_SEED, DEFAULT_MAX_ASSEMBLED_LEN, DEFAULT_MAX_CHUNKS,
    DEFAULT_MAX_PENDING, MAX_SLOTS,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

/// Default configuration location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/lockstep.toml";

/// Default fragment size used when splitting oversized commands.
pub const DEFAULT_MAX_CHUNK_DATA_LEN: usize = 400;

/// Session-level settings for the synchronization layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seats in the session; sender slots must be below this.
    pub max_slots: usize,
    /// First command id of every session. Must fit 16 bits.
    pub command_id_seed: i64,
    /// Largest data section of one wrapper chunk.
    pub max_chunk_data_len: usize,
    /// Largest reassembled wrapped command.
    pub max_assembled_len: usize,
    /// Most wrapped commands reassembled concurrently.
    pub max_pending_assemblies: usize,
    /// Largest chunk count of one wrapped command.
    pub max_chunks: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_slots: MAX_SLOTS,
            command_id_seed: i64::from(COMMAND_ID_SEED),
            max_chunk_data_len: DEFAULT_MAX_CHUNK_DATA_LEN,
            max_assembled_len: DEFAULT_MAX_ASSEMBLED_LEN,
            max_pending_assemblies: DEFAULT_MAX_PENDING,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<SyncConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    SyncConfig::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Sync config not found at {}. Using defaults", path.display());
                SyncConfig::default()
            }
            Err(err) => {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
                SyncConfig::default()
            }
        }
    }

    /// Reject settings that would be a local programming error at use time.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        self.stamper().map(|_| ())
    }

    /// Send-path stamper for a new session.
    pub fn stamper(&self) -> Result<CommandStamper, ArgumentError> {
        CommandStamper::with_seed(self.command_id_seed)
    }

    /// Reassembly bounds.
    pub fn assembly_limits(&self) -> AssemblyLimits {
        AssemblyLimits {
            max_assembled_len: self.max_assembled_len,
            max_pending: self.max_pending_assemblies,
            max_chunks: self.max_chunks,
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}
