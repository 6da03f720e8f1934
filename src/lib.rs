//! Configuration shared by the `lockstep` diagnostic tool and embedding hosts.

pub mod config;

pub use config::{SyncConfig, DEFAULT_CONFIG_PATH, DEFAULT_MAX_CHUNK_DATA_LEN};
