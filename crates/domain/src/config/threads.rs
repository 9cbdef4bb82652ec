use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Thread persistence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsConfig {
    #[serde(default)]
    pub backend: ThreadBackend,
    /// Lifetime of a stored thread, counted from the write.
    #[serde(default = "d_ttl_secs")]
    pub ttl_secs: u64,
    /// Namespace prepended to every thread id to form the storage key.
    #[serde(default = "d_key_prefix")]
    pub key_prefix: String,
    /// Directory for the `file` backend.
    #[serde(default = "d_dir")]
    pub dir: PathBuf,
    /// How often the background task drops expired threads.
    #[serde(default = "d_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            backend: ThreadBackend::Memory,
            ttl_secs: d_ttl_secs(),
            key_prefix: d_key_prefix(),
            dir: d_dir(),
            purge_interval_secs: d_purge_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadBackend {
    /// Process-local map. Threads do not survive a restart.
    #[default]
    Memory,
    /// One JSON file per thread; can be shared between instances.
    File,
}

fn d_ttl_secs() -> u64 {
    600
}
fn d_key_prefix() -> String {
    "thread:".into()
}
fn d_dir() -> PathBuf {
    PathBuf::from("./data/threads")
}
fn d_purge_interval_secs() -> u64 {
    60
}
