//! Thread persistence for threadline.
//!
//! A thread is the role+text history of a finished session, stored under
//! `key_prefix + thread_id` with a fixed time-to-live. Threads are written
//! once at the end of a session and read at most once when a later session
//! resumes them; they are never updated in place and simply expire.

pub mod codec;
pub mod file;
pub mod memory;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tl_domain::config::{ThreadBackend, ThreadsConfig};
use tl_domain::error::Result;

pub use codec::{decode_thread, encode_thread, StoredTurn};
pub use file::FileThreadStore;
pub use memory::MemoryThreadStore;
pub use store::ThreadStore;

/// Open the backend selected by `[threads] backend`.
pub fn open_store(cfg: &ThreadsConfig) -> Result<Arc<dyn ThreadStore>> {
    let ttl = Duration::from_secs(cfg.ttl_secs);
    let store: Arc<dyn ThreadStore> = match cfg.backend {
        ThreadBackend::Memory => Arc::new(MemoryThreadStore::new(&cfg.key_prefix, ttl)),
        ThreadBackend::File => Arc::new(FileThreadStore::new(&cfg.dir, &cfg.key_prefix, ttl)?),
    };
    tracing::info!(
        backend = store.backend(),
        ttl_secs = cfg.ttl_secs,
        "thread store ready"
    );
    Ok(store)
}
