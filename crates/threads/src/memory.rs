//! Process-local thread store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tl_domain::error::{Error, Result};
use tl_domain::tool::Message;
use tl_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::codec::{decode_thread, encode_thread};
use crate::store::{thread_key, ThreadStore};

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-memory store with lazy expiry on read and an explicit
/// [`purge_expired`](ThreadStore::purge_expired) sweep.
pub struct MemoryThreadStore {
    key_prefix: String,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryThreadStore {
    pub fn new(key_prefix: &str, ttl: Duration) -> Self {
        Self {
            key_prefix: key_prefix.to_owned(),
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) threads.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw stored payload for a thread, if live.
    pub fn payload(&self, thread_id: &str) -> Option<String> {
        let key = thread_key(&self.key_prefix, thread_id);
        let entries = self.entries.read();
        entries
            .get(&key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.payload.clone())
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn store(&self, thread_id: &Uuid, messages: &[Message]) -> Result<()> {
        let payload = encode_thread(messages)?;
        let key = thread_key(&self.key_prefix, &thread_id.to_string());
        let expires_at = Instant::now()
            .checked_add(self.ttl)
            .ok_or_else(|| Error::Config(format!("thread ttl out of range: {:?}", self.ttl)))?;

        self.entries.write().insert(key, Entry { payload, expires_at });

        TraceEvent::ThreadStored {
            thread_id: thread_id.to_string(),
            messages: messages.len(),
            ttl_secs: self.ttl.as_secs(),
        }
        .emit();
        Ok(())
    }

    async fn restore(&self, thread_id: &str) -> Result<Vec<Message>> {
        let key = thread_key(&self.key_prefix, thread_id);
        let now = Instant::now();

        let payload = {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(e) if e.expires_at > now => Some(e.payload.clone()),
                Some(_) => None,
                None => return Err(Error::ThreadNotFound(thread_id.to_owned())),
            }
        };

        let Some(payload) = payload else {
            self.entries.write().remove(&key);
            return Err(Error::ThreadNotFound(thread_id.to_owned()));
        };

        let messages = decode_thread(thread_id, &payload)?;
        TraceEvent::ThreadRestored {
            thread_id: thread_id.to_owned(),
            messages: messages.len(),
        }
        .emit();
        Ok(messages)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        Ok(before - entries.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
