//! File-backed thread store.
//!
//! Each thread lives in `<dir>/<key>.json` as `{"expires_at", "payload"}`.
//! Writes go to a temp file that is renamed into place, so readers never
//! see a half-written thread. All disk I/O runs on the blocking pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tl_domain::error::{Error, Result};
use tl_domain::tool::Message;
use tl_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::codec::{decode_thread, encode_thread};
use crate::store::{thread_key, ThreadStore};

#[derive(Debug, Serialize, Deserialize)]
struct ThreadFile {
    expires_at: DateTime<Utc>,
    payload: String,
}

pub struct FileThreadStore {
    dir: PathBuf,
    key_prefix: String,
    ttl: Duration,
}

impl FileThreadStore {
    pub fn new(dir: &Path, key_prefix: &str, ttl: Duration) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            key_prefix: key_prefix.to_owned(),
            ttl,
        })
    }

    /// File path for a thread id. Client-supplied ids are reduced to a
    /// safe character set so they cannot escape `dir`.
    fn path_for(&self, thread_id: &str) -> PathBuf {
        let key: String = thread_key(&self.key_prefix, thread_id)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{key}.json"))
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
}

#[async_trait]
impl ThreadStore for FileThreadStore {
    async fn store(&self, thread_id: &Uuid, messages: &[Message]) -> Result<()> {
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| Error::Config(format!("thread ttl out of range: {:?}", self.ttl)))?;
        let record = ThreadFile {
            expires_at,
            payload: encode_thread(messages)?,
        };
        let bytes = serde_json::to_vec(&record)?;
        let path = self.path_for(&thread_id.to_string());

        blocking(move || {
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, &bytes)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        })
        .await?;

        TraceEvent::ThreadStored {
            thread_id: thread_id.to_string(),
            messages: messages.len(),
            ttl_secs: self.ttl.as_secs(),
        }
        .emit();
        Ok(())
    }

    async fn restore(&self, thread_id: &str) -> Result<Vec<Message>> {
        let path = self.path_for(thread_id);
        let id = thread_id.to_owned();

        let raw = blocking(move || match std::fs::read(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        })
        .await?
        .ok_or_else(|| Error::ThreadNotFound(id.clone()))?;

        let record: ThreadFile = serde_json::from_slice(&raw).map_err(|e| Error::ThreadDecode {
            thread_id: id.clone(),
            message: e.to_string(),
        })?;
        if record.expires_at <= Utc::now() {
            return Err(Error::ThreadNotFound(id));
        }

        let messages = decode_thread(&id, &record.payload)?;
        TraceEvent::ThreadRestored {
            thread_id: id,
            messages: messages.len(),
        }
        .emit();
        Ok(messages)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let dir = self.dir.clone();
        blocking(move || {
            let now = Utc::now();
            let mut removed = 0;
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let expired = match std::fs::read(&path) {
                    Ok(raw) => serde_json::from_slice::<ThreadFile>(&raw)
                        .map(|r| r.expires_at <= now)
                        .unwrap_or(false),
                    Err(_) => false,
                };
                if expired && std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
