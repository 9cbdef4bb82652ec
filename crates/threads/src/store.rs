use async_trait::async_trait;
use tl_domain::error::Result;
use tl_domain::tool::Message;
use uuid::Uuid;

/// Persists and restores conversation threads.
///
/// Implementations must tolerate concurrent sessions: each session writes
/// only its own key and reads at most one foreign key.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Persist the role+text reduction of `messages` under `thread_id`.
    /// Overwriting an existing key replaces it and resets its expiry.
    ///
    /// Dropping the future does not roll back a write the backend already
    /// started: a session cancelled mid-store may still leave its thread,
    /// which then expires with the normal TTL.
    async fn store(&self, thread_id: &Uuid, messages: &[Message]) -> Result<()>;

    /// Load a thread. Missing or expired keys yield
    /// [`Error::ThreadNotFound`](tl_domain::error::Error::ThreadNotFound);
    /// a malformed payload yields
    /// [`Error::ThreadDecode`](tl_domain::error::Error::ThreadDecode).
    async fn restore(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

/// Storage key for a thread id.
pub fn thread_key(prefix: &str, thread_id: &str) -> String {
    format!("{prefix}{thread_id}")
}
