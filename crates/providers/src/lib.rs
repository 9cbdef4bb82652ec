pub mod google;
pub mod traits;
pub(crate) mod sse;
pub mod util;

// Re-exports for convenience.
pub use google::GoogleProvider;
pub use traits::{ChatRequest, LlmProvider};
