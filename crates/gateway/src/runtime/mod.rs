//! Session runtime: the turn loop, the system prompt and the outbound
//! writer.

pub mod prompt;
pub mod turn;
pub mod writer;

pub use prompt::SystemPrompt;
pub use turn::{SessionError, SessionOutcome, SessionRuntime};
pub use writer::SessionWriter;
