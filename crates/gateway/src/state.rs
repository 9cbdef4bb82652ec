use std::sync::Arc;

use tl_domain::config::Config;
use tokio_util::sync::CancellationToken;

use crate::runtime::SessionRuntime;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runtime: Arc<SessionRuntime>,
    /// Cancelled on server shutdown; every session token is a child.
    pub shutdown: CancellationToken,
}
